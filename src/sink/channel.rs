//! Data channels
//!
//! A [`DataChannel`] is one logical topic: a composite `(source, id)` key,
//! a declared primitive type, optional structured-type metadata, retained
//! records, and an optional publish binding installed by the live source.
//! Identity never changes once announced; records and the publish binding
//! are replaced on reconnect.
//!
//! Publishing applies a type guard before touching the wire: a value whose
//! runtime shape does not match the channel's declared type is silently
//! dropped rather than corrupting the topic's type upstream.

use std::sync::{Arc, RwLock};

use crate::sink::retention::{RecordRing, RetentionPolicy};
use crate::slot::Slot;
use crate::types::{parse_wire_type, ChannelRecord, DataType, StructuredType, Value};

/// Composite channel lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Supplier identifier, e.g. `nt`
    pub source: String,
    /// Channel identifier (topic path)
    pub id: String,
}

impl ChannelKey {
    /// Create a new key
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.id)
    }
}

/// Publish function bound to a channel at creation time.
///
/// Arguments are `(topic, wire type, value)`; the live source implements
/// this by lazily publishing the topic and setting its value.
pub type PublishFn = Arc<dyn Fn(&str, &str, Value) + Send + Sync>;

/// One logical topic with retained history
pub struct DataChannel {
    key: ChannelKey,
    wire_type: String,
    data_type: DataType,
    structured_type: Option<StructuredType>,
    properties: serde_json::Value,
    records: RwLock<RecordRing>,
    publisher: RwLock<Option<PublishFn>>,
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("key", &self.key)
            .field("data_type", &self.data_type)
            .field("structured_type", &self.structured_type)
            .finish_non_exhaustive()
    }
}

impl DataChannel {
    /// Create a channel from an announced topic.
    pub fn new(
        key: ChannelKey,
        wire_type: impl Into<String>,
        properties: serde_json::Value,
        publisher: Option<PublishFn>,
    ) -> Self {
        let wire_type = wire_type.into();
        let (data_type, structured_type) = parse_wire_type(&wire_type);
        Self {
            key,
            wire_type,
            data_type,
            structured_type,
            properties,
            records: RwLock::new(RecordRing::new()),
            publisher: RwLock::new(publisher),
        }
    }

    /// Composite lookup key.
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Supplier identifier.
    pub fn source(&self) -> &str {
        &self.key.source
    }

    /// Channel identifier (topic path).
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Declared primitive type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Structured-type descriptor, when the payload is non-primitive.
    pub fn structured_type(&self) -> Option<&StructuredType> {
        self.structured_type.as_ref()
    }

    /// Wire type string the topic was announced with.
    pub fn wire_type(&self) -> &str {
        &self.wire_type
    }

    /// Topic properties as announced.
    pub fn properties(&self) -> &serde_json::Value {
        &self.properties
    }

    /// Slot string widgets use to reference this channel.
    pub fn slot(&self) -> String {
        Slot::from_channel(&self.key.source, &self.key.id, self.data_type)
    }

    /// Snapshot of retained records, oldest first.
    pub fn records(&self) -> Vec<ChannelRecord> {
        self.records.read().expect("records lock poisoned").to_vec()
    }

    /// Most recent record by insertion order.
    pub fn latest(&self) -> Option<ChannelRecord> {
        self.records
            .read()
            .expect("records lock poisoned")
            .latest()
            .cloned()
    }

    /// Records whose timestamps fall within `window_micros` of the tail.
    pub fn lookback(&self, window_micros: i64) -> Vec<ChannelRecord> {
        self.records
            .read()
            .expect("records lock poisoned")
            .lookback(window_micros)
    }

    /// Number of retained records.
    pub fn record_count(&self) -> usize {
        self.records.read().expect("records lock poisoned").len()
    }

    pub(crate) fn append(&self, record: ChannelRecord) {
        self.records
            .write()
            .expect("records lock poisoned")
            .append(record);
    }

    pub(crate) fn enforce_retention(&self, policy: &RetentionPolicy, reference_micros: i64) -> usize {
        self.records
            .write()
            .expect("records lock poisoned")
            .enforce(policy, reference_micros)
    }

    pub(crate) fn purge(&self) {
        self.records.write().expect("records lock poisoned").purge();
    }

    pub(crate) fn set_publisher(&self, publisher: Option<PublishFn>) {
        *self.publisher.write().expect("publisher lock poisoned") = publisher;
    }

    /// Publish a value back to the upstream topic.
    ///
    /// The value is forwarded only when its runtime shape matches the
    /// channel's declared type; mismatches are dropped without error.
    /// Returns whether the value was forwarded.
    pub fn publish(&self, value: Value) -> bool {
        let publisher = self.publisher.read().expect("publisher lock poisoned");
        let Some(publish) = publisher.as_ref() else {
            return false;
        };

        let Some(value) = coerce_for_publish(value, self.data_type) else {
            tracing::debug!(
                topic = %self.key.id,
                declared = %self.data_type,
                "dropping publish with mismatched value shape"
            );
            return false;
        };

        publish(&self.key.id, &self.wire_type, value);
        true
    }
}

/// Check a value against a declared type, coercing where the declared type
/// allows it. Returns `None` on a shape mismatch.
///
/// Exact match for scalar primitives; element-wise coercion from JSON
/// arrays into the typed array variants; any JSON-compatible value for
/// `json`; raw passthrough for `binary` and `composite`.
pub fn coerce_for_publish(value: Value, declared: DataType) -> Option<Value> {
    use serde_json::Value as Json;

    match declared {
        DataType::Boolean => matches!(value, Value::Boolean(_)).then_some(value),
        DataType::Number => matches!(value, Value::Number(_)).then_some(value),
        DataType::Str => matches!(value, Value::Str(_)).then_some(value),
        DataType::BooleanArray => match value {
            Value::BooleanArray(_) => Some(value),
            Value::Json(Json::Array(items)) => items
                .iter()
                .map(Json::as_bool)
                .collect::<Option<Vec<_>>>()
                .map(Value::BooleanArray),
            _ => None,
        },
        DataType::NumberArray => match value {
            Value::NumberArray(_) => Some(value),
            Value::Json(Json::Array(items)) => items
                .iter()
                .map(Json::as_f64)
                .collect::<Option<Vec<_>>>()
                .map(Value::NumberArray),
            _ => None,
        },
        DataType::StringArray => match value {
            Value::StringArray(_) => Some(value),
            Value::Json(Json::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(Value::StringArray),
            _ => None,
        },
        DataType::Json => match value {
            Value::Binary(_) => None,
            other => Some(other),
        },
        DataType::Binary | DataType::Composite => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel(wire_type: &str, publisher: Option<PublishFn>) -> DataChannel {
        DataChannel::new(
            ChannelKey::new("nt", "/Test"),
            wire_type,
            json!({}),
            publisher,
        )
    }

    fn counting_publisher() -> (PublishFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let publish: PublishFn = Arc::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (publish, count)
    }

    #[test]
    fn test_new_parses_wire_type() {
        let ch = channel("struct:Pose2d", None);
        assert_eq!(ch.data_type(), DataType::Json);
        assert_eq!(ch.structured_type().unwrap().name, "Pose2d");
        assert_eq!(ch.wire_type(), "struct:Pose2d");
    }

    #[test]
    fn test_slot_reflects_composite() {
        let ch = channel("Field2d", None);
        assert_eq!(ch.slot(), "nt:/Test/*");
    }

    #[test]
    fn test_publish_type_guard_drops_mismatch() {
        let (publish, count) = counting_publisher();
        let ch = channel("double", Some(publish));

        assert!(!ch.publish(Value::Str("not a number".into())));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(ch.publish(Value::Number(3.5)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_without_binding() {
        let ch = channel("double", None);
        assert!(!ch.publish(Value::Number(1.0)));
    }

    #[test]
    fn test_coerce_scalars() {
        assert!(coerce_for_publish(Value::Boolean(true), DataType::Boolean).is_some());
        assert!(coerce_for_publish(Value::Number(1.0), DataType::Boolean).is_none());
        assert!(coerce_for_publish(Value::Str("x".into()), DataType::Number).is_none());
    }

    #[test]
    fn test_coerce_json_array_elementwise() {
        let coerced = coerce_for_publish(Value::Json(json!([1, 2, 3])), DataType::NumberArray);
        assert_eq!(coerced, Some(Value::NumberArray(vec![1.0, 2.0, 3.0])));

        let rejected = coerce_for_publish(Value::Json(json!([1, "x"])), DataType::NumberArray);
        assert_eq!(rejected, None);
    }

    #[test]
    fn test_coerce_json_accepts_objects() {
        assert!(coerce_for_publish(Value::Json(json!({"a": 1})), DataType::Json).is_some());
        assert!(coerce_for_publish(Value::Number(1.0), DataType::Json).is_some());
        assert!(coerce_for_publish(Value::Binary(vec![1]), DataType::Json).is_none());
    }

    #[test]
    fn test_coerce_binary_passthrough() {
        assert_eq!(
            coerce_for_publish(Value::Binary(vec![1, 2]), DataType::Binary),
            Some(Value::Binary(vec![1, 2]))
        );
    }

    #[test]
    fn test_records_start_empty() {
        let ch = channel("double", None);
        assert!(ch.records().is_empty());
        assert!(ch.latest().is_none());
        assert_eq!(ch.record_count(), 0);
    }
}
