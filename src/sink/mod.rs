//! Data sink: channel index, namespace forest, and retention
//!
//! The sink is the single writer for everything a dashboard reads: it owns
//! the channel map, the per-supplier namespace trees, and the retained
//! record history. Sources push announcements and data into it from
//! transport callbacks; widgets read channels out of it at their own
//! cadence; the scheduler drives its retention sweep.
//!
//! # Architecture
//!
//! Construction follows the backend/frontend split used throughout this
//! codebase: [`DataSink::new`] returns the sink together with a
//! [`SinkEvent`] receiver the UI layer drains for structural changes
//! (channel added/removed). Data updates do NOT produce events; consumers
//! sample records at their own frame rate.
//!
//! # Failure semantics
//!
//! Transport callbacks arrive in arbitrary order relative to subscription
//! acknowledgements, so every entry point degrades to a no-op instead of
//! failing when its channel is unknown: data before announce is dropped,
//! a second remove does nothing. This is the concurrency-safety mechanism
//! that makes arrival-order races harmless.
//!
//! # Locking
//!
//! All namespace mutation happens behind one `RwLock` at the sink
//! boundary; each channel's records sit behind their own lock so widget
//! reads never contend with tree edits. One exclusive writer, many
//! concurrent readers of the last-committed state.

pub mod channel;
pub mod retention;
pub mod tree;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::collate::Collator;
use crate::slot::Slot;
use crate::types::{ChannelRecord, Value};

pub use channel::{coerce_for_publish, ChannelKey, DataChannel, PublishFn};
pub use retention::{RecordRing, RetentionPolicy};
pub use tree::DataNode;

/// Structural change notification sent to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A channel was announced and bound into the namespace
    ChannelAdded(ChannelKey),
    /// A channel was removed from the namespace
    ChannelRemoved(ChannelKey),
}

/// Sink construction options
#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    /// Retention bounds applied on every sweep
    pub retention: RetentionPolicy,
    /// Collator for namespace child ordering
    pub collator: Collator,
}

/// One top-level namespace root per upstream source identifier.
///
/// The revision counter bumps on every structural change under this root
/// so observers can detect "this subtree changed" without deep comparison.
#[derive(Debug)]
pub struct Supplier {
    /// Supplier identifier, e.g. `nt` or `wpilog`
    pub id: String,
    /// Virtual root node
    pub root: DataNode,
    /// State revision
    pub revision: u64,
}

struct SinkState {
    suppliers: Vec<Supplier>,
    channels: HashMap<ChannelKey, Arc<DataChannel>>,
}

/// The data sink
pub struct DataSink {
    retention: RetentionPolicy,
    collator: Collator,
    state: RwLock<SinkState>,
    events: Sender<SinkEvent>,
}

impl DataSink {
    /// Create a sink and the receiver for its structural events.
    pub fn new(options: SinkOptions) -> (Self, Receiver<SinkEvent>) {
        let (events, receiver) = unbounded();
        let sink = Self {
            retention: options.retention,
            collator: options.collator,
            state: RwLock::new(SinkState {
                suppliers: Vec::new(),
                channels: HashMap::new(),
            }),
            events,
        };
        (sink, receiver)
    }

    /// Retention bounds in force.
    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Ensure a channel exists for the announced topic and bind it into
    /// the namespace.
    ///
    /// A repeated announcement for an existing key keeps the channel's
    /// identity (and declared type) and replaces only its publish binding,
    /// which is how reconnects refresh stale bindings.
    pub fn add(
        &self,
        source: &str,
        topic_path: &str,
        wire_type: &str,
        properties: serde_json::Value,
        publisher: Option<PublishFn>,
    ) {
        let key = ChannelKey::new(source, topic_path);

        {
            let mut state = self.state.write().expect("sink lock poisoned");

            let channel = match state.channels.get(&key) {
                Some(existing) => {
                    existing.set_publisher(publisher);
                    existing.clone()
                }
                None => {
                    let created = Arc::new(DataChannel::new(
                        key.clone(),
                        wire_type,
                        properties,
                        publisher,
                    ));
                    state.channels.insert(key.clone(), created.clone());
                    created
                }
            };

            let collator = self.collator.clone();
            let supplier = supplier_entry(&mut state.suppliers, source);
            if let Some(node) = tree::get_or_create(&mut supplier.root, topic_path, &collator) {
                // rewrite id to match the channel
                node.id = format!("{}:{}", source, topic_path);
                node.channel = Some(channel);
                supplier.revision += 1;
            }
        }

        let _ = self.events.send(SinkEvent::ChannelAdded(key));
    }

    /// Remove a channel and its namespace node. No-op when unknown.
    pub fn remove(&self, source: &str, topic_path: &str) {
        let key = ChannelKey::new(source, topic_path);

        {
            let mut state = self.state.write().expect("sink lock poisoned");
            if state.channels.remove(&key).is_none() {
                tracing::trace!(source, topic = topic_path, "remove for unknown channel");
                return;
            }

            let collator = self.collator.clone();
            if let Some(supplier) = state.suppliers.iter_mut().find(|s| s.id == source) {
                tree::remove(&mut supplier.root, topic_path, &collator);
                supplier.revision += 1;
            }
        }

        let _ = self.events.send(SinkEvent::ChannelRemoved(key));
    }

    /// Append a record to the identified channel.
    ///
    /// The value is normalized first (recorded-session base64 wrappers are
    /// unwrapped). An update arriving before its announcement is dropped
    /// without creating a phantom channel.
    pub fn enqueue(&self, source: &str, topic_path: &str, timestamp_micros: i64, value: Value) {
        let Some(channel) = self.get(source, topic_path) else {
            tracing::trace!(source, topic = topic_path, "data for unknown channel");
            return;
        };

        channel.append(ChannelRecord::new(timestamp_micros, value.normalized()));
    }

    /// Direct channel lookup by composite key, independent of the
    /// namespace tree.
    pub fn get(&self, source: &str, id: &str) -> Option<Arc<DataChannel>> {
        let state = self.state.read().expect("sink lock poisoned");
        state.channels.get(&ChannelKey::new(source, id)).cloned()
    }

    /// Resolve a slot string to its channel, if both are known.
    pub fn get_slot(&self, slot: &str) -> Option<Arc<DataChannel>> {
        let channel_ref = Slot::to_channel(slot)?;
        self.get(&channel_ref.source, &channel_ref.id)
    }

    /// Current in-memory records for a channel, oldest first. Empty when
    /// the channel is unknown.
    pub fn records(&self, source: &str, id: &str) -> Vec<ChannelRecord> {
        self.get(source, id)
            .map(|channel| channel.records())
            .unwrap_or_default()
    }

    /// Records within `window_micros` of the channel's latest record.
    /// Empty when the channel is unknown.
    pub fn lookback(&self, source: &str, id: &str, window_micros: i64) -> Vec<ChannelRecord> {
        self.get(source, id)
            .map(|channel| channel.lookback(window_micros))
            .unwrap_or_default()
    }

    /// Number of known channels.
    pub fn channel_count(&self) -> usize {
        self.state.read().expect("sink lock poisoned").channels.len()
    }

    /// Discard all record history while keeping channel identities.
    /// Called on every connection-establish to drop stale state.
    pub fn purge(&self) {
        let state = self.state.read().expect("sink lock poisoned");
        for channel in state.channels.values() {
            channel.purge();
        }
        tracing::debug!(channels = state.channels.len(), "purged record history");
    }

    /// Run one retention sweep over every channel.
    pub fn enforce_retention(&self, reference_micros: i64) {
        let channels: Vec<_> = {
            let state = self.state.read().expect("sink lock poisoned");
            state.channels.values().cloned().collect()
        };

        let mut evicted = 0;
        for channel in &channels {
            evicted += channel.enforce_retention(&self.retention, reference_micros);
        }

        if evicted > 0 {
            tracing::debug!(evicted, reference_micros, "retention sweep");
        }
    }

    /// Read access to the supplier forest.
    pub fn with_suppliers<R>(&self, f: impl FnOnce(&[Supplier]) -> R) -> R {
        let state = self.state.read().expect("sink lock poisoned");
        f(&state.suppliers)
    }

    /// Revision counter of one supplier's subtree, if it exists.
    pub fn supplier_revision(&self, source: &str) -> Option<u64> {
        self.with_suppliers(|suppliers| {
            suppliers
                .iter()
                .find(|s| s.id == source)
                .map(|s| s.revision)
        })
    }
}

/// Find or create the supplier root for `source`.
fn supplier_entry<'a>(suppliers: &'a mut Vec<Supplier>, source: &str) -> &'a mut Supplier {
    if let Some(index) = suppliers.iter().position(|s| s.id == source) {
        return &mut suppliers[index];
    }

    suppliers.push(Supplier {
        id: source.to_string(),
        root: DataNode::new(source, ""),
        revision: 0,
    });
    suppliers.last_mut().expect("just pushed")
}
