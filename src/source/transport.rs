//! Transport client contract
//!
//! The wire protocol itself lives outside this crate. What the data engine
//! needs from a transport is captured here: a client that announces and
//! removes topics, delivers timestamped values, accepts subscription and
//! publish calls, and reports connection state. Production wires an actual
//! protocol client behind [`TransportClient`]; tests use a scripted fake.
//!
//! Callbacks are cloneable closures with no-op defaults so a source can
//! chain its own behavior after caller-supplied taps, which is also how
//! the capturing source mirrors traffic into its event log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionState, Value};

/// Topic metadata announced by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Server-assigned topic uid
    pub uid: i64,
    /// Full topic name (path)
    pub name: String,
    /// Wire type string, e.g. `double` or `struct:Pose2d`
    #[serde(rename = "type")]
    pub wire_type: String,
    /// Topic properties as announced
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Topic {
    /// Create topic metadata.
    pub fn new(uid: i64, name: impl Into<String>, wire_type: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            wire_type: wire_type.into(),
            properties: serde_json::Value::Object(Default::default()),
        }
    }
}

/// Options for one wire subscription
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscribeOptions {
    /// Match all topics under the given prefixes instead of exact names
    pub prefix: bool,
    /// Server-side value batching period in seconds
    pub periodic: f64,
    /// Deliver topic metadata only, no values
    pub topics_only: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            prefix: false,
            periodic: 0.1,
            topics_only: false,
        }
    }
}

/// Opaque handle identifying one wire subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Reconnect policy passed through to the transport.
///
/// The data engine never retries on its own; this is configuration for
/// the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first reconnect attempt, milliseconds
    pub initial_delay_milliseconds: u64,
    /// Upper bound on the reconnect delay, milliseconds
    pub max_delay_milliseconds: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_milliseconds: 250,
            max_delay_milliseconds: 5000,
        }
    }
}

/// Transport construction options
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Reconnect policy forwarded to the transport
    pub retry_policy: Option<RetryPolicy>,
    /// Ping timeout override, milliseconds
    pub ping_timeout_milliseconds: Option<u64>,
    /// Use a secure connection
    pub secure: bool,
}

type ConnectionCallback = Arc<dyn Fn() + Send + Sync>;
type TopicCallback = Arc<dyn Fn(&Topic) + Send + Sync>;
type DataCallback = Arc<dyn Fn(&Topic, Value, i64) + Send + Sync>;

/// Callbacks a transport invokes as protocol events arrive
#[derive(Clone)]
pub struct TransportCallbacks {
    /// Connection established
    pub on_connect: ConnectionCallback,
    /// Connection lost or closed
    pub on_disconnect: ConnectionCallback,
    /// Topic announced by the server
    pub on_topic_announced: TopicCallback,
    /// Topic removed by the server
    pub on_topic_removed: TopicCallback,
    /// Topic properties updated
    pub on_topic_updated: TopicCallback,
    /// Value received for a topic, with server timestamp in microseconds
    pub on_data_received: DataCallback,
}

impl Default for TransportCallbacks {
    fn default() -> Self {
        Self {
            on_connect: Arc::new(|| {}),
            on_disconnect: Arc::new(|| {}),
            on_topic_announced: Arc::new(|_| {}),
            on_topic_removed: Arc::new(|_| {}),
            on_topic_updated: Arc::new(|_| {}),
            on_data_received: Arc::new(|_, _, _| {}),
        }
    }
}

impl std::fmt::Debug for TransportCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportCallbacks").finish_non_exhaustive()
    }
}

/// Abstract wire protocol client
///
/// Implementations own the socket, the reconnect loop, and the codec. The
/// data engine only issues the calls below and reacts to the callbacks it
/// registered at construction time.
pub trait TransportClient: Send {
    /// Open (or nudge) the connection.
    fn connect(&mut self);

    /// Close the connection and stop reconnecting.
    fn disconnect(&mut self);

    /// Subscribe to a batch of topic patterns. Returns a handle for
    /// [`TransportClient::unsubscribe`].
    fn subscribe(&mut self, patterns: &[String], options: SubscribeOptions) -> SubscriptionHandle;

    /// Cancel a subscription.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);

    /// Publish a topic so values can be written to it.
    fn publish_topic(&mut self, name: &str, wire_type: &str);

    /// Withdraw a published topic.
    fn unpublish_topic(&mut self, name: &str);

    /// Whether a topic is currently published by this client.
    fn is_topic_published(&self, name: &str) -> bool;

    /// Write a value to a published topic.
    fn set_value(&mut self, name: &str, value: Value);

    /// Update the ping timeout, milliseconds.
    fn set_ping_timeout_milliseconds(&mut self, value: Option<u64>);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Address this client was created for.
    fn server_address(&self) -> &str;

    /// Last measured round-trip latency in microseconds, if known.
    fn network_latency_microseconds(&self) -> Option<i64>;

    /// Current estimate of server time in microseconds, if known.
    fn server_time_microseconds(&self) -> Option<i64>;
}

/// Factory creating transport clients for a given server address.
///
/// The live source creates one client per distinct address and keeps it
/// alive across reconnect nudges.
pub trait TransportFactory: Send + Sync {
    /// Create a client wired to the given callbacks.
    fn create(
        &self,
        address: &str,
        client_name: &str,
        callbacks: TransportCallbacks,
        options: &TransportOptions,
    ) -> Box<dyn TransportClient>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_serde_uses_wire_field_names() {
        let topic = Topic::new(7, "/Speed", "double");
        let json = serde_json::to_value(&topic).unwrap();
        assert_eq!(json["type"], "double");
        assert_eq!(json["name"], "/Speed");

        let back: Topic = serde_json::from_value(json).unwrap();
        assert_eq!(back, topic);
    }

    #[test]
    fn test_default_callbacks_are_noops() {
        let callbacks = TransportCallbacks::default();
        (callbacks.on_connect)();
        (callbacks.on_topic_announced)(&Topic::new(1, "/a", "double"));
        (callbacks.on_data_received)(&Topic::new(1, "/a", "double"), Value::Number(1.0), 0);
    }
}
