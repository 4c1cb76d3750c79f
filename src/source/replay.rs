//! Replay and capture sources
//!
//! A recorded session is a JSON array of tagged transport events:
//!
//! ```json
//! [
//!   {"type": "connected"},
//!   {"type": "topicAnnounced", "topic": {"uid": 1, "name": "/Speed", "type": "double", "properties": {}}},
//!   {"type": "dataReceived", "topic": {...}, "value": 1.25, "timestamp": 1000000}
//! ]
//! ```
//!
//! Binary payloads are wrapped as `{"type": "base64", "data": <string>}`.
//!
//! [`ReplaySource`] feeds such a document straight into the sink with no
//! network involved, which makes every downstream consumer testable
//! against a realistic event sequence. [`CapturingSource`] produces these
//! documents by wrapping a live source and mirroring its transport
//! traffic into an in-memory log.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::sink::DataSink;
use crate::source::live::{LiveSource, LiveSourceOptions, LIVE_SUPPLIER_ID};
use crate::source::transport::{Topic, TransportCallbacks, TransportFactory, TransportOptions};
use crate::source::DataSource;
use crate::types::{ConnectionState, Value};

/// One recorded transport event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordedEvent {
    /// Connection established
    Connected,
    /// Connection lost
    Disconnected,
    /// Topic announced
    TopicAnnounced {
        /// Topic metadata, copied by value
        topic: Topic,
    },
    /// Topic removed
    TopicRemoved {
        /// Topic metadata, copied by value
        topic: Topic,
    },
    /// Topic properties updated
    TopicUpdated {
        /// Topic metadata, copied by value
        topic: Topic,
    },
    /// Value received
    DataReceived {
        /// Topic metadata, copied by value
        topic: Topic,
        /// Raw JSON payload; binary values appear base64-wrapped
        value: serde_json::Value,
        /// Server timestamp in microseconds
        timestamp: i64,
    },
}

/// Replays a recorded event document into the sink.
///
/// `connect` replays the whole document synchronously; there is no
/// transport, no subscriptions, and the reported state is always
/// connected.
pub struct ReplaySource {
    sink: Arc<DataSink>,
    events: Vec<RecordedEvent>,
}

impl ReplaySource {
    /// Create a replay source over a fixed event sequence.
    pub fn new(sink: Arc<DataSink>, events: Vec<RecordedEvent>) -> Self {
        Self { sink, events }
    }

    /// Parse a recorded document from its JSON text.
    pub fn from_json(sink: Arc<DataSink>, json: &str) -> Result<Self> {
        let events: Vec<RecordedEvent> = serde_json::from_str(json)
            .map_err(|e| DataError::Recording(format!("invalid session document: {}", e)))?;
        Ok(Self::new(sink, events))
    }

    /// Load a recorded document from a file.
    pub fn from_file(sink: Arc<DataSink>, path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(sink, &json)
    }

    /// The recorded events backing this source.
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }
}

impl DataSource for ReplaySource {
    fn connect(&mut self, _server_address: &str) {
        for event in &self.events {
            match event {
                RecordedEvent::TopicAnnounced { topic } => {
                    self.sink.add(
                        LIVE_SUPPLIER_ID,
                        &topic.name,
                        &topic.wire_type,
                        topic.properties.clone(),
                        None,
                    );
                }
                RecordedEvent::DataReceived {
                    topic,
                    value,
                    timestamp,
                } => {
                    self.sink.enqueue(
                        LIVE_SUPPLIER_ID,
                        &topic.name,
                        *timestamp,
                        Value::from_json(value.clone()),
                    );
                }
                // state transitions and topic updates carry no data to replay
                RecordedEvent::Connected
                | RecordedEvent::Disconnected
                | RecordedEvent::TopicRemoved { .. }
                | RecordedEvent::TopicUpdated { .. } => {}
            }
        }

        tracing::debug!(events = self.events.len(), "replayed recorded session");
    }

    fn disconnect(&mut self) {}

    fn subscribe(&mut self, _slots: Option<&[String]>) {}

    fn set_ping_timeout_milliseconds(&mut self, _value: Option<u64>) {}

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn network_latency_microseconds(&self) -> Option<i64> {
        None
    }

    fn server_time_microseconds(&self) -> Option<i64> {
        None
    }
}

/// Wraps a live source, recording every transport event it sees.
///
/// The captured log serializes into the replay document format, so a
/// session recorded against a real server becomes an offline fixture.
pub struct CapturingSource {
    inner: LiveSource,
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl CapturingSource {
    /// Create a capturing source feeding the given sink.
    pub fn new(sink: Arc<DataSink>, factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_transport_options(sink, factory, TransportOptions::default())
    }

    /// Create a capturing source with explicit transport options.
    pub fn with_transport_options(
        sink: Arc<DataSink>,
        factory: Arc<dyn TransportFactory>,
        transport: TransportOptions,
    ) -> Self {
        let events: Arc<Mutex<Vec<RecordedEvent>>> = Arc::new(Mutex::new(Vec::new()));

        fn push(events: &Arc<Mutex<Vec<RecordedEvent>>>, event: RecordedEvent) {
            events.lock().expect("capture log poisoned").push(event);
        }

        let callbacks = TransportCallbacks {
            on_connect: {
                let events = events.clone();
                Arc::new(move || push(&events, RecordedEvent::Connected))
            },
            on_disconnect: {
                let events = events.clone();
                Arc::new(move || push(&events, RecordedEvent::Disconnected))
            },
            on_topic_announced: {
                let events = events.clone();
                Arc::new(move |topic: &Topic| {
                    push(
                        &events,
                        RecordedEvent::TopicAnnounced {
                            topic: topic.clone(),
                        },
                    )
                })
            },
            on_topic_removed: {
                let events = events.clone();
                Arc::new(move |topic: &Topic| {
                    push(
                        &events,
                        RecordedEvent::TopicRemoved {
                            topic: topic.clone(),
                        },
                    )
                })
            },
            on_topic_updated: {
                let events = events.clone();
                Arc::new(move |topic: &Topic| {
                    push(
                        &events,
                        RecordedEvent::TopicUpdated {
                            topic: topic.clone(),
                        },
                    )
                })
            },
            on_data_received: {
                let events = events.clone();
                Arc::new(move |topic: &Topic, value: Value, timestamp: i64| {
                    push(
                        &events,
                        RecordedEvent::DataReceived {
                            topic: topic.clone(),
                            value: value.to_replay_json(),
                            timestamp,
                        },
                    )
                })
            },
        };

        let inner = LiveSource::with_options(
            sink,
            factory,
            LiveSourceOptions {
                callbacks,
                transport,
                client_name: None,
            },
        );

        Self {
            inner,
            events,
            started_at: chrono::Utc::now(),
        }
    }

    /// When this capture began.
    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Number of captured events so far.
    pub fn event_count(&self) -> usize {
        self.events.lock().expect("capture log poisoned").len()
    }

    /// Snapshot of the captured events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().expect("capture log poisoned").clone()
    }

    /// Serialize the captured log into the replay document format.
    pub fn serialize(&self) -> Result<String> {
        let events = self.events.lock().expect("capture log poisoned");
        tracing::debug!(
            events = events.len(),
            started_at = %self.started_at,
            "serializing captured session"
        );
        Ok(serde_json::to_string(&*events)?)
    }
}

impl DataSource for CapturingSource {
    fn connect(&mut self, server_address: &str) {
        self.inner.connect(server_address);
    }

    fn disconnect(&mut self) {
        self.inner.disconnect();
    }

    fn subscribe(&mut self, slots: Option<&[String]>) {
        self.inner.subscribe(slots);
    }

    fn set_ping_timeout_milliseconds(&mut self, value: Option<u64>) {
        self.inner.set_ping_timeout_milliseconds(value);
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn network_latency_microseconds(&self) -> Option<i64> {
        self.inner.network_latency_microseconds()
    }

    fn server_time_microseconds(&self) -> Option<i64> {
        self.inner.server_time_microseconds()
    }
}
