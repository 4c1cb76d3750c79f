//! Live data source
//!
//! Adapts a wire transport into sink calls: topic announcements become
//! channels, data frames become records, and a connect purges history
//! left over from the previous session. The source also owns the
//! subscription set and keeps it minimal: widgets hand over their slot
//! set, and the source folds it into at most two batched wire
//! subscriptions (exact-match and prefix), since the protocol charges per
//! subscription handle.
//!
//! Publishing is lazy. A channel's publish binding re-publishes its topic
//! on first use after a subscription reset or reconnect, so dropping all
//! published registrations in `subscribe`/`disconnect` is safe.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::sink::{DataSink, PublishFn};
use crate::slot::Slot;
use crate::source::transport::{
    SubscribeOptions, SubscriptionHandle, Topic, TransportCallbacks, TransportClient,
    TransportFactory, TransportOptions,
};
use crate::source::DataSource;
use crate::types::{ConnectionState, Value};

/// Supplier identifier for the live feed
pub const LIVE_SUPPLIER_ID: &str = "nt";

/// Refresh period for the always-on metadata/schema subscriptions, seconds
const TOPICS_REFRESH_SECONDS: f64 = 0.5;

/// Refresh period for data subscriptions, seconds
const DATA_REFRESH_SECONDS: f64 = 0.1;

/// Schema topics live under this prefix
const SCHEMA_PREFIX: &str = "/.schema/";

/// Live source construction options
#[derive(Debug, Clone, Default)]
pub struct LiveSourceOptions {
    /// Caller-supplied callback taps, invoked before the source's own
    /// handling of each transport event
    pub callbacks: TransportCallbacks,
    /// Options forwarded to the transport
    pub transport: TransportOptions,
    /// Client name announced to the server
    pub client_name: Option<String>,
}

/// Default client name announced to the server
const DEFAULT_CLIENT_NAME: &str = "ntdata";

struct ClientCell {
    client: Option<Box<dyn TransportClient>>,
    subscriptions: Vec<SubscriptionHandle>,
    published: Vec<String>,
}

/// Live wire-transport data source
pub struct LiveSource {
    sink: Arc<DataSink>,
    factory: Arc<dyn TransportFactory>,
    options: LiveSourceOptions,
    cell: Arc<Mutex<ClientCell>>,
}

impl LiveSource {
    /// Create a live source feeding the given sink.
    pub fn new(sink: Arc<DataSink>, factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_options(sink, factory, LiveSourceOptions::default())
    }

    /// Create a live source with explicit options.
    pub fn with_options(
        sink: Arc<DataSink>,
        factory: Arc<dyn TransportFactory>,
        options: LiveSourceOptions,
    ) -> Self {
        Self {
            sink,
            factory,
            options,
            cell: Arc::new(Mutex::new(ClientCell {
                client: None,
                subscriptions: Vec::new(),
                published: Vec::new(),
            })),
        }
    }

    /// Publish binding handed to every announced channel. Publishes the
    /// topic lazily on first use, then writes the value.
    fn make_publish_fn(&self) -> PublishFn {
        let cell = Arc::clone(&self.cell);
        Arc::new(move |topic: &str, wire_type: &str, value: Value| {
            let mut cell = cell.lock().expect("client lock poisoned");
            let ClientCell {
                client, published, ..
            } = &mut *cell;
            let Some(client) = client.as_mut() else {
                return;
            };

            if !client.is_topic_published(topic) {
                client.publish_topic(topic, wire_type);
                published.push(topic.to_string());
            }

            client.set_value(topic, value);
        })
    }

    /// Build the callback set wired into a new transport: caller taps
    /// first, then the sink plumbing.
    fn build_callbacks(&self) -> TransportCallbacks {
        let taps = self.options.callbacks.clone();
        let publish = self.make_publish_fn();

        let on_connect = {
            let tap = taps.on_connect;
            let sink = self.sink.clone();
            Arc::new(move || {
                tap();
                // drop any records left over from a previous session
                sink.purge();
                tracing::debug!("transport connected");
            })
        };

        let on_disconnect = {
            let tap = taps.on_disconnect;
            Arc::new(move || {
                tap();
                tracing::debug!("transport disconnected");
            })
        };

        let on_topic_announced = {
            let tap = taps.on_topic_announced;
            let sink = self.sink.clone();
            Arc::new(move |topic: &Topic| {
                tap(topic);
                sink.add(
                    LIVE_SUPPLIER_ID,
                    &topic.name,
                    &topic.wire_type,
                    topic.properties.clone(),
                    Some(publish.clone()),
                );
            })
        };

        let on_data_received = {
            let tap = taps.on_data_received;
            let sink = self.sink.clone();
            Arc::new(
                move |topic: &Topic, value: Value, timestamp: i64| {
                    tap(topic, value.clone(), timestamp);
                    sink.enqueue(LIVE_SUPPLIER_ID, &topic.name, timestamp, value);
                },
            )
        };

        TransportCallbacks {
            on_connect,
            on_disconnect,
            on_topic_announced,
            on_topic_removed: taps.on_topic_removed,
            on_topic_updated: taps.on_topic_updated,
            on_data_received,
        }
    }
}

impl DataSource for LiveSource {
    fn connect(&mut self, server_address: &str) {
        {
            let mut cell = self.cell.lock().expect("client lock poisoned");
            if let Some(client) = cell.client.as_mut() {
                if client.server_address() == server_address {
                    // reuse the existing transport; nudge it to reconnect
                    client.connect();
                    return;
                }
            }

            // different address: tear the current transport down first
            if let Some(mut client) = cell.client.take() {
                client.disconnect();
            }
            cell.subscriptions.clear();
            cell.published.clear();
        }

        let callbacks = self.build_callbacks();
        let client_name = self
            .options
            .client_name
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_NAME);
        let mut client =
            self.factory
                .create(server_address, client_name, callbacks, &self.options.transport);

        client.connect();

        // subscribe to receive the list of all topics
        client.subscribe(
            &[String::new()],
            SubscribeOptions {
                prefix: true,
                periodic: TOPICS_REFRESH_SECONDS,
                topics_only: true,
            },
        );

        // subscribe to receive schema updates
        client.subscribe(
            &[SCHEMA_PREFIX.to_string()],
            SubscribeOptions {
                prefix: true,
                periodic: TOPICS_REFRESH_SECONDS,
                topics_only: false,
            },
        );

        let mut cell = self.cell.lock().expect("client lock poisoned");
        cell.client = Some(client);
        tracing::debug!(address = server_address, "live source connecting");
    }

    fn disconnect(&mut self) {
        let mut cell = self.cell.lock().expect("client lock poisoned");
        if let Some(mut client) = cell.client.take() {
            client.disconnect();
        }
        cell.subscriptions.clear();
        cell.published.clear();
    }

    fn subscribe(&mut self, slots: Option<&[String]>) {
        let mut cell = self.cell.lock().expect("client lock poisoned");
        let ClientCell {
            client,
            subscriptions,
            published,
        } = &mut *cell;
        let Some(client) = client.as_mut() else {
            return;
        };

        for handle in subscriptions.drain(..) {
            client.unsubscribe(handle);
        }

        // drop previously published topics; they re-publish lazily when a
        // widget next interacts with the corresponding slot
        for name in published.drain(..) {
            client.unpublish_topic(&name);
        }

        let Some(slots) = slots else {
            // subscribe to receive all values (expensive)
            subscriptions.push(client.subscribe(
                &[String::new()],
                SubscribeOptions {
                    prefix: true,
                    periodic: DATA_REFRESH_SECONDS,
                    topics_only: false,
                },
            ));
            return;
        };

        let (exact, prefixed) = partition_slots(slots);

        if !exact.is_empty() {
            subscriptions.push(client.subscribe(
                &exact,
                SubscribeOptions {
                    prefix: false,
                    periodic: DATA_REFRESH_SECONDS,
                    topics_only: false,
                },
            ));
        }

        if !prefixed.is_empty() {
            subscriptions.push(client.subscribe(
                &prefixed,
                SubscribeOptions {
                    prefix: true,
                    periodic: DATA_REFRESH_SECONDS,
                    topics_only: false,
                },
            ));
        }
    }

    fn set_ping_timeout_milliseconds(&mut self, value: Option<u64>) {
        self.options.transport.ping_timeout_milliseconds = value;

        let mut cell = self.cell.lock().expect("client lock poisoned");
        if let Some(client) = cell.client.as_mut() {
            client.set_ping_timeout_milliseconds(value);
        }
    }

    fn state(&self) -> ConnectionState {
        let cell = self.cell.lock().expect("client lock poisoned");
        cell.client
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    fn network_latency_microseconds(&self) -> Option<i64> {
        let cell = self.cell.lock().expect("client lock poisoned");
        cell.client
            .as_ref()
            .and_then(|c| c.network_latency_microseconds())
    }

    fn server_time_microseconds(&self) -> Option<i64> {
        let cell = self.cell.lock().expect("client lock poisoned");
        cell.client
            .as_ref()
            .and_then(|c| c.server_time_microseconds())
    }
}

/// Split widget slots into exact-match and prefix topic sets for the live
/// supplier. Slots referencing other suppliers or malformed slots are
/// skipped. Sets are deduplicated and deterministically ordered.
///
/// Topics falling under a shorter requested prefix are not pruned; since
/// composite channels subsume their subtrees, overlap does not arise in
/// practice.
fn partition_slots(slots: &[String]) -> (Vec<String>, Vec<String>) {
    let mut exact = BTreeSet::new();
    let mut prefixed = BTreeSet::new();

    for slot in slots {
        let Some(channel_ref) = Slot::to_channel(slot) else {
            continue;
        };
        if channel_ref.source != LIVE_SUPPLIER_ID || channel_ref.id.is_empty() {
            continue;
        }

        if channel_ref.composite {
            prefixed.insert(channel_ref.id);
        } else {
            exact.insert(channel_ref.id);
        }
    }

    (
        exact.into_iter().collect(),
        prefixed.into_iter().collect(),
    )
}
