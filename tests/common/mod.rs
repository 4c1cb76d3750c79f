//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ntdata_rs::sink::{DataSink, SinkOptions};
use ntdata_rs::source::{
    SubscribeOptions, SubscriptionHandle, Topic, TransportCallbacks, TransportClient,
    TransportFactory, TransportOptions,
};
use ntdata_rs::types::{ConnectionState, Value};

/// Create a sink with default options, discarding the event receiver.
pub fn test_sink() -> Arc<DataSink> {
    let (sink, _events) = DataSink::new(SinkOptions::default());
    Arc::new(sink)
}

/// Topic metadata shorthand for tests.
pub fn topic(uid: i64, name: &str, wire_type: &str) -> Topic {
    Topic::new(uid, name, wire_type)
}

/// Everything a fake transport saw, shared with the test.
#[derive(Default)]
pub struct FakeTransportState {
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub subscribe_calls: Vec<(Vec<String>, SubscribeOptions)>,
    pub unsubscribe_calls: Vec<SubscriptionHandle>,
    pub publish_calls: Vec<(String, String)>,
    pub unpublish_calls: Vec<String>,
    pub set_value_calls: Vec<(String, Value)>,
    pub ping_timeout_calls: Vec<Option<u64>>,
    pub state: ConnectionState,
    pub server_time: Option<i64>,
    pub latency: Option<i64>,
    published: HashSet<String>,
    next_handle: u64,
}

/// Test-side view of one created fake transport: its recorded calls plus
/// the callbacks the source wired in, so tests can drive protocol events.
#[derive(Clone)]
pub struct FakeTransportHandle {
    pub address: String,
    pub state: Arc<Mutex<FakeTransportState>>,
    pub callbacks: TransportCallbacks,
}

impl FakeTransportHandle {
    /// Simulate the server acknowledging the connection.
    pub fn fire_connect(&self) {
        self.state.lock().unwrap().state = ConnectionState::Connected;
        (self.callbacks.on_connect)();
    }

    /// Simulate a disconnect.
    pub fn fire_disconnect(&self) {
        self.state.lock().unwrap().state = ConnectionState::Disconnected;
        (self.callbacks.on_disconnect)();
    }

    /// Simulate a topic announcement.
    pub fn announce(&self, topic: &Topic) {
        (self.callbacks.on_topic_announced)(topic);
    }

    /// Simulate a topic removal.
    pub fn remove_topic(&self, topic: &Topic) {
        (self.callbacks.on_topic_removed)(topic);
    }

    /// Simulate an incoming value.
    pub fn data(&self, topic: &Topic, value: Value, timestamp: i64) {
        (self.callbacks.on_data_received)(topic, value, timestamp);
    }

    /// Set the server time the transport reports.
    pub fn set_server_time(&self, micros: Option<i64>) {
        self.state.lock().unwrap().server_time = micros;
    }

    /// Subscription calls made after the two always-on background
    /// subscriptions issued at connect time.
    pub fn data_subscribe_calls(&self) -> Vec<(Vec<String>, SubscribeOptions)> {
        let state = self.state.lock().unwrap();
        state.subscribe_calls.get(2..).unwrap_or_default().to_vec()
    }

    pub fn connect_calls(&self) -> usize {
        self.state.lock().unwrap().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state.lock().unwrap().disconnect_calls
    }

    pub fn set_value_calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().set_value_calls.clone()
    }

    pub fn publish_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().publish_calls.clone()
    }

    pub fn unpublish_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().unpublish_calls.clone()
    }

    pub fn unsubscribe_calls(&self) -> Vec<SubscriptionHandle> {
        self.state.lock().unwrap().unsubscribe_calls.clone()
    }
}

struct FakeTransport {
    address: String,
    state: Arc<Mutex<FakeTransportState>>,
}

impl TransportClient for FakeTransport {
    fn connect(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.connect_calls += 1;
        if state.state == ConnectionState::Disconnected {
            state.state = ConnectionState::Connecting;
        }
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.disconnect_calls += 1;
        state.state = ConnectionState::Disconnected;
    }

    fn subscribe(&mut self, patterns: &[String], options: SubscribeOptions) -> SubscriptionHandle {
        let mut state = self.state.lock().unwrap();
        state.subscribe_calls.push((patterns.to_vec(), options));
        state.next_handle += 1;
        SubscriptionHandle(state.next_handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.state.lock().unwrap().unsubscribe_calls.push(handle);
    }

    fn publish_topic(&mut self, name: &str, wire_type: &str) {
        let mut state = self.state.lock().unwrap();
        state.publish_calls.push((name.to_string(), wire_type.to_string()));
        state.published.insert(name.to_string());
    }

    fn unpublish_topic(&mut self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.unpublish_calls.push(name.to_string());
        state.published.remove(name);
    }

    fn is_topic_published(&self, name: &str) -> bool {
        self.state.lock().unwrap().published.contains(name)
    }

    fn set_value(&mut self, name: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .set_value_calls
            .push((name.to_string(), value));
    }

    fn set_ping_timeout_milliseconds(&mut self, value: Option<u64>) {
        self.state.lock().unwrap().ping_timeout_calls.push(value);
    }

    fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().state
    }

    fn server_address(&self) -> &str {
        &self.address
    }

    fn network_latency_microseconds(&self) -> Option<i64> {
        self.state.lock().unwrap().latency
    }

    fn server_time_microseconds(&self) -> Option<i64> {
        self.state.lock().unwrap().server_time
    }
}

/// Factory producing fake transports and handing their handles to the test.
#[derive(Default)]
pub struct FakeTransportFactory {
    created: Arc<Mutex<Vec<FakeTransportHandle>>>,
}

impl FakeTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of transports created so far.
    pub fn instance_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Handle for the most recently created transport.
    pub fn last(&self) -> FakeTransportHandle {
        self.created
            .lock()
            .unwrap()
            .last()
            .expect("no transport created yet")
            .clone()
    }

    /// Handle for the n-th created transport.
    pub fn nth(&self, index: usize) -> FakeTransportHandle {
        self.created.lock().unwrap()[index].clone()
    }
}

impl TransportFactory for FakeTransportFactory {
    fn create(
        &self,
        address: &str,
        _client_name: &str,
        callbacks: TransportCallbacks,
        _options: &TransportOptions,
    ) -> Box<dyn TransportClient> {
        let state = Arc::new(Mutex::new(FakeTransportState::default()));
        self.created.lock().unwrap().push(FakeTransportHandle {
            address: address.to_string(),
            state: state.clone(),
            callbacks,
        });

        Box::new(FakeTransport {
            address: address.to_string(),
            state,
        })
    }
}
