//! Data sources
//!
//! A data source adapts some upstream feed into sink calls. Three
//! interchangeable implementations exist behind the [`DataSource`] trait,
//! selected at construction time:
//!
//! - [`LiveSource`] - adapts a live wire transport
//! - [`ReplaySource`] - replays a recorded event document, network-free
//! - [`CapturingSource`] - wraps a live source and records its traffic
//!
//! The trait deliberately exposes no errors: connectivity problems show up
//! as [`ConnectionState`] transitions and stale reads return safe defaults.

pub mod live;
pub mod replay;
pub mod transport;

use crate::types::ConnectionState;

pub use live::{LiveSource, LiveSourceOptions, LIVE_SUPPLIER_ID};
pub use replay::{CapturingSource, RecordedEvent, ReplaySource};
pub use transport::{
    RetryPolicy, SubscribeOptions, SubscriptionHandle, Topic, TransportCallbacks, TransportClient,
    TransportFactory, TransportOptions,
};

/// A connection-shaped data feed
pub trait DataSource: Send {
    /// Connect the source to the provided address.
    ///
    /// Reconnecting to the current address nudges the existing transport
    /// instead of tearing it down.
    fn connect(&mut self, server_address: &str);

    /// Disconnect the source and drop subscription/publish registrations.
    fn disconnect(&mut self);

    /// Update data subscriptions to serve the given widget slot set.
    /// Passing `None` subscribes to everything.
    fn subscribe(&mut self, slots: Option<&[String]>);

    /// Set the ping timeout override. No-op for replayed sources.
    fn set_ping_timeout_milliseconds(&mut self, value: Option<u64>);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Current network latency in microseconds if known.
    fn network_latency_microseconds(&self) -> Option<i64>;

    /// Current server time in microseconds if known.
    fn server_time_microseconds(&self) -> Option<i64>;
}
