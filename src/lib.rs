//! # ntdata-rs: Telemetry Data Engine
//!
//! The data core of a robotics telemetry dashboard: it ingests an
//! unbounded stream of (topic, timestamp, value) tuples from a live or
//! replayed NetworkTables-style connection, organizes topics into a
//! hierarchical namespace, retains bounded history per channel, and
//! serves point-in-time and range queries to many concurrently-rendering
//! widgets, while supporting type-guarded publish-back to the robot.
//!
//! ## Architecture
//!
//! - **Sink**: single writer owning the channel index, namespace forest,
//!   and retained records; notifies the UI of structural changes over a
//!   crossbeam channel
//! - **Sources**: interchangeable [`source::DataSource`] implementations:
//!   live transport adapter, recorded-session replay, and a capturing
//!   wrapper that produces replay documents
//! - **Scheduler**: background thread sampling connection status and
//!   driving retention sweeps, decoupled from rendering
//! - **Decode**: registry-based structured-type decoding (poses,
//!   rotations, sendables)
//!
//! ## Configuration
//!
//! Settings are stored in the platform-appropriate data directory under
//! `dev.hxyulin.ntdata-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.ntdata-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.ntdata-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.ntdata-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use ntdata_rs::{
//!     config::AppConfig,
//!     scheduler::{PeriodicScheduler, SharedStatus},
//!     sink::{DataSink, SinkOptions},
//!     source::{DataSource, LiveSource},
//! };
//!
//! let config = AppConfig::load_or_default(&AppConfig::default_path().unwrap());
//!
//! let (sink, sink_events) = DataSink::new(SinkOptions {
//!     retention: config.retention.into(),
//!     ..Default::default()
//! });
//! let sink = Arc::new(sink);
//!
//! // `factory` creates the actual wire protocol client
//! let mut source = LiveSource::new(sink.clone(), factory);
//! source.connect(&config.connection.server_address);
//!
//! let source: Arc<Mutex<dyn DataSource>> = Arc::new(Mutex::new(source));
//! let status = SharedStatus::new();
//! let _scheduler = PeriodicScheduler::spawn(
//!     sink.clone(),
//!     source,
//!     status.clone(),
//!     config.scheduler.into(),
//! );
//!
//! // widgets resolve slots and sample at their own cadence
//! if let Some(channel) = sink.get_slot("nt:/SmartDashboard/Speed") {
//!     let latest = channel.latest();
//! }
//! ```

pub mod collate;
pub mod config;
pub mod decode;
pub mod error;
pub mod scheduler;
pub mod sink;
pub mod slot;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use collate::Collator;
pub use config::AppConfig;
pub use error::{DataError, Result};
pub use scheduler::{PeriodicScheduler, SchedulerOptions, SharedStatus, StatusSnapshot};
pub use sink::{ChannelKey, DataChannel, DataSink, RetentionPolicy, SinkEvent, SinkOptions};
pub use slot::{ChannelRef, Slot, SlotAcceptance};
pub use source::{CapturingSource, DataSource, LiveSource, RecordedEvent, ReplaySource};
pub use types::{ChannelRecord, ConnectionState, DataType, StructFormat, StructuredType, Value};
