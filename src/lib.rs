//! # bodywatch
//!
//! A console client for a body-measurement rig.
//!
//! The rig (an ESP32 with distance sensors) streams JSON frames over a
//! WebSocket while it measures. This crate turns that stream into an
//! ordered list of measurements: at most one *live* record that is replaced
//! on every update, followed by *finalized* records that never change.
//! Every finalized record is cached locally and saved to the backend in
//! the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐    ┌────────────┐    ┌──────────────┐           │
//! │  │  app    │───▶│    data    │───▶│   persist    │──▶ REST   │
//! │  │ (state) │    │(reconciler)│    │ (save queue) │           │
//! │  └────┬────┘    └─────┬──────┘    └──────────────┘           │
//! │       │               │                                      │
//! │       ▼               ▼                                      │
//! │  ┌─────────┐    ┌──────────┐                                 │
//! │  │ source  │    │  store   │                                 │
//! │  │ (link)  │    │ (cache)  │                                 │
//! │  └─────────┘    └──────────┘                                 │
//! │       ▲                                                      │
//! │       └── WebSocketLink | StreamLink | ChannelLink           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Device links ([`DeviceLink`] trait) and frame decoding
//! - **[`data`]**: The [`Reconciler`], record history, ids and the measuring window
//! - **[`persist`]**: Background saves with retry ([`PersistQueue`])
//! - **[`store`]**: Local JSON files ([`HistoryStore`], [`LocalStore`])
//! - **[`app`]**: Operator actions and notifications
//! - **[`events`]**: Console command parsing
//! - **[`activity`]**: One-shot activity tests
//! - **[`config`]**: Layered settings
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Measure with the rig at 192.168.0.140
//! bodywatch live --ip 192.168.0.140
//!
//! # Replay a captured session without a backend
//! bodywatch replay capture.jsonl --offline
//! ```
//!
//! ### As a library with a channel link
//!
//! ```
//! use bodywatch::{ChannelLink, MemoryStore, RecordingSink, Reconciler};
//!
//! let (tx, link) = ChannelLink::create("test rig");
//! let mut reconciler = Reconciler::new(
//!     Box::new(RecordingSink::new()),
//!     Box::new(MemoryStore::new()),
//! );
//!
//! reconciler.handle_frame(r#"{"type":"done","data":{"1":120.5,"4":90.0}}"#);
//! assert_eq!(reconciler.history().len(), 1);
//! ```
//!
//! ### Replaying a capture
//!
//! ```no_run
//! use std::io::Cursor;
//! use bodywatch::{DeviceLink, StreamLink};
//!
//! # tokio_test::block_on(async {
//! let data = b"{\"type\":\"live_measurement\",\"data\":{\"1\":119.8}}\n";
//! let mut link = StreamLink::spawn(Cursor::new(data.to_vec()), "capture");
//! let frame = link.poll();
//! # });
//! ```

pub mod activity;
pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod persist;
pub mod source;
pub mod store;

// Re-export main types for convenience
pub use activity::{run_activity, ActivityError};
pub use app::{App, Notification, Severity};
pub use config::Settings;
pub use data::{MeasuringWindow, Reconciled, Reconciler};
pub use persist::{PersistHandle, PersistQueue, PersistSink, RecordingSink};
pub use source::{
    device_url, parse_frame, ChannelLink, DeviceCommand, DeviceLink, DeviceMessage, LinkError,
    StreamLink, WebSocketLink,
};
pub use store::{HistoryStore, JsonFileStore, LocalStore, MemoryStore};
