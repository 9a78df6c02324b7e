//! Measurement state and the logic that maintains it.
//!
//! ## Submodules
//!
//! - [`clock`]: Capture stamps and monotonic record ids
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "30s", "500ms")
//! - [`history`]: Finalized records, newest first
//! - [`reconciler`]: Core state machine ([`Reconciler`])
//! - [`window`]: The measuring window opened by a start command
//!
//! ## Data Flow
//!
//! ```text
//! raw frame (text)
//!        │
//!        ▼
//! parse_frame()  ──▶ dropped if malformed
//!        │
//!        ▼
//! Reconciler::apply()
//!        │
//!        ├──▶ live slot (replaced on every live_measurement)
//!        │
//!        └──▶ done: History::record() ──▶ HistoryStore::save()
//!                                     └──▶ PersistSink::submit()
//! ```

pub mod clock;
pub mod duration;
pub mod history;
pub mod reconciler;
pub mod window;

pub use clock::{capture_now, IdAllocator};
pub use history::History;
pub use reconciler::{Reconciled, Reconciler, DEFAULT_USER_ID};
pub use window::MeasuringWindow;
