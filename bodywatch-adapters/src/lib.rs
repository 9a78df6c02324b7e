//! # bodywatch-adapters
//!
//! Backend integration for bodywatch: a REST client for accounts and
//! measurement history, and the retry policy used when persisting
//! finalized measurements.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bodywatch_adapters::{BackendClient, MeasurementSink};
//! use bodywatch_types::{FinalMeasurement, SaveMeasurement};
//!
//! async fn persist(record: &FinalMeasurement) -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BackendClient::builder()
//!         .base_url("http://localhost:5000")
//!         .build()?;
//!
//!     client.save(&SaveMeasurement::from_record(1, record)).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod retry;

pub use backend::{BackendClient, BackendClientBuilder, MeasurementSink, Registration};
pub use error::AdapterError;
pub use retry::{RetryPolicy, RetryPolicyBuilder};

// Re-export types for convenience
pub use bodywatch_types::{SaveMeasurement, SessionUser, StoredMeasurement};
