//! # bodywatch-types
//!
//! Core types for athlete body measurements. This crate defines the data
//! model shared by the device reconciler, the local history cache and the
//! backend client.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON caches and REST payloads
//! - **Explicit record states**: A measurement is either [`MeasurementRecord::Live`] or
//!   [`MeasurementRecord::Final`], never a record tagged with a sentinel id
//!
//! ## Example
//!
//! ```rust
//! use bodywatch_types::{Channel, MeasurementFields, Scalar};
//!
//! // Device frames key readings by channel id; names are accepted too.
//! let mut fields = MeasurementFields::new();
//! fields.insert_raw("1", Scalar::Number(120.5));
//! fields.insert_raw("hipHeight", Scalar::Number(90.0));
//! fields.insert_raw("weight", Scalar::Number(72.0));
//!
//! assert_eq!(fields.get(Channel::CrownHeight), Some(120.5));
//! assert_eq!(fields.get(Channel::HipHeight), Some(90.0));
//! assert_eq!(fields.extra("weight"), Some(&Scalar::Number(72.0)));
//! ```

mod activity;
mod channel;
mod fields;
#[cfg(feature = "serde")]
mod lenient;
mod profile;
mod record;
mod save;

pub use activity::*;
pub use channel::*;
pub use fields::*;
pub use profile::*;
pub use record::*;
pub use save::*;
