//! # cwreport-types
//!
//! Core types for reporting in-process application metrics to CloudWatch.
//! This crate defines the point-in-time [`Snapshot`] read by the reporter and
//! the [`Datapoint`]/[`Batch`] shapes it produces for the backend.
//!
//! ## Design Goals
//!
//! - **Plain data**: Snapshots are owned, immutable views with no locks or handles
//! - **Deterministic order**: Every metric map is a `BTreeMap`, so iteration is by name
//! - **Optional serialization**: Enable the `serde` feature to read/write snapshots as JSON
//! - **Versioned schema**: Snapshots include version info for forward compatibility
//!
//! ## Features
//!
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use cwreport_types::{DistributionSnapshot, GaugeValue, Snapshot};
//!
//! let snapshot = Snapshot::builder()
//!     .timestamp_ms(1_703_160_000_000)
//!     .gauge("jvm.memory.heap", GaugeValue::from(512.0))
//!     .counter("requests", 42)
//!     .histogram("payload.size", DistributionSnapshot::from_values([10.0, 20.0, 30.0]))
//!     .build();
//!
//! assert_eq!(snapshot.len(), 3);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! snapshots to allow consumers to handle format evolution gracefully.

mod datapoint;
mod metrics;
mod snapshot;
mod units;
mod version;

pub use datapoint::*;
pub use metrics::*;
pub use snapshot::*;
pub use units::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;
