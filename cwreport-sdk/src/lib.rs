//! # cwreport-sdk
//!
//! Periodically report in-process application metrics to CloudWatch.
//!
//! This crate provides a metric registry (gauges, counters, histograms,
//! meters and timers) and a reporter that reads it on a schedule, translates
//! each metric into named datapoints, and delivers them in bounded batches.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cwreport_sdk::{CloudWatchReporter, FileTransport, MetricRegistry, ReporterConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = MetricRegistry::new();
//!
//!     // Tag every datapoint with this host's instance id
//!     let config = ReporterConfig::new("orders-service")
//!         .with_instance_id("web-1")
//!         .with_percentiles([0.5, 0.99]);
//!
//!     let reporter = CloudWatchReporter::new(
//!         registry.clone(),
//!         config,
//!         FileTransport::new("datapoints.ndjson"),
//!     )
//!     .expect("valid configuration");
//!
//!     // Record metrics as your service runs
//!     registry.counter("orders.received").inc();
//!     registry.timer("orders.latency").update(Duration::from_millis(12));
//!
//!     // Start background reporting (non-blocking)
//!     let handle = reporter.start(Duration::from_secs(60));
//!
//!     // ... your application runs ...
//!     handle.stop();
//! }
//! ```
//!
//! ## Features
//!
//! - **Deterministic output**: Kinds in a fixed order, instances by name
//! - **Bounded batches**: At most 20 datapoints per delivery
//! - **Pluggable transports**: HTTP, file, channel or in-memory
//! - **Dimensions**: Instance id plus any number of filtered adders
//! - **Dry run**: Translate and log without delivering anything
//!
//! ## Cargo Features
//!
//! - `tokio` (default): background reporting and [`ChannelTransport`]
//! - `http`: [`HttpTransport`] and EC2 instance id lookup

mod config;
mod dimensions;
mod error;
mod filter;
mod instruments;
mod metadata;
mod registry;
mod reporter;
mod sender;
mod transport;
mod translate;

pub mod kinds;

pub use config::{InstanceIdSetting, ReporterConfig};
pub use dimensions::{
    collect_dimensions, DimensionAdder, InstanceIdAdder, StaticDimensionAdder, INSTANCE_ID,
    UNKNOWN_INSTANCE,
};
pub use error::{ConfigError, MetadataError, ReportError, TransportError};
pub use filter::MetricFilter;
pub use instruments::{Counter, Histogram, Meter, Timer, TimerGuard, DEFAULT_WINDOW_SIZE};
pub use metadata::MetadataSource;
pub use registry::MetricRegistry;
pub use reporter::CloudWatchReporter;
pub use sender::{
    clamp, CycleSummary, LARGEST_SENDABLE, MAX_BATCH_SIZE, MAX_DIMENSIONS, SMALLEST_SENDABLE,
};
pub use transport::{FileTransport, MemoryTransport, Transport};
pub use translate::SnapshotTranslator;

#[cfg(feature = "tokio")]
pub use reporter::ReportingHandle;

#[cfg(feature = "tokio")]
pub use transport::ChannelTransport;

#[cfg(feature = "http")]
pub use metadata::Ec2MetadataSource;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export types for convenience
pub use cwreport_types::{
    Batch, CounterSnapshot, Datapoint, Dimension, DistributionSnapshot, GaugeValue, MetricKind,
    MetricRef, RateSnapshot, Snapshot, StandardUnit, TimeUnit, TimerSnapshot,
};
