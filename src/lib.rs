//! # cwreport
//!
//! Command-line reporter that turns registry snapshot files into CloudWatch
//! datapoint batches.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌────────────────────┐    ┌─────────────┐
//! │    source    │───▶│ CloudWatchReporter │───▶│  transport  │
//! │ (JSON file)  │    │   (cwreport-sdk)   │    │ http | file │
//! └──────────────┘    └─────────▲──────────┘    │   | stdout  │
//!                               │               └─────────────┘
//!                        ┌──────┴─────┐
//!                        │  settings  │◀── file + CWREPORT_* env
//!                        └────────────┘
//! ```
//!
//! - **[`source`]**: Reads snapshots from a JSON file, polling for changes
//! - **[`settings`]**: Reporter, dimension and transport settings
//! - **[`stdout`]**: A transport that prints batches as JSON lines
//! - **[`duration`]**: Human-friendly duration strings for intervals and timeouts

pub mod duration;
pub mod settings;
pub mod source;
pub mod stdout;

pub use settings::{DimensionSetting, Settings, TransportSettings};
pub use source::{parse_snapshot, SnapshotFileSource, SnapshotSource};
pub use stdout::StdoutTransport;
