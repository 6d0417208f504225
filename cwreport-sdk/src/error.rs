//! Error types for the reporter.

use thiserror::Error;

use cwreport_types::TimeUnit;

/// Reporter configuration that cannot be used.
///
/// Returned when a reporter or translator is built, never while sending.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The namespace is empty.
    #[error("Namespace must not be empty")]
    EmptyNamespace,

    /// The backend only accepts milli/micro/seconds for durations.
    #[error("Unsupported duration unit: {0} (only milliseconds, microseconds and seconds are accepted)")]
    UnsupportedDurationUnit(TimeUnit),

    /// A percentile outside [0, 1] or not finite.
    #[error("Invalid percentile: {0} (must be between 0 and 1)")]
    InvalidPercentile(f64),
}

/// Errors that can occur when delivering a batch.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status.
    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Writing the batch failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the batch failed.
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The receiving channel has no free capacity.
    #[error("Channel is full")]
    ChannelFull,

    /// The receiving side of the channel is gone.
    #[error("Channel is closed")]
    ChannelClosed,
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.to_string())
    }
}

/// Errors that can occur when looking up instance metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("Metadata request failed: {0}")]
    Http(String),

    /// The metadata service answered with a non-success status.
    #[error("Metadata service returned status {0}")]
    Status(u16),

    /// The metadata service returned nothing.
    #[error("Metadata service returned an empty value")]
    Empty,
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        MetadataError::Http(err.to_string())
    }
}

/// Errors that end a reporting cycle.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A batch could not be delivered; the rest of the cycle was dropped.
    ///
    /// `delivered_batches` counts batches accepted earlier in the same cycle.
    /// They are not rolled back.
    #[error(
        "Failed to deliver batch of {size} datapoints to namespace {namespace} \
         ({delivered_batches} batches already delivered this cycle): {source}"
    )]
    Delivery {
        namespace: String,
        size: usize,
        delivered_batches: usize,
        #[source]
        source: TransportError,
    },
}
