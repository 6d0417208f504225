//! Datapoints and the batches they are delivered in.
//!
//! Field names serialize the way the backend's `PutMetricData` request
//! spells them, so a serialized [`Batch`] is a ready request body.

use crate::StandardUnit;

/// A key/value tag attached to a datapoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    /// Create a dimension.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One named, timestamped, unit-tagged observation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct Datapoint {
    #[cfg_attr(feature = "serde", serde(rename = "MetricName"))]
    pub name: String,

    /// Unix timestamp in milliseconds.
    pub timestamp: u64,

    pub value: f64,

    pub unit: StandardUnit,

    #[cfg_attr(feature = "serde", serde(default))]
    pub dimensions: Vec<Dimension>,
}

impl Datapoint {
    /// Create a datapoint with no dimensions.
    pub fn new(name: impl Into<String>, timestamp: u64, value: f64, unit: StandardUnit) -> Self {
        Self {
            name: name.into(),
            timestamp,
            value,
            unit,
            dimensions: Vec::new(),
        }
    }

    /// Attach dimensions, replacing any already set.
    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Look up a dimension value by name.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// An ordered group of datapoints delivered together to one namespace.
///
/// Batches are transient: a reporter opens one, fills it and hands it to a
/// transport. Size limits are enforced by the reporter, not here.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub struct Batch {
    pub namespace: String,

    #[cfg_attr(feature = "serde", serde(rename = "MetricData"))]
    pub datapoints: Vec<Datapoint>,
}

impl Batch {
    /// Create an empty batch for a namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            datapoints: Vec::new(),
        }
    }

    /// Append a datapoint.
    pub fn push(&mut self, datapoint: Datapoint) {
        self.datapoints.push(datapoint);
    }

    /// Number of datapoints in the batch.
    pub fn len(&self) -> usize {
        self.datapoints.len()
    }

    /// Check if the batch holds no datapoints.
    pub fn is_empty(&self) -> bool {
        self.datapoints.is_empty()
    }

    /// Iterate over the datapoints.
    pub fn iter(&self) -> impl Iterator<Item = &Datapoint> {
        self.datapoints.iter()
    }

    /// Take the filled batch, leaving an empty one for the same namespace.
    pub fn take(&mut self) -> Batch {
        let empty = Batch::new(self.namespace.clone());
        core::mem::replace(self, empty)
    }
}
