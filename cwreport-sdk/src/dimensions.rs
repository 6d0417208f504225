//! Dimension adders: tag datapoints with key/value pairs.
//!
//! Adders run in registration order and their output is concatenated.
//! Duplicate keys across adders are kept as-is.

use std::sync::{Arc, OnceLock};

use cwreport_types::{Dimension, MetricRef};

use crate::filter::MetricFilter;
use crate::metadata::MetadataSource;

/// Dimension name used by [`InstanceIdAdder`].
pub const INSTANCE_ID: &str = "InstanceId";

/// Value used when the instance id cannot be looked up.
pub const UNKNOWN_INSTANCE: &str = "unknown";

/// Contributes dimensions for a metric.
///
/// Implemented for closures, so an ad-hoc adder is just
/// `|name: &str, metric: MetricRef<'_>| vec![...]`.
pub trait DimensionAdder: Send + Sync {
    /// Dimensions for one metric instance. May be empty.
    fn generate(&self, name: &str, metric: MetricRef<'_>) -> Vec<Dimension>;
}

impl<F> DimensionAdder for F
where
    F: Fn(&str, MetricRef<'_>) -> Vec<Dimension> + Send + Sync,
{
    fn generate(&self, name: &str, metric: MetricRef<'_>) -> Vec<Dimension> {
        self(name, metric)
    }
}

/// Run every adder for a metric and concatenate the results.
pub fn collect_dimensions(
    adders: &[Arc<dyn DimensionAdder>],
    name: &str,
    metric: MetricRef<'_>,
) -> Vec<Dimension> {
    adders
        .iter()
        .flat_map(|adder| adder.generate(name, metric))
        .collect()
}

enum InstanceIdValue {
    Fixed(String),
    Lookup {
        source: Arc<dyn MetadataSource>,
        resolved: OnceLock<String>,
    },
}

/// Adds an `InstanceId` dimension to matching metrics.
///
/// The id is either fixed up front or looked up from a [`MetadataSource`]
/// the first time it is needed. A lookup happens at most once; if it fails
/// the dimension value is `"unknown"`.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::{DimensionAdder, InstanceIdAdder};
/// use cwreport_types::{CounterSnapshot, MetricRef};
///
/// let adder = InstanceIdAdder::fixed("flask");
/// let count = CounterSnapshot::new(0);
/// let dims = adder.generate("requests", MetricRef::Counter(&count));
/// assert_eq!(dims[0].name, "InstanceId");
/// assert_eq!(dims[0].value, "flask");
/// ```
pub struct InstanceIdAdder {
    value: InstanceIdValue,
    filter: MetricFilter,
}

impl InstanceIdAdder {
    /// Tag every metric with a fixed instance id.
    pub fn fixed(instance_id: impl Into<String>) -> Self {
        Self {
            value: InstanceIdValue::Fixed(instance_id.into()),
            filter: MetricFilter::all(),
        }
    }

    /// Tag every metric with an instance id resolved lazily from `source`.
    pub fn lookup(source: impl MetadataSource + 'static) -> Self {
        Self {
            value: InstanceIdValue::Lookup {
                source: Arc::new(source),
                resolved: OnceLock::new(),
            },
            filter: MetricFilter::all(),
        }
    }

    /// Tag every metric with the EC2 instance id.
    #[cfg(feature = "http")]
    pub fn ec2() -> Self {
        Self::lookup(crate::metadata::Ec2MetadataSource::new())
    }

    /// Only tag metrics accepted by `filter`.
    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The instance id, resolving it if this is the first use.
    pub fn instance_id(&self) -> &str {
        match &self.value {
            InstanceIdValue::Fixed(id) => id,
            InstanceIdValue::Lookup { source, resolved } => {
                resolved.get_or_init(|| match source.instance_id() {
                    Ok(id) => {
                        tracing::debug!(instance_id = %id, "Resolved instance id");
                        id
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Instance id lookup failed, using \"{}\"", UNKNOWN_INSTANCE);
                        UNKNOWN_INSTANCE.to_string()
                    }
                })
            }
        }
    }
}

impl DimensionAdder for InstanceIdAdder {
    fn generate(&self, name: &str, metric: MetricRef<'_>) -> Vec<Dimension> {
        if !self.filter.matches(name, metric) {
            return Vec::new();
        }
        vec![Dimension::new(INSTANCE_ID, self.instance_id())]
    }
}

impl std::fmt::Debug for InstanceIdAdder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InstanceIdAdder");
        match &self.value {
            InstanceIdValue::Fixed(id) => s.field("fixed", id),
            InstanceIdValue::Lookup { resolved, .. } => s.field("resolved", &resolved.get()),
        };
        s.field("filter", &self.filter).finish()
    }
}

/// Adds the same fixed dimensions to matching metrics.
#[derive(Debug, Clone)]
pub struct StaticDimensionAdder {
    dimensions: Vec<Dimension>,
    filter: MetricFilter,
}

impl StaticDimensionAdder {
    /// Tag every metric with `dimensions`, in the given order.
    pub fn new(dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        Self {
            dimensions: dimensions.into_iter().collect(),
            filter: MetricFilter::all(),
        }
    }

    /// Only tag metrics accepted by `filter`.
    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl DimensionAdder for StaticDimensionAdder {
    fn generate(&self, name: &str, metric: MetricRef<'_>) -> Vec<Dimension> {
        if self.filter.matches(name, metric) {
            self.dimensions.clone()
        } else {
            Vec::new()
        }
    }
}
