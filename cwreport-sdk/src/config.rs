//! Reporter configuration.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use cwreport_types::{StandardUnit, TimeUnit};

use crate::dimensions::{DimensionAdder, InstanceIdAdder};
use crate::error::ConfigError;
use crate::filter::MetricFilter;

/// Where the `InstanceId` dimension value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceIdSetting {
    /// A caller-supplied id.
    Fixed(String),
    /// Looked up from the EC2 instance metadata service.
    #[cfg(feature = "http")]
    Ec2,
}

impl InstanceIdSetting {
    fn adder(&self) -> InstanceIdAdder {
        match self {
            InstanceIdSetting::Fixed(id) => InstanceIdAdder::fixed(id.clone()),
            #[cfg(feature = "http")]
            InstanceIdSetting::Ec2 => InstanceIdAdder::ec2(),
        }
    }
}

/// Configuration for a reporter.
///
/// Every field except `namespace` has a default, so a config file only
/// needs to name what it changes. Dimension adders and the metric filter
/// are code, not data, and are set programmatically.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::ReporterConfig;
/// use cwreport_types::TimeUnit;
///
/// let mut config = ReporterConfig::new("my-service");
/// config.duration_unit = TimeUnit::Seconds;
/// config.timer_summary = true;
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.percentiles, vec![0.5, 0.95, 0.99]);
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Backend namespace every datapoint is sent to. Required.
    pub namespace: String,

    /// Unit rates are expressed per.
    pub rate_unit: TimeUnit,

    /// Unit timer durations are converted to. Milli/micro/seconds only.
    pub duration_unit: TimeUnit,

    /// Percentiles sent for histograms and timers.
    pub percentiles: Vec<f64>,

    pub one_minute_rate: bool,
    pub five_minute_rate: bool,
    pub fifteen_minute_rate: bool,

    /// Send a meter's `.count` and `.meanRate`.
    pub meter_summary: bool,

    /// Send a timer's lifetime `.min`, `.max`, `.mean` and `.stddev`.
    pub timer_summary: bool,

    /// Send a histogram's lifetime `.min`, `.max`, `.mean` and `.stddev`.
    pub histogram_summary: bool,

    /// When false, batches are logged instead of delivered.
    pub delivery_enabled: bool,

    /// Add an `InstanceId` dimension to every datapoint. The adder built
    /// from this setting runs before every adder in `dimension_adders`.
    pub instance_id: Option<InstanceIdSetting>,

    /// Dimension adders, run in registration order.
    #[serde(skip)]
    pub dimension_adders: Vec<Arc<dyn DimensionAdder>>,

    /// Metrics to report.
    #[serde(skip)]
    pub filter: MetricFilter,
}

impl ReporterConfig {
    /// Default percentiles: median, 95th and 99th.
    pub const DEFAULT_PERCENTILES: [f64; 3] = [0.5, 0.95, 0.99];

    /// Create a config with default settings for a namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Replace the percentile list.
    pub fn with_percentiles(mut self, percentiles: impl IntoIterator<Item = f64>) -> Self {
        self.percentiles = percentiles.into_iter().collect();
        self
    }

    /// Append a dimension adder.
    pub fn with_dimension_adder(mut self, adder: impl DimensionAdder + 'static) -> Self {
        self.dimension_adders.push(Arc::new(adder));
        self
    }

    /// Append an adder tagging every datapoint with a fixed instance id.
    ///
    /// The adder takes its place among the other adders in call order.
    pub fn with_instance_id(self, instance_id: impl Into<String>) -> Self {
        self.with_dimension_adder(InstanceIdAdder::fixed(instance_id))
    }

    /// Only report metrics accepted by `filter`.
    pub fn with_filter(mut self, filter: MetricFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Check the configuration can be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        self.duration_standard_unit()?;
        if let Some(&p) = self
            .percentiles
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(ConfigError::InvalidPercentile(p));
        }
        Ok(())
    }

    /// The unit tag for timer durations.
    pub fn duration_standard_unit(&self) -> Result<StandardUnit, ConfigError> {
        self.duration_unit
            .standard_unit()
            .ok_or(ConfigError::UnsupportedDurationUnit(self.duration_unit))
    }

    /// The full adder pipeline: the `instance_id` setting's adder, then
    /// `dimension_adders` in registration order.
    pub(crate) fn adder_pipeline(&self) -> Vec<Arc<dyn DimensionAdder>> {
        let mut adders: Vec<Arc<dyn DimensionAdder>> = Vec::new();
        if let Some(setting) = &self.instance_id {
            adders.push(Arc::new(setting.adder()));
        }
        adders.extend(self.dimension_adders.iter().cloned());
        adders
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            percentiles: Self::DEFAULT_PERCENTILES.to_vec(),
            one_minute_rate: true,
            five_minute_rate: false,
            fifteen_minute_rate: false,
            meter_summary: false,
            timer_summary: false,
            histogram_summary: false,
            delivery_enabled: true,
            instance_id: None,
            dimension_adders: Vec::new(),
            filter: MetricFilter::all(),
        }
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("namespace", &self.namespace)
            .field("rate_unit", &self.rate_unit)
            .field("duration_unit", &self.duration_unit)
            .field("percentiles", &self.percentiles)
            .field("one_minute_rate", &self.one_minute_rate)
            .field("five_minute_rate", &self.five_minute_rate)
            .field("fifteen_minute_rate", &self.fifteen_minute_rate)
            .field("meter_summary", &self.meter_summary)
            .field("timer_summary", &self.timer_summary)
            .field("histogram_summary", &self.histogram_summary)
            .field("delivery_enabled", &self.delivery_enabled)
            .field("instance_id", &self.instance_id)
            .field("dimension_adders", &self.dimension_adders.len())
            .field("filter", &self.filter)
            .finish()
    }
}
