//! Read views of the five metric kinds.
//!
//! These are the values a registry exposes at snapshot time. They carry no
//! locks and are never mutated by the reporter.

/// The five kinds of metric a registry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    /// Lowercase name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

/// The current value of a gauge.
///
/// Gauges may hold anything; only numeric values can be reported.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum GaugeValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl GaugeValue {
    /// The numeric value, if this gauge holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GaugeValue::Number(n) => Some(*n),
            GaugeValue::Bool(_) | GaugeValue::Text(_) => None,
        }
    }

    /// Check if the value can be sent.
    pub fn is_numeric(&self) -> bool {
        matches!(self, GaugeValue::Number(_))
    }

    /// Name of the held type, for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            GaugeValue::Number(_) => "number",
            GaugeValue::Bool(_) => "bool",
            GaugeValue::Text(_) => "text",
        }
    }
}

macro_rules! gauge_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for GaugeValue {
                fn from(value: $t) -> Self {
                    GaugeValue::Number(value as f64)
                }
            }
        )*
    };
}

gauge_from_number!(f64, f32, i64, i32, u64, u32, usize);

impl From<bool> for GaugeValue {
    fn from(value: bool) -> Self {
        GaugeValue::Bool(value)
    }
}

impl From<&str> for GaugeValue {
    fn from(value: &str) -> Self {
        GaugeValue::Text(value.to_string())
    }
}

impl From<String> for GaugeValue {
    fn from(value: String) -> Self {
        GaugeValue::Text(value)
    }
}

/// A counter's current count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterSnapshot {
    pub count: u64,
}

impl CounterSnapshot {
    /// Create a counter snapshot.
    pub const fn new(count: u64) -> Self {
        Self { count }
    }
}

/// Statistical view of recorded values.
///
/// `min`, `max`, `mean` and `std_dev` cover every value ever recorded.
/// Percentiles are looked up in `values`, a sorted sample of recent values.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionSnapshot {
    /// Number of values ever recorded.
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Sorted sample used for percentile lookup. Sorted again on deserialize.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "deserialize_sorted")
    )]
    pub values: Vec<f64>,
}

impl DistributionSnapshot {
    /// Build a distribution whose lifetime statistics and sample are the given values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let values = sorted(values.into_iter().collect());
        let count = values.len() as u64;
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Self {
            count,
            min: values[0],
            max: values[values.len() - 1],
            mean,
            std_dev,
            values,
        }
    }

    /// Value at the given quantile (0.0 to 1.0) of the sample.
    ///
    /// Interpolates between the two neighbouring samples at position
    /// `quantile * (n + 1)`. Returns 0 for an empty sample.
    pub fn value(&self, quantile: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let len = self.values.len();
        let pos = quantile * (len as f64 + 1.0);
        let index = pos as usize;

        if index < 1 {
            return self.values[0];
        }
        if index >= len {
            return self.values[len - 1];
        }

        let lower = self.values[index - 1];
        let upper = self.values[index];
        lower + (pos - pos.floor()) * (upper - lower)
    }

    /// The 50th percentile.
    pub fn median(&self) -> f64 {
        self.value(0.5)
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Throughput view of a meter.
///
/// All rates are events per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateSnapshot {
    /// Number of events ever marked.
    pub count: u64,
    /// Lifetime average rate.
    pub mean_rate: f64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
}

/// A timer: rate of timed events plus the distribution of their durations.
///
/// Durations are in nanoseconds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerSnapshot {
    pub rate: RateSnapshot,
    pub durations: DistributionSnapshot,
}

/// A borrowed reference to one metric instance in a snapshot.
///
/// Filters and dimension adders receive this alongside the metric name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricRef<'a> {
    Gauge(&'a GaugeValue),
    Counter(&'a CounterSnapshot),
    Histogram(&'a DistributionSnapshot),
    Meter(&'a RateSnapshot),
    Timer(&'a TimerSnapshot),
}

impl MetricRef<'_> {
    /// The kind of the referenced metric.
    pub const fn kind(&self) -> MetricKind {
        match self {
            MetricRef::Gauge(_) => MetricKind::Gauge,
            MetricRef::Counter(_) => MetricKind::Counter,
            MetricRef::Histogram(_) => MetricKind::Histogram,
            MetricRef::Meter(_) => MetricKind::Meter,
            MetricRef::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Sort floats ascending; NaN sorts last.
fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

#[cfg(feature = "serde")]
fn deserialize_sorted<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<f64> = serde::Deserialize::deserialize(deserializer)?;
    Ok(sorted(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_sample() -> DistributionSnapshot {
        // 0..99 recorded 50 times each
        let values = (0..100).flat_map(|i| std::iter::repeat(i as f64).take(50));
        DistributionSnapshot::from_values(values)
    }

    #[test]
    fn gauge_numeric_values() {
        assert_eq!(GaugeValue::from(42_i64).as_f64(), Some(42.0));
        assert_eq!(GaugeValue::from(1.5_f64).as_f64(), Some(1.5));
        assert_eq!(GaugeValue::from(7_u32).as_f64(), Some(7.0));
        assert!(GaugeValue::from(3_usize).is_numeric());
    }

    #[test]
    fn gauge_non_numeric_values() {
        let text = GaugeValue::from("warming up");
        assert_eq!(text.as_f64(), None);
        assert_eq!(text.type_name(), "text");

        let flag = GaugeValue::from(true);
        assert!(!flag.is_numeric());
        assert_eq!(flag.type_name(), "bool");
    }

    #[test]
    fn distribution_lifetime_statistics() {
        let dist = DistributionSnapshot::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(dist.count, 8);
        assert_eq!(dist.min, 2.0);
        assert_eq!(dist.max, 9.0);
        assert_eq!(dist.mean, 5.0);
        // Sample standard deviation: sqrt(32 / 7)
        assert!((dist.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn distribution_sorts_input() {
        let dist = DistributionSnapshot::from_values([3.0, 1.0, 2.0]);
        assert_eq!(dist.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(dist.median(), 2.0);
    }

    #[test]
    fn empty_distribution_is_zero() {
        let dist = DistributionSnapshot::from_values(std::iter::empty());
        assert!(dist.is_empty());
        assert_eq!(dist.value(0.99), 0.0);
        assert_eq!(dist.median(), 0.0);
        assert_eq!(dist.std_dev, 0.0);
    }

    #[test]
    fn single_value_distribution() {
        let dist = DistributionSnapshot::from_values([12.0]);
        assert_eq!(dist.value(0.0), 12.0);
        assert_eq!(dist.value(0.5), 12.0);
        assert_eq!(dist.value(1.0), 12.0);
        assert_eq!(dist.std_dev, 0.0);
    }

    #[test]
    fn percentile_lookup_on_large_sample() {
        let dist = minutes_sample();
        assert_eq!(dist.count, 5000);
        assert_eq!(dist.min, 0.0);
        assert_eq!(dist.max, 99.0);
        assert_eq!(dist.value(0.999), 99.0);
        assert_eq!(dist.median(), 49.5);
    }

    #[test]
    fn percentile_interpolates_between_neighbours() {
        let dist = DistributionSnapshot::from_values([10.0, 20.0, 30.0, 40.0]);
        // pos = 0.5 * 5 = 2.5 -> halfway between 20 and 30
        assert_eq!(dist.value(0.5), 25.0);
        // pos = 0.1 * 5 = 0.5 -> below first sample
        assert_eq!(dist.value(0.1), 10.0);
        // pos = 0.9 * 5 = 4.5 -> past last sample
        assert_eq!(dist.value(0.9), 40.0);
    }

    #[test]
    fn metric_ref_kinds() {
        let gauge = GaugeValue::from(1.0);
        let counter = CounterSnapshot::new(3);
        let hist = DistributionSnapshot::default();
        let meter = RateSnapshot::default();
        let timer = TimerSnapshot::default();

        assert_eq!(MetricRef::Gauge(&gauge).kind(), MetricKind::Gauge);
        assert_eq!(MetricRef::Counter(&counter).kind(), MetricKind::Counter);
        assert_eq!(MetricRef::Histogram(&hist).kind(), MetricKind::Histogram);
        assert_eq!(MetricRef::Meter(&meter).kind(), MetricKind::Meter);
        assert_eq!(MetricRef::Timer(&timer).kind(), MetricKind::Timer);
        assert_eq!(MetricKind::Timer.as_str(), "timer");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn gauge_value_untagged_serde() {
        let number: GaugeValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(number, GaugeValue::Number(12.5));
        let text: GaugeValue = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(text, GaugeValue::Text("idle".to_string()));
        let flag: GaugeValue = serde_json::from_str("false").unwrap();
        assert_eq!(flag, GaugeValue::Bool(false));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_sample_is_sorted() {
        let dist: DistributionSnapshot = serde_json::from_str(
            r#"{"count":3,"min":10.0,"max":30.0,"mean":20.0,"std_dev":10.0,"values":[30.0,10.0,20.0]}"#,
        )
        .unwrap();

        assert_eq!(dist.values, vec![10.0, 20.0, 30.0]);
        assert_eq!(dist.median(), 20.0);
    }
}
