//! Snapshot - a point-in-time view of a metric registry.

use std::collections::BTreeMap;

use crate::{
    CounterSnapshot, DistributionSnapshot, GaugeValue, RateSnapshot, SchemaVersion, TimerSnapshot,
};

/// A point-in-time snapshot of every metric in a registry.
///
/// Each kind lives in its own name-ordered map, so iterating a map visits
/// metrics in name order. Snapshots are read-only once taken; the reporter
/// translates them into datapoints.
///
/// # Example
///
/// ```rust
/// use cwreport_types::{RateSnapshot, Snapshot};
///
/// let snapshot = Snapshot::builder()
///     .counter("jobs.completed", 12)
///     .meter("jobs.started", RateSnapshot { count: 14, ..Default::default() })
///     .build();
///
/// let names: Vec<_> = snapshot.counters.keys().collect();
/// assert_eq!(names, ["jobs.completed"]);
///
/// // Serialize with serde (requires "serde" feature)
/// // let json = serde_json::to_string(&snapshot)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    #[cfg_attr(feature = "serde", serde(default))]
    pub gauges: BTreeMap<String, GaugeValue>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub counters: BTreeMap<String, CounterSnapshot>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub histograms: BTreeMap<String, DistributionSnapshot>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub meters: BTreeMap<String, RateSnapshot>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub timers: BTreeMap<String, TimerSnapshot>,
}

impl Snapshot {
    /// Create an empty snapshot with the current timestamp.
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            version: SchemaVersion::current(),
            timestamp_ms,
            gauges: BTreeMap::new(),
            counters: BTreeMap::new(),
            histograms: BTreeMap::new(),
            meters: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of metrics across all kinds.
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            timestamp_ms: None,
            snapshot: Snapshot::with_timestamp(0),
        }
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a gauge.
    pub fn gauge(mut self, name: impl Into<String>, value: impl Into<GaugeValue>) -> Self {
        self.snapshot.gauges.insert(name.into(), value.into());
        self
    }

    /// Add a counter with the given count.
    pub fn counter(mut self, name: impl Into<String>, count: u64) -> Self {
        self.snapshot
            .counters
            .insert(name.into(), CounterSnapshot::new(count));
        self
    }

    /// Add a histogram.
    pub fn histogram(mut self, name: impl Into<String>, dist: DistributionSnapshot) -> Self {
        self.snapshot.histograms.insert(name.into(), dist);
        self
    }

    /// Add a meter.
    pub fn meter(mut self, name: impl Into<String>, rate: RateSnapshot) -> Self {
        self.snapshot.meters.insert(name.into(), rate);
        self
    }

    /// Add a timer.
    pub fn timer(mut self, name: impl Into<String>, timer: TimerSnapshot) -> Self {
        self.snapshot.timers.insert(name.into(), timer);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            ..self.snapshot
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .gauge("queue.depth", 12)
            .counter("requests", 1000)
            .counter("errors", 3)
            .timer("db.query", TimerSnapshot::default())
            .build();

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.timestamp_ms, 1703160000000);
        assert_eq!(snapshot.counters["requests"].count, 1000);
        assert_eq!(snapshot.gauges["queue.depth"], GaugeValue::Number(12.0));
    }

    #[test]
    fn test_maps_iterate_by_name() {
        let snapshot = Snapshot::builder()
            .counter("zeta", 1)
            .counter("alpha", 2)
            .counter("mid", 3)
            .build();

        let names: Vec<&str> = snapshot.counters.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_snapshot_version() {
        let snapshot = Snapshot::builder().build();
        assert!(snapshot.version.is_compatible());
        assert!(snapshot.is_empty());
        assert!(snapshot.timestamp_ms > 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1703160000000)
            .gauge("cache.state", "warming")
            .counter("requests", 42)
            .histogram("sizes", DistributionSnapshot::from_values([1.0, 2.0, 3.0]))
            .meter(
                "hits",
                RateSnapshot {
                    count: 10,
                    mean_rate: 1.0,
                    one_minute_rate: 0.5,
                    five_minute_rate: 0.25,
                    fifteen_minute_rate: 0.125,
                },
            )
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_missing_kinds_default_to_empty() {
        let parsed: Snapshot =
            serde_json::from_str(r#"{"timestamp_ms": 5, "counters": {"a": {"count": 1}}}"#)
                .unwrap();

        assert_eq!(parsed.timestamp_ms, 5);
        assert_eq!(parsed.len(), 1);
        assert!(parsed.version.is_compatible());
    }
}
