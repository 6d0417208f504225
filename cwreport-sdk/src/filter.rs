//! Predicates over metric instances.

use std::fmt;
use std::sync::Arc;

use cwreport_types::{MetricRef, Snapshot};

type Predicate = dyn Fn(&str, MetricRef<'_>) -> bool + Send + Sync;

/// A predicate over `(name, metric)` pairs.
///
/// Used to decide which metrics are reported at all, and which metrics a
/// dimension adder applies to. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::MetricFilter;
/// use cwreport_types::{CounterSnapshot, MetricKind, MetricRef};
///
/// let counters_only = MetricFilter::new(|_, metric| metric.kind() == MetricKind::Counter);
/// let count = CounterSnapshot::new(1);
/// assert!(counters_only.matches("requests", MetricRef::Counter(&count)));
/// ```
#[derive(Clone)]
pub struct MetricFilter {
    predicate: Option<Arc<Predicate>>,
}

impl MetricFilter {
    /// A filter that accepts every metric.
    pub fn all() -> Self {
        Self { predicate: None }
    }

    /// A filter backed by a closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str, MetricRef<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// Accept metrics whose name starts with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |name, _| name.starts_with(&prefix))
    }

    /// Check a single metric.
    pub fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(name, metric),
            None => true,
        }
    }

    /// Check if this filter accepts everything without calling a predicate.
    pub fn accepts_all(&self) -> bool {
        self.predicate.is_none()
    }

    /// Drop every metric the filter rejects from a snapshot.
    pub fn apply(&self, snapshot: &Snapshot) -> Snapshot {
        if self.accepts_all() {
            return snapshot.clone();
        }

        let mut filtered = Snapshot {
            version: snapshot.version,
            ..Snapshot::with_timestamp(snapshot.timestamp_ms)
        };
        filtered.gauges = snapshot
            .gauges
            .iter()
            .filter(|(name, v)| self.matches(name, MetricRef::Gauge(v)))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();
        filtered.counters = snapshot
            .counters
            .iter()
            .filter(|(name, v)| self.matches(name, MetricRef::Counter(v)))
            .map(|(name, v)| (name.clone(), *v))
            .collect();
        filtered.histograms = snapshot
            .histograms
            .iter()
            .filter(|(name, v)| self.matches(name, MetricRef::Histogram(v)))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();
        filtered.meters = snapshot
            .meters
            .iter()
            .filter(|(name, v)| self.matches(name, MetricRef::Meter(v)))
            .map(|(name, v)| (name.clone(), *v))
            .collect();
        filtered.timers = snapshot
            .timers
            .iter()
            .filter(|(name, v)| self.matches(name, MetricRef::Timer(v)))
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();
        filtered
    }
}

impl Default for MetricFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for MetricFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricFilter")
            .field("accepts_all", &self.accepts_all())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwreport_types::{CounterSnapshot, MetricKind, RateSnapshot};

    #[test]
    fn default_accepts_everything() {
        let filter = MetricFilter::default();
        let count = CounterSnapshot::new(0);
        assert!(filter.accepts_all());
        assert!(filter.matches("anything", MetricRef::Counter(&count)));
    }

    #[test]
    fn prefix_filter() {
        let filter = MetricFilter::prefix("jvm.");
        let count = CounterSnapshot::new(0);
        assert!(filter.matches("jvm.memory.heap", MetricRef::Counter(&count)));
        assert!(!filter.matches("http.requests", MetricRef::Counter(&count)));
    }

    #[test]
    fn apply_keeps_matching_metrics_only() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(42)
            .counter("keep.a", 1)
            .counter("drop.b", 2)
            .meter("keep.rate", RateSnapshot::default())
            .gauge("drop.gauge", 1.0)
            .build();

        let filtered = MetricFilter::prefix("keep.").apply(&snapshot);

        assert_eq!(filtered.timestamp_ms, 42);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.counters.contains_key("keep.a"));
        assert!(filtered.meters.contains_key("keep.rate"));
    }

    #[test]
    fn filter_by_kind() {
        let snapshot = Snapshot::builder()
            .counter("a", 1)
            .gauge("b", 2.0)
            .build();

        let filter = MetricFilter::new(|_, metric| metric.kind() != MetricKind::Gauge);
        let filtered = filter.apply(&snapshot);

        assert_eq!(filtered.counters.len(), 1);
        assert!(filtered.gauges.is_empty());
    }
}
