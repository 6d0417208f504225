//! In-process metric registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use cwreport_types::{GaugeValue, MetricRef, Snapshot};

use crate::filter::MetricFilter;
use crate::instruments::{Counter, Histogram, Meter, Timer};

type GaugeFn = Arc<dyn Fn() -> GaugeValue + Send + Sync>;

#[derive(Default)]
struct Instruments {
    gauges: BTreeMap<String, GaugeFn>,
    counters: BTreeMap<String, Counter>,
    histograms: BTreeMap<String, Histogram>,
    meters: BTreeMap<String, Meter>,
    timers: BTreeMap<String, Timer>,
}

/// Named instruments, read as a [`Snapshot`] once per reporting cycle.
///
/// Clones share the same instruments. Each kind has its own namespace, so
/// a counter and a meter may share a name.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::{MetricFilter, MetricRegistry};
///
/// let registry = MetricRegistry::new();
/// registry.counter("jobs.completed").inc();
/// registry.gauge("queue.depth", || 7_i64.into());
///
/// let snapshot = registry.snapshot(&MetricFilter::all());
/// assert_eq!(snapshot.counters["jobs.completed"].count, 1);
/// ```
#[derive(Clone, Default)]
pub struct MetricRegistry {
    inner: Arc<RwLock<Instruments>>,
}

macro_rules! get_or_create {
    ($self:ident, $field:ident, $name:ident, $ty:ty) => {{
        // Fast path: check if it exists
        {
            let instruments = $self.inner.read();
            if let Some(existing) = instruments.$field.get($name) {
                return existing.clone();
            }
        }

        // Slow path: create it
        let mut instruments = $self.inner.write();
        instruments
            .$field
            .entry($name.to_string())
            .or_insert_with(<$ty>::new)
            .clone()
    }};
}

impl MetricRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter.
    pub fn counter(&self, name: &str) -> Counter {
        get_or_create!(self, counters, name, Counter)
    }

    /// Get or create a histogram.
    pub fn histogram(&self, name: &str) -> Histogram {
        get_or_create!(self, histograms, name, Histogram)
    }

    /// Get or create a meter.
    pub fn meter(&self, name: &str) -> Meter {
        get_or_create!(self, meters, name, Meter)
    }

    /// Get or create a timer.
    pub fn timer(&self, name: &str) -> Timer {
        get_or_create!(self, timers, name, Timer)
    }

    /// Register a gauge, replacing any gauge with the same name.
    ///
    /// `f` is called once per snapshot.
    pub fn gauge<F>(&self, name: &str, f: F)
    where
        F: Fn() -> GaugeValue + Send + Sync + 'static,
    {
        self.inner.write().gauges.insert(name.to_string(), Arc::new(f));
    }

    /// Remove every instrument with this name.
    ///
    /// Returns `true` if anything was removed. Existing handles keep working
    /// but no longer appear in snapshots.
    pub fn remove(&self, name: &str) -> bool {
        let mut instruments = self.inner.write();
        let removed = [
            instruments.gauges.remove(name).is_some(),
            instruments.counters.remove(name).is_some(),
            instruments.histograms.remove(name).is_some(),
            instruments.meters.remove(name).is_some(),
            instruments.timers.remove(name).is_some(),
        ];
        removed.contains(&true)
    }

    /// Number of registered instruments across all kinds.
    pub fn len(&self) -> usize {
        let instruments = self.inner.read();
        instruments.gauges.len()
            + instruments.counters.len()
            + instruments.histograms.len()
            + instruments.meters.len()
            + instruments.timers.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read every instrument accepted by `filter`.
    pub fn snapshot(&self, filter: &MetricFilter) -> Snapshot {
        let mut snapshot = Snapshot::new();

        // Gauge callbacks run without the lock held so they may use the registry.
        let gauges: Vec<(String, GaugeFn)> = {
            let instruments = self.inner.read();
            for (name, counter) in &instruments.counters {
                snapshot.counters.insert(
                    name.clone(),
                    cwreport_types::CounterSnapshot::new(counter.count()),
                );
            }
            for (name, histogram) in &instruments.histograms {
                snapshot.histograms.insert(name.clone(), histogram.snapshot());
            }
            for (name, meter) in &instruments.meters {
                snapshot.meters.insert(name.clone(), meter.snapshot());
            }
            for (name, timer) in &instruments.timers {
                snapshot.timers.insert(name.clone(), timer.snapshot());
            }
            instruments
                .gauges
                .iter()
                .map(|(name, f)| (name.clone(), f.clone()))
                .collect()
        };
        for (name, f) in gauges {
            snapshot.gauges.insert(name, f());
        }

        snapshot.counters.retain(|name, v| filter.matches(name, MetricRef::Counter(v)));
        snapshot.gauges.retain(|name, v| filter.matches(name, MetricRef::Gauge(v)));
        snapshot
            .histograms
            .retain(|name, v| filter.matches(name, MetricRef::Histogram(v)));
        snapshot.meters.retain(|name, v| filter.matches(name, MetricRef::Meter(v)));
        snapshot.timers.retain(|name, v| filter.matches(name, MetricRef::Timer(v)));
        snapshot
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instruments = self.inner.read();
        f.debug_struct("MetricRegistry")
            .field("gauges", &instruments.gauges.keys().collect::<Vec<_>>())
            .field("counters", &instruments.counters.keys().collect::<Vec<_>>())
            .field("histograms", &instruments.histograms.keys().collect::<Vec<_>>())
            .field("meters", &instruments.meters.keys().collect::<Vec<_>>())
            .field("timers", &instruments.timers.keys().collect::<Vec<_>>())
            .finish()
    }
}
