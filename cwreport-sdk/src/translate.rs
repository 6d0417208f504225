//! Snapshot translation: the root of a reporting cycle.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use cwreport_types::{current_timestamp_ms, MetricRef, Snapshot, StandardUnit};

use crate::config::ReporterConfig;
use crate::dimensions::{collect_dimensions, DimensionAdder};
use crate::error::{ConfigError, ReportError};
use crate::kinds::{self, Reading};
use crate::sender::{CycleSummary, Notices, ValueSender};
use crate::transport::Transport;

/// Turns snapshots into batched datapoints and hands them to a transport.
///
/// A translator keeps a little state between cycles: warn-once flags for
/// clamped, NaN and over-tagged values, the names of gauges found to hold
/// non-numeric values, and (inside its instance id adder) a resolved
/// instance id. Cycles must not run concurrently; `translate` takes
/// `&mut self` to enforce that.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::{MemoryTransport, ReporterConfig, SnapshotTranslator};
/// use cwreport_types::Snapshot;
///
/// let mut translator = SnapshotTranslator::new(ReporterConfig::new("app")).unwrap();
/// let transport = MemoryTransport::new();
///
/// let snapshot = Snapshot::builder().counter("requests", 3).build();
/// let summary = translator.translate(&snapshot, &transport).unwrap();
///
/// assert_eq!(summary.datapoints_sent, 1);
/// assert_eq!(transport.batches()[0].datapoints[0].name, "requests");
/// ```
pub struct SnapshotTranslator {
    config: ReporterConfig,
    adders: Vec<Arc<dyn DimensionAdder>>,
    duration_tag: StandardUnit,
    notices: Notices,
    unsendable: BTreeSet<String>,
}

impl SnapshotTranslator {
    /// Create a translator, rejecting unusable configuration.
    pub fn new(config: ReporterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let duration_tag = config.duration_standard_unit()?;
        let adders = config.adder_pipeline();

        Ok(Self {
            config,
            adders,
            duration_tag,
            notices: Notices::default(),
            unsendable: BTreeSet::new(),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Names of gauges that held a non-numeric value at some point.
    pub fn unsendable(&self) -> &BTreeSet<String> {
        &self.unsendable
    }

    /// Translate and deliver one snapshot, stamped with the current time.
    ///
    /// Visits gauges, counters, histograms, meters and timers in that order,
    /// each by name. Every datapoint carries the time the cycle started, not
    /// the snapshot's own timestamp. The first delivery failure ends the
    /// cycle; batches delivered before it stay delivered.
    pub fn translate(
        &mut self,
        snapshot: &Snapshot,
        transport: &dyn Transport,
    ) -> Result<CycleSummary, ReportError> {
        self.translate_at(snapshot, transport, current_timestamp_ms())
    }

    /// Like [`translate`](Self::translate), stamping every datapoint with
    /// `timestamp_ms`.
    pub fn translate_at(
        &mut self,
        snapshot: &Snapshot,
        transport: &dyn Transport,
        timestamp_ms: u64,
    ) -> Result<CycleSummary, ReportError> {
        let Self {
            config,
            adders,
            duration_tag,
            notices,
            unsendable,
        } = self;

        let mut sender = ValueSender::new(
            &config.namespace,
            timestamp_ms,
            transport,
            config.delivery_enabled,
            notices,
        );

        for (name, value) in &snapshot.gauges {
            match kinds::gauge(value) {
                Some(reading) => {
                    emit(
                        &mut sender,
                        adders,
                        name,
                        MetricRef::Gauge(value),
                        vec![reading],
                    )?;
                }
                None => {
                    if unsendable.insert(name.clone()) {
                        warn!(
                            metric = %name,
                            value_type = value.type_name(),
                            "Gauge value is not numeric and won't be sent"
                        );
                    }
                }
            }
        }

        for (name, counter) in &snapshot.counters {
            emit(
                &mut sender,
                adders,
                name,
                MetricRef::Counter(counter),
                kinds::counter(counter),
            )?;
        }

        for (name, dist) in &snapshot.histograms {
            emit(
                &mut sender,
                adders,
                name,
                MetricRef::Histogram(dist),
                kinds::histogram(dist, config),
            )?;
        }

        for (name, rate) in &snapshot.meters {
            emit(
                &mut sender,
                adders,
                name,
                MetricRef::Meter(rate),
                kinds::meter(rate, config),
            )?;
        }

        for (name, timer) in &snapshot.timers {
            emit(
                &mut sender,
                adders,
                name,
                MetricRef::Timer(timer),
                kinds::timer(timer, config, config.duration_unit, *duration_tag),
            )?;
        }

        let summary = sender.finish()?;
        debug!(
            namespace = %config.namespace,
            batches = summary.batches_delivered,
            datapoints = summary.datapoints_sent,
            "Translated snapshot"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for SnapshotTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotTranslator")
            .field("config", &self.config)
            .field("duration_tag", &self.duration_tag)
            .field("unsendable", &self.unsendable)
            .finish_non_exhaustive()
    }
}

/// Send every reading of one metric instance, all with the same dimensions.
fn emit(
    sender: &mut ValueSender<'_>,
    adders: &[Arc<dyn DimensionAdder>],
    name: &str,
    metric: MetricRef<'_>,
    readings: Vec<Reading>,
) -> Result<(), ReportError> {
    if readings.is_empty() {
        return Ok(());
    }

    let dimensions = collect_dimensions(adders, name, metric);
    for reading in readings {
        sender.send(
            format!("{name}{}", reading.suffix),
            reading.value,
            reading.unit,
            &dimensions,
        )?;
    }
    Ok(())
}
