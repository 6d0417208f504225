//! The reporter: ties a registry, a translator and a transport together.

use std::sync::Arc;

use tracing::{debug, error};

use cwreport_types::Snapshot;

use crate::config::ReporterConfig;
use crate::error::{ConfigError, ReportError};
use crate::registry::MetricRegistry;
use crate::sender::CycleSummary;
use crate::transport::Transport;
use crate::translate::SnapshotTranslator;

/// Periodically reports a registry's metrics to the backend.
///
/// # Example
///
/// ```rust,no_run
/// use cwreport_sdk::{CloudWatchReporter, FileTransport, MetricRegistry, ReporterConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = MetricRegistry::new();
///     let config = ReporterConfig::new("my-service").with_instance_id("web-1");
///     let transport = FileTransport::new("datapoints.ndjson");
///
///     let reporter = CloudWatchReporter::new(registry.clone(), config, transport)
///         .expect("valid configuration");
///
///     // Report every minute in the background
///     let handle = reporter.start(Duration::from_secs(60));
///
///     registry.counter("requests").inc();
///
///     // ... your application runs ...
///     handle.stop();
/// }
/// ```
pub struct CloudWatchReporter {
    registry: MetricRegistry,
    translator: SnapshotTranslator,
    transport: Arc<dyn Transport>,
}

impl CloudWatchReporter {
    /// Create a reporter, rejecting unusable configuration.
    pub fn new(
        registry: MetricRegistry,
        config: ReporterConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            registry,
            translator: SnapshotTranslator::new(config)?,
            transport: Arc::new(transport),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ReporterConfig {
        self.translator.config()
    }

    /// The translator, for inspecting its warn-once state.
    pub fn translator(&self) -> &SnapshotTranslator {
        &self.translator
    }

    /// Snapshot the registry and report it now.
    pub fn report_now(&mut self) -> Result<CycleSummary, ReportError> {
        let snapshot = self.registry.snapshot(&self.translator.config().filter);
        self.translator.translate(&snapshot, self.transport.as_ref())
    }

    /// Report an externally taken snapshot, after applying the filter.
    pub fn report(&mut self, snapshot: &Snapshot) -> Result<CycleSummary, ReportError> {
        let filtered = self.translator.config().filter.apply(snapshot);
        self.translator.translate(&filtered, self.transport.as_ref())
    }

    /// Run one scheduled cycle. Failures are logged, never returned.
    pub fn run_cycle(&mut self) {
        match self.report_now() {
            Ok(summary) => debug!(
                namespace = %self.config().namespace,
                batches = summary.batches_delivered,
                datapoints = summary.datapoints_sent,
                "Reporting cycle complete"
            ),
            Err(e) => error!(
                namespace = %self.config().namespace,
                error = %e,
                "Reporting cycle failed"
            ),
        }
    }

    /// Start reporting every `interval` in the background.
    ///
    /// The first cycle runs immediately. Cycles run on the blocking pool
    /// and never overlap: a slow cycle delays the next tick.
    ///
    /// Returns a handle that can be used to stop reporting.
    #[cfg(feature = "tokio")]
    pub fn start(self, interval: std::time::Duration) -> ReportingHandle {
        use tokio::sync::watch;
        use tokio::time::MissedTickBehavior;

        let (stop_tx, stop_rx) = watch::channel(false);
        let reporter = Arc::new(parking_lot::Mutex::new(self));

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let reporter = reporter.clone();
                        let cycle = tokio::task::spawn_blocking(move || reporter.lock().run_cycle());
                        if let Err(e) = cycle.await {
                            error!(error = %e, "Reporting cycle panicked");
                        }
                    }
                    changed = stop_rx.changed() => {
                        // A dropped handle stops reporting too
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Stopped periodic reporting");
        });

        ReportingHandle { stop_tx, task }
    }
}

impl std::fmt::Debug for CloudWatchReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudWatchReporter")
            .field("registry", &self.registry)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

/// Handle for controlling background reporting.
///
/// Drop this handle to stop reporting, or call `stop()` explicitly.
#[cfg(feature = "tokio")]
pub struct ReportingHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "tokio")]
impl ReportingHandle {
    /// Stop background reporting.
    ///
    /// A cycle already in progress runs to completion.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop background reporting and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    /// Check if the reporting task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
