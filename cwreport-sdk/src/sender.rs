//! Value sender: clamps values and fills bounded batches.

use tracing::{debug, info, warn};

use cwreport_types::{Batch, Datapoint, Dimension, StandardUnit};

use crate::error::ReportError;
use crate::transport::Transport;

/// Most datapoints the backend accepts in one request.
pub const MAX_BATCH_SIZE: usize = 20;

/// Most dimensions the backend accepts on one datapoint.
pub const MAX_DIMENSIONS: usize = 10;

/// Smallest non-zero magnitude the backend accepts.
pub const SMALLEST_SENDABLE: f64 = 1E-108;

/// Largest magnitude the backend accepts.
pub const LARGEST_SENDABLE: f64 = 1E108;

/// Force a value into the range the backend accepts, keeping its sign.
///
/// Zero and NaN pass through unchanged. Infinities become the largest
/// sendable value.
///
/// ```rust
/// use cwreport_sdk::clamp;
///
/// assert_eq!(clamp(1E-200), 1E-108);
/// assert_eq!(clamp(-1E200), -1E108);
/// assert_eq!(clamp(0.0), 0.0);
/// assert_eq!(clamp(42.0), 42.0);
/// ```
pub fn clamp(value: f64) -> f64 {
    let abs = value.abs();
    if abs > 0.0 && abs < SMALLEST_SENDABLE {
        SMALLEST_SENDABLE.copysign(value)
    } else if abs > LARGEST_SENDABLE {
        LARGEST_SENDABLE.copysign(value)
    } else {
        value
    }
}

/// Warn-once flags kept for the lifetime of a translator.
#[derive(Debug, Default)]
pub(crate) struct Notices {
    too_small: bool,
    too_large: bool,
    not_a_number: bool,
    too_many_dimensions: bool,
}

/// Totals for one reporting cycle.
///
/// With delivery disabled, batches are counted as if delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleSummary {
    pub batches_delivered: usize,
    pub datapoints_sent: usize,
}

/// Owns the open batch for one cycle.
///
/// Each [`send`](ValueSender::send) appends one datapoint; the batch is
/// delivered as soon as it holds [`MAX_BATCH_SIZE`] items and replaced with
/// an empty one. [`finish`](ValueSender::finish) delivers a non-empty
/// remainder.
pub(crate) struct ValueSender<'a> {
    batch: Batch,
    timestamp: u64,
    transport: &'a dyn Transport,
    delivery_enabled: bool,
    notices: &'a mut Notices,
    summary: CycleSummary,
}

impl<'a> ValueSender<'a> {
    pub(crate) fn new(
        namespace: &str,
        timestamp: u64,
        transport: &'a dyn Transport,
        delivery_enabled: bool,
        notices: &'a mut Notices,
    ) -> Self {
        Self {
            batch: Batch::new(namespace),
            timestamp,
            transport,
            delivery_enabled,
            notices,
            summary: CycleSummary::default(),
        }
    }

    /// Clamp and append one datapoint, delivering the batch if it is full.
    pub(crate) fn send(
        &mut self,
        name: String,
        value: f64,
        unit: StandardUnit,
        dimensions: &[Dimension],
    ) -> Result<(), ReportError> {
        if value.is_nan() {
            if !self.notices.not_a_number {
                warn!(metric = %name, "Value is NaN and cannot be sent; skipping. Further NaN values won't be logged.");
                self.notices.not_a_number = true;
            }
            return Ok(());
        }

        let clamped = clamp(value);
        if clamped != value {
            if clamped.abs() == SMALLEST_SENDABLE && !self.notices.too_small {
                debug!(metric = %name, value = clamped, "Value is smaller than the backend supports; trimming. Further small values won't be logged.");
                self.notices.too_small = true;
            } else if clamped.abs() == LARGEST_SENDABLE && !self.notices.too_large {
                debug!(metric = %name, value = clamped, "Value is larger than the backend supports; trimming. Further large values won't be logged.");
                self.notices.too_large = true;
            }
        }

        let dimensions = if dimensions.len() > MAX_DIMENSIONS {
            if !self.notices.too_many_dimensions {
                warn!(
                    metric = %name,
                    count = dimensions.len(),
                    "Too many dimensions; keeping the first {}. Further truncations won't be logged.",
                    MAX_DIMENSIONS
                );
                self.notices.too_many_dimensions = true;
            }
            &dimensions[..MAX_DIMENSIONS]
        } else {
            dimensions
        };

        let datapoint = Datapoint::new(name, self.timestamp, clamped, unit)
            .with_dimensions(dimensions.to_vec());
        self.batch.push(datapoint);

        if self.batch.len() == MAX_BATCH_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    /// Deliver any remaining datapoints and return the cycle totals.
    pub(crate) fn finish(mut self) -> Result<CycleSummary, ReportError> {
        if !self.batch.is_empty() {
            self.flush()?;
        }
        Ok(self.summary)
    }

    fn flush(&mut self) -> Result<(), ReportError> {
        let batch = self.batch.take();

        if self.delivery_enabled {
            if let Err(source) = self.transport.deliver(&batch) {
                let size = batch.len();
                warn!(
                    namespace = %batch.namespace,
                    size,
                    error = %source,
                    "Failed delivering batch"
                );
                return Err(ReportError::Delivery {
                    namespace: batch.namespace,
                    size,
                    delivered_batches: self.summary.batches_delivered,
                    source,
                });
            }
        } else {
            info!(
                namespace = %batch.namespace,
                size = batch.len(),
                "Delivery disabled; logging batch instead"
            );
            for datapoint in batch.iter() {
                debug!(
                    metric = %datapoint.name,
                    value = datapoint.value,
                    unit = %datapoint.unit,
                    dimensions = ?datapoint.dimensions,
                    "Would send datapoint"
                );
            }
        }

        self.summary.batches_delivered += 1;
        self.summary.datapoints_sent += batch.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a debug-level subscriber and return what it logged.
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || LogBuffer(writer.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn send_n(sender: &mut ValueSender<'_>, n: usize) {
        for i in 0..n {
            sender
                .send(format!("m{i}"), i as f64, StandardUnit::None, &[])
                .unwrap();
        }
    }

    #[test]
    fn clamp_small_values_keep_sign() {
        assert_eq!(clamp(1E-109), 1E-108);
        assert_eq!(clamp(-1E-109), -1E-108);
        assert_eq!(clamp(f64::MIN_POSITIVE), 1E-108);
        assert_eq!(clamp(-5E-300), -1E-108);
    }

    #[test]
    fn clamp_large_values_keep_sign() {
        assert_eq!(clamp(1E109), 1E108);
        assert_eq!(clamp(-1E109), -1E108);
        assert_eq!(clamp(f64::MAX), 1E108);
        assert_eq!(clamp(f64::INFINITY), 1E108);
        assert_eq!(clamp(f64::NEG_INFINITY), -1E108);
    }

    #[test]
    fn clamp_leaves_zero_and_boundaries() {
        assert_eq!(clamp(0.0), 0.0);
        assert_eq!(clamp(1E-108), 1E-108);
        assert_eq!(clamp(1E108), 1E108);
        assert_eq!(clamp(-3.5), -3.5);
    }

    #[test]
    fn clamp_is_idempotent() {
        for v in [
            0.0, 1E-300, -1E-300, 1E-108, 7.25, -7.25, 1E108, 1E300, -1E300,
            f64::INFINITY,
        ] {
            assert_eq!(clamp(clamp(v)), clamp(v));
        }
    }

    #[test]
    fn twenty_datapoints_make_one_delivery() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);

        send_n(&mut sender, 20);
        assert_eq!(transport.deliveries(), 1);

        let summary = sender.finish().unwrap();
        assert_eq!(transport.deliveries(), 1);
        assert_eq!(transport.batches()[0].len(), 20);
        assert_eq!(summary.batches_delivered, 1);
        assert_eq!(summary.datapoints_sent, 20);
    }

    #[test]
    fn twenty_one_datapoints_make_two_deliveries() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);

        send_n(&mut sender, 21);
        sender.finish().unwrap();

        let batches = transport.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 20);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1].namespace, "app");
    }

    #[test]
    fn nothing_sent_means_no_delivery() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let sender = ValueSender::new("app", 0, &transport, true, &mut notices);

        let summary = sender.finish().unwrap();
        assert_eq!(transport.deliveries(), 0);
        assert_eq!(summary, CycleSummary::default());
    }

    #[test]
    fn values_are_clamped_before_batching() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 7, &transport, true, &mut notices);

        sender.send("tiny".into(), 1E-200, StandardUnit::None, &[]).unwrap();
        sender.send("huge".into(), -1E200, StandardUnit::None, &[]).unwrap();
        sender.finish().unwrap();

        let batch = &transport.batches()[0];
        assert_eq!(batch.datapoints[0].value, 1E-108);
        assert_eq!(batch.datapoints[1].value, -1E108);
        assert_eq!(batch.datapoints[1].timestamp, 7);
        assert!(notices.too_small);
        assert!(notices.too_large);
    }

    #[test]
    fn clamping_is_logged_once_per_direction() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();

        let logs = captured_logs(|| {
            let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);
            for name in ["tiny.a", "tiny.b"] {
                sender.send(name.into(), 1E-200, StandardUnit::None, &[]).unwrap();
            }
            for name in ["huge.a", "huge.b"] {
                sender.send(name.into(), -1E200, StandardUnit::None, &[]).unwrap();
            }
            sender.finish().unwrap();

            // the flags outlive the cycle
            let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);
            sender.send("tiny.c".into(), 1E-300, StandardUnit::None, &[]).unwrap();
            sender.send("huge.c".into(), 1E300, StandardUnit::None, &[]).unwrap();
            sender.finish().unwrap();
        });

        assert_eq!(logs.matches("smaller than the backend supports").count(), 1);
        assert_eq!(logs.matches("larger than the backend supports").count(), 1);
        assert!(logs.contains("tiny.a"));
        assert!(logs.contains("huge.a"));
        for quiet in ["tiny.b", "huge.b", "tiny.c", "huge.c"] {
            assert!(!logs.contains(quiet), "{quiet} should not be logged");
        }

        let batches = transport.batches();
        assert_eq!(batches[0].len(), 4);
        assert_eq!(batches[1].datapoints[0].value, 1E-108);
        assert_eq!(batches[1].datapoints[1].value, 1E108);
    }

    #[test]
    fn nan_is_logged_once() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();

        let logs = captured_logs(|| {
            let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);
            sender.send("bad.a".into(), f64::NAN, StandardUnit::None, &[]).unwrap();
            sender.send("bad.b".into(), f64::NAN, StandardUnit::None, &[]).unwrap();
            sender.finish().unwrap();
        });

        assert_eq!(logs.matches("Value is NaN").count(), 1);
        assert!(!logs.contains("bad.b"));
    }

    #[test]
    fn nan_is_skipped() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);

        sender.send("bad".into(), f64::NAN, StandardUnit::None, &[]).unwrap();
        let summary = sender.finish().unwrap();

        assert_eq!(summary.datapoints_sent, 0);
        assert_eq!(transport.deliveries(), 0);
        assert!(notices.not_a_number);
    }

    #[test]
    fn dimensions_are_attached() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);
        let dims = [Dimension::new("InstanceId", "flask")];

        sender.send("a".into(), 1.0, StandardUnit::Count, &dims).unwrap();
        sender.finish().unwrap();

        assert_eq!(transport.batches()[0].datapoints[0].dimensions, dims.to_vec());
    }

    #[test]
    fn dimensions_are_truncated_to_backend_limit() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);
        let dims: Vec<Dimension> = (0..12)
            .map(|i| Dimension::new(format!("k{i}"), "v"))
            .collect();

        sender.send("a".into(), 1.0, StandardUnit::None, &dims).unwrap();
        sender.finish().unwrap();

        let sent = &transport.batches()[0].datapoints[0].dimensions;
        assert_eq!(sent.len(), MAX_DIMENSIONS);
        assert_eq!(sent[..], dims[..MAX_DIMENSIONS]);
        assert!(notices.too_many_dimensions);
    }

    #[test]
    fn delivery_disabled_skips_transport() {
        let transport = MemoryTransport::new();
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, false, &mut notices);

        send_n(&mut sender, 25);
        let summary = sender.finish().unwrap();

        assert_eq!(transport.deliveries(), 0);
        assert_eq!(summary.batches_delivered, 2);
        assert_eq!(summary.datapoints_sent, 25);
    }

    #[test]
    fn failure_reports_namespace_size_and_progress() {
        let transport = MemoryTransport::failing_after(1);
        let mut notices = Notices::default();
        let mut sender = ValueSender::new("app", 0, &transport, true, &mut notices);

        send_n(&mut sender, 20);
        let mut result = Ok(());
        for i in 0..20 {
            result = sender.send(format!("late{i}"), 1.0, StandardUnit::None, &[]);
            if result.is_err() {
                break;
            }
        }

        match result {
            Err(ReportError::Delivery {
                namespace,
                size,
                delivered_batches,
                ..
            }) => {
                assert_eq!(namespace, "app");
                assert_eq!(size, 20);
                assert_eq!(delivered_batches, 1);
            }
            other => panic!("expected delivery failure, got {other:?}"),
        }
    }
}
