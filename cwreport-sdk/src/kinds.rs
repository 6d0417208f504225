//! Per-kind translation of metric instances into named readings.
//!
//! Each function is pure: it looks at one metric and the reporter settings
//! and returns the `(suffix, value, unit)` readings to send, in send order.
//! The full metric name is the instance name followed by the suffix.

use cwreport_types::{
    CounterSnapshot, DistributionSnapshot, GaugeValue, RateSnapshot, StandardUnit, TimeUnit,
    TimerSnapshot,
};

use crate::config::ReporterConfig;

/// One value to send, before naming and dimensions are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub suffix: String,
    pub value: f64,
    pub unit: StandardUnit,
}

impl Reading {
    fn new(suffix: impl Into<String>, value: f64, unit: StandardUnit) -> Self {
        Self {
            suffix: suffix.into(),
            value,
            unit,
        }
    }
}

/// Suffix for a percentile reading.
///
/// `0.5` is `.median`; anything else is `_percentile_` followed by the
/// percentile's decimal form. The match is exact, not approximate.
///
/// ```rust
/// use cwreport_sdk::kinds::percentile_suffix;
///
/// assert_eq!(percentile_suffix(0.5), ".median");
/// assert_eq!(percentile_suffix(0.9), "_percentile_0.9");
/// assert_eq!(percentile_suffix(0.999), "_percentile_0.999");
/// assert_eq!(percentile_suffix(1.0), "_percentile_1.0");
/// ```
pub fn percentile_suffix(percentile: f64) -> String {
    if percentile == 0.5 {
        ".median".to_string()
    } else if percentile.fract() == 0.0 {
        format!("_percentile_{percentile:.1}")
    } else {
        format!("_percentile_{percentile}")
    }
}

/// A gauge's reading, or `None` if its value is not numeric.
pub fn gauge(value: &GaugeValue) -> Option<Reading> {
    value
        .as_f64()
        .map(|v| Reading::new("", v, StandardUnit::None))
}

/// A counter's reading: always exactly one.
pub fn counter(counter: &CounterSnapshot) -> Vec<Reading> {
    vec![Reading::new("", counter.count as f64, StandardUnit::Count)]
}

/// A meter's readings: the enabled moving-average rates, then the summary.
pub fn meter(rate: &RateSnapshot, config: &ReporterConfig) -> Vec<Reading> {
    let per_unit = |per_second: f64| config.rate_unit.rate_from_per_second(per_second);
    let mut readings = Vec::new();

    if config.one_minute_rate {
        readings.push(Reading::new(
            ".1MinuteRate",
            per_unit(rate.one_minute_rate),
            StandardUnit::None,
        ));
    }
    if config.five_minute_rate {
        readings.push(Reading::new(
            ".5MinuteRate",
            per_unit(rate.five_minute_rate),
            StandardUnit::None,
        ));
    }
    if config.fifteen_minute_rate {
        readings.push(Reading::new(
            ".15MinuteRate",
            per_unit(rate.fifteen_minute_rate),
            StandardUnit::None,
        ));
    }
    if config.meter_summary {
        readings.push(Reading::new(".count", rate.count as f64, StandardUnit::Count));
        readings.push(Reading::new(
            ".meanRate",
            per_unit(rate.mean_rate),
            StandardUnit::None,
        ));
    }

    readings
}

/// A histogram's readings: configured percentiles, then the summary.
pub fn histogram(dist: &DistributionSnapshot, config: &ReporterConfig) -> Vec<Reading> {
    distribution(
        dist,
        &config.percentiles,
        config.histogram_summary,
        StandardUnit::None,
        |v| v,
    )
}

/// A timer's readings: its meter readings, then its duration readings
/// converted from nanoseconds to `duration_unit` and tagged `duration_tag`.
pub fn timer(
    timer: &TimerSnapshot,
    config: &ReporterConfig,
    duration_unit: TimeUnit,
    duration_tag: StandardUnit,
) -> Vec<Reading> {
    let mut readings = meter(&timer.rate, config);
    readings.extend(distribution(
        &timer.durations,
        &config.percentiles,
        config.timer_summary,
        duration_tag,
        |nanos| duration_unit.from_nanos(nanos),
    ));
    readings
}

fn distribution(
    dist: &DistributionSnapshot,
    percentiles: &[f64],
    summary: bool,
    unit: StandardUnit,
    convert: impl Fn(f64) -> f64,
) -> Vec<Reading> {
    let mut readings: Vec<Reading> = percentiles
        .iter()
        .map(|&p| {
            let value = if p == 0.5 { dist.median() } else { dist.value(p) };
            Reading::new(percentile_suffix(p), convert(value), unit)
        })
        .collect();

    if summary {
        readings.push(Reading::new(".min", convert(dist.min), unit));
        readings.push(Reading::new(".max", convert(dist.max), unit));
        readings.push(Reading::new(".mean", convert(dist.mean), unit));
        readings.push(Reading::new(".stddev", convert(dist.std_dev), unit));
    }

    readings
}
