//! Time units and the backend's unit tags.
//!
//! The registry records durations in nanoseconds. Reporters convert them to a
//! configured [`TimeUnit`] and tag each datapoint with the matching
//! [`StandardUnit`].

use core::fmt;

/// A unit of time, used for configuring duration and rate conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TimeUnit {
    #[cfg_attr(feature = "serde", serde(alias = "ns"))]
    Nanoseconds,
    #[cfg_attr(feature = "serde", serde(alias = "us", alias = "µs"))]
    Microseconds,
    #[cfg_attr(feature = "serde", serde(alias = "ms"))]
    Milliseconds,
    #[cfg_attr(feature = "serde", serde(alias = "s"))]
    Seconds,
    #[cfg_attr(feature = "serde", serde(alias = "m"))]
    Minutes,
    #[cfg_attr(feature = "serde", serde(alias = "h"))]
    Hours,
    #[cfg_attr(feature = "serde", serde(alias = "d"))]
    Days,
}

impl TimeUnit {
    /// Number of nanoseconds in one of this unit.
    pub const fn nanos_per_unit(&self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1_000.0,
            TimeUnit::Milliseconds => 1_000_000.0,
            TimeUnit::Seconds => 1_000_000_000.0,
            TimeUnit::Minutes => 60_000_000_000.0,
            TimeUnit::Hours => 3_600_000_000_000.0,
            TimeUnit::Days => 86_400_000_000_000.0,
        }
    }

    /// Number of seconds in one of this unit.
    pub fn seconds_per_unit(&self) -> f64 {
        self.nanos_per_unit() / TimeUnit::Seconds.nanos_per_unit()
    }

    /// Convert a nanosecond quantity into this unit.
    pub fn from_nanos(&self, nanos: f64) -> f64 {
        nanos / self.nanos_per_unit()
    }

    /// Convert a per-second rate into a per-unit rate.
    pub fn rate_from_per_second(&self, per_second: f64) -> f64 {
        per_second * self.seconds_per_unit()
    }

    /// The backend unit tag for this time unit.
    ///
    /// Only milliseconds, microseconds and seconds have a counterpart.
    pub const fn standard_unit(&self) -> Option<StandardUnit> {
        match self {
            TimeUnit::Milliseconds => Some(StandardUnit::Milliseconds),
            TimeUnit::Microseconds => Some(StandardUnit::Microseconds),
            TimeUnit::Seconds => Some(StandardUnit::Seconds),
            TimeUnit::Nanoseconds | TimeUnit::Minutes | TimeUnit::Hours | TimeUnit::Days => None,
        }
    }

    /// Lowercase name of the unit.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit tag attached to every datapoint.
///
/// Variant names are the backend's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StandardUnit {
    Seconds,
    Microseconds,
    Milliseconds,
    Count,
    /// Dimensionless.
    #[default]
    None,
}

impl StandardUnit {
    /// Wire name of the unit.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StandardUnit::Seconds => "Seconds",
            StandardUnit::Microseconds => "Microseconds",
            StandardUnit::Milliseconds => "Milliseconds",
            StandardUnit::Count => "Count",
            StandardUnit::None => "None",
        }
    }
}

impl fmt::Display for StandardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
