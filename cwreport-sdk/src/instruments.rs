//! Instruments application code records into.
//!
//! All handles are cheap clones sharing state, and safe to use from any
//! thread. Reading a handle's snapshot never resets it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use cwreport_types::{DistributionSnapshot, RateSnapshot, TimerSnapshot};

/// A monotonically increasing count.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    count: Arc<AtomicU64>,
}

impl Counter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by `n`.
    pub fn inc_by(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// The current count.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Number of recent samples a histogram keeps for percentiles.
pub const DEFAULT_WINDOW_SIZE: usize = 1028;

#[derive(Debug)]
struct HistogramState {
    window: VecDeque<f64>,
    capacity: usize,
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    // Sum of squared distances from the mean (Welford).
    m2: f64,
}

impl HistogramState {
    fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    fn record(&mut self, value: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);

        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn snapshot(&self) -> DistributionSnapshot {
        let mut values: Vec<f64> = self.window.iter().copied().collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let std_dev = if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        };

        DistributionSnapshot {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean,
            std_dev,
            values,
        }
    }
}

/// Distribution of recorded values.
///
/// Percentiles are computed over the most recent samples (see
/// [`DEFAULT_WINDOW_SIZE`]); min, max, mean and standard deviation cover
/// every value ever recorded.
#[derive(Debug, Clone)]
pub struct Histogram {
    state: Arc<Mutex<HistogramState>>,
}

impl Histogram {
    /// Create a histogram with the default window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_SIZE)
    }

    /// Create a histogram keeping `size` recent samples for percentiles.
    pub fn with_window(size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HistogramState::new(size.max(1)))),
        }
    }

    /// Record a value.
    pub fn update(&self, value: i64) {
        self.record(value as f64);
    }

    fn record(&self, value: f64) {
        self.state.lock().record(value);
    }

    /// Number of values ever recorded.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Read the current distribution.
    pub fn snapshot(&self) -> DistributionSnapshot {
        self.state.lock().snapshot()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially weighted moving average of an event rate.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: u64,
    initialized: bool,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        let interval = TICK_INTERVAL.as_secs_f64();
        Self {
            alpha: 1.0 - (-interval / 60.0 / minutes).exp(),
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: u64) {
        self.uncounted += n;
    }

    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Events per second.
    fn rate(&self) -> f64 {
        self.rate
    }
}

#[derive(Debug)]
struct MeterState {
    count: u64,
    start: Instant,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            start: now,
            last_tick: now,
            m1: Ewma::over_minutes(1.0),
            m5: Ewma::over_minutes(5.0),
            m15: Ewma::over_minutes(15.0),
        }
    }

    fn tick_if_necessary(&mut self, now: Instant) {
        let age = now.saturating_duration_since(self.last_tick);
        if age < TICK_INTERVAL {
            return;
        }

        let ticks = age.as_nanos() / TICK_INTERVAL.as_nanos();
        self.last_tick += TICK_INTERVAL * ticks as u32;
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }

    fn mark(&mut self, n: u64, now: Instant) {
        self.tick_if_necessary(now);
        self.count += n;
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    fn snapshot(&mut self, now: Instant) -> RateSnapshot {
        self.tick_if_necessary(now);
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let mean_rate = if self.count == 0 || elapsed == 0.0 {
            0.0
        } else {
            self.count as f64 / elapsed
        };

        RateSnapshot {
            count: self.count,
            mean_rate,
            one_minute_rate: self.m1.rate(),
            five_minute_rate: self.m5.rate(),
            fifteen_minute_rate: self.m15.rate(),
        }
    }
}

/// Rate of events: lifetime count and mean, plus 1, 5 and 15 minute
/// moving averages updated every 5 seconds. Rates are per second.
#[derive(Debug, Clone)]
pub struct Meter {
    state: Arc<Mutex<MeterState>>,
}

impl Meter {
    /// Create a meter starting now.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MeterState::new(Instant::now()))),
        }
    }

    /// Mark one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Mark `n` events.
    pub fn mark_n(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    pub(crate) fn mark_at(&self, n: u64, now: Instant) {
        self.state.lock().mark(n, now);
    }

    /// Number of events ever marked.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    /// Read the current rates.
    pub fn snapshot(&self) -> RateSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> RateSnapshot {
        self.state.lock().snapshot(now)
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate and duration distribution of timed events.
///
/// Durations are recorded in nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    /// Create a timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event that took `duration`.
    pub fn update(&self, duration: Duration) {
        self.histogram.record(duration.as_nanos() as f64);
        self.meter.mark();
    }

    /// Run `f` and record how long it took.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        self.update(started.elapsed());
        result
    }

    /// Start timing; the elapsed time is recorded when the guard is stopped
    /// or dropped.
    ///
    /// ```rust
    /// use cwreport_sdk::Timer;
    ///
    /// let timer = Timer::new();
    /// {
    ///     let _guard = timer.start();
    ///     // ... timed work ...
    /// }
    /// assert_eq!(timer.count(), 1);
    /// ```
    pub fn start(&self) -> TimerGuard {
        TimerGuard {
            timer: self.clone(),
            started: Some(Instant::now()),
        }
    }

    /// Number of events ever recorded.
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    /// Read the current rates and durations.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            rate: self.meter.snapshot(),
            durations: self.histogram.snapshot(),
        }
    }
}

/// Records the time since [`Timer::start`] when stopped or dropped.
#[derive(Debug)]
pub struct TimerGuard {
    timer: Timer,
    started: Option<Instant>,
}

impl TimerGuard {
    /// Stop timing, record and return the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.record().unwrap_or_default()
    }

    fn record(&mut self) -> Option<Duration> {
        let elapsed = self.started.take()?.elapsed();
        self.timer.update(elapsed);
        Some(elapsed)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.record();
    }
}
