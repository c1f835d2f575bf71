//! Windowed CPU usage and host metric estimation.
//!
//! [`UsageEstimator`] owns a [`SampleWindow`] and a [`HardwareSampler`] and
//! turns raw counters into [`ResourceMetrics`]. CPU usage is the only
//! stateful figure: tick counters are absolute totals, so usage is the busy
//! share of the tick delta between two snapshots. Recomputing is
//! rate-limited to one snapshot per [`CPU_WINDOW_MILLIS`]; calls inside the
//! window return the cached value without touching the counters.
//!
//! Sampling takes `&mut self`, so one estimator serves one polling loop.
//! Give each consumer its own instance, or share one through
//! [`SharedEstimator`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::collectors::TickSnapshot;
use crate::error::MonitorError;
use crate::metrics::{
    bytes_to_gb, ratio_to_percent, round2, LoadSource, ResourceMetrics, UNAVAILABLE,
};
use crate::policy::{self, OverloadReason, OverloadVerdict};
use crate::sampler::{HardwareSampler, SystemSampler};
use crate::thresholds::OverloadThresholds;

/// Minimum time between two CPU tick snapshots.
pub const CPU_WINDOW_MILLIS: i64 = 950;

/// Volume inspected for free disk space unless overridden.
pub const DEFAULT_DISK_PATH: &str = ".";

/// Millisecond time source for the CPU window.
pub trait Clock {
    /// Current reading in milliseconds. Only differences are meaningful.
    fn now_millis(&self) -> i64;
}

/// [`Clock`] counting milliseconds since its creation on the monotonic clock.
///
/// Wall clock adjustments cannot move it backwards.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Mutable windowing state behind CPU usage.
///
/// Snapshot, timestamp and cached value are only ever replaced together
/// by [`SampleWindow::cpu_usage`].
#[derive(Clone, Debug, Default)]
pub struct SampleWindow {
    previous_ticks: TickSnapshot,
    previous_sample_time_millis: Option<i64>,
    last_cpu_usage: Option<f64>,
    last_busy_ratio: Option<f64>,
}

impl SampleWindow {
    /// Tick snapshot taken at the last window advance.
    pub fn previous_ticks(&self) -> &TickSnapshot {
        &self.previous_ticks
    }

    /// Clock reading of the last window advance, `None` before the first.
    pub fn previous_sample_time_millis(&self) -> Option<i64> {
        self.previous_sample_time_millis
    }

    /// Last finite CPU usage percentage, `None` until one was computed.
    pub fn last_cpu_usage(&self) -> Option<f64> {
        self.last_cpu_usage
    }

    /// Busy share of the window that ended at the last advance, in
    /// `[0, 1]`, as long as that window is still current at `now`.
    ///
    /// `None` once a full window has elapsed without a fresh tick reading,
    /// and after a window whose ratio was not finite.
    pub fn busy_ratio_at(&self, now: i64) -> Option<f64> {
        if self.is_open(now) {
            return None;
        }
        self.last_busy_ratio
    }

    /// Whether a new snapshot may be taken at `now`.
    ///
    /// A reading earlier than the previous sample keeps the gate shut so a
    /// clock stepping backwards cannot shrink or invert the window.
    pub fn is_open(&self, now: i64) -> bool {
        match self.previous_sample_time_millis {
            None => true,
            Some(previous) => now.saturating_sub(previous) >= CPU_WINDOW_MILLIS,
        }
    }

    fn cached(&self) -> f64 {
        self.last_cpu_usage.unwrap_or(UNAVAILABLE)
    }

    /// CPU usage percentage at `now`, reading ticks from `sampler` only when
    /// the window is open.
    pub fn cpu_usage<S: HardwareSampler + ?Sized>(&mut self, now: i64, sampler: &mut S) -> f64 {
        if !self.is_open(now) {
            trace!(now, "cpu window still open, returning cached usage");
            return self.cached();
        }

        let current = match sampler.current_ticks() {
            Ok(ticks) => ticks,
            Err(e) => {
                debug!(error = %e, "cpu tick counters unavailable");
                return UNAVAILABLE;
            }
        };

        let ratio = self.previous_ticks.delta(&current).busy_ratio();
        self.previous_ticks = current;
        self.previous_sample_time_millis = Some(now);

        let percent = ratio_to_percent(ratio);
        if percent == UNAVAILABLE {
            self.last_busy_ratio = None;
            let anomaly = MonitorError::TransientAnomaly { metric: "cpu usage" };
            debug!(error = %anomaly, "keeping previous cpu usage");
            return UNAVAILABLE;
        }

        self.last_cpu_usage = Some(percent);
        self.last_busy_ratio = Some(ratio.clamp(0.0, 1.0));
        percent
    }
}

/// Produces [`ResourceMetrics`] from a [`HardwareSampler`].
///
/// # Example
/// ```no_run
/// use overload_rs::{policy, OverloadThresholds, UsageEstimator};
///
/// let mut estimator = UsageEstimator::system();
/// let thresholds = OverloadThresholds::new(8.0, 0.3).expect("valid thresholds");
/// let metrics = estimator.sample();
/// if policy::evaluate(&metrics, &thresholds).overloaded {
///     println!("host is overloaded: {}", metrics.summary());
/// }
/// ```
pub struct UsageEstimator<S = SystemSampler, C = MonotonicClock> {
    sampler: S,
    clock: C,
    window: SampleWindow,
    disk_path: PathBuf,
}

impl UsageEstimator<SystemSampler, MonotonicClock> {
    /// Estimator over the running host.
    pub fn system() -> Self {
        Self::new(SystemSampler::new(), MonotonicClock::new())
    }
}

impl<S: HardwareSampler, C: Clock> UsageEstimator<S, C> {
    /// Estimator over `sampler`, timing its CPU window with `clock`.
    pub fn new(sampler: S, clock: C) -> Self {
        Self {
            sampler,
            clock,
            window: SampleWindow::default(),
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
        }
    }

    /// Inspect the volume holding `path` for free disk space.
    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    /// Volume inspected for free disk space.
    pub fn disk_path(&self) -> &Path {
        &self.disk_path
    }

    /// Current windowing state.
    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Sample every metric.
    ///
    /// Each field degrades to [`UNAVAILABLE`] independently; nothing here
    /// fails as a whole.
    pub fn sample(&mut self) -> ResourceMetrics {
        let (memory_usage_percent, available_memory_gb, total_memory_gb) = self.memory();
        let disk_available_gb = self.disk_available_gb();

        // CPU first: the load fallback reads the window it advances.
        let now = self.clock.now_millis();
        let cpu_usage_percent = self.window.cpu_usage(now, &mut self.sampler);
        let (load_average, load_source) = self.load_average(now);

        ResourceMetrics {
            memory_usage_percent,
            available_memory_gb,
            total_memory_gb,
            disk_available_gb,
            load_average,
            load_source,
            cpu_usage_percent,
        }
    }

    /// Sample, then evaluate against `thresholds`, logging a warning naming
    /// the tripped signal.
    pub fn check_overload(
        &mut self,
        thresholds: &OverloadThresholds,
    ) -> (ResourceMetrics, OverloadVerdict) {
        let metrics = self.sample();
        let verdict = policy::evaluate(&metrics, thresholds);

        match verdict.reason {
            OverloadReason::CpuLoadExceeded => warn!(
                load_average = metrics.load_average,
                max_cpu_load_average = thresholds.max_cpu_load_average(),
                "current cpu load average is too high"
            ),
            OverloadReason::MemoryBelowReserve => warn!(
                available_memory_gb = metrics.available_memory_gb,
                reserved_memory_gb = thresholds.min_reserved_memory_gb(),
                "current available memory is too low"
            ),
            OverloadReason::None => {}
        }

        (metrics, verdict)
    }

    fn memory(&mut self) -> (f64, f64, f64) {
        let (total, available) = self.sampler.memory_bytes();
        let total = unavailable_logged(total);
        let available = unavailable_logged(available);

        let usage = match (total, available) {
            (Some(total), Some(available)) if total > 0 => {
                ratio_to_percent(total.saturating_sub(available) as f64 / total as f64)
            }
            _ => UNAVAILABLE,
        };

        (
            usage,
            available.map_or(UNAVAILABLE, bytes_to_gb),
            total.map_or(UNAVAILABLE, bytes_to_gb),
        )
    }

    fn disk_available_gb(&mut self) -> f64 {
        unavailable_logged(self.sampler.free_disk_bytes(&self.disk_path))
            .map_or(UNAVAILABLE, bytes_to_gb)
    }

    fn load_average(&mut self, now: i64) -> (f64, LoadSource) {
        match self.sampler.platform_load_average() {
            Ok(load) if load.is_finite() && load >= 0.0 => {
                return (round2(load), LoadSource::Platform);
            }
            Ok(load) => debug!(load, "platform load average is not usable, estimating"),
            Err(e) => debug!(error = %e, "falling back to processor load estimate"),
        }

        match self.processor_load_estimate(now) {
            Some(estimate) => (estimate, LoadSource::ProcessorEstimate),
            None => (UNAVAILABLE, LoadSource::Unavailable),
        }
    }

    /// Busy share of the current CPU window scaled by the logical CPU count.
    fn processor_load_estimate(&mut self, now: i64) -> Option<f64> {
        let ratio = self.window.busy_ratio_at(now)?;
        let cpus = unavailable_logged(self.sampler.logical_cpus())?;
        let estimate = ratio * cpus as f64;
        estimate.is_finite().then(|| round2(estimate))
    }
}

fn unavailable_logged<T>(result: Result<T, MonitorError>) -> Option<T> {
    result
        .map_err(|e| debug!(error = %e, "metric unavailable"))
        .ok()
}

/// Cloneable handle that funnels every sample through one estimator.
///
/// All clones share a single window, so concurrent callers see one
/// consistent rate limit instead of racing on the tick snapshot.
pub struct SharedEstimator<S = SystemSampler, C = MonotonicClock> {
    inner: Arc<Mutex<UsageEstimator<S, C>>>,
}

impl<S, C> Clone for SharedEstimator<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: HardwareSampler, C: Clock> SharedEstimator<S, C> {
    /// Wrap `estimator` for shared use.
    pub fn new(estimator: UsageEstimator<S, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(estimator)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UsageEstimator<S, C>> {
        // A panic mid-sample cannot leave the window half-updated, so the
        // state behind a poisoned lock is still consistent.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// See [`UsageEstimator::sample`].
    pub fn sample(&self) -> ResourceMetrics {
        self.lock().sample()
    }

    /// See [`UsageEstimator::check_overload`].
    pub fn check_overload(
        &self,
        thresholds: &OverloadThresholds,
    ) -> (ResourceMetrics, OverloadVerdict) {
        self.lock().check_overload(thresholds)
    }
}
