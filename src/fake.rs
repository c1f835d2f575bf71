//! Scriptable sampler and clock for deterministic tests and demos.
//!
//! Both types are cheap handles over shared state: clone one, hand the
//! clone to a [`UsageEstimator`](crate::estimator::UsageEstimator), and keep
//! driving the readings from the handle you kept.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::collectors::TickSnapshot;
use crate::error::MonitorError;
use crate::estimator::Clock;
use crate::metrics::BYTES_PER_GB;
use crate::sampler::HardwareSampler;

#[derive(Clone, Debug)]
struct FakeReadings {
    total_memory: Option<u64>,
    available_memory: Option<u64>,
    free_disk: Option<u64>,
    ticks: Option<TickSnapshot>,
    load_average: Option<f64>,
    logical_cpus: Option<usize>,
    tick_reads: usize,
    memory_reads: usize,
}

/// [`HardwareSampler`] whose readings are set by the test.
///
/// A `None` reading reports [`MonitorError::MetricUnavailable`].
#[derive(Clone, Debug)]
pub struct FakeSampler {
    readings: Arc<Mutex<FakeReadings>>,
}

impl Default for FakeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSampler {
    /// 16 GB total, 8 GB available, 100 GB free disk, 4 CPUs, load 1.0,
    /// and a zero tick snapshot.
    pub fn new() -> Self {
        Self {
            readings: Arc::new(Mutex::new(FakeReadings {
                total_memory: Some(gb(16.0)),
                available_memory: Some(gb(8.0)),
                free_disk: Some(gb(100.0)),
                ticks: Some(TickSnapshot::default()),
                load_average: Some(1.0),
                logical_cpus: Some(4),
                tick_reads: 0,
                memory_reads: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeReadings> {
        self.readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set total and available memory in GB.
    pub fn set_memory_gb(&self, total: f64, available: f64) {
        let mut r = self.lock();
        r.total_memory = Some(gb(total));
        r.available_memory = Some(gb(available));
    }

    /// Make the memory counters unavailable.
    pub fn clear_memory(&self) {
        let mut r = self.lock();
        r.total_memory = None;
        r.available_memory = None;
    }

    /// Set free disk space in GB, or `None` for unavailable.
    pub fn set_free_disk_gb(&self, free: Option<f64>) {
        self.lock().free_disk = free.map(gb);
    }

    /// Set the absolute tick counters, or `None` for unavailable.
    pub fn set_ticks(&self, ticks: Option<TickSnapshot>) {
        self.lock().ticks = ticks;
    }

    /// Set absolute busy and idle tick totals.
    pub fn set_busy_idle(&self, busy: u64, idle: u64) {
        self.set_ticks(Some(TickSnapshot::from_busy_idle(busy, idle)));
    }

    /// Set the platform load average, or `None` for unavailable.
    pub fn set_load_average(&self, load: Option<f64>) {
        self.lock().load_average = load;
    }

    /// Set the logical CPU count, or `None` for unavailable.
    pub fn set_logical_cpus(&self, cpus: Option<usize>) {
        self.lock().logical_cpus = cpus;
    }

    /// How many times [`HardwareSampler::current_ticks`] was called.
    pub fn tick_reads(&self) -> usize {
        self.lock().tick_reads
    }

    /// How many times [`HardwareSampler::memory_bytes`] was called.
    pub fn memory_reads(&self) -> usize {
        self.lock().memory_reads
    }
}

fn gb(value: f64) -> u64 {
    (value * BYTES_PER_GB) as u64
}

fn missing<T>(reading: Option<T>, metric: &'static str) -> Result<T, MonitorError> {
    reading.ok_or_else(|| MonitorError::unavailable(metric, "fake sampler has no reading"))
}

impl HardwareSampler for FakeSampler {
    fn total_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        missing(self.lock().total_memory, "total memory")
    }

    fn available_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        missing(self.lock().available_memory, "available memory")
    }

    fn memory_bytes(&mut self) -> (Result<u64, MonitorError>, Result<u64, MonitorError>) {
        let mut r = self.lock();
        r.memory_reads += 1;
        (
            missing(r.total_memory, "total memory"),
            missing(r.available_memory, "available memory"),
        )
    }

    fn free_disk_bytes(&mut self, _path: &Path) -> Result<u64, MonitorError> {
        missing(self.lock().free_disk, "disk free")
    }

    fn current_ticks(&mut self) -> Result<TickSnapshot, MonitorError> {
        let mut r = self.lock();
        r.tick_reads += 1;
        missing(r.ticks, "cpu ticks")
    }

    fn platform_load_average(&mut self) -> Result<f64, MonitorError> {
        missing(self.lock().load_average, "load average")
    }

    fn logical_cpus(&mut self) -> Result<usize, MonitorError> {
        missing(self.lock().logical_cpus, "logical cpus")
    }
}

/// [`Clock`] that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start at `millis`.
    pub fn new(millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Move forward (or backward, for negative `millis`).
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute reading.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_readings() {
        let fake = FakeSampler::new();
        let mut handle = fake.clone();
        fake.set_load_average(Some(3.5));
        assert_eq!(handle.platform_load_average().unwrap(), 3.5);

        fake.set_load_average(None);
        assert!(matches!(
            handle.platform_load_average(),
            Err(MonitorError::MetricUnavailable { metric: "load average", .. })
        ));
    }

    #[test]
    fn test_tick_reads_counted() {
        let fake = FakeSampler::new();
        let mut handle = fake.clone();
        handle.current_ticks().unwrap();
        handle.current_ticks().unwrap();
        assert_eq!(fake.tick_reads(), 2);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        let shared = clock.clone();
        clock.advance(500);
        assert_eq!(shared.now_millis(), 1_500);
        clock.set(10);
        assert_eq!(shared.now_millis(), 10);
    }
}
