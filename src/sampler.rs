//! Hardware counter access for overload-rs.
//!
//! [`HardwareSampler`] is the boundary the estimator consumes. Every query
//! either returns the platform figure or a [`MonitorError`]; an unavailable
//! counter is an ordinary outcome, never a panic.

use std::path::Path;

use sysinfo::{CpuRefreshKind, System};

use crate::collectors::{self, TickSnapshot};
use crate::error::MonitorError;

/// Read-only access to host-level counters.
///
/// Methods take `&mut self` because platform backends refresh cached
/// readings before answering; callers observe no other side effect.
pub trait HardwareSampler {
    /// Total physical memory in bytes.
    fn total_memory_bytes(&mut self) -> Result<u64, MonitorError>;

    /// Memory available to new allocations without swapping, in bytes.
    fn available_memory_bytes(&mut self) -> Result<u64, MonitorError>;

    /// Total and available memory from a single refresh of the counters,
    /// each degrading on its own.
    fn memory_bytes(&mut self) -> (Result<u64, MonitorError>, Result<u64, MonitorError>) {
        (self.total_memory_bytes(), self.available_memory_bytes())
    }

    /// Unallocated bytes on the volume holding `path`.
    fn free_disk_bytes(&mut self, path: &Path) -> Result<u64, MonitorError>;

    /// Absolute CPU tick counters since boot.
    fn current_ticks(&mut self) -> Result<TickSnapshot, MonitorError>;

    /// The platform's 1-minute load average.
    fn platform_load_average(&mut self) -> Result<f64, MonitorError>;

    /// Number of logical CPUs on the host, used to scale the
    /// processor-derived load estimate.
    fn logical_cpus(&mut self) -> Result<usize, MonitorError>;
}

impl<S: HardwareSampler + ?Sized> HardwareSampler for Box<S> {
    fn total_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        (**self).total_memory_bytes()
    }

    fn available_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        (**self).available_memory_bytes()
    }

    fn memory_bytes(&mut self) -> (Result<u64, MonitorError>, Result<u64, MonitorError>) {
        (**self).memory_bytes()
    }

    fn free_disk_bytes(&mut self, path: &Path) -> Result<u64, MonitorError> {
        (**self).free_disk_bytes(path)
    }

    fn current_ticks(&mut self) -> Result<TickSnapshot, MonitorError> {
        (**self).current_ticks()
    }

    fn platform_load_average(&mut self) -> Result<f64, MonitorError> {
        (**self).platform_load_average()
    }

    fn logical_cpus(&mut self) -> Result<usize, MonitorError> {
        (**self).logical_cpus()
    }
}

/// [`HardwareSampler`] backed by the running host.
///
/// Memory and the CPU count come from `sysinfo`, CPU ticks from `/proc/stat`, the load
/// average from `/proc/loadavg` on Linux and `sysinfo` on other unixes,
/// and free disk space from `statvfs`.
pub struct SystemSampler {
    sys: System,
}

impl SystemSampler {
    /// Create a sampler. No counters are read until the first query.
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn refreshed_memory(&mut self) -> &System {
        self.sys.refresh_memory();
        &self.sys
    }
}

fn total_memory(sys: &System) -> Result<u64, MonitorError> {
    match sys.total_memory() {
        0 => Err(MonitorError::unavailable(
            "total memory",
            "platform reported 0 bytes",
        )),
        total => Ok(total),
    }
}

fn available_memory(sys: &System) -> Result<u64, MonitorError> {
    if sys.total_memory() == 0 {
        return Err(MonitorError::unavailable(
            "available memory",
            "platform reported no memory",
        ));
    }
    Ok(sys.available_memory())
}

/// `sysinfo`'s CPU count, or the scheduler's parallelism hint when the CPU
/// list came back empty.
fn cpu_count_or_parallelism(cpus: usize) -> Result<usize, MonitorError> {
    if cpus > 0 {
        return Ok(cpus);
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .map_err(|e| MonitorError::unavailable("logical cpus", e.to_string()))
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareSampler for SystemSampler {
    fn total_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        total_memory(self.refreshed_memory())
    }

    fn available_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        available_memory(self.refreshed_memory())
    }

    fn memory_bytes(&mut self) -> (Result<u64, MonitorError>, Result<u64, MonitorError>) {
        let sys = self.refreshed_memory();
        (total_memory(sys), available_memory(sys))
    }

    fn free_disk_bytes(&mut self, path: &Path) -> Result<u64, MonitorError> {
        collectors::free_disk_bytes(path)
    }

    fn current_ticks(&mut self) -> Result<TickSnapshot, MonitorError> {
        if cfg!(target_os = "linux") {
            collectors::read_cpu_ticks()
        } else {
            Err(MonitorError::unavailable(
                "cpu ticks",
                "tick counters are only read from /proc/stat",
            ))
        }
    }

    fn platform_load_average(&mut self) -> Result<f64, MonitorError> {
        if cfg!(target_os = "linux") {
            collectors::read_loadavg()
        } else if cfg!(unix) {
            let load = System::load_average().one;
            if load.is_finite() && load >= 0.0 {
                Ok(load)
            } else {
                Err(MonitorError::unavailable(
                    "load average",
                    format!("platform reported {load}"),
                ))
            }
        } else {
            Err(MonitorError::unavailable(
                "load average",
                "platform has no load average",
            ))
        }
    }

    fn logical_cpus(&mut self) -> Result<usize, MonitorError> {
        self.sys.refresh_cpu_list(CpuRefreshKind::nothing());
        cpu_count_or_parallelism(self.sys.cpus().len())
    }
}
