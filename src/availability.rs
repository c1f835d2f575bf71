//! Metric availability tracking for overload-rs.
//!
//! This module records which platform counters answered at startup so the
//! binary can explain `n/a` fields up front instead of on every line.

use std::path::Path;

use crate::sampler::HardwareSampler;

/// Tracks which metric sources are available.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct MetricAvailability {
    /// Total and available physical memory
    pub memory: bool,
    /// Free space on the configured disk path
    pub disk: bool,
    /// CPU tick counters (needed for CPU usage and the load estimate)
    pub cpu_ticks: bool,
    /// Platform load average
    pub load_average: bool,
}

impl MetricAvailability {
    /// Probe every counter once.
    pub fn probe<S: HardwareSampler + ?Sized>(sampler: &mut S, disk_path: &Path) -> Self {
        let (total, available) = sampler.memory_bytes();
        Self {
            memory: total.is_ok() && available.is_ok(),
            disk: sampler.free_disk_bytes(disk_path).is_ok(),
            cpu_ticks: sampler.current_ticks().is_ok(),
            load_average: sampler.platform_load_average().is_ok(),
        }
    }

    /// Generate warnings for unavailable metrics.
    pub fn get_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.memory {
            warnings.push("Memory counters unavailable; memory reserve check disabled".into());
        }
        if !self.disk {
            warnings.push("Free disk space unavailable for the configured path".into());
        }
        if !self.cpu_ticks {
            warnings.push("CPU tick counters unavailable (requires /proc/stat)".into());
        }
        if !self.load_average {
            if self.cpu_ticks {
                warnings.push("Platform load average unavailable; using processor estimate".into());
            } else {
                warnings.push("Load average unavailable; cpu load check disabled".into());
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeSampler;

    #[test]
    fn test_all_available() {
        let mut fake = FakeSampler::new();
        let availability = MetricAvailability::probe(&mut fake, Path::new("."));
        assert!(availability.memory && availability.disk);
        assert!(availability.get_warnings().is_empty());
    }

    #[test]
    fn test_load_fallback_warning() {
        let mut fake = FakeSampler::new();
        fake.set_load_average(None);
        let warnings = MetricAvailability::probe(&mut fake, Path::new(".")).get_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("processor estimate"));
    }

    #[test]
    fn test_cpu_check_disabled_warning() {
        let mut fake = FakeSampler::new();
        fake.set_load_average(None);
        fake.set_ticks(None);
        fake.clear_memory();
        let warnings = MetricAvailability::probe(&mut fake, Path::new(".")).get_warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("cpu load check disabled")));
    }
}
