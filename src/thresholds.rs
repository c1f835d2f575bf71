//! Threshold definitions for overload-rs.
//!
//! [`OverloadThresholds`] holds the two limits the overload policy checks.
//! Values are validated once, at construction, so evaluation never has to
//! second-guess them.

use crate::error::MonitorError;

/// Default reserve of available physical memory in GB.
pub const DEFAULT_RESERVED_MEMORY_GB: f64 = 0.3;

/// Default allowed load average per logical CPU.
pub const DEFAULT_LOAD_PER_CPU: f64 = 2.0;

/// Caller-supplied overload limits.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct OverloadThresholds {
    /// Load average above which the host counts as CPU-overloaded
    max_cpu_load_average: f64,
    /// Available memory (GB) below which the host counts as memory-starved
    min_reserved_memory_gb: f64,
}

impl OverloadThresholds {
    /// Validate and build thresholds.
    ///
    /// # Errors
    ///
    /// [`MonitorError::InvalidConfiguration`] if `max_cpu_load_average` is
    /// not a finite value above zero, or `min_reserved_memory_gb` is not a
    /// finite value at or above zero.
    pub fn new(
        max_cpu_load_average: f64,
        min_reserved_memory_gb: f64,
    ) -> Result<Self, MonitorError> {
        if !max_cpu_load_average.is_finite() || max_cpu_load_average <= 0.0 {
            return Err(MonitorError::InvalidConfiguration {
                detail: format!("max cpu load average must be > 0, got {max_cpu_load_average}"),
            });
        }
        if !min_reserved_memory_gb.is_finite() || min_reserved_memory_gb < 0.0 {
            return Err(MonitorError::InvalidConfiguration {
                detail: format!(
                    "reserved memory must be >= 0 GB, got {min_reserved_memory_gb}"
                ),
            });
        }

        Ok(Self {
            max_cpu_load_average,
            min_reserved_memory_gb,
        })
    }

    /// Defaults for a host with `logical_cpus` CPUs: a load average of
    /// [`DEFAULT_LOAD_PER_CPU`] per CPU and [`DEFAULT_RESERVED_MEMORY_GB`].
    pub fn for_cpus(logical_cpus: usize) -> Self {
        Self {
            max_cpu_load_average: logical_cpus.max(1) as f64 * DEFAULT_LOAD_PER_CPU,
            min_reserved_memory_gb: DEFAULT_RESERVED_MEMORY_GB,
        }
    }

    /// Load average limit.
    pub fn max_cpu_load_average(&self) -> f64 {
        self.max_cpu_load_average
    }

    /// Available memory reserve in GB.
    pub fn min_reserved_memory_gb(&self) -> f64 {
        self.min_reserved_memory_gb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_thresholds() {
        let t = OverloadThresholds::new(8.0, 0.0).unwrap();
        assert_eq!(t.max_cpu_load_average(), 8.0);
        assert_eq!(t.min_reserved_memory_gb(), 0.0);
    }

    #[test]
    fn test_rejects_non_positive_load() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                OverloadThresholds::new(bad, 1.0),
                Err(MonitorError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_negative_reserve() {
        for bad in [-0.1, f64::NAN, f64::NEG_INFINITY] {
            assert!(OverloadThresholds::new(4.0, bad).is_err());
        }
    }

    #[test]
    fn test_for_cpus() {
        let t = OverloadThresholds::for_cpus(4);
        assert_eq!(t.max_cpu_load_average(), 8.0);
        assert_eq!(t.min_reserved_memory_gb(), DEFAULT_RESERVED_MEMORY_GB);

        // A zero CPU count still yields a usable limit.
        assert_eq!(OverloadThresholds::for_cpus(0).max_cpu_load_average(), 2.0);
    }
}
