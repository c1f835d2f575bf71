//! Command-line configuration for overload-rs.
//!
//! This module defines all CLI arguments using `clap` for parsing.
//! The configuration controls the polling interval, the overload
//! thresholds and the volume inspected for free disk space.

use std::path::PathBuf;

use clap::Parser;

use crate::error::MonitorError;
use crate::estimator::DEFAULT_DISK_PATH;
use crate::thresholds::{OverloadThresholds, DEFAULT_RESERVED_MEMORY_GB};

/// Host overload gate.
///
/// overload-rs samples CPU usage, load average, physical memory and free
/// disk space, and reports whether the host is overloaded: either the
/// load average is above the allowed maximum or available memory is
/// below the reserve.
///
/// # Examples
///
/// ```bash
/// # Print one line per second until interrupted
/// overload-rs
///
/// # Admission check for a script: exit status 2 when overloaded
/// overload-rs --once --max-cpu-load-avg 16 --reserved-memory-gb 1
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Sample host resources and report overload")]
pub struct Config {
    /// Interval in milliseconds between samples.
    ///
    /// CPU usage is only recomputed once per 950 ms window, so intervals
    /// below that repeat the previous CPU figure.
    #[arg(short, long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Load average above which the host is overloaded.
    ///
    /// Defaults to twice the number of logical CPUs.
    #[arg(short = 'l', long)]
    pub max_cpu_load_avg: Option<f64>,

    /// Available physical memory (GB) below which the host is overloaded.
    #[arg(short = 'm', long, default_value_t = DEFAULT_RESERVED_MEMORY_GB)]
    pub reserved_memory_gb: f64,

    /// Path whose volume is inspected for free disk space.
    #[arg(short, long, default_value = DEFAULT_DISK_PATH)]
    pub disk_path: PathBuf,

    /// Take a single sample and exit with status 2 if overloaded.
    #[arg(long)]
    pub once: bool,

    /// Stop after this many samples (0 runs until interrupted).
    #[arg(short, long, default_value_t = 0)]
    pub count: u64,
}

impl Config {
    /// Build validated thresholds, filling the load limit from
    /// `logical_cpus` when it was not given.
    pub fn thresholds(&self, logical_cpus: usize) -> Result<OverloadThresholds, MonitorError> {
        let max_load = self
            .max_cpu_load_avg
            .unwrap_or_else(|| OverloadThresholds::for_cpus(logical_cpus).max_cpu_load_average());
        OverloadThresholds::new(max_load, self.reserved_memory_gb)
    }

    /// Number of samples to take, `None` for unbounded.
    pub fn sample_limit(&self) -> Option<u64> {
        if self.once {
            Some(1)
        } else if self.count > 0 {
            Some(self.count)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["overload-rs"]);
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.disk_path, PathBuf::from("."));
        assert_eq!(config.sample_limit(), None);

        let thresholds = config.thresholds(4).unwrap();
        assert_eq!(thresholds.max_cpu_load_average(), 8.0);
        assert_eq!(thresholds.min_reserved_memory_gb(), DEFAULT_RESERVED_MEMORY_GB);
    }

    #[test]
    fn test_explicit_thresholds() {
        let config = Config::parse_from([
            "overload-rs",
            "--max-cpu-load-avg",
            "12.5",
            "--reserved-memory-gb",
            "2",
            "--once",
        ]);
        let thresholds = config.thresholds(4).unwrap();
        assert_eq!(thresholds.max_cpu_load_average(), 12.5);
        assert_eq!(thresholds.min_reserved_memory_gb(), 2.0);
        assert_eq!(config.sample_limit(), Some(1));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = Config::parse_from(["overload-rs", "-l", "0"]);
        assert!(config.thresholds(4).is_err());
    }

    #[test]
    fn test_count_limit() {
        let config = Config::parse_from(["overload-rs", "--count", "3"]);
        assert_eq!(config.sample_limit(), Some(3));
    }
}
