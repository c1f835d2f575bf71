//! Overload decision for overload-rs.
//!
//! [`evaluate`] is a pure function of one [`ResourceMetrics`] sample and
//! validated [`OverloadThresholds`]. CPU load is checked before memory and
//! short-circuits. A field holding the [`UNAVAILABLE`] sentinel never trips
//! its check.

use std::fmt;

use crate::metrics::{ResourceMetrics, UNAVAILABLE};
use crate::thresholds::OverloadThresholds;

/// Which signal tripped the verdict.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum OverloadReason {
    /// Nothing tripped
    #[default]
    None,
    /// Load average above `max_cpu_load_average`
    CpuLoadExceeded,
    /// Available memory below `min_reserved_memory_gb`
    MemoryBelowReserve,
}

impl fmt::Display for OverloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverloadReason::None => "ok",
            OverloadReason::CpuLoadExceeded => "cpu load exceeded",
            OverloadReason::MemoryBelowReserve => "memory below reserve",
        };
        f.write_str(label)
    }
}

/// Outcome of [`evaluate`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct OverloadVerdict {
    /// Whether new work should be refused
    pub overloaded: bool,
    /// The signal that decided it
    pub reason: OverloadReason,
}

impl OverloadVerdict {
    fn tripped(reason: OverloadReason) -> Self {
        Self {
            overloaded: true,
            reason,
        }
    }
}

/// Decide whether the host is overloaded.
pub fn evaluate(metrics: &ResourceMetrics, thresholds: &OverloadThresholds) -> OverloadVerdict {
    let load = metrics.load_average;
    if is_measured(load) && load > thresholds.max_cpu_load_average() {
        return OverloadVerdict::tripped(OverloadReason::CpuLoadExceeded);
    }

    let available = metrics.available_memory_gb;
    if is_measured(available) && available < thresholds.min_reserved_memory_gb() {
        return OverloadVerdict::tripped(OverloadReason::MemoryBelowReserve);
    }

    OverloadVerdict::default()
}

/// A real reading: finite, non-negative, not the sentinel.
fn is_measured(value: f64) -> bool {
    value != UNAVAILABLE && value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(load_average: f64, available_memory_gb: f64) -> ResourceMetrics {
        ResourceMetrics {
            load_average,
            available_memory_gb,
            ..ResourceMetrics::default()
        }
    }

    fn thresholds(max_load: f64, reserve: f64) -> OverloadThresholds {
        OverloadThresholds::new(max_load, reserve).unwrap()
    }

    #[test]
    fn test_not_overloaded() {
        let verdict = evaluate(&metrics(1.0, 8.0), &thresholds(8.0, 4.0));
        assert_eq!(verdict, OverloadVerdict::default());
        assert!(!verdict.overloaded);
    }

    #[test]
    fn test_cpu_load_exceeded() {
        let verdict = evaluate(&metrics(9.0, 8.0), &thresholds(8.0, 4.0));
        assert!(verdict.overloaded);
        assert_eq!(verdict.reason, OverloadReason::CpuLoadExceeded);
    }

    #[test]
    fn test_load_equal_to_limit_is_fine() {
        let verdict = evaluate(&metrics(8.0, 8.0), &thresholds(8.0, 4.0));
        assert!(!verdict.overloaded);
    }

    #[test]
    fn test_cpu_checked_before_memory() {
        let verdict = evaluate(&metrics(9.0, 1.0), &thresholds(8.0, 4.0));
        assert_eq!(verdict.reason, OverloadReason::CpuLoadExceeded);
    }

    #[test]
    fn test_memory_below_reserve() {
        let verdict = evaluate(&metrics(1.0, 2.0), &thresholds(8.0, 4.0));
        assert!(verdict.overloaded);
        assert_eq!(verdict.reason, OverloadReason::MemoryBelowReserve);
    }

    #[test]
    fn test_sentinel_load_never_trips_cpu() {
        for max in [0.001, 0.5, 8.0, 1e9] {
            let verdict = evaluate(&metrics(UNAVAILABLE, 8.0), &thresholds(max, 0.0));
            assert_ne!(verdict.reason, OverloadReason::CpuLoadExceeded);
            assert!(!verdict.overloaded);
        }
    }

    #[test]
    fn test_sentinel_memory_never_trips_reserve() {
        let verdict = evaluate(&metrics(1.0, UNAVAILABLE), &thresholds(8.0, 4.0));
        assert!(!verdict.overloaded);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(OverloadReason::None.to_string(), "ok");
        assert_eq!(
            OverloadReason::MemoryBelowReserve.to_string(),
            "memory below reserve"
        );
    }
}
