//! Error types for overload-rs.
//!
//! None of these are fatal to the host process. The estimator degrades
//! every sampling failure to the [`UNAVAILABLE`](crate::metrics::UNAVAILABLE)
//! sentinel for the affected field, and only threshold construction
//! surfaces an error to the caller.

/// Errors produced while reading platform counters or validating thresholds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    /// A single platform counter could not be read.
    #[error("{metric} is unavailable: {reason}")]
    MetricUnavailable {
        /// Name of the counter that failed.
        metric: &'static str,
        /// Platform detail (missing file, unsupported OS, ...).
        reason: String,
    },

    /// Arithmetic on otherwise valid counters produced NaN or infinity.
    #[error("{metric} produced a non-finite value")]
    TransientAnomaly {
        /// Name of the derived metric.
        metric: &'static str,
    },

    /// A caller-supplied threshold is out of range.
    #[error("invalid configuration: {detail}")]
    InvalidConfiguration {
        /// What was wrong with the value.
        detail: String,
    },
}

impl MonitorError {
    /// Shorthand for [`MonitorError::MetricUnavailable`].
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        Self::MetricUnavailable {
            metric,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = MonitorError::unavailable("load average", "no /proc/loadavg");
        assert_eq!(err.to_string(), "load average is unavailable: no /proc/loadavg");

        let err = MonitorError::TransientAnomaly { metric: "cpu usage" };
        assert_eq!(err.to_string(), "cpu usage produced a non-finite value");

        let err = MonitorError::InvalidConfiguration {
            detail: "max cpu load average must be > 0".into(),
        };
        assert!(err.to_string().starts_with("invalid configuration:"));
    }
}
