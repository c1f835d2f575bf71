//! Metrics data structures for overload-rs.
//!
//! This module defines the [`ResourceMetrics`] value returned by
//! [`UsageEstimator::sample`](crate::estimator::UsageEstimator::sample),
//! together with the rounding and unit helpers every field goes through.

use std::fmt;

/// Explicit "metric not obtainable" value. Never NaN, never another negative.
pub const UNAVAILABLE: f64 = -1.0;

/// Bytes in one GB (binary, 1024³).
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Where [`ResourceMetrics::load_average`] came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoadSource {
    /// The platform's own 1-minute load average.
    Platform,
    /// Degraded estimate: busy fraction of the last CPU tick window times
    /// the logical CPU count.
    ProcessorEstimate,
    /// Neither source produced a value; the field holds [`UNAVAILABLE`].
    #[default]
    Unavailable,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoadSource::Platform => "platform",
            LoadSource::ProcessorEstimate => "estimate",
            LoadSource::Unavailable => "n/a",
        };
        f.write_str(label)
    }
}

/// One sample of host resource metrics.
///
/// Every field is rounded to two decimals (round-half-up) or is exactly
/// [`UNAVAILABLE`]. Percentages lie in `[0, 100]`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ResourceMetrics {
    /// Physical memory in use, percent of total
    pub memory_usage_percent: f64,
    /// Physical memory available to new allocations in GB
    pub available_memory_gb: f64,
    /// Total physical memory in GB
    pub total_memory_gb: f64,
    /// Unallocated space on the sampled volume in GB
    pub disk_available_gb: f64,
    /// 1-minute load average (see [`ResourceMetrics::load_source`])
    pub load_average: f64,
    /// Provenance of `load_average`
    pub load_source: LoadSource,
    /// Share of CPU ticks spent busy over the last window, percent
    pub cpu_usage_percent: f64,
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self {
            memory_usage_percent: UNAVAILABLE,
            available_memory_gb: UNAVAILABLE,
            total_memory_gb: UNAVAILABLE,
            disk_available_gb: UNAVAILABLE,
            load_average: UNAVAILABLE,
            load_source: LoadSource::Unavailable,
            cpu_usage_percent: UNAVAILABLE,
        }
    }
}

impl ResourceMetrics {
    /// Returns a summary string suitable for logging or CLI display.
    ///
    /// # Example output
    /// ```text
    /// CPU:  12.50% | Mem:  43.21% (9.10/16.00 GB avail) | Load:  1.25 (platform) | Disk: 120.34 GB free
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "CPU: {} | Mem: {} ({}/{} GB avail) | Load: {} ({}) | Disk: {} GB free",
            display_field(self.cpu_usage_percent, "%"),
            display_field(self.memory_usage_percent, "%"),
            display_field(self.available_memory_gb, ""),
            display_field(self.total_memory_gb, ""),
            display_field(self.load_average, ""),
            self.load_source,
            display_field(self.disk_available_gb, ""),
        )
    }
}

fn display_field(value: f64, unit: &str) -> String {
    if is_unavailable(value) {
        "n/a".to_string()
    } else {
        format!("{value:6.2}{unit}")
    }
}

/// Whether `value` is the [`UNAVAILABLE`] sentinel.
pub fn is_unavailable(value: f64) -> bool {
    value == UNAVAILABLE
}

/// Convert a ratio in `[0, 1]` to a rounded percentage.
///
/// NaN and infinite ratios become [`UNAVAILABLE`]; finite ones are clamped
/// into `[0, 100]`.
pub fn ratio_to_percent(ratio: f64) -> f64 {
    if !ratio.is_finite() {
        return UNAVAILABLE;
    }
    round2(ratio * 100.0).clamp(0.0, 100.0)
}

/// Convert a byte count to rounded GB.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

/// Round to two decimal places, half away from zero, on the shortest
/// decimal representation of `value`.
///
/// Rounding the decimal text rather than `value * 100.0` makes literal
/// inputs behave as written: `12.345` becomes `12.35` even though the
/// nearest `f64` is slightly below it. Non-finite input is returned
/// unchanged.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // `Display` for f64 never uses exponent notation and round-trips.
    let text = format!("{}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if frac_part.len() <= 2 {
        return value;
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(2))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes()[2] >= b'5' {
        increment_digits(&mut digits);
    }

    let split = digits.len() - 2;
    let mut rounded = String::with_capacity(digits.len() + 1);
    rounded.extend(digits[..split].iter().map(|d| char::from(b'0' + d)));
    rounded.push('.');
    rounded.extend(digits[split..].iter().map(|d| char::from(b'0' + d)));

    let magnitude: f64 = rounded.parse().unwrap_or(value.abs());
    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Add one to a big-endian decimal digit string, growing it on overflow.
fn increment_digits(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_round2_half_up_boundaries() {
        assert_eq!(round2(12.345), 12.35);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(12.355), 12.36);
        assert_eq!(round2(0.125 * 100.0), 12.5);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_round2_carries() {
        assert_eq!(round2(99.995), 100.0);
        assert_eq!(round2(9.999), 10.0);
        assert_eq!(round2(0.999), 1.0);
    }

    #[test]
    fn test_round2_short_values_untouched() {
        assert_eq!(round2(50.0), 50.0);
        assert_eq!(round2(3.1), 3.1);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_round2_negative_is_symmetric() {
        assert_eq!(round2(-12.345), -12.35);
        assert_eq!(round2(-1.0), UNAVAILABLE);
    }

    #[test]
    fn test_round2_non_finite() {
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_ratio_to_percent() {
        assert_eq!(ratio_to_percent(0.5), 50.0);
        assert_eq!(ratio_to_percent(0.87500), 87.5);
        assert_eq!(ratio_to_percent(f64::NAN), UNAVAILABLE);
        assert_eq!(ratio_to_percent(1.5), 100.0);
    }

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(bytes_to_gb(16 * 1024 * 1024 * 1024), 16.0);
        assert_eq!(bytes_to_gb(1024 * 1024 * 1024 / 2), 0.5);
        assert_eq!(bytes_to_gb(0), 0.0);
    }

    #[test]
    fn test_summary_marks_unavailable_fields() {
        let metrics = ResourceMetrics {
            cpu_usage_percent: 12.5,
            ..ResourceMetrics::default()
        };
        let summary = metrics.summary();
        assert!(summary.contains(" 12.50%"));
        assert!(summary.contains("Load: n/a (n/a)"));
    }

    proptest! {
        #[test]
        fn prop_round2_percent_is_two_decimal_half_up(r in 0.0f64..=1.0) {
            let raw = r * 100.0;
            let rounded = round2(raw);
            prop_assert!((0.0..=100.0).contains(&rounded));
            prop_assert!((rounded - raw).abs() <= 0.005 + 1e-9);
            // At most two decimals survive a second pass.
            prop_assert_eq!(round2(rounded), rounded);
            prop_assert_eq!(format!("{rounded:.2}").parse::<f64>().unwrap(), rounded);
        }

        #[test]
        fn prop_round2_matches_integer_half_up(k in 0u64..=100_000) {
            // `k` thousandths rounded half-up to hundredths in integer space.
            let hundredths = (k + 5) / 10;
            let expected = hundredths as f64 / 100.0;
            prop_assert_eq!(round2(k as f64 / 1000.0), expected);
        }
    }
}
