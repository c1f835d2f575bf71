//! Raw platform readers for overload-rs.
//!
//! These are the cheap counter reads that back
//! [`SystemSampler`](crate::sampler::SystemSampler). Each reader either
//! returns the raw figure or a [`MonitorError::MetricUnavailable`]; none of
//! them retain state between calls.
//!
//! # Data Sources
//!
//! - `/proc/stat` - Aggregate CPU tick counters
//! - `/proc/loadavg` - 1-minute load average (Linux)
//! - `statvfs(3)` - Free disk bytes (unix), `sysinfo` disk list elsewhere

use std::ops::Index;
use std::path::Path;

use crate::error::MonitorError;

/// Path to the kernel CPU statistics file.
const PROC_STAT: &str = "/proc/stat";

/// Path to the kernel load average file.
const PROC_LOADAVG: &str = "/proc/loadavg";

/// CPU tick categories, in `/proc/stat` column order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickType {
    /// Time spent in user mode
    User,
    /// Time spent in user mode with low priority
    Nice,
    /// Time spent in system mode
    System,
    /// Time spent idle
    Idle,
    /// Time spent waiting for I/O
    IoWait,
    /// Time spent servicing hardware interrupts
    Irq,
    /// Time spent servicing software interrupts
    SoftIrq,
    /// Time stolen by the hypervisor
    Steal,
}

impl TickType {
    /// Number of tick categories.
    pub const COUNT: usize = 8;

    /// All categories in column order.
    pub const ALL: [TickType; Self::COUNT] = [
        TickType::User,
        TickType::Nice,
        TickType::System,
        TickType::Idle,
        TickType::IoWait,
        TickType::Irq,
        TickType::SoftIrq,
        TickType::Steal,
    ];

    /// Whether time in this category counts as the CPU doing nothing.
    ///
    /// I/O wait is idle time from the processor's point of view.
    pub fn is_idle(self) -> bool {
        matches!(self, TickType::Idle | TickType::IoWait)
    }
}

/// Absolute CPU tick counters accumulated since boot, one per [`TickType`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TickSnapshot {
    ticks: [u64; TickType::COUNT],
}

impl TickSnapshot {
    /// Build a snapshot from counters in [`TickType::ALL`] order.
    pub fn new(ticks: [u64; TickType::COUNT]) -> Self {
        Self { ticks }
    }

    /// Build a snapshot from separate busy and idle totals.
    ///
    /// Busy ticks are attributed to [`TickType::User`] and idle ticks to
    /// [`TickType::Idle`]; useful for synthetic samplers.
    pub fn from_busy_idle(busy: u64, idle: u64) -> Self {
        let mut ticks = [0; TickType::COUNT];
        ticks[TickType::User as usize] = busy;
        ticks[TickType::Idle as usize] = idle;
        Self { ticks }
    }

    /// Calculate the difference between this snapshot and a later one.
    ///
    /// Counters that went backwards (counter reset, hotplug) clamp to zero.
    pub fn delta(&self, other: &Self) -> Self {
        let mut ticks = [0; TickType::COUNT];
        for (i, slot) in ticks.iter_mut().enumerate() {
            *slot = other.ticks[i].saturating_sub(self.ticks[i]);
        }
        Self { ticks }
    }

    /// Sum of all categories.
    pub fn total(&self) -> u64 {
        self.ticks.iter().fold(0u64, |acc, t| acc.saturating_add(*t))
    }

    /// Sum of the idle categories.
    pub fn idle(&self) -> u64 {
        TickType::ALL
            .iter()
            .filter(|t| t.is_idle())
            .fold(0u64, |acc, t| acc.saturating_add(self[*t]))
    }

    /// Sum of the busy categories.
    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle())
    }

    /// Fraction of ticks spent busy, in `[0, 1]`.
    ///
    /// Returns NaN when the snapshot holds no ticks at all, which happens
    /// when two identical snapshots are diffed.
    pub fn busy_ratio(&self) -> f64 {
        self.busy() as f64 / self.total() as f64
    }
}

impl Index<TickType> for TickSnapshot {
    type Output = u64;

    fn index(&self, tick: TickType) -> &u64 {
        &self.ticks[tick as usize]
    }
}

/// Read the aggregate CPU tick counters from `/proc/stat`.
pub fn read_cpu_ticks() -> Result<TickSnapshot, MonitorError> {
    let content = std::fs::read_to_string(PROC_STAT)
        .map_err(|e| MonitorError::unavailable("cpu ticks", format!("{PROC_STAT}: {e}")))?;
    parse_cpu_ticks(&content)
}

/// Parse the aggregate `cpu` line of a `/proc/stat`-formatted string.
///
/// Kernels older than 2.6.11 omit the steal column; it reads as zero.
pub fn parse_cpu_ticks(content: &str) -> Result<TickSnapshot, MonitorError> {
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"cpu") {
            continue;
        }
        if parts.len() < 8 {
            return Err(MonitorError::unavailable(
                "cpu ticks",
                format!("truncated cpu line: '{line}'"),
            ));
        }

        let mut ticks = [0u64; TickType::COUNT];
        for (i, slot) in ticks.iter_mut().enumerate() {
            *slot = match parts.get(i + 1) {
                Some(raw) => raw.parse().map_err(|_| {
                    MonitorError::unavailable("cpu ticks", format!("bad tick value '{raw}'"))
                })?,
                None => 0,
            };
        }
        return Ok(TickSnapshot::new(ticks));
    }

    Err(MonitorError::unavailable(
        "cpu ticks",
        "no aggregate cpu line in /proc/stat",
    ))
}

/// Read the 1-minute load average from `/proc/loadavg`.
pub fn read_loadavg() -> Result<f64, MonitorError> {
    let content = std::fs::read_to_string(PROC_LOADAVG)
        .map_err(|e| MonitorError::unavailable("load average", format!("{PROC_LOADAVG}: {e}")))?;
    parse_loadavg(&content)
}

/// Parse the first field of a `/proc/loadavg`-formatted string.
///
/// Format: `"0.35 0.28 0.22 1/234 5678"`.
pub fn parse_loadavg(content: &str) -> Result<f64, MonitorError> {
    content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| {
            MonitorError::unavailable("load average", format!("unparseable '{}'", content.trim()))
        })
}

/// Unallocated bytes on the filesystem holding `path`.
///
/// This counts blocks reserved for root as free, matching what the
/// filesystem reports as not allocated to any file.
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub fn free_disk_bytes(path: &Path) -> Result<u64, MonitorError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        MonitorError::unavailable("disk free", format!("{} contains a NUL byte", path.display()))
    })?;

    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(MonitorError::unavailable(
            "disk free",
            format!("{}: {}", path.display(), std::io::Error::last_os_error()),
        ));
    }

    Ok((stat.f_bfree as u64).saturating_mul(stat.f_frsize as u64))
}

/// Free bytes on the disk whose mount point is the longest prefix of `path`.
#[cfg(not(unix))]
pub fn free_disk_bytes(path: &Path) -> Result<u64, MonitorError> {
    use sysinfo::Disks;

    let path = path.canonicalize().map_err(|e| {
        MonitorError::unavailable("disk free", format!("{}: {e}", path.display()))
    })?;

    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
        .ok_or_else(|| {
            MonitorError::unavailable("disk free", format!("no disk mounted at {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_STAT: &str = "\
cpu  4705 356 584 3699176 23 23 0 12 0 0
cpu0 1393 280 255 924575 11 8 0 3 0 0
intr 1462898 0 0
ctxt 115315
procs_running 2
procs_blocked 0
";

    #[test]
    fn test_parse_cpu_ticks() {
        let ticks = parse_cpu_ticks(SAMPLE_STAT).unwrap();
        assert_eq!(ticks[TickType::User], 4705);
        assert_eq!(ticks[TickType::Nice], 356);
        assert_eq!(ticks[TickType::System], 584);
        assert_eq!(ticks[TickType::Idle], 3699176);
        assert_eq!(ticks[TickType::IoWait], 23);
        assert_eq!(ticks[TickType::Steal], 12);
    }

    #[test]
    fn test_parse_cpu_ticks_without_steal() {
        let ticks = parse_cpu_ticks("cpu 10 0 5 100 1 0 0\n").unwrap();
        assert_eq!(ticks[TickType::Steal], 0);
        assert_eq!(ticks.total(), 116);
    }

    #[test]
    fn test_parse_cpu_ticks_rejects_garbage() {
        assert!(parse_cpu_ticks("").is_err());
        assert!(parse_cpu_ticks("cpu 1 2 3\n").is_err());
        assert!(parse_cpu_ticks("cpu a b c d e f g h\n").is_err());
    }

    #[test]
    fn test_busy_idle_split() {
        let ticks = TickSnapshot::new([10, 5, 5, 70, 10, 0, 0, 0]);
        assert_eq!(ticks.total(), 100);
        assert_eq!(ticks.idle(), 80);
        assert_eq!(ticks.busy(), 20);
        assert!((ticks.busy_ratio() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delta_saturates() {
        let before = TickSnapshot::from_busy_idle(500, 1000);
        let after = TickSnapshot::from_busy_idle(400, 1500);
        let delta = before.delta(&after);
        assert_eq!(delta.busy(), 0);
        assert_eq!(delta.idle(), 500);
    }

    #[test]
    fn test_empty_delta_is_nan() {
        let snap = TickSnapshot::from_busy_idle(100, 100);
        assert!(snap.delta(&snap).busy_ratio().is_nan());
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.35 0.28 0.22 1/234 5678\n").unwrap();
        assert!((load - 0.35).abs() < f64::EPSILON);
        assert!(parse_loadavg("").is_err());
        assert!(parse_loadavg("nan 0 0").is_err());
    }

    #[test]
    fn test_read_cpu_ticks_on_linux() {
        if Path::new(PROC_STAT).exists() {
            let ticks = read_cpu_ticks().unwrap();
            assert!(ticks.total() > 0);
        }
    }

    #[test]
    fn test_free_disk_bytes_current_dir() {
        // Any test host has a filesystem under the working directory.
        assert!(free_disk_bytes(Path::new(".")).is_ok());
    }
}
