//! # overload-rs
//!
//! Samples host-level resource metrics and derives a boolean overload
//! signal for gating admission of new work.
//!
//! ## Overview
//!
//! A long-lived process polls cheap local counters through a
//! [`HardwareSampler`], turns them into [`ResourceMetrics`] with a
//! [`UsageEstimator`], and asks [`policy::evaluate`] whether the host is
//! overloaded:
//!
//! - **CPU usage**: busy share of the CPU tick delta, recomputed at most
//!   once per [`CPU_WINDOW_MILLIS`] and cached in between
//! - **Load average**: the platform's 1-minute figure, or a clearly tagged
//!   processor-derived estimate when the platform has none
//! - **Memory**: usage percentage and available GB
//! - **Disk**: unallocated GB on a configurable volume
//!
//! Every figure is rounded to two decimals (round-half-up) or is exactly
//! [`metrics::UNAVAILABLE`] (`-1.0`). A missing counter degrades only its
//! own field.
//!
//! ## Example
//!
//! ```no_run
//! use overload_rs::{OverloadThresholds, UsageEstimator};
//!
//! let thresholds = OverloadThresholds::new(8.0, 0.3).expect("valid thresholds");
//! let mut estimator = UsageEstimator::system();
//! let (metrics, verdict) = estimator.check_overload(&thresholds);
//! println!("{} -> {}", metrics.summary(), verdict.reason);
//! ```
//!
//! ## Module Organization
//!
//! - [`collectors`]: Raw reads of `/proc` files and `statvfs`
//! - [`sampler`]: The [`HardwareSampler`] boundary and the host-backed sampler
//! - [`estimator`]: CPU window state and metric assembly
//! - [`metrics`]: The [`ResourceMetrics`] value and rounding helpers
//! - [`thresholds`]: Validated [`OverloadThresholds`]
//! - [`policy`]: The overload decision
//! - [`availability`]: Startup probe of which counters exist
//! - [`fake`]: Scriptable sampler and clock for tests
//! - [`config`]: CLI configuration for the `overload-rs` binary

pub mod availability;
pub mod collectors;
pub mod config;
pub mod error;
pub mod estimator;
pub mod fake;
pub mod metrics;
pub mod policy;
pub mod sampler;
pub mod thresholds;

pub use collectors::{TickSnapshot, TickType};
pub use error::MonitorError;
pub use estimator::{
    Clock, MonotonicClock, SampleWindow, SharedEstimator, UsageEstimator, CPU_WINDOW_MILLIS,
};
pub use metrics::{LoadSource, ResourceMetrics};
pub use policy::{OverloadReason, OverloadVerdict};
pub use sampler::{HardwareSampler, SystemSampler};
pub use thresholds::OverloadThresholds;
