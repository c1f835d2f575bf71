//! # overload-rs
//!
//! Polls host resources and prints one line per sample with the overload
//! verdict.
//!
//! ## Usage
//!
//! ```bash
//! # Sample once per second until Ctrl+C
//! overload-rs
//!
//! # One-shot admission check (exit status 2 when overloaded)
//! overload-rs --once -l 16 -m 1
//!
//! # Verbose diagnostics on stderr
//! RUST_LOG=overload_rs=debug overload-rs -c 5
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use overload_rs::availability::MetricAvailability;
use overload_rs::config::Config;
use overload_rs::{HardwareSampler, SystemSampler, UsageEstimator};

/// Exit status of a one-shot check that found the host overloaded.
const EXIT_OVERLOADED: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    let mut probe_sampler = SystemSampler::new();
    let logical_cpus = probe_sampler.logical_cpus().unwrap_or(1);
    let thresholds = match config.thresholds(logical_cpus) {
        Ok(thresholds) => thresholds,
        Err(e) => {
            error!(error = %e, "refusing to start");
            return ExitCode::FAILURE;
        }
    };

    for warning in MetricAvailability::probe(&mut probe_sampler, &config.disk_path).get_warnings()
    {
        warn!("{warning}");
    }

    info!(
        max_cpu_load_average = thresholds.max_cpu_load_average(),
        reserved_memory_gb = thresholds.min_reserved_memory_gb(),
        disk_path = %config.disk_path.display(),
        "sampling host resources"
    );

    let running = Arc::new(AtomicBool::new(true));
    setup_signal_handler(running.clone());

    let mut estimator = UsageEstimator::system().with_disk_path(config.disk_path.clone());
    let interval = Duration::from_millis(config.interval_ms);
    let limit = config.sample_limit();

    let mut taken = 0u64;
    let mut last_overloaded = false;
    while running.load(Ordering::Relaxed) {
        let (metrics, verdict) = estimator.check_overload(&thresholds);
        last_overloaded = verdict.overloaded;

        println!(
            "[{}] {} | {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            metrics.summary(),
            if verdict.overloaded {
                format!("OVERLOADED ({})", verdict.reason)
            } else {
                "OK".to_string()
            },
        );

        taken += 1;
        if limit.is_some_and(|limit| taken >= limit) {
            break;
        }
        std::thread::sleep(interval);
    }

    if config.once && last_overloaded {
        ExitCode::from(EXIT_OVERLOADED)
    } else {
        ExitCode::SUCCESS
    }
}

/// Global flag for signal handler (must be static for signal safety).
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set up signal handlers for graceful shutdown.
fn setup_signal_handler(running: Arc<AtomicBool>) {
    // Spawn a thread to monitor the signal flag and propagate to running
    std::thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            if SIGNAL_RECEIVED.load(Ordering::Relaxed) {
                running.store(false, Ordering::Relaxed);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    });

    #[cfg(unix)]
    unsafe {
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

/// Signal handler that sets the signal flag (async-signal-safe).
#[cfg(unix)]
extern "C" fn signal_handler(_: i32) {
    SIGNAL_RECEIVED.store(true, Ordering::Relaxed);
}
