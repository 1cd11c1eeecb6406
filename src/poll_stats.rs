//! Poll loop statistics for the health endpoint.
//!
//! Tracks how long poll cycles take, how many containers they cover and how
//! often containers or device lookups fail.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::Instant;

use chrono::{DateTime, Local};

/// Running statistics for a single sampled value.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Counters and samples describing the poll loop.
pub struct PollStats {
    pub cycle_duration_seconds: Stat,
    pub containers_per_cycle: Stat,
    pub cached_devices: Stat,

    pub cycles_total: AtomicU64,
    pub cycle_failures: AtomicU64,
    pub container_failures: AtomicU64,
    pub extraction_errors: AtomicU64,
    pub device_lookup_failures: AtomicU64,
    pub device_cache_clears: AtomicU64,
    pub metrics_requests: AtomicU64,

    pub start_time: Instant,
    pub last_success: StdRwLock<Option<DateTime<Local>>>,
}

impl Default for PollStats {
    fn default() -> Self {
        Self {
            cycle_duration_seconds: Stat::default(),
            containers_per_cycle: Stat::default(),
            cached_devices: Stat::default(),
            cycles_total: AtomicU64::new(0),
            cycle_failures: AtomicU64::new(0),
            container_failures: AtomicU64::new(0),
            extraction_errors: AtomicU64::new(0),
            device_lookup_failures: AtomicU64::new(0),
            device_cache_clears: AtomicU64::new(0),
            metrics_requests: AtomicU64::new(0),
            start_time: Instant::now(),
            last_success: StdRwLock::new(None),
        }
    }
}

impl PollStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a cycle that reached the container runtime.
    pub fn record_cycle(&self, containers: u64, duration_seconds: f64, cached_devices: u64) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.containers_per_cycle.add_sample(containers as f64);
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.cached_devices.add_sample(cached_devices as f64);
        if let Ok(mut guard) = self.last_success.write() {
            *guard = Some(Local::now());
        }
    }

    /// Records a cycle that could not list containers at all.
    pub fn record_cycle_failure(&self) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_container_failure(&self) {
        self.container_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction_errors(&self, count: u64) {
        self.extraction_errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_device_lookup_failure(&self) {
        self.device_lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_device_cache_clear(&self) {
        self.device_cache_clears.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_metrics_request(&self) {
        self.metrics_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn has_succeeded(&self) -> bool {
        self.last_success.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_success_str(&self) -> String {
        match self.last_success.read() {
            Ok(guard) => guard
                .as_ref()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn get_cycle_success_rate(&self) -> f64 {
        let total = self.cycles_total.load(Ordering::Relaxed);
        let failures = self.cycle_failures.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            (total.saturating_sub(failures) as f64 / total as f64) * 100.0
        }
    }

    pub fn render_table(&self) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();
        let (cc_cur, cc_avg, cc_max, cc_min, _) = self.containers_per_cycle.snapshot();
        let (dv_cur, dv_avg, dv_max, dv_min, _) = self.cached_devices.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - POLL STATISTICS").ok();
        writeln!(out, "=================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(out, "{}", "-".repeat(left_col + 4 * (col_w + 3))).ok();

        for (label, cur, avg, max, min, precision) in [
            ("cycle duration (s)", cd_cur, cd_avg, cd_max, cd_min, 3usize),
            ("containers per cycle", cc_cur, cc_avg, cc_max, cc_min, 0),
            ("cached devices", dv_cur, dv_avg, dv_max, dv_min, 0),
        ] {
            writeln!(
                out,
                "{:left$} | {:>col$.p$} | {:>col$.p$} | {:>col$.p$} | {:>col$.p$}",
                label,
                cur,
                avg,
                max,
                min,
                left = left_col,
                col = col_w,
                p = precision
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        for (label, value) in [
            ("poll cycles", self.cycles_total.load(Ordering::Relaxed)),
            ("failed cycles", self.cycle_failures.load(Ordering::Relaxed)),
            ("failed containers", self.container_failures.load(Ordering::Relaxed)),
            ("extraction errors", self.extraction_errors.load(Ordering::Relaxed)),
            ("device lookup failures", self.device_lookup_failures.load(Ordering::Relaxed)),
            ("device cache clears", self.device_cache_clears.load(Ordering::Relaxed)),
            ("/metrics requests", self.metrics_requests.load(Ordering::Relaxed)),
        ] {
            writeln!(out, "{:left$} | {:>col$}", label, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:>col$.1}%",
            "cycle success rate",
            self.get_cycle_success_rate(),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {}",
            "last successful poll",
            self.get_last_success_str(),
            left = left_col
        )
        .ok();

        out
    }
}
