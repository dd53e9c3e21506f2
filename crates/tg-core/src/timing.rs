//! Lightweight timing utilities for graph execution phases.
//!
//! Timing is off by default. Enable it programmatically or by setting the
//! `TG_TIMING` environment variable.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turn timing on for the whole process.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// True when enabled programmatically or through `TG_TIMING`.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("TG_TIMING").is_ok()
}

/// Wall-clock stopwatch for one labelled phase.
///
/// Reads the global switch when started, so a timer started while timing is
/// off always stops with `None`.
pub struct Timer {
    label: &'static str,
    started: Option<Instant>,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: is_enabled().then(Instant::now),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed seconds, or `None` when timing was off at start.
    pub fn stop(self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }
}

/// Running total of many short measurements, shareable across threads.
#[derive(Default)]
pub struct AccumulatingTimer {
    nanos: AtomicU64,
    samples: AtomicU64,
}

impl std::fmt::Debug for AccumulatingTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccumulatingTimer")
            .field("samples", &self.count())
            .field("total_seconds", &self.total_seconds())
            .finish()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        }
    }

    pub fn record(&self, seconds: f64) {
        let elapsed = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    pub fn total_seconds(&self) -> f64 {
        self.total().as_secs_f64()
    }

    pub fn count(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Mean seconds per sample; zero before the first sample.
    pub fn average_seconds(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.total_seconds() / n as f64,
        }
    }

    pub fn reset(&self) {
        self.nanos.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
    }
}

/// Wall time spent in each processor phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    pub wire_s: f64,
    pub initialize_s: f64,
    pub sweep_s: f64,
    pub teardown_s: f64,
}

impl PhaseTimings {
    pub fn total_s(&self) -> f64 {
        self.wire_s + self.initialize_s + self.sweep_s + self.teardown_s
    }

    /// Formatted multi-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Wire:        {:.3}s\nInitialize:  {:.3}s\nTile sweep:  {:.3}s\nTeardown:    {:.3}s\nTotal:       {:.3}s",
            self.wire_s,
            self.initialize_s,
            self.sweep_s,
            self.teardown_s,
            self.total_s()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_average() {
        let timer = AccumulatingTimer::new();
        timer.record(0.5);
        timer.record(1.5);
        assert_eq!(timer.count(), 2);
        assert!((timer.average_seconds() - 1.0).abs() < 1e-6);
        timer.reset();
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average_seconds(), 0.0);
    }

    #[test]
    fn timer_reports_when_enabled() {
        enable_timing();
        let t = Timer::start("phase");
        assert_eq!(t.label(), "phase");
        assert!(t.stop().is_some());
    }

    #[test]
    fn phase_summary_lists_phases() {
        let timings = PhaseTimings {
            wire_s: 0.1,
            initialize_s: 0.2,
            sweep_s: 1.0,
            teardown_s: 0.0,
        };
        assert!((timings.total_s() - 1.3).abs() < 1e-12);
        assert!(timings.summary().contains("Tile sweep"));
    }
}
