//! Progress reporting and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. May be called from any thread at any time.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monotonic unit-of-work counter driven by the processor.
pub trait ProgressMonitor {
    /// Start a task made of `total_units` units of work.
    fn begin_task(&mut self, task: &str, total_units: usize);

    /// Report `units` more units as done.
    fn worked(&mut self, units: usize);

    /// The task is finished, successfully or not.
    fn done(&mut self);

    /// Whether the caller asked to stop. Checked once per tile.
    fn is_canceled(&self) -> bool;
}

/// Progress monitor that records nothing but still honours a cancel token.
#[derive(Debug, Clone, Default)]
pub struct NullProgressMonitor {
    cancel: CancelToken,
}

impl NullProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl ProgressMonitor for NullProgressMonitor {
    fn begin_task(&mut self, _task: &str, _total_units: usize) {}

    fn worked(&mut self, _units: usize) {}

    fn done(&mut self) {}

    fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}

/// Progress monitor that keeps counters, useful for reporting and tests.
#[derive(Debug, Clone, Default)]
pub struct CountingProgressMonitor {
    pub task: String,
    pub total_units: usize,
    pub worked_units: usize,
    pub finished: bool,
    cancel: CancelToken,
}

impl CountingProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    /// Fraction of the task done in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            return if self.finished { 1.0 } else { 0.0 };
        }
        (self.worked_units as f64 / self.total_units as f64).min(1.0)
    }
}

impl ProgressMonitor for CountingProgressMonitor {
    fn begin_task(&mut self, task: &str, total_units: usize) {
        self.task = task.to_string();
        self.total_units = total_units;
        self.worked_units = 0;
        self.finished = false;
    }

    fn worked(&mut self, units: usize) {
        self.worked_units += units;
    }

    fn done(&mut self) {
        self.finished = true;
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let pm = NullProgressMonitor::with_cancel_token(token.clone());
        assert!(!pm.is_canceled());
        token.cancel();
        assert!(pm.is_canceled());
    }

    #[test]
    fn counting_monitor_tracks_units() {
        let mut pm = CountingProgressMonitor::new();
        pm.begin_task("sweep", 4);
        pm.worked(1);
        pm.worked(1);
        assert_eq!(pm.worked_units, 2);
        assert!((pm.fraction() - 0.5).abs() < 1e-12);
        pm.done();
        assert!(pm.finished);
    }
}
