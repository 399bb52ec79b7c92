//! Cooperative cancellation and progress tracking.
//!
//! Both are plain atomics behind `Arc`s so a caller on another thread can
//! watch or stop a running evaluation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Shared cancellation flag, checked between goals and between trial chunks
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Progress of one simulation run
#[derive(Debug, Clone)]
pub struct SimulationProgress {
    /// Completed trials counter
    completed: Arc<AtomicUsize>,
    /// Total trials
    total: Arc<AtomicUsize>,
    token: CancellationToken,
}

impl SimulationProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Progress that stops when `token` is cancelled
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            token,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Fraction done, 0.0 before a run starts
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed() as f64 / total as f64,
        }
    }

    pub fn add(&self, trials: usize) {
        self.completed.fetch_add(trials, Ordering::Relaxed);
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for SimulationProgress {
    fn default() -> Self {
        Self::new()
    }
}
