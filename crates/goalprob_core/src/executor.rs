//! Bounded worker pool.
//!
//! With the `parallel` feature the pool wraps a rayon thread pool limited to
//! the configured worker count. Without it every map runs sequentially on the
//! caller's thread. Output order always matches input order, so results do
//! not depend on scheduling.

#[cfg(feature = "parallel")]
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::SimulationError;

#[derive(Clone)]
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
    workers: usize,
}

impl WorkerPool {
    /// Pool limited to `worker_limit` threads (all available cores when
    /// `None`)
    #[cfg(feature = "parallel")]
    pub fn new(worker_limit: Option<usize>) -> Result<Self, SimulationError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("goalprob-worker-{i}"));
        if let Some(limit) = worker_limit {
            builder = builder.num_threads(limit.max(1));
        }
        let pool = builder
            .build()
            .map_err(|e| SimulationError::WorkerPool(e.to_string()))?;
        let workers = pool.current_num_threads();
        tracing::debug!(workers, "Worker pool started");
        Ok(Self {
            pool: Some(Arc::new(pool)),
            workers,
        })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn new(_worker_limit: Option<usize>) -> Result<Self, SimulationError> {
        Ok(Self::sequential())
    }

    /// Pool that runs everything on the caller's thread
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            #[cfg(feature = "parallel")]
            pool: None,
            workers: 1,
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item, returning outputs in input order
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return pool.install(|| items.into_par_iter().map(f).collect());
        }

        items.into_iter().map(f).collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}
