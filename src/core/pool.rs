//! Bounded pool for CPU-bound evaluator work.
//!
//! Jobs run on tokio's blocking threads so the async dispatcher never stalls.
//! Each job owns a semaphore permit until the closure returns, which keeps a
//! job abandoned by a timeout counted against the bound.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::error;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the pool. A panic inside the job is reported as
    /// [`EngineError::EvaluatorFailed`] carrying `name`.
    pub async fn run<F, T>(&self, name: &'static str, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::WorkerPool)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| {
            error!(job = name, error = %e, "worker job did not complete");
            EngineError::EvaluatorFailed {
                evaluator: name,
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_jobs_and_returns_their_output() {
        let pool = WorkerPool::new(2);
        let out = pool.run("sum", || (1..=10).sum::<u32>()).await.unwrap();
        assert_eq!(out, 55);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn panicking_job_is_a_named_failure() {
        let pool = WorkerPool::new(1);
        let err = pool
            .run("rule_guardrail", || -> u32 { panic!("tier table corrupted") })
            .await
            .unwrap_err();
        match err {
            EngineError::EvaluatorFailed { evaluator, .. } => assert_eq!(evaluator, "rule_guardrail"),
            other => panic!("unexpected error: {other}"),
        }
        // permit is released after the panic
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn zero_size_is_raised_to_one() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        assert!(pool.run("noop", || ()).await.is_ok());
    }
}
