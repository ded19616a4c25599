//! Bounded pool of tokio tasks shared by polling loops and group dispatches.
//!
//! The pool has `capacity` slots and no backlog. A task holds its slot until
//! it finishes, so at most `capacity` tasks run at once. Callers choose how to
//! react to a full pool: [`WorkerPool::try_submit`] rejects immediately,
//! [`WorkerPool::submit`] waits for a slot. [`WorkerPool::acquire`] reserves a
//! slot without running anything yet, so the caller can still decide to give
//! it back.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::error;

use crate::errors::WorkerPoolError;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: Arc<str>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(name: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        WorkerPool {
            name: Arc::from(name),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_shutdown(&self) -> bool {
        self.permits.is_closed()
    }

    /// Runs `task` if a slot is free, otherwise rejects it.
    pub fn try_submit<F, E>(&self, task: F) -> Result<JoinHandle<()>, WorkerPoolError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|err| match err {
                TryAcquireError::NoPermits => WorkerPoolError::Exhausted {
                    pool: self.name.to_string(),
                    capacity: self.capacity,
                },
                TryAcquireError::Closed => WorkerPoolError::Shutdown {
                    pool: self.name.to_string(),
                },
            })?;

        Ok(self.slot(permit).spawn(task))
    }

    /// Runs `task` once a slot is free.
    pub async fn submit<F, E>(&self, task: F) -> Result<JoinHandle<()>, WorkerPoolError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        Ok(self.acquire().await?.spawn(task))
    }

    /// Waits for a free slot and reserves it. Dropping the slot unused
    /// returns it to the pool.
    pub async fn acquire(&self) -> Result<WorkerSlot, WorkerPoolError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerPoolError::Shutdown {
                pool: self.name.to_string(),
            })?;

        Ok(self.slot(permit))
    }

    /// Rejects all further submissions. Running tasks keep their slots and
    /// finish normally.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    fn slot(&self, permit: OwnedSemaphorePermit) -> WorkerSlot {
        WorkerSlot {
            pool: self.name.clone(),
            permit,
        }
    }
}

/// A reserved slot of a [`WorkerPool`].
#[derive(Debug)]
pub struct WorkerSlot {
    pool: Arc<str>,
    permit: OwnedSemaphorePermit,
}

impl WorkerSlot {
    /// Runs `task` in this slot. The slot is released when the task ends.
    pub fn spawn<F, E>(self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let WorkerSlot { pool, permit } = self;
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(err) = task.await {
                error!(pool = %pool, error = %err, "Worker task failed");
            }
        })
    }
}
