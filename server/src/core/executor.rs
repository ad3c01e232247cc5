//! Bounded background task executor
//!
//! A fixed set of core workers drains a bounded queue. When the queue is full
//! the pool grows up to `max_pool_size`; surplus workers retire after sitting
//! idle for `keep_alive`. Task failures and panics are logged and never reach
//! the submitter.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::constants::{
    DEFAULT_EXECUTOR_CORE_POOL_SIZE, DEFAULT_EXECUTOR_KEEP_ALIVE_SECS,
    DEFAULT_EXECUTOR_MAX_POOL_SIZE, DEFAULT_EXECUTOR_QUEUE_CAPACITY, EXECUTOR_THREAD_PREFIX,
    SHUTDOWN_TIMEOUT_SECS,
};

pub type Task = BoxFuture<'static, anyhow::Result<()>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Executor queue is full and all {0} workers are busy")]
    Rejected(usize),

    #[error("Executor is shut down")]
    Shutdown,

    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),
}

/// Pool sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub core_pool_size: usize,
    pub max_pool_size: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
    pub thread_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            core_pool_size: DEFAULT_EXECUTOR_CORE_POOL_SIZE,
            max_pool_size: DEFAULT_EXECUTOR_MAX_POOL_SIZE,
            queue_capacity: DEFAULT_EXECUTOR_QUEUE_CAPACITY,
            keep_alive: Duration::from_secs(DEFAULT_EXECUTOR_KEEP_ALIVE_SECS),
            thread_prefix: EXECUTOR_THREAD_PREFIX.to_string(),
        }
    }
}

impl ExecutorConfig {
    fn validate(&self) -> Result<(), ExecutorError> {
        if self.core_pool_size == 0 {
            return Err(ExecutorError::InvalidConfig(
                "core_pool_size must be at least 1".to_string(),
            ));
        }
        if self.core_pool_size > self.max_pool_size {
            return Err(ExecutorError::InvalidConfig(format!(
                "core_pool_size ({}) exceeds max_pool_size ({})",
                self.core_pool_size, self.max_pool_size
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ExecutorError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

struct Inner {
    config: ExecutorConfig,
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Task>>,
    workers: AtomicUsize,
    next_id: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle to a shared worker pool
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

impl TaskExecutor {
    /// Start the core workers. Must be called inside a tokio runtime.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let core = config.core_pool_size;

        let executor = Self {
            inner: Arc::new(Inner {
                config,
                sender: Mutex::new(Some(tx)),
                receiver: tokio::sync::Mutex::new(rx),
                workers: AtomicUsize::new(core),
                next_id: AtomicUsize::new(1),
                handles: Mutex::new(Vec::new()),
            }),
        };
        for _ in 0..core {
            executor.spawn_worker(None, true);
        }

        tracing::debug!(
            core = executor.inner.config.core_pool_size,
            max = executor.inner.config.max_pool_size,
            queue = executor.inner.config.queue_capacity,
            "Task executor started"
        );
        Ok(executor)
    }

    /// Queue a task, growing the pool if the queue is full
    pub fn execute(&self, task: Task) -> Result<(), ExecutorError> {
        let result = {
            let guard = lock(&self.inner.sender);
            match guard.as_ref() {
                Some(sender) => sender.try_send(task),
                None => return Err(ExecutorError::Shutdown),
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(ExecutorError::Shutdown),
            Err(TrySendError::Full(task)) => {
                let max = self.inner.config.max_pool_size;
                let grown = self
                    .inner
                    .workers
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < max).then_some(n + 1)
                    })
                    .is_ok();
                if grown {
                    self.spawn_worker(Some(task), false);
                    Ok(())
                } else {
                    tracing::warn!(workers = max, "Task rejected, executor saturated");
                    Err(ExecutorError::Rejected(max))
                }
            }
        }
    }

    /// Convenience wrapper boxing a future
    pub fn submit<F>(&self, future: F) -> Result<(), ExecutorError>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.execute(Box::pin(future))
    }

    /// Live workers, core and surplus
    pub fn worker_count(&self) -> usize {
        self.inner.workers.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        lock(&self.inner.sender).is_none()
    }

    /// Stop accepting tasks and wait for queued ones to finish
    pub async fn shutdown(&self) {
        let sender = lock(&self.inner.sender).take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let handles = std::mem::take(&mut *lock(&self.inner.handles));
        tracing::debug!(count = handles.len(), "Waiting for executor workers to drain");

        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(_) => tracing::debug!("Task executor stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for executor workers"
            ),
        }
    }

    fn spawn_worker(&self, first: Option<Task>, core: bool) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}-{}", self.inner.config.thread_prefix, id);
        let span = tracing::debug_span!("worker", name = %name);
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(worker_loop(inner, first, core).instrument(span));
        let mut handles = lock(&self.inner.handles);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

async fn worker_loop(inner: Arc<Inner>, first: Option<Task>, core: bool) {
    if let Some(task) = first {
        run_task(task).await;
    }

    loop {
        let next = async { inner.receiver.lock().await.recv().await };
        let task = if core {
            next.await
        } else {
            match tokio::time::timeout(inner.config.keep_alive, next).await {
                Ok(task) => task,
                Err(_) => {
                    tracing::trace!("Idle surplus worker retiring");
                    break;
                }
            }
        };

        match task {
            Some(task) => run_task(task).await,
            None => break,
        }
    }

    inner.workers.fetch_sub(1, Ordering::SeqCst);
}

async fn run_task(task: Task) {
    match AssertUnwindSafe(task).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %format!("{:#}", e), "Background task failed"),
        Err(panic) => tracing::error!(panic = %panic_message(&*panic), "Background task panicked"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
