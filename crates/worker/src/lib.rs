//! Background task queue for non-blocking write-backs
//!
//! A fixed number of workers consume named async tasks from a bounded
//! FIFO. User requests never block on this queue: `add_task` is
//! non-blocking and a full queue drops the task with a counter bump.
//!
//! Ordering is FIFO globally, but tasks for the same document may still
//! be reordered across workers; callers must treat writes as
//! last-writer-wins and write complete payloads, not deltas.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};

use thiserror::Error;

/// Worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Queue full, task dropped: {0}")]
    QueueFull(String),

    #[error("Queue closed")]
    Closed,
}

impl From<WorkerError> for tour_agent_core::Error {
    fn from(err: WorkerError) -> Self {
        tour_agent_core::Error::Internal(err.to_string())
    }
}

/// A deferred unit of work
pub struct BackgroundTask {
    pub name: String,
    pub fut: BoxFuture<'static, Result<(), tour_agent_core::Error>>,
}

impl BackgroundTask {
    pub fn new(
        name: impl Into<String>,
        fut: impl std::future::Future<Output = Result<(), tour_agent_core::Error>> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            fut: Box::pin(fut),
        }
    }
}

#[derive(Default)]
struct QueueStats {
    queued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    total_processing_ms: AtomicU64,
}

/// Stats snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskQueueStats {
    pub tasks_queued: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_dropped: u64,
    pub queue_size: usize,
    pub workers: usize,
    pub running: bool,
    pub avg_processing_ms: u64,
}

/// Fixed-size background worker pool over a bounded FIFO
pub struct TaskQueue {
    tx: mpsc::Sender<BackgroundTask>,
    rx: Arc<Mutex<mpsc::Receiver<BackgroundTask>>>,
    stop_tx: watch::Sender<bool>,
    workers: usize,
    started: once::OnceFlag,
    stats: Arc<QueueStats>,
}

// Minimal once-flag; avoids pulling a dependency for one bool.
mod once {
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct OnceFlag(AtomicBool);

    impl OnceFlag {
        /// Returns true exactly once
        pub fn set(&self) -> bool {
            !self.0.swap(true, Ordering::SeqCst)
        }

        pub fn is_set(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }
}

impl TaskQueue {
    pub fn new(workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, _) = watch::channel(false);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            stop_tx,
            workers: workers.max(1),
            started: once::OnceFlag::default(),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Spawn the worker loops. Safe to call once; later calls no-op.
    pub fn start(&self) {
        if !self.started.set() {
            tracing::warn!("worker pool already running");
            return;
        }

        for worker_id in 0..self.workers {
            let rx = Arc::clone(&self.rx);
            let stats = Arc::clone(&self.stats);
            let mut stop_rx = self.stop_tx.subscribe();

            tokio::spawn(async move {
                tracing::info!(worker_id, "background worker started");
                loop {
                    let task = {
                        let mut guard = rx.lock().await;
                        tokio::select! {
                            task = guard.recv() => task,
                            _ = stop_rx.changed() => None,
                        }
                    };

                    let Some(task) = task else {
                        break;
                    };

                    let started_at = Instant::now();
                    tracing::info!(worker_id, task = %task.name, "executing background task");

                    match task.fut.await {
                        Ok(()) => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                            stats
                                .total_processing_ms
                                .fetch_add(started_at.elapsed().as_millis() as u64, Ordering::Relaxed);
                            tracing::info!(
                                worker_id,
                                task = %task.name,
                                elapsed_ms = started_at.elapsed().as_millis() as u64,
                                "background task completed"
                            );
                        }
                        Err(err) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(worker_id, task = %task.name, %err, "background task failed");
                        }
                    }
                }
                tracing::info!(worker_id, "background worker stopped");
            });
        }

        tracing::info!(workers = self.workers, "background worker pool running");
    }

    /// Enqueue without blocking. Full queue drops the task.
    pub fn add_task(&self, task: BackgroundTask) -> Result<(), WorkerError> {
        let name = task.name.clone();
        match self.tx.try_send(task) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(task = %name, "queued background task");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(task = %name, "background queue full, task dropped");
                Err(WorkerError::QueueFull(name))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WorkerError::Closed),
        }
    }

    /// Signal workers to finish the task in hand and exit.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        tracing::info!("stopping background workers");
    }

    pub fn queue_size(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn stats(&self) -> TaskQueueStats {
        let completed = self.stats.completed.load(Ordering::Relaxed);
        let total_ms = self.stats.total_processing_ms.load(Ordering::Relaxed);
        TaskQueueStats {
            tasks_queued: self.stats.queued.load(Ordering::Relaxed),
            tasks_completed: completed,
            tasks_failed: self.stats.failed.load(Ordering::Relaxed),
            tasks_dropped: self.stats.dropped.load(Ordering::Relaxed),
            queue_size: self.queue_size(),
            workers: self.workers,
            running: self.started.is_set() && !*self.stop_tx.borrow(),
            avg_processing_ms: if completed > 0 { total_ms / completed } else { 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tasks_run_fifo_and_stats() {
        let queue = TaskQueue::new(1, 16);
        queue.start();

        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..3 {
            let counter = Arc::clone(&counter);
            queue
                .add_task(BackgroundTask::new(format!("task-{i}"), async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let stats = queue.stats();
        assert_eq!(stats.tasks_queued, 3);
        assert_eq!(stats.tasks_completed, 3);
        assert_eq!(stats.tasks_failed, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_workers() {
        let queue = TaskQueue::new(2, 16);
        queue.start();

        queue
            .add_task(BackgroundTask::new("failing", async {
                Err(tour_agent_core::Error::Internal("boom".into()))
            }))
            .unwrap();

        let done = Arc::new(AtomicUsize::new(0));
        let done_clone = Arc::clone(&done);
        queue
            .add_task(BackgroundTask::new("after-failure", async move {
                done_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(queue.stats().tasks_failed, 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        // not started: nothing drains the queue
        let queue = TaskQueue::new(1, 1);
        queue
            .add_task(BackgroundTask::new("first", async { Ok(()) }))
            .unwrap();
        let err = queue.add_task(BackgroundTask::new("second", async { Ok(()) }));
        assert!(matches!(err, Err(WorkerError::QueueFull(_))));
        assert_eq!(queue.stats().tasks_dropped, 1);
    }

    #[tokio::test]
    async fn test_stop_exits_workers() {
        let queue = TaskQueue::new(1, 4);
        queue.start();
        queue.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!queue.stats().running);
    }
}
