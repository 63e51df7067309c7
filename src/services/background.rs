use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, mpsc::error::TrySendError, Notify, Semaphore};

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Message for a detached background job
struct JobMessage {
    label: &'static str,
    job: BoxedJob,
}

/// Queued jobs allowed when the caller does not choose
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Pool for fire-and-forget work (cache write-back, detail prefetch, telemetry)
///
/// Jobs are handed to a dispatcher task over a bounded channel so `spawn` never blocks the
/// caller; when the queue is full the job is dropped with a warning. The dispatcher runs at
/// most `max_concurrency` jobs at once. Jobs must do their own error logging; nothing is
/// reported back to the request that scheduled them.
#[derive(Clone)]
pub struct BackgroundTasks {
    job_tx: mpsc::Sender<JobMessage>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

/// Handle for gracefully shutting down the background pool
pub struct BackgroundTasksHandle {
    shutdown_tx: mpsc::Sender<()>,
    dispatcher: tokio::task::JoinHandle<()>,
}

impl BackgroundTasksHandle {
    /// Stops accepting jobs and waits for queued and running jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Background task shutdown signal sent");
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "Background dispatcher terminated abnormally");
        }
    }
}

/// Decrements the pending counter when a job finishes, even if it panicked
struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    /// Creates the pool with the default queue capacity and spawns its dispatcher task
    pub fn new(max_concurrency: usize) -> (Self, BackgroundTasksHandle) {
        Self::with_capacity(max_concurrency, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        max_concurrency: usize,
        queue_capacity: usize,
    ) -> (Self, BackgroundTasksHandle) {
        let (job_tx, job_rx) = mpsc::channel(queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let dispatcher = tokio::spawn(Self::dispatcher_task(
            job_rx,
            shutdown_rx,
            permits,
            max_concurrency.max(1),
            pending.clone(),
            idle.clone(),
        ));

        (
            Self {
                job_tx,
                pending,
                idle,
            },
            BackgroundTasksHandle {
                shutdown_tx,
                dispatcher,
            },
        )
    }

    async fn dispatcher_task(
        mut job_rx: mpsc::Receiver<JobMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
        permits: Arc<Semaphore>,
        max_concurrency: usize,
        pending: Arc<AtomicUsize>,
        idle: Arc<Notify>,
    ) {
        tracing::info!(max_concurrency, "Background task dispatcher started");

        // A dropped handle only disables the shutdown branch; jobs keep running until every
        // sender is gone

        loop {
            tokio::select! {
                Some(msg) = job_rx.recv() => {
                    Self::run_job(msg, &permits, &pending, &idle).await;
                }
                Some(()) = shutdown_rx.recv() => {
                    job_rx.close();
                    tracing::info!(
                        pending = pending.load(Ordering::SeqCst),
                        "Background dispatcher shutting down, draining queued jobs"
                    );

                    while let Some(msg) = job_rx.recv().await {
                        Self::run_job(msg, &permits, &pending, &idle).await;
                    }

                    // Every permit back means every running job has finished
                    if let Ok(all) = permits.acquire_many(max_concurrency as u32).await {
                        drop(all);
                    }

                    tracing::info!("Background dispatcher stopped");
                    break;
                }
                else => break,
            }
        }
    }

    async fn run_job(
        msg: JobMessage,
        permits: &Arc<Semaphore>,
        pending: &Arc<AtomicUsize>,
        idle: &Arc<Notify>,
    ) {
        let guard = PendingGuard {
            pending: pending.clone(),
            idle: idle.clone(),
        };

        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, job = msg.label, "Background pool closed, dropping job");
                return;
            }
        };

        let label = msg.label;
        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            tracing::debug!(job = label, "Background job started");
            msg.job.await;
        });
    }

    /// Schedules a detached job, returning false if it was dropped
    pub fn spawn<F>(&self, label: &'static str, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let msg = JobMessage {
            label,
            job: Box::pin(job),
        };

        let Err(e) = self.job_tx.try_send(msg) else {
            return true;
        };

        // The dropped message never runs, so release its slot here
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
        match e {
            TrySendError::Full(_) => {
                tracing::warn!(job = label, "Background queue full, dropping job")
            }
            TrySendError::Closed(_) => {
                tracing::error!(job = label, "Background pool stopped, dropping job")
            }
        }
        false
    }

    /// Number of scheduled jobs that have not finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Waits until every scheduled job, including ones scheduled meanwhile, has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}
