//! BLAST job queue: bounded submission channel, worker pool and stale job reaper.
//!
//! Shutdown: [`BlastQueue::shutdown`] stops the pool from taking new jobs; runs
//! already in flight continue until they finish. The runner bounds each run
//! with its own search timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};

use masterblast_core::Config;

use crate::context::TaskHandlerContext;

#[derive(Clone, Debug)]
pub struct BlastQueueConfig {
    pub max_workers: usize,
    /// Jobs that may wait for a worker before `submit` reports the queue full.
    pub capacity: usize,
    /// Zero disables the stale job reaper.
    pub stale_job_reap_interval: Duration,
    pub stale_job_grace_period_secs: i64,
}

impl Default for BlastQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            capacity: 256,
            stale_job_reap_interval: Duration::from_secs(300),
            stale_job_grace_period_secs: 3600,
        }
    }
}

impl BlastQueueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.queue.max_workers,
            capacity: config.queue.capacity,
            stale_job_reap_interval: Duration::from_secs(config.queue.stale_job_reap_interval_secs),
            stale_job_grace_period_secs: config.queue.stale_job_grace_period_secs,
        }
    }
}

#[derive(Clone)]
pub struct BlastQueue {
    job_tx: mpsc::Sender<i64>,
    shutdown_tx: mpsc::Sender<()>,
}

impl BlastQueue {
    pub fn new(config: BlastQueueConfig, context: Arc<dyn TaskHandlerContext>) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(config, context, job_rx, shutdown_rx).await;
        });

        Self {
            job_tx,
            shutdown_tx,
        }
    }

    /// A queue without workers. Every submission is refused, so callers fall
    /// back to running jobs inline.
    pub fn new_no_worker() -> Self {
        let (job_tx, job_rx) = mpsc::channel(1);
        drop(job_rx);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        drop(shutdown_rx);
        Self {
            job_tx,
            shutdown_tx,
        }
    }

    /// Hand a job to the worker pool without waiting.
    ///
    /// Fails when the queue is full or the pool has stopped; the error gives
    /// the job id back.
    #[tracing::instrument(skip(self))]
    pub fn submit(&self, job_id: i64) -> Result<(), TrySendError<i64>> {
        self.job_tx.try_send(job_id)?;
        tracing::info!(job_id = job_id, "BLAST job submitted to queue");
        Ok(())
    }

    async fn worker_pool(
        config: BlastQueueConfig,
        context: Arc<dyn TaskHandlerContext>,
        mut job_rx: mpsc::Receiver<i64>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            capacity = config.capacity,
            "BLAST worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

        let (reaper_shutdown_tx, mut reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if !config.stale_job_reap_interval.is_zero() {
            let ctx = context.clone();
            let reap_interval = config.stale_job_reap_interval;
            let grace_period = config.stale_job_grace_period_secs;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = ctx.reap_stale_jobs(grace_period).await {
                                tracing::error!(error = %e, "Stale job reaper failed");
                            }
                        }
                        _ = reaper_shutdown_rx.recv() => break,
                    }
                }
            });
        }

        loop {
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job_id = tokio::select! {
                _ = shutdown_rx.recv() => break,
                job = job_rx.recv() => match job {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            let ctx = context.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::process_job(job_id, ctx).await;
            });
        }

        tracing::info!("BLAST worker pool shutting down");
        let _ = reaper_shutdown_tx.send(()).await;
    }

    #[tracing::instrument(skip(context))]
    async fn process_job(job_id: i64, context: Arc<dyn TaskHandlerContext>) {
        match context.perform_blast_job(job_id).await {
            Ok(summary) if summary.discarded => {
                tracing::info!(job_id = job_id, "BLAST job discarded");
            }
            Ok(summary) => {
                tracing::info!(
                    job_id = job_id,
                    hits_created = summary.hits_created,
                    "BLAST job finished"
                );
            }
            Err(e) => {
                // Already stored on the job by the run itself.
                tracing::warn!(job_id = job_id, error = %e, "BLAST job finished with an error");
            }
        }
    }

    /// Stop taking jobs from the queue. Returns without waiting for running jobs.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating BLAST queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use masterblast_core::TaskError;
    use masterblast_services::BlastRunSummary;

    #[derive(Debug, PartialEq)]
    enum Event {
        Ran(i64),
        Reaped(i64),
    }

    struct RecordingContext {
        events: mpsc::UnboundedSender<Event>,
    }

    impl RecordingContext {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
            let (events, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { events }), rx)
        }
    }

    #[async_trait]
    impl TaskHandlerContext for RecordingContext {
        async fn perform_blast_job(&self, job_id: i64) -> Result<BlastRunSummary, TaskError> {
            let _ = self.events.send(Event::Ran(job_id));
            Ok(BlastRunSummary::default())
        }

        async fn reap_stale_jobs(&self, grace_period_secs: i64) -> Result<Vec<i64>> {
            let _ = self.events.send(Event::Reaped(grace_period_secs));
            Ok(Vec::new())
        }
    }

    fn config() -> BlastQueueConfig {
        BlastQueueConfig {
            max_workers: 2,
            capacity: 8,
            stale_job_reap_interval: Duration::ZERO,
            stale_job_grace_period_secs: 3600,
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .expect("context dropped")
    }

    #[tokio::test]
    async fn test_submitted_jobs_are_run() {
        let (ctx, mut events) = RecordingContext::new();
        let queue = BlastQueue::new(config(), ctx);

        queue.submit(1).unwrap();
        queue.submit(2).unwrap();

        let mut ran = vec![next_event(&mut events).await, next_event(&mut events).await];
        ran.sort_by_key(|e| match e {
            Event::Ran(id) => *id,
            _ => i64::MAX,
        });
        assert_eq!(ran, vec![Event::Ran(1), Event::Ran(2)]);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_reaper_runs_with_grace_period() {
        let (ctx, mut events) = RecordingContext::new();
        let queue = BlastQueue::new(
            BlastQueueConfig {
                stale_job_reap_interval: Duration::from_millis(20),
                stale_job_grace_period_secs: 42,
                ..config()
            },
            ctx,
        );

        assert_eq!(next_event(&mut events).await, Event::Reaped(42));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_queue_without_worker_refuses_jobs() {
        let queue = BlastQueue::new_no_worker();
        assert!(matches!(queue.submit(3), Err(TrySendError::Closed(3))));
    }

    #[tokio::test]
    async fn test_stopped_queue_refuses_jobs() {
        let (ctx, _events) = RecordingContext::new();
        let queue = BlastQueue::new(config(), ctx);
        queue.shutdown().await;

        let mut refused = false;
        for _ in 0..50 {
            if matches!(queue.submit(9), Err(TrySendError::Closed(9))) {
                refused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refused);
    }
}
