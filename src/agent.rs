//! Worker pool that pulls tasks from a [`TaskSource`], waits the simulated
//! cost, computes the operation and reports the result back.
//!
//! A worker that fails to compute (division by zero) or whose submission is
//! rejected logs the problem and moves on. The task it held stays running;
//! there is no lease or requeue.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::core::errors::Result;
use crate::tasks::{Claim, Settings, TaskAssignment, TaskId};

/// Where workers get their work from and report it to
#[async_trait]
pub trait TaskSource: Send + Sync + 'static {
    /// Claim the next ready task, if any
    async fn claim(&self) -> Result<Claim>;

    /// Report the result of a claimed task
    async fn submit(&self, task_id: TaskId, value: f64) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct WorkerConfig {
    poll_interval: Duration,
    poll_jitter: f64,
    simulate_latency: bool,
}

/// Counts of what one or all workers did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentReport {
    pub completed: usize,
    pub compute_failures: usize,
    pub rejected: usize,
}

impl AgentReport {
    fn merge(mut self, other: AgentReport) -> Self {
        self.completed += other.completed;
        self.compute_failures += other.compute_failures;
        self.rejected += other.rejected;
        self
    }
}

pub struct Agent {
    source: Arc<dyn TaskSource>,
    workers: usize,
    config: WorkerConfig,
}

impl Agent {
    pub fn new(source: Arc<dyn TaskSource>, settings: &Settings) -> Self {
        Self {
            source,
            workers: settings.computing_power.max(1),
            config: WorkerConfig {
                poll_interval: settings.poll_interval(),
                poll_jitter: settings.poll_jitter,
                simulate_latency: settings.simulate_latency,
            },
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all workers until `shutdown` flips to true or its sender is
    /// dropped
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> AgentReport {
        info!(workers = self.workers, "Starting agent");

        let handles: Vec<JoinHandle<AgentReport>> = (0..self.workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    self.source.clone(),
                    self.config,
                    shutdown.clone(),
                ))
            })
            .collect();

        let report = join_all(handles)
            .await
            .into_iter()
            .fold(AgentReport::default(), |acc, joined| match joined {
                Ok(report) => acc.merge(report),
                Err(e) => {
                    error!(error = %e, "Worker panicked");
                    acc
                }
            });

        info!(?report, "Agent stopped");
        report
    }

    /// Run the agent in the background
    pub fn start(self) -> AgentHandle {
        let (shutdown, rx) = watch::channel(false);
        AgentHandle {
            shutdown,
            task: tokio::spawn(self.run(rx)),
        }
    }
}

/// Handle to an agent running in the background
pub struct AgentHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<AgentReport>,
}

impl AgentHandle {
    /// Signal every worker to stop and wait for them
    pub async fn shutdown(self) -> AgentReport {
        let _ = self.shutdown.send(true);
        self.task.await.unwrap_or_else(|e| {
            error!(error = %e, "Agent task failed");
            AgentReport::default()
        })
    }
}

async fn worker_loop(
    worker_id: usize,
    source: Arc<dyn TaskSource>,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> AgentReport {
    let mut report = AgentReport::default();

    while !*shutdown.borrow() {
        match source.claim().await {
            Ok(Claim::Assigned(task)) => {
                if config.simulate_latency
                    && !task.cost.is_zero()
                    && wait_or_shutdown(task.cost, &mut shutdown).await
                {
                    warn!(worker_id, task_id = %task.id, "Shutdown while task in flight");
                    break;
                }
                process(worker_id, source.as_ref(), &task, &mut report).await;
            }
            Ok(Claim::NoTaskAvailable) => {
                if wait_or_shutdown(backoff(&config), &mut shutdown).await {
                    break;
                }
            }
            Err(e) => {
                warn!(worker_id, error = %e, "Claim failed");
                if wait_or_shutdown(backoff(&config), &mut shutdown).await {
                    break;
                }
            }
        }
    }

    debug!(worker_id, ?report, "Worker exiting");
    report
}

async fn process(
    worker_id: usize,
    source: &dyn TaskSource,
    task: &TaskAssignment,
    report: &mut AgentReport,
) {
    let value = match task.compute() {
        Ok(value) => value,
        Err(e) => {
            error!(worker_id, task_id = %task.id, error = %e, "Error computing task");
            report.compute_failures += 1;
            return;
        }
    };

    match source.submit(task.id, value).await {
        Ok(()) => {
            debug!(worker_id, task_id = %task.id, value, "Completed task");
            report.completed += 1;
        }
        Err(e) => {
            error!(worker_id, task_id = %task.id, error = %e, "Error posting result");
            report.rejected += 1;
        }
    }
}

/// Poll interval with ±jitter applied
fn backoff(config: &WorkerConfig) -> Duration {
    let jitter = (fastrand::f64() * 2.0 - 1.0) * config.poll_jitter;
    config.poll_interval.mul_f64(1.0 + jitter)
}

/// Sleep for `duration`; returns true if shutdown was requested meanwhile
async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
