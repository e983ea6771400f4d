use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::tasks::model::{Claim, Operand, Task, TaskAssignment, TaskId, TaskStatus};
use crate::tasks::store::{StoreState, StoreStats, TaskStore};

/// Hands out pending tasks whose operands are resolved.
///
/// Readiness is discovered by scanning on every claim; completing a task
/// does not wake anyone up. Pending tasks are scanned earliest-created first.
pub struct Scheduler {
    store: Arc<TaskStore>,
}

impl Scheduler {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    /// Claim the next ready task, flipping it to running. Returns
    /// `Claim::NoTaskAvailable` when nothing is ready right now.
    pub async fn claim_next(&self) -> Claim {
        let mut state = self.store.lock().await;
        match claim_next_ready(&mut state) {
            Some(assignment) => {
                info!(task_id = %assignment.id, op = %assignment.op, "Task claimed");
                Claim::Assigned(assignment)
            }
            None => {
                debug!("No task available");
                Claim::NoTaskAvailable
            }
        }
    }

    /// Get statistics about the scheduler state
    pub async fn get_stats(&self) -> SchedulerStats {
        SchedulerStats::from(self.store.stats().await)
    }
}

/// Scan pending tasks in creation order and claim the first ready one
pub(crate) fn claim_next_ready(state: &mut StoreState) -> Option<TaskAssignment> {
    let StoreState { tasks, pending, .. } = state;

    let mut claimed = None;
    for (&seq, task_id) in pending.iter() {
        if dependencies_met(tasks, task_id) {
            claimed = Some((seq, *task_id));
            break;
        }
    }

    let (seq, task_id) = claimed?;
    pending.remove(&seq);

    let task = tasks.get_mut(&task_id)?;
    let (arg1, arg2) = task.operands()?;
    task.mark_running();

    Some(TaskAssignment {
        id: task.id,
        op: task.op,
        arg1,
        arg2,
        cost: task.cost,
    })
}

/// Check whether both operands of a pending task are available. Slots
/// pointing at finished tasks are replaced by their results as a side
/// effect; repeating the check is harmless.
pub(crate) fn dependencies_met(tasks: &mut HashMap<TaskId, Task>, task_id: &TaskId) -> bool {
    let (arg1, arg2) = match tasks.get(task_id) {
        Some(task) => (
            resolve(tasks, &task.arg1, task_id),
            resolve(tasks, &task.arg2, task_id),
        ),
        None => return false,
    };

    let Some(task) = tasks.get_mut(task_id) else {
        return false;
    };
    task.arg1 = arg1;
    task.arg2 = arg2;
    task.operands().is_some()
}

fn resolve(tasks: &HashMap<TaskId, Task>, slot: &Operand, owner: &TaskId) -> Operand {
    match slot {
        Operand::Literal(_) => *slot,
        Operand::PendingOn(dep_id) => match tasks.get(dep_id) {
            Some(dep) if dep.status == TaskStatus::Done => match dep.result {
                Some(value) => {
                    debug!(task_id = %owner, dependency = %dep_id, value, "Dependency resolved");
                    Operand::Literal(value)
                }
                None => *slot,
            },
            Some(_) => *slot,
            None => {
                warn!(task_id = %owner, dependency = %dep_id, "Dependency not found");
                *slot
            }
        },
    }
}

/// Statistics about the scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub pending_tasks: usize,
    pub running_tasks: usize,
    pub done_tasks: usize,
    pub pending_expressions: usize,
    pub done_expressions: usize,
}

impl From<StoreStats> for SchedulerStats {
    fn from(stats: StoreStats) -> Self {
        Self {
            pending_tasks: stats.pending_tasks,
            running_tasks: stats.running_tasks,
            done_tasks: stats.done_tasks,
            pending_expressions: stats.pending_expressions,
            done_expressions: stats.done_expressions,
        }
    }
}
