use std::sync::Arc;
use tracing::{debug, info};

use crate::core::errors::{CalcError, Result};
use crate::tasks::model::{ExpressionStatus, RecordOutcome, TaskId, TaskStatus};
use crate::tasks::store::{StoreState, TaskStore};

/// Records finished results and closes out expressions whose root task
/// completes.
pub struct ResultCollector {
    store: Arc<TaskStore>,
}

impl ResultCollector {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    /// Record `value` as the result of a running task
    pub async fn record_result(&self, task_id: TaskId, value: f64) -> Result<RecordOutcome> {
        let mut state = self.store.lock().await;
        record(&mut state, task_id, value)
    }
}

pub(crate) fn record(state: &mut StoreState, task_id: TaskId, value: f64) -> Result<RecordOutcome> {
    let task = state
        .tasks
        .get_mut(&task_id)
        .ok_or(CalcError::UnknownTask { task_id })?;

    if task.status != TaskStatus::Running {
        return Err(CalcError::TaskNotRunning {
            task_id,
            status: task.status,
        });
    }

    task.complete(value);
    let expression_id = task.expression_id;
    debug!(task_id = %task_id, value, "Task result recorded");

    let mut outcome = RecordOutcome {
        task_id,
        completed_expression: None,
    };

    if let Some(expr) = state.expressions.get_mut(&expression_id) {
        if expr.root_task == Some(task_id) {
            expr.status = ExpressionStatus::Done;
            expr.result = Some(value);
            outcome.completed_expression = Some(expression_id);
            info!(expression_id = %expression_id, result = value, "Expression completed");
        }
    }

    Ok(outcome)
}
