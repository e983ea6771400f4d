use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::core::errors::{CalcError, Result};
use crate::tasks::model::{
    Expression, ExpressionId, ExpressionStatus, ExpressionView, Task, TaskId, TaskStatus,
    TaskView,
};

/// Authoritative registry of tasks and expressions.
///
/// All state sits behind one mutex: registration, claiming, result recording
/// and queries are serialized, so nobody observes a half-updated task or
/// expression. Critical sections never await.
#[derive(Default)]
pub struct TaskStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) tasks: HashMap<TaskId, Task>,
    /// Pending tasks keyed by creation sequence; drives claim order
    pub(crate) pending: BTreeMap<u64, TaskId>,
    pub(crate) expressions: HashMap<ExpressionId, Expression>,
    next_seq: u64,
}

impl StoreState {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Register one compiled expression with all of its tasks. Tasks must be
    /// given dependencies-first.
    pub(crate) fn register(&mut self, mut expression: Expression, tasks: Vec<Task>) {
        debug!(
            expression_id = %expression.id,
            task_count = tasks.len(),
            "Registering expression"
        );

        for mut task in tasks {
            debug_assert!(task.dependencies().all(|dep| self.tasks.contains_key(&dep)));
            task.seq = self.next_seq();
            self.pending.insert(task.seq, task.id);
            self.tasks.insert(task.id, task);
        }

        expression.seq = self.next_seq();
        self.expressions.insert(expression.id, expression);
    }

    /// Expressions ordered by registration sequence
    pub(crate) fn expression_views(&self) -> Vec<ExpressionView> {
        let mut expressions: Vec<&Expression> = self.expressions.values().collect();
        expressions.sort_by_key(|expr| expr.seq);
        expressions.into_iter().map(ExpressionView::from).collect()
    }

    fn tasks_of(&self, id: ExpressionId) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.expression_id == id)
            .collect();
        tasks.sort_by_key(|task| task.seq);
        tasks
    }

    pub(crate) fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::Running => stats.running_tasks += 1,
                TaskStatus::Done => stats.done_tasks += 1,
            }
        }
        for expr in self.expressions.values() {
            match expr.status {
                ExpressionStatus::Pending => stats.pending_expressions += 1,
                ExpressionStatus::Done => stats.done_expressions += 1,
            }
        }
        stats
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the store's critical section
    pub(crate) async fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().await
    }

    pub async fn get_expression(&self, id: ExpressionId) -> Result<ExpressionView> {
        let state = self.lock().await;
        state
            .expressions
            .get(&id)
            .map(ExpressionView::from)
            .ok_or_else(|| CalcError::ExpressionNotFound { id: id.to_string() })
    }

    /// All expressions in submission order
    pub async fn list_expressions(&self) -> Vec<ExpressionView> {
        self.lock().await.expression_views()
    }

    /// Snapshot of a single task
    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        self.lock().await.tasks.get(&id).cloned()
    }

    pub async fn get_task_view(&self, id: TaskId) -> Result<TaskView> {
        let state = self.lock().await;
        state
            .tasks
            .get(&id)
            .map(TaskView::from)
            .ok_or(CalcError::UnknownTask { task_id: id })
    }

    /// Snapshot of the tasks of one expression, in creation order
    pub async fn tasks_for_expression(&self, id: ExpressionId) -> Vec<Task> {
        let state = self.lock().await;
        state.tasks_of(id).into_iter().cloned().collect()
    }

    /// Views of the tasks of one expression, in creation order
    pub async fn task_views(&self, id: ExpressionId) -> Result<Vec<TaskView>> {
        let state = self.lock().await;
        if !state.expressions.contains_key(&id) {
            return Err(CalcError::ExpressionNotFound { id: id.to_string() });
        }
        Ok(state.tasks_of(id).into_iter().map(TaskView::from).collect())
    }

    pub async fn task_count(&self) -> usize {
        self.lock().await.tasks.len()
    }

    pub async fn stats(&self) -> StoreStats {
        self.lock().await.stats()
    }
}

/// Counts of tasks and expressions by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub pending_tasks: usize,
    pub running_tasks: usize,
    pub done_tasks: usize,
    pub pending_expressions: usize,
    pub done_expressions: usize,
}

impl StoreStats {
    pub fn is_idle(&self) -> bool {
        self.pending_expressions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::token::BinaryOp;
    use crate::tasks::model::Operand;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_register_assigns_sequences_in_order() {
        let store = TaskStore::new();
        let expr_id = Uuid::new_v4();
        let first = Task::new(
            expr_id,
            BinaryOp::Mul,
            Operand::Literal(2.0),
            Operand::Literal(2.0),
            Duration::ZERO,
        );
        let second = Task::new(
            expr_id,
            BinaryOp::Add,
            Operand::Literal(2.0),
            Operand::PendingOn(first.id),
            Duration::ZERO,
        );
        let (first_id, second_id) = (first.id, second.id);

        store.lock().await.register(
            Expression::pending(expr_id, "2 + 2 * 2", second_id),
            vec![first, second],
        );

        let tasks = store.tasks_for_expression(expr_id).await;
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![first_id, second_id]
        );
        assert!(tasks[0].seq < tasks[1].seq);

        let state = store.lock().await;
        assert_eq!(
            state.pending.values().copied().collect::<Vec<_>>(),
            vec![first_id, second_id]
        );
    }

    #[tokio::test]
    async fn test_task_views() {
        let store = TaskStore::new();
        let expr_id = Uuid::new_v4();
        let task = Task::new(
            expr_id,
            BinaryOp::Div,
            Operand::Literal(8.0),
            Operand::Literal(2.0),
            Duration::from_millis(40),
        );
        let task_id = task.id;
        store
            .lock()
            .await
            .register(Expression::pending(expr_id, "8 / 2", task_id), vec![task]);

        let view = store.get_task_view(task_id).await.unwrap();
        assert_eq!((view.arg1, view.arg2), (Some(8.0), Some(2.0)));
        assert_eq!(view.status, TaskStatus::Pending);
        assert_eq!(store.task_views(expr_id).await.unwrap(), vec![view]);

        assert!(matches!(
            store.get_task_view(Uuid::new_v4()).await,
            Err(CalcError::UnknownTask { .. })
        ));
        assert!(matches!(
            store.task_views(Uuid::new_v4()).await,
            Err(CalcError::ExpressionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_expression() {
        let store = TaskStore::new();
        let result = store.get_expression(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CalcError::ExpressionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_preserves_submission_order() {
        let store = TaskStore::new();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            store
                .lock()
                .await
                .register(Expression::resolved(*id, i.to_string(), i as f64), vec![]);
        }

        let listed: Vec<Uuid> = store
            .list_expressions()
            .await
            .into_iter()
            .map(|view| view.id)
            .collect();
        assert_eq!(listed, ids);

        let stats = store.stats().await;
        assert_eq!(stats.done_expressions, 4);
        assert!(stats.is_idle());
    }
}
