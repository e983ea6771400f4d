use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::expr::token::BinaryOp;

// Type aliases
pub type TaskId = Uuid;
pub type ExpressionId = Uuid;

/// Task status. Transitions only move forward: Pending -> Running -> Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Done,
}

/// One operand of a task: a concrete value, or the result of another task
/// that has not been read yet. A `PendingOn` slot is overwritten with
/// `Literal` once the referenced task is done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    PendingOn(TaskId),
}

impl Operand {
    pub fn value(&self) -> Option<f64> {
        match self {
            Operand::Literal(value) => Some(*value),
            Operand::PendingOn(_) => None,
        }
    }

    pub fn dependency(&self) -> Option<TaskId> {
        match self {
            Operand::Literal(_) => None,
            Operand::PendingOn(id) => Some(*id),
        }
    }
}

/// A single binary operation and its scheduling state
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub op: BinaryOp,
    pub arg1: Operand,
    pub arg2: Operand,
    pub cost: Duration,
    pub status: TaskStatus,
    pub result: Option<f64>,
    /// Creation sequence within the store, assigned on registration
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        expression_id: ExpressionId,
        op: BinaryOp,
        arg1: Operand,
        arg2: Operand,
        cost: Duration,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), expression_id, op, arg1, arg2, cost)
    }

    /// Create a task whose id was allocated up front
    pub fn with_id(
        id: TaskId,
        expression_id: ExpressionId,
        op: BinaryOp,
        arg1: Operand,
        arg2: Operand,
        cost: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            expression_id,
            op,
            arg1,
            arg2,
            cost,
            status: TaskStatus::Pending,
            result: None,
            seq: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn dependencies(&self) -> impl Iterator<Item = TaskId> {
        self.arg1.dependency().into_iter().chain(self.arg2.dependency())
    }

    /// Both operands as values, if both are already concrete
    pub fn operands(&self) -> Option<(f64, f64)> {
        Some((self.arg1.value()?, self.arg2.value()?))
    }

    pub(crate) fn mark_running(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::Running;
        self.updated_at = Utc::now();
    }

    pub(crate) fn complete(&mut self, value: f64) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        self.status = TaskStatus::Done;
        self.result = Some(value);
        self.updated_at = Utc::now();
    }
}

/// A submitted expression and its overall completion state
#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExpressionId,
    pub text: String,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    /// `None` when the expression was a bare literal
    pub root_task: Option<TaskId>,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

impl Expression {
    pub fn pending(id: ExpressionId, text: impl Into<String>, root_task: TaskId) -> Self {
        Self {
            id,
            text: text.into(),
            status: ExpressionStatus::Pending,
            result: None,
            root_task: Some(root_task),
            seq: 0,
            created_at: Utc::now(),
        }
    }

    /// An expression with no operations, resolved at compile time
    pub fn resolved(id: ExpressionId, text: impl Into<String>, value: f64) -> Self {
        Self {
            id,
            text: text.into(),
            status: ExpressionStatus::Done,
            result: Some(value),
            root_task: None,
            seq: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ExpressionStatus::Done
    }
}

/// Read-only view of an expression returned by queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionView {
    pub id: ExpressionId,
    #[serde(rename = "expression")]
    pub text: String,
    pub status: ExpressionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
}

impl From<&Expression> for ExpressionView {
    fn from(expr: &Expression) -> Self {
        Self {
            id: expr.id,
            text: expr.text.clone(),
            status: expr.status,
            result: expr.result,
        }
    }
}

/// Read-only view of a task. Operands still waiting on another task are
/// left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    #[serde(rename = "operation")]
    pub op: BinaryOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg2: Option<f64>,
    #[serde(rename = "operation_time", with = "duration_ms")]
    pub cost: Duration,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            expression_id: task.expression_id,
            op: task.op,
            arg1: task.arg1.value(),
            arg2: task.arg2.value(),
            cost: task.cost,
            status: task.status,
            result: task.result,
        }
    }
}

/// Work handed to a worker: one operation with both operands resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: TaskId,
    #[serde(rename = "operation")]
    pub op: BinaryOp,
    pub arg1: f64,
    pub arg2: f64,
    #[serde(rename = "operation_time", with = "duration_ms")]
    pub cost: Duration,
}

impl TaskAssignment {
    /// Compute the operation locally
    pub fn compute(&self) -> crate::core::errors::Result<f64> {
        self.op.apply(self.arg1, self.arg2)
    }
}

/// Outcome of a claim attempt. `NoTaskAvailable` is the normal "poll again
/// later" answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    Assigned(TaskAssignment),
    NoTaskAvailable,
}

impl Claim {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Claim::Assigned(_))
    }

    pub fn into_assignment(self) -> Option<TaskAssignment> {
        match self {
            Claim::Assigned(assignment) => Some(assignment),
            Claim::NoTaskAvailable => None,
        }
    }
}

/// Result of recording a task result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordOutcome {
    pub task_id: TaskId,
    /// Set when the task was the root of its expression
    pub completed_expression: Option<ExpressionId>,
}

// Durations travel as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_transitions() {
        let mut task = Task::new(
            Uuid::new_v4(),
            BinaryOp::Add,
            Operand::Literal(1.0),
            Operand::Literal(2.0),
            Duration::from_millis(10),
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.operands(), Some((1.0, 2.0)));

        task.mark_running();
        assert_eq!(task.status, TaskStatus::Running);

        task.complete(3.0);
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.result, Some(3.0));
    }

    #[test]
    fn test_dependencies() {
        let dep = Uuid::new_v4();
        let task = Task::new(
            Uuid::new_v4(),
            BinaryOp::Mul,
            Operand::Literal(2.0),
            Operand::PendingOn(dep),
            Duration::ZERO,
        );
        assert_eq!(task.dependencies().collect::<Vec<_>>(), vec![dep]);
        assert_eq!(task.operands(), None);
    }

    #[test]
    fn test_assignment_wire_format() {
        let id = Uuid::new_v4();
        let assignment = TaskAssignment {
            id,
            op: BinaryOp::Div,
            arg1: 6.0,
            arg2: 3.0,
            cost: Duration::from_millis(1500),
        };
        let value = serde_json::to_value(&assignment).unwrap();
        assert_eq!(
            value,
            json!({
                "id": id.to_string(),
                "operation": "/",
                "arg1": 6.0,
                "arg2": 3.0,
                "operation_time": 1500
            })
        );
        let back: TaskAssignment = serde_json::from_value(value).unwrap();
        assert_eq!(back, assignment);
        assert_eq!(back.compute().unwrap(), 2.0);
    }

    #[test]
    fn test_task_view_wire_format() {
        let dep = Uuid::new_v4();
        let mut task = Task::new(
            Uuid::new_v4(),
            BinaryOp::Sub,
            Operand::Literal(9.0),
            Operand::PendingOn(dep),
            Duration::from_millis(250),
        );

        let value = serde_json::to_value(TaskView::from(&task)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": task.id.to_string(),
                "expression_id": task.expression_id.to_string(),
                "operation": "-",
                "arg1": 9.0,
                "operation_time": 250,
                "status": "pending"
            })
        );

        task.arg2 = Operand::Literal(4.0);
        task.mark_running();
        task.complete(5.0);
        let view = TaskView::from(&task);
        assert_eq!(view.arg2, Some(4.0));
        assert_eq!(view.status, TaskStatus::Done);
        assert_eq!(serde_json::to_value(&view).unwrap()["result"], 5.0);
    }

    #[test]
    fn test_expression_view_omits_missing_result() {
        let expr = Expression::pending(Uuid::new_v4(), "1 + 1", Uuid::new_v4());
        let value = serde_json::to_value(ExpressionView::from(&expr)).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["expression"], "1 + 1");
        assert!(value.get("result").is_none());
    }
}
