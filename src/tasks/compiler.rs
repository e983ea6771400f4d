use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::errors::{CalcError, Result};
use crate::expr::{compile_tree, Node, PriorityTable};
use crate::tasks::config::OperationCosts;
use crate::tasks::model::{Expression, ExpressionId, Operand, Task};
use crate::tasks::store::TaskStore;

/// Turns expression text into a task graph registered in the store
pub struct TaskCompiler {
    store: Arc<TaskStore>,
    costs: OperationCosts,
    priorities: PriorityTable,
}

impl TaskCompiler {
    pub fn new(store: Arc<TaskStore>, costs: OperationCosts) -> Self {
        Self {
            store,
            costs,
            priorities: PriorityTable::default(),
        }
    }

    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    /// Compile `text` and register its tasks. Nothing is registered when any
    /// front-end stage fails.
    pub async fn compile(&self, text: &str) -> Result<ExpressionId> {
        let mut tree = compile_tree(text, &self.priorities)?;
        let expression_id = Uuid::new_v4();

        let mut tasks = Vec::with_capacity(tree.operation_count());
        let expression = match lower(&mut tree, expression_id, &self.costs, &mut tasks)? {
            Operand::Literal(value) => {
                debug!(expression_id = %expression_id, value, "Expression resolved at compile time");
                Expression::resolved(expression_id, text, value)
            }
            Operand::PendingOn(root_task) => Expression::pending(expression_id, text, root_task),
        };

        let task_count = tasks.len();
        self.store.lock().await.register(expression, tasks);

        info!(
            expression_id = %expression_id,
            task_count,
            "Expression compiled"
        );
        Ok(expression_id)
    }
}

/// Lower an expression tree into tasks. Every operation node first gets
/// its task id, then tasks are emitted children-first so each dependency is
/// pushed before the task that references it. Returns the operand standing
/// for the whole tree.
fn lower(
    node: &mut Node,
    expression_id: ExpressionId,
    costs: &OperationCosts,
    out: &mut Vec<Task>,
) -> Result<Operand> {
    node.for_each_operation_mut(|slot| *slot = Some(Uuid::new_v4()));

    for operation in node.post_order() {
        if let Node::Operation {
            op,
            left,
            right,
            task_id: Some(id),
        } = operation
        {
            out.push(Task::with_id(
                *id,
                expression_id,
                *op,
                operand_for(left)?,
                operand_for(right)?,
                costs.cost(*op),
            ));
        }
    }

    operand_for(node)
}

/// The operand a parent uses for `node`: its value, or its task's result
fn operand_for(node: &Node) -> Result<Operand> {
    match node {
        Node::Literal(value) => Ok(Operand::Literal(*value)),
        Node::Operation {
            task_id: Some(id), ..
        } => Ok(Operand::PendingOn(*id)),
        Node::Operation { task_id: None, .. } => {
            Err(CalcError::malformed("operation without a task"))
        }
    }
}
