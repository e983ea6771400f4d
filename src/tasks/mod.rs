//! Task engine: compiling expressions into task graphs, claiming ready
//! tasks and collecting their results.

pub mod collector;
pub mod compiler;
pub mod config;
pub mod model;
pub mod scheduler;
pub mod store;

pub use collector::ResultCollector;
pub use compiler::TaskCompiler;
pub use config::{OperationCosts, Settings, SettingsBuilder, DEFAULT_OPERATION_COST};
pub use model::{
    Claim, Expression, ExpressionId, ExpressionStatus, ExpressionView, Operand, RecordOutcome,
    Task, TaskAssignment, TaskId, TaskStatus, TaskView,
};
pub use scheduler::{Scheduler, SchedulerStats};
pub use store::{StoreStats, TaskStore};
