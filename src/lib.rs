//! # dagcalc: distributed arithmetic over a task DAG
//!
//! Expressions are compiled into a graph of binary-operation tasks. Workers
//! claim tasks whose operands are ready, compute them and report back; the
//! expression completes when its root task does.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dagcalc::{Agent, Orchestrator, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let orchestrator = Arc::new(Orchestrator::new(&settings));
//!     let id = orchestrator.submit_expression("(2 + 2) * (3 + 3)").await?;
//!
//!     let agent = Agent::new(orchestrator.clone(), &settings).start();
//!     // ... poll orchestrator.get_expression(id) until done
//!     agent.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod core;
pub mod expr;
pub mod orchestrator;
pub mod tasks;

// Re-exports for convenience
pub use agent::{Agent, AgentHandle, AgentReport, TaskSource};
pub use crate::core::errors::{CalcError, Result};
pub use expr::{calculate, BinaryOp, PriorityTable};
pub use orchestrator::Orchestrator;
pub use tasks::{
    Claim, ExpressionId, ExpressionStatus, ExpressionView, Settings, SettingsBuilder,
    TaskAssignment, TaskId, TaskStatus, TaskView,
};
