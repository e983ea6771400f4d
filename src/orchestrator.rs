use async_trait::async_trait;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::agent::TaskSource;
use crate::core::errors::Result;
use crate::expr::PriorityTable;
use crate::tasks::{
    Claim, ExpressionId, ExpressionView, RecordOutcome, ResultCollector, Scheduler,
    SchedulerStats, Settings, StoreStats, TaskCompiler, TaskId, TaskStore, TaskView,
};

/// Owns the task store and exposes the boundary operations: submitting
/// expressions, claiming tasks, submitting results and querying expressions.
pub struct Orchestrator {
    store: Arc<TaskStore>,
    compiler: TaskCompiler,
    scheduler: Scheduler,
    collector: ResultCollector,
}

impl Orchestrator {
    pub fn new(settings: &Settings) -> Self {
        Self::with_store(Arc::new(TaskStore::new()), settings)
    }

    pub fn with_store(store: Arc<TaskStore>, settings: &Settings) -> Self {
        Self {
            compiler: TaskCompiler::new(store.clone(), settings.operation_costs()),
            scheduler: Scheduler::new(store.clone()),
            collector: ResultCollector::new(store.clone()),
            store,
        }
    }

    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.compiler = self.compiler.with_priorities(priorities);
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    #[instrument(skip(self))]
    pub async fn submit_expression(&self, text: &str) -> Result<ExpressionId> {
        self.compiler.compile(text).await.map_err(|e| {
            warn!(error = %e, category = e.category(), "Expression rejected");
            e
        })
    }

    #[instrument(skip(self))]
    pub async fn claim_task(&self) -> Claim {
        self.scheduler.claim_next().await
    }

    #[instrument(skip(self))]
    pub async fn submit_result(&self, task_id: TaskId, value: f64) -> Result<RecordOutcome> {
        self.collector
            .record_result(task_id, value)
            .await
            .map_err(|e| {
                warn!(error = %e, "Result rejected");
                e
            })
    }

    pub async fn get_expression(&self, id: ExpressionId) -> Result<ExpressionView> {
        self.store.get_expression(id).await
    }

    pub async fn list_expressions(&self) -> Vec<ExpressionView> {
        self.store.list_expressions().await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<TaskView> {
        self.store.get_task_view(id).await
    }

    /// Tasks compiled from one expression, dependencies first
    pub async fn expression_tasks(&self, id: ExpressionId) -> Result<Vec<TaskView>> {
        self.store.task_views(id).await
    }

    pub async fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.get_stats().await
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }
}

#[async_trait]
impl TaskSource for Orchestrator {
    async fn claim(&self) -> Result<Claim> {
        Ok(self.claim_task().await)
    }

    async fn submit(&self, task_id: TaskId, value: f64) -> Result<()> {
        self.submit_result(task_id, value).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CalcError;
    use crate::tasks::ExpressionStatus;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(&Settings::builder().uniform_cost(0).build().unwrap())
    }

    #[tokio::test]
    async fn test_submit_and_drain() {
        let orch = orchestrator();
        let id = orch.submit_expression("(2+2)*(3+3)").await.unwrap();

        while let Claim::Assigned(task) = orch.claim_task().await {
            let value = task.compute().unwrap();
            orch.submit_result(task.id, value).await.unwrap();
        }

        let view = orch.get_expression(id).await.unwrap();
        assert_eq!(view.status, ExpressionStatus::Done);
        assert_eq!(view.result, Some(24.0));
        let stats = orch.scheduler_stats().await;
        assert_eq!(stats.done_tasks, 3);
        assert_eq!(stats.done_expressions, 1);

        let tasks = orch.expression_tasks(id).await.unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[2].result, Some(24.0));
        assert_eq!(orch.get_task(tasks[0].id).await.unwrap(), tasks[0]);
    }

    #[tokio::test]
    async fn test_errors_are_local() {
        let orch = orchestrator();
        let good = orch.submit_expression("1 + 2").await.unwrap();
        assert!(matches!(
            orch.submit_expression("1 +").await,
            Err(CalcError::MalformedExpression { .. })
        ));
        assert!(matches!(
            orch.submit_result(TaskId::new_v4(), 1.0).await,
            Err(CalcError::UnknownTask { .. })
        ));

        let listed = orch.list_expressions().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, good);
        assert!(orch.claim_task().await.is_assigned());
    }

    #[tokio::test]
    async fn test_custom_priorities() {
        use crate::expr::BinaryOp;
        let orch = orchestrator()
            .with_priorities(PriorityTable::default().with_operator(BinaryOp::Add, 3));
        let id = orch.submit_expression("2 * 3 + 4").await.unwrap();

        while let Some(task) = orch.claim().await.unwrap().into_assignment() {
            orch.submit(task.id, task.compute().unwrap()).await.unwrap();
        }
        assert_eq!(orch.get_expression(id).await.unwrap().result, Some(14.0));
    }
}
