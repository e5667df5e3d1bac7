use super::ExecutionContext;
use crate::core::{DbError, Result};
use crate::planner::QueryPlan;
use crate::result::QueryResult;

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Имя executor'а для отладки
    fn name(&self) -> &'static str;

    fn can_handle(&self, plan: &QueryPlan) -> bool;
    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult>;
}

pub struct ExecutorPipeline {
    executors: Vec<Box<dyn Executor>>,
}

impl ExecutorPipeline {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    /// Pipeline with an executor for every plan kind.
    pub fn with_default_executors() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(super::ddl::MappingExecutor));
        pipeline.register(Box::new(super::dml::InsertExecutor));
        pipeline.register(Box::new(super::delete::DeleteExecutor));
        pipeline.register(Box::new(super::update::UpdateExecutor));
        pipeline.register(Box::new(super::query::QueryExecutor));
        pipeline
    }

    pub fn register(&mut self, executor: Box<dyn Executor>) {
        debug!(executor = executor.name(), "Registered executor");
        self.executors.push(executor);
    }

    pub async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        for executor in &self.executors {
            if executor.can_handle(plan) {
                return executor.execute(plan, ctx).await;
            }
        }

        Err(DbError::ParseError(format!(
            "No executor found for {} statement",
            plan.kind()
        )))
    }
}

impl Default for ExecutorPipeline {
    fn default() -> Self {
        Self::with_default_executors()
    }
}
