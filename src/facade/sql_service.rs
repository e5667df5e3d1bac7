use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::GridConfig;
use crate::core::{DbError, Result, Value};
use crate::evaluator::EvaluatorRegistry;
use crate::executor::{ExecutionContext, ExecutorPipeline};
use crate::parser::SqlParserAdapter;
use crate::planner::{QueryPlan, QueryPlanner};
use crate::result::{Cursor, QueryResult};
use crate::storage::{MappingCatalog, StoreRegistry};

/// Statement entry point: parse → plan against a catalog snapshot → execute.
pub struct SqlService {
    parser: SqlParserAdapter,
    planner: QueryPlanner,
    pipeline: ExecutorPipeline,
    evaluators: EvaluatorRegistry,
    stores: Arc<StoreRegistry>,
    catalog: Arc<MappingCatalog>,
    statement_timeout: Option<Duration>,
    scan_yield_interval: usize,
}

impl SqlService {
    pub(crate) fn new(
        config: &GridConfig,
        stores: Arc<StoreRegistry>,
        catalog: Arc<MappingCatalog>,
    ) -> Self {
        Self {
            parser: SqlParserAdapter::new().with_max_statement_len(config.max_statement_len),
            planner: QueryPlanner::new(),
            pipeline: ExecutorPipeline::with_default_executors(),
            evaluators: EvaluatorRegistry::with_default_evaluators(),
            stores,
            catalog,
            statement_timeout: config.statement_timeout,
            scan_yield_interval: config.scan_yield_interval,
        }
    }

    /// Execute one statement with positional parameters.
    ///
    /// Multi-row INSERT, UPDATE and DELETE stop at the first failing row.
    /// Rows written before the failure stay written.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Cursor> {
        let parsed = self.parser.parse(sql)?;
        let plan = self.planner.plan(parsed, &self.catalog.snapshot()?, params)?;
        debug!(kind = plan.kind(), params = params.len(), "Executing statement");

        let result = match self.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(&plan))
                .await
                .map_err(|_| {
                    warn!(kind = plan.kind(), timeout_ms = limit.as_millis() as u64, "Statement timed out");
                    DbError::TransientStoreError(format!(
                        "{} statement exceeded the {} ms timeout",
                        plan.kind(),
                        limit.as_millis()
                    ))
                })??,
            None => self.run(&plan).await?,
        };
        Ok(Cursor::from(result))
    }

    async fn run(&self, plan: &QueryPlan) -> Result<QueryResult> {
        let ctx = ExecutionContext::new(
            &self.stores,
            &self.catalog,
            &self.evaluators,
            self.scan_yield_interval,
        );
        self.pipeline.execute(plan, &ctx).await
    }
}
