use async_trait::async_trait;

use super::{ExecutionContext, Executor};
use crate::core::{Column, DataType, Result, Value};
use crate::planner::QueryPlan;
use crate::result::QueryResult;

/// CREATE MAPPING, DROP MAPPING and SHOW MAPPINGS.
///
/// Mappings only describe entries; creating or dropping one never touches
/// the backing map.
pub struct MappingExecutor;

#[async_trait]
impl Executor for MappingExecutor {
    fn name(&self) -> &'static str {
        "MAPPING"
    }

    fn can_handle(&self, plan: &QueryPlan) -> bool {
        matches!(
            plan,
            QueryPlan::CreateMapping { .. } | QueryPlan::DropMapping { .. } | QueryPlan::ShowMappings
        )
    }

    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        match plan {
            QueryPlan::CreateMapping {
                mapping,
                replace,
                if_not_exists,
            } => {
                ctx.catalog
                    .create_mapping(mapping.clone(), *replace, *if_not_exists)?;
                Ok(QueryResult::empty())
            }
            QueryPlan::DropMapping { name, if_exists } => {
                ctx.catalog.drop_mapping(name, *if_exists)?;
                Ok(QueryResult::empty())
            }
            QueryPlan::ShowMappings => {
                let rows = ctx
                    .catalog
                    .list()?
                    .into_iter()
                    .map(|name| vec![Value::Text(name)])
                    .collect();
                Ok(QueryResult::new(
                    vec![Column::new("name", DataType::Varchar)],
                    rows,
                ))
            }
            other => unreachable_plan(self.name(), other),
        }
    }
}

pub(super) fn unreachable_plan(executor: &str, plan: &QueryPlan) -> Result<QueryResult> {
    Err(crate::core::DbError::FatalStoreError(format!(
        "{} executor cannot run a {} plan",
        executor,
        plan.kind()
    )))
}
