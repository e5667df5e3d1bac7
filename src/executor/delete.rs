use async_trait::async_trait;

use super::{ExecutionContext, Executor};
use crate::core::{Result, Value};
use crate::planner::QueryPlan;
use crate::result::QueryResult;

/// DELETE FROM mapping [WHERE predicate]
pub struct DeleteExecutor;

#[async_trait]
impl Executor for DeleteExecutor {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn can_handle(&self, plan: &QueryPlan) -> bool {
        matches!(plan, QueryPlan::Delete(_))
    }

    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let QueryPlan::Delete(delete) = plan else {
            return super::ddl::unreachable_plan(self.name(), plan);
        };

        let Some(predicate) = &delete.predicate else {
            let Some(store) = ctx.stores.get(delete.mapping.object_name()) else {
                return Ok(QueryResult::affected(0));
            };
            let removed = store.size()?;
            store.clear()?;
            return Ok(QueryResult::affected(removed as u64));
        };

        // Сначала собираем кандидатов, потом удаляем через compare-and-delete
        let eval = ctx.evaluation();
        let mut matched: Vec<(Value, Value)> = Vec::new();
        ctx.for_each_row(&delete.mapping, |entry, row| {
            if eval.matches(predicate, &row)? {
                matched.push((entry.key, entry.value));
            }
            Ok(())
        })
        .await?;

        let Some(store) = ctx.stores.get(delete.mapping.object_name()) else {
            return Ok(QueryResult::affected(0));
        };
        let mut removed = 0u64;
        for (key, value) in matched {
            if store.remove_if_same(&key, &value)? {
                removed += 1;
            }
        }
        Ok(QueryResult::affected(removed))
    }
}
