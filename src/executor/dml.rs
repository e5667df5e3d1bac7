use async_trait::async_trait;

use super::{ExecutionContext, Executor};
use crate::core::{Result, Tuple};
use crate::planner::QueryPlan;
use crate::planner::logical_plan::InsertPlan;
use crate::result::QueryResult;
use crate::storage::Entry;

/// INSERT: every tuple is evaluated and encoded before the first write, so a
/// bad tuple anywhere in the statement leaves the map untouched. Writes
/// themselves are plain puts; an existing key is overwritten.
pub struct InsertExecutor;

impl InsertExecutor {
    fn encode_all(plan: &InsertPlan, ctx: &ExecutionContext<'_>) -> Result<Vec<Entry>> {
        let eval = ctx.evaluation();
        let empty: Tuple = Vec::new();

        plan.rows
            .iter()
            .map(|exprs| {
                let values = exprs
                    .iter()
                    .map(|expr| eval.evaluate(expr, &empty))
                    .collect::<Result<Tuple>>()?;
                plan.mapping.encode(&values)
            })
            .collect()
    }
}

#[async_trait]
impl Executor for InsertExecutor {
    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn can_handle(&self, plan: &QueryPlan) -> bool {
        matches!(plan, QueryPlan::Insert(_))
    }

    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let QueryPlan::Insert(insert) = plan else {
            return super::ddl::unreachable_plan(self.name(), plan);
        };

        let entries = Self::encode_all(insert, ctx)?;
        let store = ctx.stores.get_or_create(insert.mapping.object_name());

        let mut written = 0u64;
        for entry in entries {
            // Прерываемся на первой ошибке, уже записанные строки остаются
            store.set(entry.key, entry.value)?;
            written += 1;
        }
        Ok(QueryResult::affected(written))
    }
}
