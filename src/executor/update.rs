use async_trait::async_trait;

use super::{ExecutionContext, Executor};
use crate::core::{Result, Value};
use crate::planner::QueryPlan;
use crate::result::QueryResult;

/// UPDATE mapping SET col = expr, ... [WHERE predicate]
///
/// New values are computed from the row as it was scanned and written back
/// with compare-and-set. Record values keep every field that is not assigned. An entry changed by someone else in between is left
/// alone and not counted.
pub struct UpdateExecutor;

#[async_trait]
impl Executor for UpdateExecutor {
    fn name(&self) -> &'static str {
        "UPDATE"
    }

    fn can_handle(&self, plan: &QueryPlan) -> bool {
        matches!(plan, QueryPlan::Update(_))
    }

    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let QueryPlan::Update(update) = plan else {
            return super::ddl::unreachable_plan(self.name(), plan);
        };

        let eval = ctx.evaluation();
        let mut changes: Vec<(Value, Value, Value)> = Vec::new();
        ctx.for_each_row(&update.mapping, |entry, row| {
            if let Some(predicate) = &update.predicate
                && !eval.matches(predicate, &row)?
            {
                return Ok(());
            }

            let assigned = update
                .assignments
                .iter()
                .map(|(idx, expr)| Ok((*idx, eval.evaluate(expr, &row)?)))
                .collect::<Result<Vec<_>>>()?;
            let new_value = update.mapping.apply_assignments(&entry, &assigned)?;
            changes.push((entry.key, entry.value, new_value));
            Ok(())
        })
        .await?;

        let Some(store) = ctx.stores.get(update.mapping.object_name()) else {
            return Ok(QueryResult::affected(0));
        };
        let mut updated = 0u64;
        for (key, old_value, new_value) in changes {
            if store.replace_if_same(&key, &old_value, new_value)? {
                updated += 1;
            }
        }
        Ok(QueryResult::affected(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::DbError;
    use crate::evaluator::EvaluatorRegistry;
    use crate::executor::test_support::{cities, countries};
    use crate::parser::ast::{BinaryOp, Expr};
    use crate::planner::logical_plan::UpdatePlan;
    use crate::storage::{MappingCatalog, StoreRegistry};

    #[tokio::test]
    async fn test_update_matching_rows() {
        let stores = StoreRegistry::new();
        let store = stores.get_or_create("cities");
        store.set("Australia".into(), "Sydney".into()).unwrap();
        store.set("Croatia".into(), "Zagreb".into()).unwrap();

        let catalog = MappingCatalog::new();
        let evaluators = EvaluatorRegistry::with_default_evaluators();
        let ctx = ExecutionContext::new(&stores, &catalog, &evaluators, 16);

        let plan = QueryPlan::Update(UpdatePlan {
            mapping: Arc::new(cities()),
            assignments: vec![(1, Expr::Literal("Canberra".into()))],
            predicate: Some(Expr::BinaryOp {
                left: Box::new(Expr::ColumnIndex(0)),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Literal("Australia".into())),
            }),
        });
        let result = UpdateExecutor.execute(&plan, &ctx).await.unwrap();
        assert_eq!(result.update_count, Some(1));
        assert_eq!(
            store.get(&"Australia".into()).unwrap(),
            Some(Value::from("Canberra"))
        );
        assert_eq!(store.get(&"Croatia".into()).unwrap(), Some(Value::from("Zagreb")));
    }

    #[tokio::test]
    async fn test_update_record_field() {
        let stores = StoreRegistry::new();
        let store = stores.get_or_create("country");
        store
            .set(
                "1".into(),
                Value::record([("isoCode", Value::from("AU")), ("country", Value::from("Australia"))]),
            )
            .unwrap();

        let catalog = MappingCatalog::new();
        let evaluators = EvaluatorRegistry::with_default_evaluators();
        let ctx = ExecutionContext::new(&stores, &catalog, &evaluators, 16);

        // country = isoCode
        let plan = QueryPlan::Update(UpdatePlan {
            mapping: Arc::new(countries()),
            assignments: vec![(2, Expr::ColumnIndex(1))],
            predicate: None,
        });
        UpdateExecutor.execute(&plan, &ctx).await.unwrap();

        let value = store.get(&"1".into()).unwrap().unwrap();
        assert_eq!(
            value.as_record().unwrap().get("country"),
            Some(&Value::from("AU"))
        );
    }

    #[tokio::test]
    async fn test_update_keeps_undeclared_and_untouched_fields() {
        let stores = StoreRegistry::new();
        let store = stores.get_or_create("country");
        store
            .set(
                "1".into(),
                Value::record([
                    ("isoCode", Value::from("AU")),
                    ("country", Value::from("Australia")),
                    ("population", Value::Integer(25_690_000)),
                    ("capital", Value::from("Canberra")),
                ]),
            )
            .unwrap();

        let catalog = MappingCatalog::new();
        let evaluators = EvaluatorRegistry::with_default_evaluators();
        let ctx = ExecutionContext::new(&stores, &catalog, &evaluators, 16);

        let plan = QueryPlan::Update(UpdatePlan {
            mapping: Arc::new(countries()),
            assignments: vec![(2, Expr::Literal("Commonwealth of Australia".into()))],
            predicate: None,
        });
        let result = UpdateExecutor.execute(&plan, &ctx).await.unwrap();
        assert_eq!(result.update_count, Some(1));

        let value = store.get(&"1".into()).unwrap().unwrap();
        let fields = value.as_record().unwrap();
        assert_eq!(fields.get("country"), Some(&Value::from("Commonwealth of Australia")));
        assert_eq!(fields.get("isoCode"), Some(&Value::from("AU")));
        assert_eq!(fields.get("population"), Some(&Value::Integer(25_690_000)));
        assert_eq!(fields.get("capital"), Some(&Value::from("Canberra")));
    }

    #[tokio::test]
    async fn test_update_rejects_mistyped_value() {
        let stores = StoreRegistry::new();
        stores
            .get_or_create("cities")
            .set("Croatia".into(), "Zagreb".into())
            .unwrap();
        let catalog = MappingCatalog::new();
        let evaluators = EvaluatorRegistry::with_default_evaluators();
        let ctx = ExecutionContext::new(&stores, &catalog, &evaluators, 16);

        let plan = QueryPlan::Update(UpdatePlan {
            mapping: Arc::new(cities()),
            assignments: vec![(1, Expr::Literal(Value::Integer(7)))],
            predicate: None,
        });
        let err = UpdateExecutor.execute(&plan, &ctx).await.unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }
}
