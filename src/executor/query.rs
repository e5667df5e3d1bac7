use std::collections::HashMap;

use async_recursion::async_recursion;
use async_trait::async_trait;

use super::{ExecutionContext, Executor};
use crate::core::{Result, Tuple, Value};
use crate::planner::logical_plan::{
    FilterNode, JoinNode, JoinType, LimitNode, ProjectionNode, ScanNode, SortNode,
};
use crate::planner::{LogicalPlan, QueryPlan};
use crate::result::QueryResult;

/// SELECT: walks the logical plan bottom-up and materializes the rows.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Выполнить логический план
    #[async_recursion]
    async fn execute_plan<'a>(
        &'a self,
        plan: &'a LogicalPlan,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        match plan {
            LogicalPlan::Scan(scan) => self.execute_scan(scan, ctx).await,
            LogicalPlan::Join(join) => self.execute_join(join, ctx).await,
            LogicalPlan::Filter(filter) => self.execute_filter(filter, ctx).await,
            LogicalPlan::Sort(sort) => self.execute_sort(sort, ctx).await,
            LogicalPlan::Limit(limit) => self.execute_limit(limit, ctx).await,
            LogicalPlan::Projection(proj) => self.execute_projection(proj, ctx).await,
        }
    }

    async fn execute_scan(&self, scan: &ScanNode, ctx: &ExecutionContext<'_>) -> Result<Vec<Tuple>> {
        let mut rows = Vec::new();
        ctx.for_each_row(&scan.mapping, |_, row| {
            rows.push(row);
            Ok(())
        })
        .await?;
        Ok(rows)
    }

    /// Hash join: the right input is the build side.
    async fn execute_join<'a>(
        &'a self,
        join: &'a JoinNode,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        let left = self.execute_plan(&join.left, ctx).await?;
        let right = self.execute_plan(&join.right, ctx).await?;
        let right_width = join.right.schema().column_count();

        let mut build: HashMap<Value, Vec<Tuple>> = HashMap::new();
        for row in right {
            let key = join_key(&row, join.right_key);
            // NULL никогда не равен ничему
            if key.is_null() {
                continue;
            }
            build.entry(key).or_default().push(row);
        }

        let mut output = Vec::new();
        for row in left {
            let key = join_key(&row, join.left_key);
            let matches = if key.is_null() { None } else { build.get(&key) };

            match matches {
                Some(matches) => {
                    for other in matches {
                        let mut joined = row.clone();
                        joined.extend(other.iter().cloned());
                        output.push(joined);
                    }
                }
                None if join.join_type == JoinType::Left => {
                    let mut joined = row;
                    joined.extend(std::iter::repeat_n(Value::Null, right_width));
                    output.push(joined);
                }
                None => {}
            }
        }
        Ok(output)
    }

    async fn execute_filter<'a>(
        &'a self,
        filter: &'a FilterNode,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        let input = self.execute_plan(&filter.input, ctx).await?;
        let eval = ctx.evaluation();

        let mut rows = Vec::with_capacity(input.len());
        for row in input {
            if eval.matches(&filter.predicate, &row)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn execute_sort<'a>(
        &'a self,
        sort: &'a SortNode,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        let input = self.execute_plan(&sort.input, ctx).await?;
        super::sort::sort_rows(input, &sort.order_by, &ctx.evaluation())
    }

    async fn execute_limit<'a>(
        &'a self,
        limit: &'a LimitNode,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        let input = self.execute_plan(&limit.input, ctx).await?;
        Ok(input
            .into_iter()
            .skip(limit.offset)
            .take(limit.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn execute_projection<'a>(
        &'a self,
        proj: &'a ProjectionNode,
        ctx: &'a ExecutionContext<'a>,
    ) -> Result<Vec<Tuple>> {
        let input = self.execute_plan(&proj.input, ctx).await?;
        let eval = ctx.evaluation();

        input
            .iter()
            .map(|row| {
                proj.expressions
                    .iter()
                    .map(|expr| eval.evaluate(expr, row))
                    .collect::<Result<Tuple>>()
            })
            .collect()
    }
}

fn join_key(row: &[Value], idx: usize) -> Value {
    row.get(idx).cloned().unwrap_or(Value::Null)
}

#[async_trait]
impl Executor for QueryExecutor {
    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn can_handle(&self, plan: &QueryPlan) -> bool {
        matches!(plan, QueryPlan::Select(_))
    }

    async fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let QueryPlan::Select(select) = plan else {
            return super::ddl::unreachable_plan(self.name(), plan);
        };

        let rows = self.execute_plan(&select.root, ctx).await?;
        Ok(QueryResult::new(select.columns.clone(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DbError;
    use crate::evaluator::EvaluatorRegistry;
    use crate::executor::test_support::{cities, countries};
    use crate::parser::SqlParserAdapter;
    use crate::planner::QueryPlanner;
    use crate::storage::{MappingCatalog, StoreRegistry};

    struct Fixture {
        stores: StoreRegistry,
        catalog: MappingCatalog,
        evaluators: EvaluatorRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = MappingCatalog::new();
            catalog.create_mapping(cities(), false, false).unwrap();
            catalog.create_mapping(countries(), false, false).unwrap();

            let stores = StoreRegistry::new();
            let city = stores.get_or_create("cities");
            city.set("Australia".into(), "Canberra".into()).unwrap();
            city.set("Croatia".into(), "Zagreb".into()).unwrap();
            city.set("Czech Republic".into(), "Prague".into()).unwrap();

            let country = stores.get_or_create("country");
            for (key, iso, name) in [("1", "AU", "Australia"), ("2", "CZ", "Czech Republic")] {
                country
                    .set(
                        key.into(),
                        Value::record([("isoCode", iso), ("country", name)]),
                    )
                    .unwrap();
            }

            Self {
                stores,
                catalog,
                evaluators: EvaluatorRegistry::with_default_evaluators(),
            }
        }

        async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            let parsed = SqlParserAdapter::new().parse(sql)?;
            let plan = QueryPlanner::new().plan(parsed, &self.catalog.snapshot()?, params)?;
            let ctx = ExecutionContext::new(&self.stores, &self.catalog, &self.evaluators, 2);
            QueryExecutor.execute(&plan, &ctx).await
        }
    }

    #[tokio::test]
    async fn test_select_with_order_and_limit() {
        let fx = Fixture::new();
        let result = fx
            .query("SELECT this FROM cities ORDER BY __key DESC LIMIT 2", &[])
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::from("Prague")], vec![Value::from("Zagreb")]]
        );
    }

    #[tokio::test]
    async fn test_inner_join() {
        let fx = Fixture::new();
        let result = fx
            .query(
                "SELECT c.isoCode, cities.this FROM country AS c \
                 JOIN cities ON c.country = cities.__key ORDER BY c.isoCode",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("AU"), Value::from("Canberra")],
                vec![Value::from("CZ"), Value::from("Prague")],
            ]
        );
    }

    #[tokio::test]
    async fn test_left_join_pads_with_nulls() {
        let fx = Fixture::new();
        let result = fx
            .query(
                "SELECT cities.__key, c.isoCode FROM cities \
                 LEFT JOIN country c ON cities.__key = c.country ORDER BY cities.__key",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[1], vec![Value::from("Croatia"), Value::Null]);
    }

    #[tokio::test]
    async fn test_filter_errors_propagate() {
        let fx = Fixture::new();
        let err = fx
            .query("SELECT * FROM cities WHERE __key > 1", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[tokio::test]
    async fn test_missing_map_reads_as_empty() {
        let fx = Fixture::new();
        fx.stores.drop_store("cities");
        let result = fx.query("SELECT * FROM cities", &[]).await.unwrap();
        assert!(result.is_empty());
        assert!(result.is_row_set());
    }
}
