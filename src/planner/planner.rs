use std::collections::HashSet;
use crate::core::{Column, DataType, DbError, Result, Schema, Value};
use crate::parser::ast::*;
use crate::storage::{Catalog, Mapping};
use super::logical_plan::*;

/// Query planner - resolves names, binds parameters and builds a [`QueryPlan`].
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, parsed: ParsedStatement, catalog: &Catalog, params: &[Value]) -> Result<QueryPlan> {
        if params.len() != parsed.param_count {
            return Err(DbError::ParameterCount {
                expected: parsed.param_count,
                actual: params.len(),
            });
        }
        let binder = Binder { params };

        match parsed.statement {
            Statement::CreateMapping(create) => Ok(QueryPlan::CreateMapping {
                mapping: Mapping::from_definition(create.definition)?,
                replace: create.or_replace,
                if_not_exists: create.if_not_exists,
            }),
            Statement::DropMapping(drop) => Ok(QueryPlan::DropMapping {
                name: drop.name,
                if_exists: drop.if_exists,
            }),
            Statement::ShowMappings => Ok(QueryPlan::ShowMappings),
            Statement::Insert(insert) => self.plan_insert(insert, catalog, &binder),
            Statement::Delete(delete) => self.plan_delete(delete, catalog, &binder),
            Statement::Update(update) => self.plan_update(update, catalog, &binder),
            Statement::Query(query) => self.plan_query(query, catalog, &binder),
        }
    }

    fn plan_insert(&self, insert: InsertStmt, catalog: &Catalog, binder: &Binder<'_>) -> Result<QueryPlan> {
        let mapping = catalog.get_mapping(&insert.table_name)?;
        let width = mapping.columns().len();

        // target ordinal for each position of the VALUES tuples
        let targets: Vec<usize> = match &insert.columns {
            None => (0..width).collect(),
            Some(names) => {
                let mut seen = HashSet::new();
                names
                    .iter()
                    .map(|name| {
                        let idx = mapping.column_index(name)?;
                        if !seen.insert(idx) {
                            return Err(DbError::ParseError(format!(
                                "Column '{}' is listed twice in INSERT into '{}'",
                                name,
                                mapping.name()
                            )));
                        }
                        Ok(idx)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        // VALUES cannot reference columns
        let empty = Schema::default();
        let mut rows = Vec::with_capacity(insert.values.len());
        for tuple in insert.values {
            if tuple.len() != targets.len() {
                return Err(DbError::ColumnCount {
                    table: mapping.name().to_string(),
                    expected: targets.len(),
                    actual: tuple.len(),
                });
            }
            let mut row = vec![Expr::Literal(Value::Null); width];
            for (expr, &target) in tuple.into_iter().zip(&targets) {
                let bound = binder.bind(&expr, &empty)?;
                if let Expr::Literal(value) = &bound {
                    let col = &mapping.columns()[target];
                    check_type(col.data_type, value, &col.name, mapping.name())?;
                }
                row[target] = bound;
            }
            rows.push(row);
        }

        Ok(QueryPlan::Insert(InsertPlan { mapping, rows }))
    }

    fn plan_delete(&self, delete: DeleteStmt, catalog: &Catalog, binder: &Binder<'_>) -> Result<QueryPlan> {
        let mapping = catalog.get_mapping(&delete.table_name)?;
        let schema = mapping.schema(mapping.name());
        let predicate = delete
            .selection
            .map(|expr| binder.bind(&expr, &schema))
            .transpose()?;
        Ok(QueryPlan::Delete(DeletePlan { mapping, predicate }))
    }

    fn plan_update(&self, update: UpdateStmt, catalog: &Catalog, binder: &Binder<'_>) -> Result<QueryPlan> {
        let mapping = catalog.get_mapping(&update.table_name)?;
        let schema = mapping.schema(mapping.name());

        let mut seen = HashSet::new();
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in update.assignments {
            let idx = mapping.column_index(&assignment.column)?;
            if mapping.is_key_column(idx) {
                return Err(DbError::ParseError(format!(
                    "Cannot update key column '{}' of table '{}'",
                    assignment.column,
                    mapping.name()
                )));
            }
            if !seen.insert(idx) {
                return Err(DbError::ParseError(format!(
                    "Column '{}' is assigned more than once",
                    assignment.column
                )));
            }
            let value = binder.bind(&assignment.value, &schema)?;
            if let Expr::Literal(literal) = &value {
                let col = &mapping.columns()[idx];
                check_type(col.data_type, literal, &col.name, mapping.name())?;
            }
            assignments.push((idx, value));
        }

        let predicate = update
            .selection
            .map(|expr| binder.bind(&expr, &schema))
            .transpose()?;

        Ok(QueryPlan::Update(UpdatePlan {
            mapping,
            assignments,
            predicate,
        }))
    }

    fn plan_query(&self, query: QueryStmt, catalog: &Catalog, binder: &Binder<'_>) -> Result<QueryPlan> {
        // Start with table scan
        let mut plan = self.plan_scan(&query.from, catalog)?;

        if let Some(join) = &query.join {
            plan = self.plan_join(plan, join, &query.from, catalog)?;
        }

        // Apply WHERE clause
        if let Some(selection) = &query.selection {
            let predicate = binder.bind(selection, plan.schema())?;
            let schema = plan.schema().clone();
            plan = LogicalPlan::Filter(FilterNode {
                input: Box::new(plan),
                predicate,
                schema,
            });
        }

        let (expressions, columns) = self.plan_projection(&query.projection, plan.schema(), binder)?;

        // Apply ORDER BY: aliases of the select list first, then input columns
        if !query.order_by.is_empty() {
            let order_by = query
                .order_by
                .iter()
                .map(|order| {
                    let aliased = match &order.expr {
                        Expr::Column(name) => query
                            .projection
                            .iter()
                            .zip(&expressions)
                            .find(|(item, _)| {
                                matches!(item, SelectItem::Expr { alias: Some(alias), .. } if alias == name)
                            })
                            .map(|(_, bound)| bound.clone()),
                        _ => None,
                    };
                    let expr = match aliased {
                        Some(expr) => expr,
                        None => binder.bind(&order.expr, plan.schema())?,
                    };
                    Ok(OrderByExpr {
                        expr,
                        descending: order.descending,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let schema = plan.schema().clone();
            plan = LogicalPlan::Sort(SortNode {
                input: Box::new(plan),
                order_by,
                schema,
            });
        }

        // Apply LIMIT / OFFSET
        if query.limit.is_some() || query.offset.is_some() {
            let schema = plan.schema().clone();
            plan = LogicalPlan::Limit(LimitNode {
                input: Box::new(plan),
                limit: query.limit,
                offset: query.offset.unwrap_or(0),
                schema,
            });
        }

        let root = LogicalPlan::Projection(ProjectionNode {
            input: Box::new(plan),
            expressions,
            schema: Schema::new(columns.clone()),
        });
        Ok(QueryPlan::Select(SelectPlan { root, columns }))
    }

    fn plan_scan(&self, table: &TableRef, catalog: &Catalog) -> Result<LogicalPlan> {
        let mapping = catalog.get_mapping(&table.name)?;
        let schema = mapping.schema(table.qualifier());
        Ok(LogicalPlan::Scan(ScanNode { mapping, schema }))
    }

    fn plan_join(&self, left: LogicalPlan, join: &Join, from: &TableRef, catalog: &Catalog) -> Result<LogicalPlan> {
        if join.relation.qualifier() == from.qualifier() {
            return Err(DbError::ParseError(format!(
                "Table name '{}' is used twice, give one side an alias",
                from.qualifier()
            )));
        }
        let right = self.plan_scan(&join.relation, catalog)?;
        let left_width = left.schema().column_count();
        let schema = left.schema().join(right.schema());

        let Expr::BinaryOp {
            left: lhs,
            op: BinaryOp::Eq,
            right: rhs,
        } = &join.on
        else {
            return Err(equi_join_error(&join.on));
        };
        let a = resolve_column(lhs, &schema).ok_or_else(|| equi_join_error(&join.on))??;
        let b = resolve_column(rhs, &schema).ok_or_else(|| equi_join_error(&join.on))??;
        let (left_key, right_key) = match (a < left_width, b < left_width) {
            (true, false) => (a, b - left_width),
            (false, true) => (b, a - left_width),
            _ => return Err(equi_join_error(&join.on)),
        };

        let left_type = schema.columns()[left_key].data_type;
        let right_type = schema.columns()[left_width + right_key].data_type;
        if !join_compatible(left_type, right_type) {
            return Err(DbError::TypeMismatch(format!(
                "Cannot join {} with {} in '{}'",
                type_label(left_type),
                type_label(right_type),
                join.on
            )));
        }

        Ok(LogicalPlan::Join(JoinNode {
            left: Box::new(left),
            right: Box::new(right),
            left_key,
            right_key,
            join_type: match join.kind {
                JoinKind::Inner => JoinType::Inner,
                JoinKind::Left => JoinType::Left,
            },
            schema,
        }))
    }

    fn plan_projection(&self, projection: &[SelectItem], input: &Schema, binder: &Binder<'_>) -> Result<(Vec<Expr>, Vec<Column>)> {
        let mut expressions = Vec::new();
        let mut columns = Vec::new();

        for item in projection {
            match item {
                SelectItem::Wildcard => {
                    for (idx, col) in input.columns().iter().enumerate() {
                        expressions.push(Expr::ColumnIndex(idx));
                        columns.push(Column {
                            qualifier: None,
                            ..col.clone()
                        });
                    }
                }
                SelectItem::Expr { expr, alias } => {
                    let bound = binder.bind(expr, input)?;
                    let name = match (alias, expr) {
                        (Some(alias), _) => alias.clone(),
                        (None, Expr::Column(name)) => name.clone(),
                        (None, Expr::CompoundIdentifier(parts)) => {
                            parts.last().cloned().unwrap_or_else(|| expr.to_string())
                        }
                        (None, other) => other.to_string(),
                    };
                    let data_type = match &bound {
                        Expr::ColumnIndex(idx) => input.columns()[*idx].data_type,
                        Expr::Literal(value) => literal_type(value),
                        Expr::BinaryOp { .. } | Expr::IsNull { .. } | Expr::Not { .. } => Some(DataType::Boolean),
                        _ => None,
                    };
                    expressions.push(bound);
                    columns.push(Column {
                        name,
                        data_type,
                        qualifier: None,
                    });
                }
            }
        }

        Ok((expressions, columns))
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves column names to ordinals and substitutes parameter values.
struct Binder<'a> {
    params: &'a [Value],
}

impl Binder<'_> {
    fn bind(&self, expr: &Expr, schema: &Schema) -> Result<Expr> {
        match expr {
            Expr::Column(_) | Expr::CompoundIdentifier(_) => match resolve_column(expr, schema) {
                Some(idx) => Ok(Expr::ColumnIndex(idx?)),
                None => Err(DbError::ParseError(format!("Invalid column reference '{}'", expr))),
            },
            Expr::ColumnIndex(_) | Expr::Literal(_) => Ok(expr.clone()),
            Expr::Parameter(idx) => self.param(*idx).map(Expr::Literal),
            Expr::BinaryOp { left, op, right } => {
                let left_bound = self.bind(left, schema)?;
                let right_bound = self.bind(right, schema)?;
                if op.is_comparison() {
                    check_operand_against_column(right, &right_bound, &left_bound, schema)?;
                    check_operand_against_column(left, &left_bound, &right_bound, schema)?;
                }
                Ok(Expr::BinaryOp {
                    left: Box::new(left_bound),
                    op: *op,
                    right: Box::new(right_bound),
                })
            }
            Expr::IsNull { expr, negated } => Ok(Expr::IsNull {
                expr: Box::new(self.bind(expr, schema)?),
                negated: *negated,
            }),
            Expr::Not { expr } => Ok(Expr::Not {
                expr: Box::new(self.bind(expr, schema)?),
            }),
        }
    }

    fn param(&self, idx: usize) -> Result<Value> {
        self.params.get(idx).cloned().ok_or(DbError::ParameterCount {
            expected: idx + 1,
            actual: self.params.len(),
        })
    }
}

/// A constant compared with a column must fit the column's type, so the
/// outcome does not depend on whether any row is scanned.
fn check_operand_against_column(original: &Expr, bound: &Expr, other: &Expr, schema: &Schema) -> Result<()> {
    let (Expr::Literal(value), Expr::ColumnIndex(c)) = (bound, other) else {
        return Ok(());
    };
    let column = &schema.columns()[*c];
    let Some(data_type) = column.data_type else {
        return Ok(());
    };
    if comparable(data_type, value) {
        return Ok(());
    }
    let operand = match original {
        Expr::Parameter(p) => format!("Parameter {}", p + 1),
        _ => "Literal".to_string(),
    };
    Err(DbError::TypeMismatch(format!(
        "{} ({} value {}) cannot be compared with column '{}' of type {}",
        operand,
        value.type_name(),
        value,
        column.name,
        data_type
    )))
}

fn comparable(data_type: DataType, value: &Value) -> bool {
    matches!(
        (data_type, value),
        (_, Value::Null)
            | (DataType::Varchar, Value::Text(_))
            | (DataType::Boolean, Value::Boolean(_))
            | (DataType::Int | DataType::BigInt, Value::Integer(_))
    )
}

/// `Some(ordinal)` for column references, `None` for anything else.
fn resolve_column(expr: &Expr, schema: &Schema) -> Option<Result<usize>> {
    match expr {
        Expr::Column(name) => Some(schema.resolve(None, name)),
        Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [qualifier, name] => Some(schema.resolve(Some(qualifier), name)),
            _ => None,
        },
        _ => None,
    }
}

fn check_type(data_type: DataType, value: &Value, column: &str, table: &str) -> Result<()> {
    if data_type.is_compatible(value) {
        return Ok(());
    }
    Err(DbError::TypeMismatch(format!(
        "Cannot write {} value {} into column '{}' ({}) of table '{}'",
        value.type_name(),
        value,
        column,
        data_type,
        table
    )))
}

fn join_compatible(left: Option<DataType>, right: Option<DataType>) -> bool {
    use DataType::*;
    match (left, right) {
        (Some(Int | BigInt), Some(Int | BigInt)) => true,
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn type_label(data_type: Option<DataType>) -> String {
    data_type.map(|t| t.to_string()).unwrap_or_else(|| "UNKNOWN".into())
}

fn equi_join_error(on: &Expr) -> DbError {
    DbError::ParseError(format!(
        "JOIN condition '{}' must be a single equality between a column of each table",
        on
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParserAdapter;
    use crate::storage::{ColumnSpec, MappingDefinition};

    fn catalog() -> Catalog {
        let country = Mapping::from_definition(MappingDefinition {
            name: "country".into(),
            external_name: None,
            columns: vec![
                ColumnSpec {
                    name: "__key".into(),
                    data_type: DataType::Varchar,
                    external_name: None,
                },
                ColumnSpec {
                    name: "isoCode".into(),
                    data_type: DataType::Varchar,
                    external_name: None,
                },
                ColumnSpec {
                    name: "country".into(),
                    data_type: DataType::Varchar,
                    external_name: None,
                },
            ],
            type_name: "IMap".into(),
            options: vec![
                ("keyFormat".into(), "varchar".into()),
                ("valueFormat".into(), "json-flat".into()),
            ],
        })
        .unwrap();
        let capitals = Mapping::from_definition(MappingDefinition {
            name: "capitals".into(),
            external_name: None,
            columns: vec![],
            type_name: "IMap".into(),
            options: vec![
                ("keyFormat".into(), "varchar".into()),
                ("valueFormat".into(), "varchar".into()),
            ],
        })
        .unwrap();
        Catalog::new()
            .with_mapping(country, false)
            .unwrap()
            .with_mapping(capitals, false)
            .unwrap()
    }

    fn plan(sql: &str, params: &[Value]) -> Result<QueryPlan> {
        let parsed = SqlParserAdapter::new().parse(sql)?;
        QueryPlanner::new().plan(parsed, &catalog(), params)
    }

    #[test]
    fn test_parameter_count_is_checked_first() {
        let err = plan("SELECT * FROM nowhere WHERE __key = ?", &[]).unwrap_err();
        assert!(matches!(err, DbError::ParameterCount { expected: 1, actual: 0 }));
    }

    #[test]
    fn test_parameter_type_is_checked_against_column() {
        let err = plan("SELECT * FROM capitals WHERE __key = ?", &[Value::from(1)]).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
        assert!(plan("SELECT * FROM capitals WHERE __key = ?", &[Value::from("1")]).is_ok());
        assert!(matches!(
            plan("SELECT * FROM capitals WHERE __key = 1", &[]),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            plan("DELETE FROM capitals WHERE 'x' = __key OR this = TRUE", &[]),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(plan("SELECT * FROM capitals WHERE this IS NULL AND __key = 'Tokyo'", &[]).is_ok());
    }

    #[test]
    fn test_select_output_columns() {
        let QueryPlan::Select(select) =
            plan("SELECT __key AS country, this AS city FROM capitals", &[]).unwrap()
        else {
            panic!("Expected SELECT plan");
        };
        let names: Vec<&str> = select.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["country", "city"]);

        let QueryPlan::Select(select) = plan("SELECT * FROM capitals", &[]).unwrap() else {
            panic!("Expected SELECT plan");
        };
        assert_eq!(select.columns.len(), 2);
        assert_eq!(select.columns[1].data_type, Some(DataType::Varchar));
    }

    #[test]
    fn test_join_keys_are_split_per_side() {
        let QueryPlan::Select(select) = plan(
            "SELECT c.country, t.this FROM country c JOIN capitals t ON t.__key = c.isoCode",
            &[],
        )
        .unwrap() else {
            panic!("Expected SELECT plan");
        };
        let LogicalPlan::Projection(projection) = &select.root else {
            panic!("Expected projection at the root");
        };
        let LogicalPlan::Join(join) = projection.input.as_ref() else {
            panic!("Expected join under projection");
        };
        assert_eq!(join.left_key, 1);
        assert_eq!(join.right_key, 0);
    }

    #[test]
    fn test_join_requires_single_equality() {
        assert!(matches!(
            plan("SELECT * FROM country c JOIN capitals t ON c.isoCode = c.country", &[]),
            Err(DbError::ParseError(_))
        ));
        assert!(matches!(
            plan("SELECT * FROM country c JOIN capitals t ON c.isoCode > t.__key", &[]),
            Err(DbError::ParseError(_))
        ));
    }

    #[test]
    fn test_unknown_table_and_column() {
        assert!(matches!(plan("SELECT * FROM nowhere", &[]), Err(DbError::UnknownTable(_))));
        assert!(matches!(
            plan("SELECT population FROM capitals", &[]),
            Err(DbError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_arity_and_key_updates() {
        assert!(matches!(
            plan("INSERT INTO capitals VALUES ('1', 'Tokyo', 'extra')", &[]),
            Err(DbError::ColumnCount { expected: 2, actual: 3, .. })
        ));
        assert!(matches!(
            plan("INSERT INTO capitals VALUES (1, 'Tokyo')", &[]),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            plan("UPDATE capitals SET __key = 'x'", &[]),
            Err(DbError::ParseError(_))
        ));
    }
}
