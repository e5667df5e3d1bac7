use sqlparser::ast as sql_ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Tokenizer;
use crate::core::{DbError, Result};
use crate::parser::ast::*;
use crate::parser::mapping;
use crate::plugins::{ExpressionConverter, ParamScope};

/// Default upper bound on statement text, in bytes.
pub const DEFAULT_MAX_STATEMENT_LEN: usize = 1024 * 1024;

pub struct SqlParserAdapter {
    dialect: GenericDialect,
    expr_converter: ExpressionConverter,
    max_statement_len: usize,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
            expr_converter: ExpressionConverter::new(),
            max_statement_len: DEFAULT_MAX_STATEMENT_LEN,
        }
    }

    pub fn with_max_statement_len(mut self, max_statement_len: usize) -> Self {
        self.max_statement_len = max_statement_len;
        self
    }

    /// Parse exactly one statement.
    pub fn parse(&self, sql: &str) -> Result<ParsedStatement> {
        if sql.len() > self.max_statement_len {
            return Err(DbError::ParseError(format!(
                "Statement is {} bytes long, the limit is {}",
                sql.len(),
                self.max_statement_len
            )));
        }
        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(DbError::ParseError("Empty statement".into()));
        }

        // Mapping DDL is not part of any sqlparser dialect
        let tokens = Tokenizer::new(&self.dialect, sql)
            .tokenize()
            .map_err(|e| DbError::ParseError(e.to_string()))?;
        if mapping::is_mapping_statement(&tokens) {
            return Ok(ParsedStatement {
                statement: mapping::parse_mapping_statement(tokens)?,
                param_count: 0,
            });
        }

        let mut external_stmts = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| DbError::ParseError(e.to_string()))?;
        if external_stmts.len() != 1 {
            return Err(DbError::ParseError(format!(
                "Expected exactly one statement, got {}",
                external_stmts.len()
            )));
        }

        let mut params = ParamScope::new();
        let statement = match external_stmts.pop() {
            Some(stmt) => self.convert_statement(stmt, &mut params)?,
            None => return Err(DbError::ParseError("Empty statement".into())),
        };
        Ok(ParsedStatement {
            statement,
            param_count: params.count(),
        })
    }

    fn convert_statement(&self, stmt: sql_ast::Statement, params: &mut ParamScope) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::Insert(insert) => {
                Ok(Statement::Insert(self.convert_insert(insert, params)?))
            }
            sql_ast::Statement::Query(query) => {
                Ok(Statement::Query(self.convert_query(*query, params)?))
            }
            sql_ast::Statement::Delete(delete) => {
                Ok(Statement::Delete(self.convert_delete(delete, params)?))
            }
            sql_ast::Statement::Update { table, assignments, selection, .. } => {
                Ok(Statement::Update(self.convert_update(table, assignments, selection, params)?))
            }
            other => Err(DbError::ParseError(format!(
                "Statement type not supported: {}",
                other
            ))),
        }
    }

    fn convert_insert(&self, insert: sql_ast::Insert, params: &mut ParamScope) -> Result<InsertStmt> {
        let table_name = match &insert.table {
            sql_ast::TableObject::TableName(name) => extract_table_name(name)?,
            other => {
                return Err(DbError::ParseError(format!(
                    "Unsupported INSERT target: {}",
                    other
                )));
            }
        };

        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.into_iter().map(|id| id.value).collect())
        };

        let Some(source) = insert.source else {
            return Err(DbError::ParseError("INSERT requires a VALUES clause".into()));
        };
        let sql_ast::SetExpr::Values(vals) = *source.body else {
            return Err(DbError::ParseError("Only INSERT ... VALUES is supported".into()));
        };
        let values = vals
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|expr| self.expr_converter.convert(expr, params))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InsertStmt {
            table_name,
            columns,
            values,
        })
    }

    fn convert_delete(&self, delete: sql_ast::Delete, params: &mut ParamScope) -> Result<DeleteStmt> {
        // In sqlparser, DELETE has a FromTable enum variant
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let table_name = match tables.as_slice() {
            [table] if table.joins.is_empty() => match &table.relation {
                sql_ast::TableFactor::Table { name, .. } => extract_table_name(name)?,
                _ => {
                    return Err(DbError::ParseError(
                        "Complex table references not supported in DELETE".into(),
                    ));
                }
            },
            _ => {
                return Err(DbError::ParseError(
                    "DELETE requires exactly one table".into(),
                ));
            }
        };

        let selection = delete
            .selection
            .map(|expr| self.expr_converter.convert(expr, params))
            .transpose()?;

        Ok(DeleteStmt {
            table_name,
            selection,
        })
    }

    fn convert_update(
        &self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
        params: &mut ParamScope,
    ) -> Result<UpdateStmt> {
        if !table.joins.is_empty() {
            return Err(DbError::ParseError("UPDATE with JOIN is not supported".into()));
        }
        let table_name = match table.relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(&name)?,
            _ => {
                return Err(DbError::ParseError(
                    "Complex table references not supported in UPDATE".into(),
                ));
            }
        };

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match assign.target {
                    sql_ast::AssignmentTarget::ColumnName(col_name) => extract_table_name(&col_name)?,
                    other => {
                        return Err(DbError::ParseError(format!(
                            "Only simple column names supported in UPDATE, got {}",
                            other
                        )));
                    }
                };
                let value = self.expr_converter.convert(assign.value, params)?;
                Ok(Assignment { column, value })
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = selection
            .map(|expr| self.expr_converter.convert(expr, params))
            .transpose()?;

        Ok(UpdateStmt {
            table_name,
            assignments,
            selection,
        })
    }

    fn convert_query(&self, query: sql_ast::Query, params: &mut ParamScope) -> Result<QueryStmt> {
        if query.with.is_some() {
            return Err(DbError::ParseError("WITH clauses are not supported".into()));
        }
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::ParseError("Only SELECT queries supported".into()));
        };
        let select = *select;

        if select.distinct.is_some() {
            return Err(DbError::ParseError("SELECT DISTINCT is not supported".into()));
        }
        match &select.group_by {
            sql_ast::GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
            _ => return Err(DbError::ParseError("GROUP BY is not supported".into())),
        }
        if select.having.is_some() {
            return Err(DbError::ParseError("HAVING is not supported".into()));
        }

        let projection = select
            .projection
            .into_iter()
            .map(|item| self.convert_select_item(item, params))
            .collect::<Result<Vec<_>>>()?;

        let mut from = select.from;
        if from.len() != 1 {
            return Err(DbError::ParseError(
                "SELECT requires exactly one table in FROM, use JOIN to combine tables".into(),
            ));
        }
        let table = from.remove(0);
        let relation = self.convert_table_factor(table.relation)?;
        let mut joins = table.joins;
        let join = match joins.len() {
            0 => None,
            1 => Some(self.convert_join(joins.remove(0), params)?),
            _ => {
                return Err(DbError::ParseError(
                    "Only a single JOIN per query is supported".into(),
                ));
            }
        };

        let selection = select
            .selection
            .map(|expr| self.expr_converter.convert(expr, params))
            .transpose()?;

        // ✅ ORDER BY через OrderBy struct
        let order_by = self.convert_order_by(query.order_by, params)?;

        let (limit, offset) = self.convert_limit_clause(query.limit_clause)?;

        Ok(QueryStmt {
            projection,
            from: relation,
            join,
            selection,
            order_by,
            limit,
            offset,
        })
    }

    fn convert_table_factor(&self, factor: sql_ast::TableFactor) -> Result<TableRef> {
        match factor {
            sql_ast::TableFactor::Table { name, alias, .. } => Ok(TableRef {
                name: extract_table_name(&name)?,
                alias: alias.map(|a| a.name.value),
            }),
            _ => Err(DbError::ParseError(
                "Complex table references not supported".into(),
            )),
        }
    }

    fn convert_join(&self, join: sql_ast::Join, params: &mut ParamScope) -> Result<Join> {
        let relation = self.convert_table_factor(join.relation)?;
        let (kind, constraint) = match join.join_operator {
            sql_ast::JoinOperator::Join(constraint) | sql_ast::JoinOperator::Inner(constraint) => {
                (JoinKind::Inner, constraint)
            }
            sql_ast::JoinOperator::Left(constraint) | sql_ast::JoinOperator::LeftOuter(constraint) => {
                (JoinKind::Left, constraint)
            }
            other => {
                return Err(DbError::ParseError(format!(
                    "Unsupported join type: {:?}, only INNER and LEFT joins are supported",
                    other
                )));
            }
        };
        let on = match constraint {
            sql_ast::JoinConstraint::On(expr) => self.expr_converter.convert(expr, params)?,
            _ => {
                return Err(DbError::ParseError(
                    "JOIN requires an ON condition".into(),
                ));
            }
        };
        Ok(Join { relation, kind, on })
    }

    fn convert_order_by(&self, order_by: Option<sql_ast::OrderBy>, params: &mut ParamScope) -> Result<Vec<OrderByExpr>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };

        match order_by.kind {
            sql_ast::OrderByKind::Expressions(exprs) => exprs
                .into_iter()
                .map(|order| {
                    // ASC по умолчанию
                    let descending = order.options.asc.map(|asc| !asc).unwrap_or(false);
                    Ok(OrderByExpr {
                        expr: self.expr_converter.convert(order.expr, params)?,
                        descending,
                    })
                })
                .collect(),
            sql_ast::OrderByKind::All(_) => {
                Err(DbError::ParseError("ORDER BY ALL not supported".into()))
            }
        }
    }

    fn convert_limit_clause(&self, limit_clause: Option<sql_ast::LimitClause>) -> Result<(Option<usize>, Option<usize>)> {
        let Some(clause) = limit_clause else {
            return Ok((None, None));
        };

        match clause {
            sql_ast::LimitClause::LimitOffset { limit, offset, .. } => {
                let limit = limit.as_ref().map(|e| self.extract_count(e, "LIMIT")).transpose()?;
                let offset = offset
                    .as_ref()
                    .map(|o| self.extract_count(&o.value, "OFFSET"))
                    .transpose()?;
                Ok((limit, offset))
            }
            // MySQL style: LIMIT offset, limit
            sql_ast::LimitClause::OffsetCommaLimit { offset, limit } => Ok((
                Some(self.extract_count(&limit, "LIMIT")?),
                Some(self.extract_count(&offset, "OFFSET")?),
            )),
        }
    }

    fn extract_count(&self, expr: &sql_ast::Expr, clause: &str) -> Result<usize> {
        match expr {
            sql_ast::Expr::Value(value_with_span) => match &value_with_span.value {
                sql_ast::Value::Number(n, _) => n.parse::<usize>().map_err(|_| {
                    DbError::ParseError(format!("Invalid {} value: {}", clause, n))
                }),
                other => Err(DbError::ParseError(format!(
                    "Only numeric {} supported, got: {}",
                    clause, other
                ))),
            },
            other => Err(DbError::ParseError(format!(
                "Only numeric {} supported, got: {}",
                clause, other
            ))),
        }
    }

    fn convert_select_item(&self, item: sql_ast::SelectItem, params: &mut ParamScope) -> Result<SelectItem> {
        match item {
            sql_ast::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
            sql_ast::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
                expr: self.expr_converter.convert(expr, params)?,
                alias: None,
            }),
            sql_ast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
                expr: self.expr_converter.convert(expr, params)?,
                alias: Some(alias.value),
            }),
            other => Err(DbError::ParseError(format!(
                "Unsupported select item: {}",
                other
            ))),
        }
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    match name.0.as_slice() {
        [sql_ast::ObjectNamePart::Identifier(ident)] => Ok(ident.value.clone()),
        _ => Err(DbError::ParseError(format!("Invalid name: {}", name))),
    }
}

// ============================================================================
// TESTS
// ============================================================================
