use super::{ExpressionConverter, ExpressionPlugin, ParamScope};
use crate::core::{DbError, Result};
use crate::parser::ast::Expr;
use sqlparser::ast as sql_ast;

pub struct NestedPlugin;

impl ExpressionPlugin for NestedPlugin {
    fn name(&self) -> &'static str {
        "NESTED"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::Nested(_))
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter, params: &mut ParamScope) -> Result<Expr> {
        match expr {
            // Скобки только группируют, в нашем AST их нет
            sql_ast::Expr::Nested(inner) => converter.convert(*inner, params),
            other => Err(DbError::ParseError(format!("Not a nested expression: {}", other))),
        }
    }
}
