use super::{ExpressionConverter, ExpressionPlugin, ParamScope};
use crate::core::{DbError, Result};
use crate::parser::ast::Expr;
use sqlparser::ast as sql_ast;

pub struct IsNullPlugin;

impl ExpressionPlugin for IsNullPlugin {
    fn name(&self) -> &'static str {
        "IS NULL"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        matches!(expr, sql_ast::Expr::IsNull(_) | sql_ast::Expr::IsNotNull(_))
    }

    fn convert(
        &self,
        expr: sql_ast::Expr,
        converter: &ExpressionConverter,
        params: &mut ParamScope,
    ) -> Result<Expr> {
        match expr {
            sql_ast::Expr::IsNull(e) => Ok(Expr::IsNull {
                expr: Box::new(converter.convert(*e, params)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(e) => Ok(Expr::IsNull {
                expr: Box::new(converter.convert(*e, params)?),
                negated: true,
            }),
            other => Err(DbError::ParseError(format!("Not an IS NULL check: {}", other))),
        }
    }
}
