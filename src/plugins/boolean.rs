use super::{ExpressionConverter, ExpressionPlugin, ParamScope};
use crate::core::{DbError, Result};
use crate::parser::ast::Expr;
use sqlparser::ast as sql_ast;

pub struct BooleanPlugin;

impl ExpressionPlugin for BooleanPlugin {
    fn name(&self) -> &'static str {
        "BOOLEAN"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        match expr {
            sql_ast::Expr::BinaryOp { op, .. } => {
                matches!(
                    op,
                    sql_ast::BinaryOperator::And | sql_ast::BinaryOperator::Or
                )
            }
            sql_ast::Expr::UnaryOp { op, .. } => {
                matches!(op, sql_ast::UnaryOperator::Not)
            }
            _ => false,
        }
    }

    fn convert(&self, expr: sql_ast::Expr, converter: &ExpressionConverter, params: &mut ParamScope) -> Result<Expr> {
        match expr {
            // AND/OR
            sql_ast::Expr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
                left: Box::new(converter.convert(*left, params)?),
                op: converter.convert_binary_op(&op)?,
                right: Box::new(converter.convert(*right, params)?),
            }),
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Not,
                expr,
            } => Ok(Expr::Not {
                expr: Box::new(converter.convert(*expr, params)?),
            }),
            other => Err(DbError::ParseError(format!("Not a boolean expression: {}", other))),
        }
    }
}
