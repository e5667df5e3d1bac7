use super::{ExpressionConverter, ExpressionPlugin, ParamScope};
use crate::core::{DbError, Result};
use crate::parser::ast::Expr;
use sqlparser::ast as sql_ast;

pub struct ComparisonPlugin;

impl ExpressionPlugin for ComparisonPlugin {
    fn name(&self) -> &'static str {
        "COMPARISON"
    }

    fn can_handle(&self, expr: &sql_ast::Expr) -> bool {
        if let sql_ast::Expr::BinaryOp { op, .. } = expr {
            matches!(
                op,
                sql_ast::BinaryOperator::Eq
                    | sql_ast::BinaryOperator::NotEq
                    | sql_ast::BinaryOperator::Lt
                    | sql_ast::BinaryOperator::LtEq
                    | sql_ast::BinaryOperator::Gt
                    | sql_ast::BinaryOperator::GtEq
            )
        } else {
            false
        }
    }

    fn convert(
        &self,
        expr: sql_ast::Expr,
        converter: &ExpressionConverter,
        params: &mut ParamScope,
    ) -> Result<Expr> {
        match expr {
            sql_ast::Expr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
                left: Box::new(converter.convert(*left, params)?),
                op: converter.convert_binary_op(&op)?,
                right: Box::new(converter.convert(*right, params)?),
            }),
            other => Err(DbError::ParseError(format!("Not a comparison: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::parser::ast::BinaryOp;

    #[test]
    fn test_comparison_with_placeholder() {
        let converter = ExpressionConverter::new();
        let mut params = ParamScope::new();
        let sql = sql_ast::Expr::BinaryOp {
            left: Box::new(sql_ast::Expr::Identifier(sql_ast::Ident::new("__key"))),
            op: sql_ast::BinaryOperator::Eq,
            right: Box::new(sql_ast::Expr::value(sql_ast::Value::Placeholder("?".into()))),
        };
        let expr = converter.convert(sql, &mut params).unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                left: Box::new(Expr::Column("__key".into())),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Parameter(0)),
            }
        );
        assert_eq!(params.count(), 1);

        let literal = sql_ast::Expr::value(sql_ast::Value::Number("42".into(), false));
        assert_eq!(
            converter.convert(literal, &mut params).unwrap(),
            Expr::Literal(Value::Integer(42))
        );
    }
}
