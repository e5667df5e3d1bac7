use super::super::{EvaluationContext, ExpressionEvaluator};
use crate::core::{DbError, Result, Value};
use crate::parser::ast::{BinaryOp, Expr};

pub struct LogicalEvaluator;

impl ExpressionEvaluator for LogicalEvaluator {
    fn name(&self) -> &'static str {
        "LOGICAL"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::BinaryOp { op: BinaryOp::And | BinaryOp::Or, .. })
    }

    fn evaluate(&self, expr: &Expr, row: &[Value], context: &EvaluationContext<'_>) -> Result<Value> {
        let Expr::BinaryOp { left, op, right } = expr else {
            return Err(DbError::ParseError(format!("Not a logical operation: {}", expr)));
        };

        // short-circuit
        let left_val = truth(context.evaluate(left, row)?)?;
        match op {
            BinaryOp::And if !left_val => Ok(Value::Boolean(false)),
            BinaryOp::Or if left_val => Ok(Value::Boolean(true)),
            _ => Ok(Value::Boolean(truth(context.evaluate(right, row)?)?)),
        }
    }
}

pub struct NotEvaluator;

impl ExpressionEvaluator for NotEvaluator {
    fn name(&self) -> &'static str {
        "NOT"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Not { .. })
    }

    fn evaluate(&self, expr: &Expr, row: &[Value], context: &EvaluationContext<'_>) -> Result<Value> {
        let Expr::Not { expr } = expr else {
            return Err(DbError::ParseError(format!("Not a NOT expression: {}", expr)));
        };
        Ok(Value::Boolean(!truth(context.evaluate(expr, row)?)?))
    }
}

fn truth(value: Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(DbError::TypeMismatch(format!(
            "Expected a BOOLEAN condition, got {} value {}",
            other.type_name(),
            other
        ))),
    }
}
