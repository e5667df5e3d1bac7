use std::cmp::Ordering;
use super::super::{EvaluationContext, ExpressionEvaluator};
use crate::core::{DbError, Result, Value};
use crate::parser::ast::{BinaryOp, Expr};

pub struct ComparisonEvaluator;

impl ExpressionEvaluator for ComparisonEvaluator {
    fn name(&self) -> &'static str {
        "COMPARISON"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::BinaryOp { op, .. } if op.is_comparison())
    }

    fn evaluate(&self, expr: &Expr, row: &[Value], context: &EvaluationContext<'_>) -> Result<Value> {
        let Expr::BinaryOp { left, op, right } = expr else {
            return Err(DbError::ParseError(format!("Not a comparison: {}", expr)));
        };

        let left_val = context.evaluate(left, row)?;
        let right_val = context.evaluate(right, row)?;

        Ok(Value::Boolean(self.compare(&left_val, &right_val, *op)?))
    }
}

impl ComparisonEvaluator {
    /// Comparisons involving NULL are false; mismatched types are an error.
    pub fn compare(&self, left: &Value, right: &Value, op: BinaryOp) -> Result<bool> {
        if left.is_null() || right.is_null() {
            return Ok(false);
        }
        if !left.is_scalar() || !right.is_scalar() {
            return Err(DbError::TypeMismatch(format!(
                "Cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            )));
        }

        let ordering = left.compare(right)?;
        Ok(match op {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::NotEq => ordering != Ordering::Equal,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::GtEq => ordering != Ordering::Less,
            BinaryOp::And | BinaryOp::Or => {
                return Err(DbError::ParseError(format!("{} is not a comparison", op)));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_scalars() {
        let cmp = ComparisonEvaluator;
        assert!(cmp.compare(&Value::from(1), &Value::from(2), BinaryOp::Lt).unwrap());
        assert!(cmp.compare(&Value::from("b"), &Value::from("a"), BinaryOp::GtEq).unwrap());
        assert!(cmp.compare(&Value::from("a"), &Value::from("b"), BinaryOp::NotEq).unwrap());
    }

    #[test]
    fn test_null_never_matches() {
        let cmp = ComparisonEvaluator;
        assert!(!cmp.compare(&Value::Null, &Value::Null, BinaryOp::Eq).unwrap());
        assert!(!cmp.compare(&Value::from(1), &Value::Null, BinaryOp::NotEq).unwrap());
    }

    #[test]
    fn test_text_vs_integer_is_type_mismatch() {
        let cmp = ComparisonEvaluator;
        assert!(matches!(
            cmp.compare(&Value::from("1"), &Value::from(1), BinaryOp::Eq),
            Err(DbError::TypeMismatch(_))
        ));
    }
}
