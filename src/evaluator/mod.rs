pub mod plugins;

use tracing::debug;
use crate::core::{DbError, Result, Value};
use crate::parser::ast::Expr;

/// Trait для оценки выражений
///
/// Evaluators see expressions after planning: column references are
/// already [`Expr::ColumnIndex`] and parameters are literals.
pub trait ExpressionEvaluator: Send + Sync {
    /// Имя evaluator'а
    fn name(&self) -> &'static str;

    /// Может ли evaluator обработать это выражение?
    fn can_evaluate(&self, expr: &Expr) -> bool;

    /// Вычислить выражение
    fn evaluate(&self, expr: &Expr, row: &[Value], context: &EvaluationContext<'_>) -> Result<Value>;
}

/// Контекст для оценки выражений
pub struct EvaluationContext<'a> {
    registry: &'a EvaluatorRegistry,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(registry: &'a EvaluatorRegistry) -> Self {
        Self { registry }
    }

    /// Вычислить выражение через подходящий evaluator
    pub fn evaluate(&self, expr: &Expr, row: &[Value]) -> Result<Value> {
        // Базовые случаи (всегда напрямую)
        match expr {
            Expr::ColumnIndex(idx) => {
                return row.get(*idx).cloned().ok_or_else(|| {
                    DbError::FatalStoreError(format!(
                        "Column #{} is out of range for a row of {} values",
                        idx,
                        row.len()
                    ))
                });
            }
            Expr::Literal(val) => return Ok(val.clone()),
            Expr::Column(_) | Expr::CompoundIdentifier(_) | Expr::Parameter(_) => {
                return Err(DbError::ParseError(format!(
                    "Expression '{}' was not bound before evaluation",
                    expr
                )));
            }
            _ => {}
        }

        if let Some(evaluator) = self.registry.find_evaluator(expr) {
            return evaluator.evaluate(expr, row, self);
        }

        Err(DbError::ParseError(format!(
            "No evaluator found for expression: {}",
            expr
        )))
    }

    /// Evaluate a predicate. Only `TRUE` selects the row.
    pub fn matches(&self, predicate: &Expr, row: &[Value]) -> Result<bool> {
        Ok(self.evaluate(predicate, row)?.as_bool())
    }
}

/// Registry для evaluators
pub struct EvaluatorRegistry {
    evaluators: Vec<Box<dyn ExpressionEvaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
        }
    }

    pub fn register(&mut self, evaluator: Box<dyn ExpressionEvaluator>) {
        debug!(evaluator = evaluator.name(), "Registered evaluator");
        self.evaluators.push(evaluator);
    }

    /// Автоматическая регистрация всех встроенных evaluators
    pub fn with_default_evaluators() -> Self {
        use plugins::*;

        let mut registry = Self::new();
        registry.register(Box::new(comparison::ComparisonEvaluator));
        registry.register(Box::new(logical::LogicalEvaluator));
        registry.register(Box::new(logical::NotEvaluator));
        registry.register(Box::new(is_null::IsNullEvaluator));
        registry
    }

    fn find_evaluator(&self, expr: &Expr) -> Option<&dyn ExpressionEvaluator> {
        self.evaluators
            .iter()
            .find(|ev| ev.can_evaluate(expr))
            .map(|boxed| &**boxed)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_default_evaluators()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BinaryOp;

    fn col(idx: usize) -> Box<Expr> {
        Box::new(Expr::ColumnIndex(idx))
    }

    fn lit(v: impl Into<Value>) -> Box<Expr> {
        Box::new(Expr::Literal(v.into()))
    }

    #[test]
    fn test_predicate_over_row() {
        let registry = EvaluatorRegistry::with_default_evaluators();
        let ctx = EvaluationContext::new(&registry);
        let row = vec![Value::from(1), Value::from("Tokyo"), Value::Null];

        let predicate = Expr::BinaryOp {
            left: Box::new(Expr::BinaryOp {
                left: col(0),
                op: BinaryOp::GtEq,
                right: lit(1),
            }),
            op: BinaryOp::And,
            right: Box::new(Expr::IsNull {
                expr: col(2),
                negated: false,
            }),
        };
        assert!(ctx.matches(&predicate, &row).unwrap());

        let not_tokyo = Expr::Not {
            expr: Box::new(Expr::BinaryOp {
                left: col(1),
                op: BinaryOp::Eq,
                right: lit("Tokyo"),
            }),
        };
        assert!(!ctx.matches(&not_tokyo, &row).unwrap());
    }

    #[test]
    fn test_unbound_expressions_are_rejected() {
        let registry = EvaluatorRegistry::with_default_evaluators();
        let ctx = EvaluationContext::new(&registry);
        assert!(ctx.evaluate(&Expr::Parameter(0), &[]).is_err());
        assert!(ctx.evaluate(&Expr::Column("city".into()), &[]).is_err());
    }
}
