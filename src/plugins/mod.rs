pub mod comparison;
pub mod is_null;
pub mod nested;
mod boolean;

use tracing::debug;
use crate::core::{DbError, Result, Value};
use crate::parser::ast::{BinaryOp, Expr};
use sqlparser::ast as sql_ast;

/// Трейт для конвертации SQL выражения в наш AST
pub trait ExpressionPlugin: Send + Sync {
    /// Имя плагина для отладки
    fn name(&self) -> &'static str;

    /// Может ли плагин обработать это выражение?
    fn can_handle(&self, expr: &sql_ast::Expr) -> bool;

    /// Конвертировать SQL выражение в наш Expr
    fn convert(
        &self,
        expr: sql_ast::Expr,
        converter: &ExpressionConverter,
        params: &mut ParamScope,
    ) -> Result<Expr>;
}

/// Placeholder bookkeeping for one statement.
///
/// `?` placeholders are numbered in order of appearance, `$n` refers to slot
/// `n - 1`. A statement may use one style or the other, not both.
#[derive(Debug, Default)]
pub struct ParamScope {
    positional: usize,
    numbered_max: usize,
}

impl ParamScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, placeholder: &str) -> Result<usize> {
        if placeholder == "?" {
            if self.numbered_max > 0 {
                return Err(mixed_placeholders());
            }
            self.positional += 1;
            return Ok(self.positional - 1);
        }

        let n = placeholder
            .strip_prefix('$')
            .and_then(|digits| digits.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                DbError::ParseError(format!("Unsupported parameter placeholder '{}'", placeholder))
            })?;
        if self.positional > 0 {
            return Err(mixed_placeholders());
        }
        self.numbered_max = self.numbered_max.max(n);
        Ok(n - 1)
    }

    /// Number of parameter values the statement expects.
    pub fn count(&self) -> usize {
        self.positional.max(self.numbered_max)
    }
}

fn mixed_placeholders() -> DbError {
    DbError::ParseError("Cannot mix '?' and '$n' parameter placeholders in one statement".into())
}

/// Реестр плагинов для выражений
pub struct ExpressionPluginRegistry {
    plugins: Vec<Box<dyn ExpressionPlugin>>,
}

impl ExpressionPluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Зарегистрировать плагин
    pub fn register(&mut self, plugin: Box<dyn ExpressionPlugin>) {
        debug!(plugin = plugin.name(), "Registered expression plugin");
        self.plugins.push(plugin);
    }

    pub fn with_default_plugins() -> Self {
        let mut registry = Self::new();

        // Nested должен быть первым, чтобы обрабатывать скобки
        registry.register(Box::new(nested::NestedPlugin));
        registry.register(Box::new(is_null::IsNullPlugin));
        registry.register(Box::new(boolean::BooleanPlugin));
        registry.register(Box::new(comparison::ComparisonPlugin));

        registry
    }

    /// Найти подходящий плагин для выражения
    pub fn find_plugin(&self, expr: &sql_ast::Expr) -> Option<&dyn ExpressionPlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.can_handle(expr))
            .map(|boxed| &**boxed)
    }
}

impl Default for ExpressionPluginRegistry {
    fn default() -> Self {
        Self::with_default_plugins()
    }
}

/// Конвертер выражений с поддержкой плагинов
pub struct ExpressionConverter {
    registry: ExpressionPluginRegistry,
}

impl ExpressionConverter {
    pub fn new() -> Self {
        Self {
            registry: ExpressionPluginRegistry::with_default_plugins(),
        }
    }

    /// Конвертировать выражение используя плагины
    pub fn convert(&self, expr: sql_ast::Expr, params: &mut ParamScope) -> Result<Expr> {
        // Базовые случаи (всегда обрабатываются напрямую)
        match &expr {
            sql_ast::Expr::Identifier(ident) => {
                return Ok(Expr::Column(ident.value.clone()));
            }
            sql_ast::Expr::CompoundIdentifier(idents) => {
                let parts: Vec<String> = idents.iter().map(|i| i.value.clone()).collect();
                if parts.len() != 2 {
                    return Err(DbError::ParseError(format!(
                        "Column reference '{}' must be 'column' or 'table.column'",
                        parts.join(".")
                    )));
                }
                return Ok(Expr::CompoundIdentifier(parts));
            }
            sql_ast::Expr::Value(val) => {
                if let sql_ast::Value::Placeholder(placeholder) = &val.value {
                    return Ok(Expr::Parameter(params.bind(placeholder)?));
                }
                return Ok(Expr::Literal(self.convert_value(&val.value)?));
            }
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Minus,
                expr: inner,
            } => {
                if let sql_ast::Expr::Value(val) = inner.as_ref()
                    && let sql_ast::Value::Number(n, _) = &val.value
                {
                    return self.parse_integer(&format!("-{}", n)).map(Expr::Literal);
                }
            }
            _ => {}
        }

        // Попытка обработать через плагины
        if let Some(plugin) = self.registry.find_plugin(&expr) {
            return plugin.convert(expr, self, params);
        }

        Err(DbError::ParseError(format!("Unsupported expression: {}", expr)))
    }

    /// Helper для конвертации значений
    pub fn convert_value(&self, val: &sql_ast::Value) -> Result<Value> {
        match val {
            sql_ast::Value::Number(n, _) => self.parse_integer(n),
            sql_ast::Value::SingleQuotedString(s) => Ok(Value::Text(s.clone())),
            sql_ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
            sql_ast::Value::Null => Ok(Value::Null),
            _ => Err(DbError::ParseError(format!("Unsupported literal: {}", val))),
        }
    }

    fn parse_integer(&self, n: &str) -> Result<Value> {
        n.parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| DbError::TypeMismatch(format!("Unsupported numeric literal: {}", n)))
    }

    /// Helper для конвертации бинарных операторов
    pub fn convert_binary_op(&self, op: &sql_ast::BinaryOperator) -> Result<BinaryOp> {
        use sql_ast::BinaryOperator as SqlOp;

        match op {
            SqlOp::Eq => Ok(BinaryOp::Eq),
            SqlOp::NotEq => Ok(BinaryOp::NotEq),
            SqlOp::Lt => Ok(BinaryOp::Lt),
            SqlOp::LtEq => Ok(BinaryOp::LtEq),
            SqlOp::Gt => Ok(BinaryOp::Gt),
            SqlOp::GtEq => Ok(BinaryOp::GtEq),

            SqlOp::And => Ok(BinaryOp::And),
            SqlOp::Or => Ok(BinaryOp::Or),

            _ => Err(DbError::ParseError(format!(
                "Unsupported binary operator: {}",
                op
            ))),
        }
    }
}

impl Default for ExpressionConverter {
    fn default() -> Self {
        Self::new()
    }
}
