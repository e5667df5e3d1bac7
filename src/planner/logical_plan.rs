use std::sync::Arc;
use crate::core::{Column, Schema, Value};
use crate::parser::ast::{Expr, OrderByExpr};
use crate::storage::Mapping;

/// Bound form of one statement, ready for an executor.
#[derive(Debug, Clone)]
pub enum QueryPlan {
    CreateMapping {
        mapping: Mapping,
        replace: bool,
        if_not_exists: bool,
    },
    DropMapping {
        name: String,
        if_exists: bool,
    },
    ShowMappings,
    Insert(InsertPlan),
    Delete(DeletePlan),
    Update(UpdatePlan),
    Select(SelectPlan),
}

impl QueryPlan {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryPlan::CreateMapping { .. } => "CREATE MAPPING",
            QueryPlan::DropMapping { .. } => "DROP MAPPING",
            QueryPlan::ShowMappings => "SHOW MAPPINGS",
            QueryPlan::Insert(_) => "INSERT",
            QueryPlan::Delete(_) => "DELETE",
            QueryPlan::Update(_) => "UPDATE",
            QueryPlan::Select(_) => "SELECT",
        }
    }
}

/// Rows to insert, one expression per mapping column in declared order.
/// Columns left out of the INSERT column list hold `NULL`.
#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub mapping: Arc<Mapping>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub mapping: Arc<Mapping>,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub mapping: Arc<Mapping>,
    /// (column ordinal, new value evaluated against the old row)
    pub assignments: Vec<(usize, Expr)>,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub root: LogicalPlan,
    pub columns: Vec<Column>,
}

/// Logical plan nodes - high-level operations
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Read every entry of a mapping's backing map
    Scan(ScanNode),

    /// Equi-join two inputs
    Join(JoinNode),

    /// Filter rows
    Filter(FilterNode),

    /// Sort rows
    Sort(SortNode),

    /// Skip and limit rows
    Limit(LimitNode),

    /// Project columns
    Projection(ProjectionNode),
}

#[derive(Debug, Clone)]
pub struct ScanNode {
    pub mapping: Arc<Mapping>,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct JoinNode {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
    /// Ordinal of the join column in the left input
    pub left_key: usize,
    /// Ordinal of the join column in the right input
    pub right_key: usize,
    pub join_type: JoinType,
    pub schema: Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct FilterNode {
    pub input: Box<LogicalPlan>,
    pub predicate: Expr,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct SortNode {
    pub input: Box<LogicalPlan>,
    pub order_by: Vec<OrderByExpr>,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct LimitNode {
    pub input: Box<LogicalPlan>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct ProjectionNode {
    pub input: Box<LogicalPlan>,
    pub expressions: Vec<Expr>,
    pub schema: Schema,
}

impl LogicalPlan {
    /// Get the output schema of this plan
    pub fn schema(&self) -> &Schema {
        match self {
            LogicalPlan::Scan(node) => &node.schema,
            LogicalPlan::Join(node) => &node.schema,
            LogicalPlan::Filter(node) => &node.schema,
            LogicalPlan::Sort(node) => &node.schema,
            LogicalPlan::Limit(node) => &node.schema,
            LogicalPlan::Projection(node) => &node.schema,
        }
    }
}

/// Output type of a constant, if it has one.
pub(crate) fn literal_type(value: &Value) -> Option<crate::core::DataType> {
    use crate::core::DataType;
    match value {
        Value::Text(_) => Some(DataType::Varchar),
        Value::Boolean(_) => Some(DataType::Boolean),
        Value::Integer(_) => Some(DataType::BigInt),
        Value::Null | Value::Record(_) => None,
    }
}
