#![allow(clippy::module_inception)]
pub mod logical_plan;
pub mod planner;

pub use logical_plan::{LogicalPlan, QueryPlan};
pub use planner::QueryPlanner;
