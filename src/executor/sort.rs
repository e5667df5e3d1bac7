//! ORDER BY support: multi-key stable sort over precomputed sort keys.

use std::cmp::Ordering;

use crate::core::{Result, Tuple, Value};
use crate::evaluator::EvaluationContext;
use crate::parser::ast::OrderByExpr;

/// Where NULLs land relative to other values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    /// ASC → NULLS LAST, DESC → NULLS FIRST
    pub fn default_for_direction(descending: bool) -> Self {
        if descending {
            Self::NullsFirst
        } else {
            Self::NullsLast
        }
    }
}

/// Compare two key values under one ORDER BY item.
pub fn compare_values(left: &Value, right: &Value, descending: bool) -> Result<Ordering> {
    let nulls = NullOrdering::default_for_direction(descending);
    let ordering = match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match nulls {
            NullOrdering::NullsFirst => return Ok(Ordering::Less),
            NullOrdering::NullsLast => return Ok(Ordering::Greater),
        },
        (false, true) => match nulls {
            NullOrdering::NullsFirst => return Ok(Ordering::Greater),
            NullOrdering::NullsLast => return Ok(Ordering::Less),
        },
        (false, false) => left.compare(right)?,
    };

    Ok(if descending { ordering.reverse() } else { ordering })
}

/// Order rows by the ORDER BY items. Equal rows keep their input order.
pub fn sort_rows(
    rows: Vec<Tuple>,
    order_by: &[OrderByExpr],
    eval: &EvaluationContext<'_>,
) -> Result<Vec<Tuple>> {
    if order_by.is_empty() || rows.len() < 2 {
        return Ok(rows);
    }

    // Ключи считаем один раз на строку
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let keys = order_by
                .iter()
                .map(|item| eval.evaluate(&item.expr, &row))
                .collect::<Result<Vec<Value>>>()?;
            Ok((keys, row))
        })
        .collect::<Result<Vec<(Vec<Value>, Tuple)>>>()?;

    let mut first_error = None;
    keyed.sort_by(|(a, _), (b, _)| {
        for (item, (left, right)) in order_by.iter().zip(a.iter().zip(b)) {
            match compare_values(left, right, item.descending) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => return ordering,
                Err(e) => {
                    first_error.get_or_insert(e);
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    });

    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}
