//! Query descriptions accepted by the content store gateway
//!
//! The remote collection supports equality filters, a bounded `in` filter
//! (at most [`IN_FILTER_LIMIT`] values), range filters on a single field,
//! ordering by one or two fields, a result limit, and cursor-style
//! `start_after` pagination keyed by document id. Compound-index-dependent
//! shapes are the caller's responsibility to avoid.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Maximum number of values the store accepts in one `in` filter
pub const IN_FILTER_LIMIT: usize = 10;

/// Split an id set into store-acceptable `in` filter chunks
pub fn chunk_for_in(values: &[String]) -> impl Iterator<Item = &[String]> {
    values.chunks(IN_FILTER_LIMIT)
}

/// A typed filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl FieldValue {
    /// Ordering between two operands of the same variant; None across variants
    pub fn partial_cmp(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Str(a), FieldValue::Str(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Time(a), FieldValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Range comparison operators supported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

/// A single filter clause
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: FieldValue },
    In { field: String, values: Vec<String> },
    Range { field: String, op: RangeOp, value: FieldValue },
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One ordering clause
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// A complete query against the content collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<Order>,
    pub limit: Option<usize>,
    /// Document id cursor: results strictly after this id in sort order
    pub start_after: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq_str(mut self, field: &str, value: &str) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: FieldValue::Str(value.to_string()),
        });
        self
    }

    pub fn filter_eq_int(mut self, field: &str, value: i64) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: FieldValue::Int(value),
        });
        self
    }

    pub fn filter_eq_bool(mut self, field: &str, value: bool) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: FieldValue::Bool(value),
        });
        self
    }

    pub fn filter_in(mut self, field: &str, values: &[String]) -> Self {
        self.filters.push(Filter::In {
            field: field.to_string(),
            values: values.to_vec(),
        });
        self
    }

    pub fn filter_range_time(mut self, field: &str, op: RangeOp, value: DateTime<Utc>) -> Self {
        self.filters.push(Filter::Range {
            field: field.to_string(),
            op,
            value: FieldValue::Time(value),
        });
        self
    }

    pub fn order_asc(mut self, field: &str) -> Self {
        self.order_by.push(Order {
            field: field.to_string(),
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_by.push(Order {
            field: field.to_string(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, doc_id: &str) -> Self {
        self.start_after = Some(doc_id.to_string());
        self
    }

    /// Shape validation mirroring what the remote store enforces
    ///
    /// Returns the rejection message the store would give, if any.
    pub fn validate(&self) -> Result<(), String> {
        for filter in &self.filters {
            if let Filter::In { field, values } = filter {
                if values.is_empty() {
                    return Err(format!("empty in filter on {}", field));
                }
                if values.len() > IN_FILTER_LIMIT {
                    return Err(format!(
                        "in filter on {} has {} values, limit is {}",
                        field,
                        values.len(),
                        IN_FILTER_LIMIT
                    ));
                }
            }
        }
        if self.order_by.len() > 2 {
            return Err(format!(
                "ordering by {} fields, limit is 2",
                self.order_by.len()
            ));
        }
        Ok(())
    }
}
