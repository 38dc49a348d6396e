//! The scope builder: typed accumulation of query constraints.
//!
//! A [`Scope`] collects conditions for one mapped type and renders them as a
//! parameterized SQL tail. Conditions form a closed set — raw fragments with
//! `?` markers, the primary-key shorthand, and filter values — so dispatch
//! is total by construction.
//!
//! # Filter semantics
//!
//! A filter is a value of the mapped type itself where non-zero fields mean
//! "constrain on this column". Zero is how *unset* is distinguished from
//! *explicitly zero*: a scalar filter field cannot express "column equals
//! the zero value". Array-valued fields use deep comparison (an empty array
//! is unset) and render as `IN (...)` with each element bound separately.

use std::marker::PhantomData;

use sqlrow_core::{Dialect, Error, Model, Record, Result, Value};

use crate::tail;

/// One accumulated condition.
#[derive(Debug, Clone)]
enum Cond {
    /// Raw SQL with `?` markers and their bound values.
    Raw { sql: String, args: Vec<Value> },
    /// Shorthand for "primary key equals this value".
    Pk(Value),
    /// Column/value pairs extracted from a filter value.
    Fields(Vec<(String, Value)>),
}

/// Accumulates `WHERE`/`GROUP BY`/`ORDER BY`/`LIMIT` constraints for the
/// mapped type `M` and renders them with a single, globally increasing
/// placeholder counter.
#[derive(Debug, Clone)]
pub struct Scope<M: Model> {
    conds: Vec<Cond>,
    order: Vec<String>,
    group: Vec<String>,
    limit: Option<u64>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Model> Default for Scope<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Scope<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            conds: Vec::new(),
            order: Vec::new(),
            group: Vec::new(),
            limit: None,
            _marker: PhantomData,
        }
    }

    /// Add a raw condition with positional `?` markers.
    ///
    /// The marker count must equal the argument count; a mismatch is
    /// rejected here, before any SQL is built.
    pub fn raw(mut self, sql: impl Into<String>, args: impl Into<Vec<Value>>) -> Result<Self> {
        let sql = sql.into();
        let args = args.into();
        let markers = tail::marker_count(&sql);
        if markers != args.len() {
            return Err(Error::malformed(format!(
                "{markers} placeholder(s) in {sql:?} but {} argument(s)",
                args.len()
            )));
        }
        self.conds.push(Cond::Raw { sql, args });
        Ok(self)
    }

    /// Constrain on every filterable, non-zero field of `filter`.
    #[must_use]
    pub fn filter(mut self, filter: &M) -> Self {
        let info = M::info();
        let mut pairs = Vec::new();
        for (field, value) in info.fields().iter().zip(filter.values()) {
            if !field.filterable || value.is_zero() {
                continue;
            }
            pairs.push((field.column.clone(), value));
        }
        if !pairs.is_empty() {
            self.conds.push(Cond::Fields(pairs));
        }
        self
    }

    /// Append an `ORDER BY` expression.
    #[must_use]
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order.push(expr.into());
        self
    }

    /// Append a `GROUP BY` expression.
    #[must_use]
    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group.push(expr.into());
        self
    }

    /// Limit the number of result rows. Rendered by the select engine with
    /// the dialect's limiting syntax, not in the tail.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// The requested row limit, if any.
    #[must_use]
    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn has_conditions(&self) -> bool {
        !self.conds.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
            && self.order.is_empty()
            && self.group.is_empty()
            && self.limit.is_none()
    }

    /// Render the tail, numbering placeholders from 1.
    pub fn tail(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        self.tail_from(dialect, 1)
    }

    /// Render the tail, numbering placeholders from `start`.
    ///
    /// Conditions are individually parenthesized and joined with `AND`; the
    /// placeholder counter increases across the whole chain, so the rendered
    /// placeholder count always equals the returned argument count.
    pub fn tail_from(&self, dialect: Dialect, start: usize) -> Result<(String, Vec<Value>)> {
        let mut args = Vec::new();
        let mut next = start;
        let mut fragments = Vec::with_capacity(self.conds.len());

        for cond in &self.conds {
            let fragment = match cond {
                Cond::Raw { sql, args: raw } => {
                    let rendered = tail::render_markers(sql, dialect, next);
                    next += raw.len();
                    args.extend(raw.iter().cloned());
                    rendered
                }
                Cond::Pk(value) => {
                    let column = &M::info().pk_field().column;
                    let fragment = format!("{column} = {}", dialect.placeholder(next));
                    next += 1;
                    args.push(value.clone());
                    fragment
                }
                Cond::Fields(pairs) => {
                    let mut parts = Vec::with_capacity(pairs.len());
                    for (column, value) in pairs {
                        match value {
                            Value::Array(items) => {
                                let placeholders = dialect.placeholders(next, items.len());
                                next += items.len();
                                args.extend(items.iter().cloned());
                                parts.push(format!("{column} IN ({})", placeholders.join(", ")));
                            }
                            scalar => {
                                parts.push(format!("{column} = {}", dialect.placeholder(next)));
                                next += 1;
                                args.push(scalar.clone());
                            }
                        }
                    }
                    parts.join(" AND ")
                }
            };
            fragments.push(format!("({fragment})"));
        }

        let mut sql = String::new();
        if !fragments.is_empty() {
            sql.push_str("WHERE ");
            sql.push_str(&fragments.join(" AND "));
        }
        if !self.group.is_empty() {
            if !sql.is_empty() {
                sql.push(' ');
            }
            sql.push_str("GROUP BY ");
            sql.push_str(&self.group.join(", "));
        }
        if !self.order.is_empty() {
            if !sql.is_empty() {
                sql.push(' ');
            }
            sql.push_str("ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }

        tracing::trace!(conds = self.conds.len(), args = args.len(), "scope tail");
        Ok((sql, args))
    }
}

impl<M: Record> Scope<M> {
    /// Shorthand for "primary key equals `value`".
    #[must_use]
    pub fn pk(mut self, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Pk(value.into()));
        self
    }
}
