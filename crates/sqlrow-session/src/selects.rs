//! The query/scan engine.
//!
//! Builds SELECT statements (optionally restricted to a field subset or an
//! alternate FROM clause), executes them, and scans result rows back into
//! mapped values, invoking the after-find hook.

use sqlrow_core::{Dialect, Error, Model, Record, Result, Row, SelectLimitMethod, StructInfo, Value};
use sqlrow_query::Scope;

use crate::querier::Querier;

/// A materialized result set, iterated with [`Selects::next_row`].
#[derive(Debug)]
pub struct Rows {
    rows: std::vec::IntoIter<Row>,
}

impl Rows {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    /// Rows not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

/// Render a full SELECT for `info`.
///
/// Row limiting is dialect-conditional: `SELECT TOP n` injection for
/// dialects that use it, a `LIMIT n` suffix otherwise. Using the wrong form
/// for a dialect is a correctness bug, so both live here and nowhere else.
fn select_query(
    dialect: Dialect,
    info: &StructInfo,
    tail: &str,
    limit: Option<u64>,
    alt_table: Option<&str>,
    fields: Option<&[&str]>,
) -> Result<String> {
    let mut query = String::from("SELECT");
    if let Some(n) = limit {
        if dialect.select_limit_method() == SelectLimitMethod::SelectTop {
            query.push_str(&format!(" TOP {n}"));
        }
    }

    let columns = match fields {
        Some(fields) => {
            let mut quoted = Vec::with_capacity(fields.len());
            for field in fields {
                let column = info.column_by_field(field).ok_or_else(|| {
                    Error::schema_mismatch(format!("{}: unknown field {field}", info.sql_name()))
                })?;
                quoted.push(dialect.quote_identifier(column));
            }
            quoted
        }
        None => info.qualified_columns(dialect),
    };
    query.push(' ');
    query.push_str(&columns.join(", "));

    query.push_str(" FROM ");
    match alt_table {
        Some(table) => query.push_str(table),
        None => query.push_str(&info.qualified_name(dialect)),
    }

    if !tail.is_empty() {
        query.push(' ');
        query.push_str(tail);
    }

    if let Some(n) = limit {
        if dialect.select_limit_method() == SelectLimitMethod::Limit {
            query.push_str(&format!(" LIMIT {n}"));
        }
    }

    Ok(query)
}

/// Equality tail for one column. `Value::Null` renders `IS NULL`, never
/// `= ?`.
fn find_tail(
    dialect: Dialect,
    info: &StructInfo,
    column: &str,
    arg: Value,
) -> Result<(String, Vec<Value>)> {
    require_column(info, column)?;
    let qualified = format!(
        "{}.{}",
        dialect.quote_identifier(info.sql_name()),
        dialect.quote_identifier(column)
    );
    if arg.is_null() {
        Ok((format!("WHERE {qualified} IS NULL"), Vec::new()))
    } else {
        Ok((
            format!("WHERE {qualified} = {}", dialect.placeholder(1)),
            vec![arg],
        ))
    }
}

fn require_column(info: &StructInfo, column: &str) -> Result<()> {
    if info.column_index(column).is_none() {
        return Err(Error::schema_mismatch(format!(
            "{}: unknown column {column}",
            info.sql_name()
        )));
    }
    Ok(())
}

/// SELECT and scan operations, available on every [`Querier`].
pub trait Selects: Querier {
    /// Scan the next result row into `row_struct` and run its after-find
    /// hook. Returns [`Error::NotFound`] when the set is exhausted.
    fn next_row<S: Model>(&self, row_struct: &mut S, rows: &mut Rows) -> Result<()> {
        match rows.rows.next() {
            None => Err(Error::NotFound),
            Some(row) => {
                row_struct.load_row(row)?;
                row_struct.after_find()
            }
        }
    }

    /// Query `S`'s relation with a raw tail and return the result set.
    fn select_rows<S: Model>(&self, tail: &str, args: &[Value]) -> Result<Rows> {
        self.flex_select_rows::<S>(None, None, tail, args)
    }

    /// Like [`Selects::select_rows`] with an alternate FROM clause and/or a
    /// field subset.
    fn flex_select_rows<S: Model>(
        &self,
        alt_table: Option<&str>,
        fields: Option<&[&str]>,
        tail: &str,
        args: &[Value],
    ) -> Result<Rows> {
        let query = select_query(self.dialect(), S::info(), tail, None, alt_table, fields)?;
        Ok(Rows::new(self.query(&query, args)?))
    }

    /// Scan the first matching row into `row_struct`. Always applies the
    /// limit-1 optimization; do not pass your own `LIMIT` in `tail`.
    fn select_one_to<S: Model>(&self, row_struct: &mut S, tail: &str, args: &[Value]) -> Result<()> {
        self.flex_select_one_to(row_struct, None, None, tail, args)
    }

    /// Like [`Selects::select_one_to`] with an alternate FROM clause and/or
    /// a field subset; subset scans only touch the named fields.
    fn flex_select_one_to<S: Model>(
        &self,
        row_struct: &mut S,
        alt_table: Option<&str>,
        fields: Option<&[&str]>,
        tail: &str,
        args: &[Value],
    ) -> Result<()> {
        let query = select_query(self.dialect(), S::info(), tail, Some(1), alt_table, fields)?;
        let row = self.query_row(&query, args)?.ok_or(Error::NotFound)?;
        match fields {
            Some(fields) => row_struct.load_fields(fields, row)?,
            None => row_struct.load_row(row)?,
        }
        row_struct.after_find()
    }

    /// Return the first matching row as a fresh value.
    fn select_one_from<S: Model + Default>(&self, tail: &str, args: &[Value]) -> Result<S> {
        let mut row_struct = S::default();
        self.select_one_to(&mut row_struct, tail, args)?;
        Ok(row_struct)
    }

    /// Collect all matching rows. Exhausting the result set is success; an
    /// empty vector is a valid outcome.
    fn select_all_from<S: Model + Default>(&self, tail: &str, args: &[Value]) -> Result<Vec<S>> {
        let mut rows = self.select_rows::<S>(tail, args)?;
        let mut collected = Vec::with_capacity(rows.remaining());
        loop {
            let mut row_struct = S::default();
            match self.next_row(&mut row_struct, &mut rows) {
                Ok(()) => collected.push(row_struct),
                Err(Error::NotFound) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(collected)
    }

    /// Scan the first row where `column` equals `arg` into `row_struct`.
    fn find_one_to<S: Model>(&self, row_struct: &mut S, column: &str, arg: Value) -> Result<()> {
        let (tail, args) = find_tail(self.dialect(), S::info(), column, arg)?;
        self.select_one_to(row_struct, &tail, &args)
    }

    /// Return the first row where `column` equals `arg` as a fresh value.
    fn find_one_from<S: Model + Default>(&self, column: &str, arg: Value) -> Result<S> {
        let mut row_struct = S::default();
        self.find_one_to(&mut row_struct, column, arg)?;
        Ok(row_struct)
    }

    /// Result set of rows where `column` equals `arg`.
    fn find_rows<S: Model>(&self, column: &str, arg: Value) -> Result<Rows> {
        let (tail, args) = find_tail(self.dialect(), S::info(), column, arg)?;
        self.select_rows::<S>(&tail, &args)
    }

    /// Collect all rows where `column` is any of `args` (`IN` list).
    fn find_all_from<S: Model + Default>(&self, column: &str, args: &[Value]) -> Result<Vec<S>> {
        let info = S::info();
        require_column(info, column)?;
        let dialect = self.dialect();
        let placeholders = dialect.placeholders(1, args.len());
        let tail = format!(
            "WHERE {}.{} IN ({})",
            info.qualified_name(dialect),
            dialect.quote_identifier(column),
            placeholders.join(", ")
        );
        self.select_all_from(&tail, args)
    }

    /// Scan the row with the given primary key into `record`.
    fn find_by_primary_key_to<R: Record>(&self, record: &mut R, pk: Value) -> Result<()> {
        let column = R::info().pk_field().column.as_str();
        self.find_one_to(record, column, pk)
    }

    /// Return the row with the given primary key as a fresh record.
    fn find_by_primary_key_from<R: Record + Default>(&self, pk: Value) -> Result<R> {
        let mut record = R::default();
        self.find_by_primary_key_to(&mut record, pk)?;
        Ok(record)
    }

    /// Re-read `record` from the database by its current primary key.
    fn reload<R: Record>(&self, record: &mut R) -> Result<()> {
        let pk = record.pk_value();
        self.find_by_primary_key_to(record, pk)
    }

    /// Collect all rows matching a [`Scope`]. The scope's limit is placed
    /// with the dialect's row-limiting syntax.
    fn select_where<S: Model + Default>(&self, scope: &Scope<S>) -> Result<Vec<S>> {
        let dialect = self.dialect();
        let (tail, args) = scope.tail(dialect)?;
        let query = select_query(dialect, S::info(), &tail, scope.row_limit(), None, None)?;
        let rows = self.query(&query, &args)?;
        let mut collected = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row_struct = S::default();
            row_struct.load_row(row)?;
            row_struct.after_find()?;
            collected.push(row_struct);
        }
        Ok(collected)
    }

    /// Return the first row matching a [`Scope`].
    fn select_one_where<S: Model + Default>(&self, scope: &Scope<S>) -> Result<S> {
        let dialect = self.dialect();
        let (tail, args) = scope.tail(dialect)?;
        let query = select_query(dialect, S::info(), &tail, Some(1), None, None)?;
        let row = self.query_row(&query, &args)?.ok_or(Error::NotFound)?;
        let mut row_struct = S::default();
        row_struct.load_row(row)?;
        row_struct.after_find()?;
        Ok(row_struct)
    }
}

impl<Q: Querier + ?Sized> Selects for Q {}
