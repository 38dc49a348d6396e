//! SQLite driver for sqlrow, backed by `rusqlite` (bundled SQLite).
//!
//! Adapts a [`rusqlite::Connection`] to the engine's [`Driver`] capability
//! set. Result sets are fully materialized; transactions use
//! `unchecked_transaction` so the adapter can hand them out behind a shared
//! reference — matching the engine's single-owner transaction discipline.

use std::path::Path;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::Connection;

use sqlrow_core::{Driver, DriverTx, Error, ExecResult, Result, Row, Value};

/// A SQLite connection implementing [`Driver`].
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::driver)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::driver)?;
        Ok(Self { conn })
    }

    /// Wrap an already-configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Access the underlying connection, e.g. for pragmas.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Bind adapter: one engine [`Value`] as a rusqlite parameter.
struct Param<'a>(&'a Value);

impl rusqlite::ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Bool(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            Value::Int(i) | Value::Timestamp(i) => {
                ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i))
            }
            Value::Float(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Json(j) => ToSqlOutput::Owned(rusqlite::types::Value::Text(j.to_string())),
            Value::Array(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "array values must be expanded before binding".into(),
                ));
            }
        })
    }
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

fn exec_on(conn: &Connection, query: &str, params: &[Value]) -> Result<ExecResult> {
    let affected = conn
        .execute(query, rusqlite::params_from_iter(params.iter().map(Param)))
        .map_err(Error::driver)?;
    Ok(ExecResult {
        rows_affected: affected as u64,
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}

fn query_on(conn: &Connection, query: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(query).map_err(Error::driver)?;
    let column_count = stmt.column_count();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter().map(Param)))
        .map_err(Error::driver)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(Error::driver)? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(read_value(row.get_ref(i).map_err(Error::driver)?));
        }
        out.push(Row::new(values));
    }
    Ok(out)
}

impl Driver for SqliteDriver {
    type Tx<'conn>
        = SqliteTx<'conn>
    where
        Self: 'conn;

    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        exec_on(&self.conn, query, params)
    }

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        query_on(&self.conn, query, params)
    }

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(query_on(&self.conn, query, params)?.into_iter().next())
    }

    fn begin(&self) -> Result<Self::Tx<'_>> {
        let tx = self.conn.unchecked_transaction().map_err(Error::driver)?;
        Ok(SqliteTx { tx })
    }
}

/// An open SQLite transaction. Dropping it without committing rolls back.
pub struct SqliteTx<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl DriverTx for SqliteTx<'_> {
    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        exec_on(&self.tx, query, params)
    }

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        query_on(&self.tx, query, params)
    }

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(query_on(&self.tx, query, params)?.into_iter().next())
    }

    fn commit(self) -> Result<()> {
        self.tx.commit().map_err(Error::driver)
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback().map_err(Error::driver)
    }
}
