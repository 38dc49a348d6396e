//! The minimal capability set a database driver exposes to the engine.
//!
//! Any driver that can execute a parameterized statement, run a query into
//! materialized rows, and open a transaction can be adapted. Cancellation
//! and timeouts are the driver's concern: a caller wanting a bounded-time
//! query passes an already-deadlined connection.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Result of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Driver-reported id of the last inserted row, where the driver tracks
    /// one. Only meaningful directly after an INSERT.
    pub last_insert_id: Option<i64>,
}

/// A live database connection (or pool handle).
pub trait Driver {
    /// Transaction handle tied to this connection's lifetime.
    type Tx<'conn>: DriverTx
    where
        Self: 'conn;

    /// Execute a statement without returning rows.
    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult>;

    /// Execute a query and materialize the full result set.
    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query expected to return at most one row.
    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Open a transaction.
    fn begin(&self) -> Result<Self::Tx<'_>>;
}

/// Statement execution inside an open transaction.
///
/// Exactly one of [`commit`](DriverTx::commit) or
/// [`rollback`](DriverTx::rollback) consumes the handle; dropping an
/// unfinished handle must roll back on the driver side.
pub trait DriverTx {
    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult>;

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>>;

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>>;

    fn commit(self) -> Result<()>
    where
        Self: Sized;

    fn rollback(self) -> Result<()>
    where
        Self: Sized;
}

impl<D: Driver> Driver for &D {
    type Tx<'conn>
        = D::Tx<'conn>
    where
        Self: 'conn;

    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        (**self).exec(query, params)
    }

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(query, params)
    }

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        (**self).query_row(query, params)
    }

    fn begin(&self) -> Result<Self::Tx<'_>> {
        (**self).begin()
    }
}
