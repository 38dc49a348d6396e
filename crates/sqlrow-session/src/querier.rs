//! Connection and transaction wrappers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use sqlrow_core::{Dialect, Driver, DriverTx, ExecResult, Logger, Result, Row, Value};

/// Statement execution with dialect, logging, and tagging context.
///
/// Implemented by [`Db`], [`Tx`], and [`Tagged`]. The command and query
/// engines are blanket extension traits over this seam, so every operation
/// works unchanged inside and outside a transaction.
pub trait Querier {
    fn dialect(&self) -> Dialect;

    fn logger(&self) -> Option<&dyn Logger>;

    /// Observability tag appended as a trailing SQL comment, if any.
    fn tag(&self) -> Option<&str>;

    /// Driver passthrough without the logging envelope.
    fn raw_exec(&self, query: &str, params: &[Value]) -> Result<ExecResult>;

    /// Driver passthrough without the logging envelope.
    fn raw_query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Driver passthrough without the logging envelope.
    fn raw_query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Final statement text: the query plus the tag comment, if set.
    fn statement(&self, query: &str) -> String {
        match self.tag() {
            Some(tag) => format!("{query} /* {tag} */"),
            None => query.to_string(),
        }
    }

    /// Execute a statement with the logging envelope.
    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        let query = self.statement(query);
        log_around(self.logger(), &query, params, || {
            self.raw_exec(&query, params)
        })
    }

    /// Run a query with the logging envelope.
    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        let query = self.statement(query);
        log_around(self.logger(), &query, params, || {
            self.raw_query(&query, params)
        })
    }

    /// Run a single-row query with the logging envelope.
    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        let query = self.statement(query);
        log_around(self.logger(), &query, params, || {
            self.raw_query_row(&query, params)
        })
    }

    /// Derive a wrapper that appends ` /* tag */` to every statement it
    /// issues. Shares the same underlying connection or transaction.
    fn with_tag(&self, tag: impl Into<String>) -> Tagged<'_, Self>
    where
        Self: Sized,
    {
        Tagged {
            inner: self,
            tag: tag.into(),
        }
    }
}

/// Run `f` between the logger's before/after hooks. The hooks observe the
/// statement; they never change its outcome.
fn log_around<T>(
    logger: Option<&dyn Logger>,
    query: &str,
    params: &[Value],
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if let Some(logger) = logger {
        logger.before(query, params);
    }
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    tracing::trace!(query, elapsed_us = elapsed.as_micros() as u64, ok = result.is_ok(), "statement");
    if let Some(logger) = logger {
        logger.after(query, params, elapsed, result.as_ref().err());
    }
    result
}

/// A connection handle: driver plus dialect, logger, and tag context.
///
/// Concurrent callers may share one `Db` (through a shared driver) and issue
/// independent statements; ordering within a transaction requires a [`Tx`].
pub struct Db<D: Driver> {
    driver: D,
    dialect: Dialect,
    logger: Option<Arc<dyn Logger>>,
}

impl<D: Driver> Db<D> {
    pub fn new(driver: D, dialect: Dialect) -> Self {
        Self {
            driver,
            dialect,
            logger: None,
        }
    }

    /// Attach a statement logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Start a transaction. `BEGIN` is issued by the driver but still passes
    /// through the log hooks.
    pub fn begin(&self) -> Result<Tx<'_, D>> {
        let tx = log_around(self.logger.as_deref(), "BEGIN", &[], || self.driver.begin())?;
        Ok(Tx {
            tx,
            dialect: self.dialect,
            logger: self.logger.clone(),
        })
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits iff `f` returns `Ok`. On `Err`, on a failed commit, or on a
    /// panic, the transaction is rolled back; rollback errors are swallowed
    /// in favor of the original error, and a panic is re-raised after the
    /// rollback. Exactly one of commit or rollback executes per call.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Tx<'_, D>) -> Result<T>) -> Result<T> {
        let tx = self.begin()?;
        match panic::catch_unwind(AssertUnwindSafe(|| f(&tx))) {
            Ok(Ok(value)) => {
                tx.commit()?;
                Ok(value)
            }
            Ok(Err(err)) => {
                let _ = tx.rollback();
                Err(err)
            }
            Err(payload) => {
                let _ = tx.rollback();
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<D: Driver> Querier for Db<D> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn logger(&self) -> Option<&dyn Logger> {
        self.logger.as_deref()
    }

    fn tag(&self) -> Option<&str> {
        None
    }

    fn raw_exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.driver.exec(query, params)
    }

    fn raw_query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.driver.query(query, params)
    }

    fn raw_query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        self.driver.query_row(query, params)
    }
}

/// An open transaction. Single-owner: statements within it are strictly
/// ordered. Must not be used after commit or rollback (both consume it);
/// dropping it without either rolls back on the driver side.
pub struct Tx<'db, D: Driver>
where
    D: 'db,
{
    tx: D::Tx<'db>,
    dialect: Dialect,
    logger: Option<Arc<dyn Logger>>,
}

impl<'db, D: Driver> Tx<'db, D> {
    /// Commit the transaction.
    pub fn commit(self) -> Result<()> {
        let Tx { tx, logger, .. } = self;
        log_around(logger.as_deref(), "COMMIT", &[], || tx.commit())
    }

    /// Roll the transaction back.
    pub fn rollback(self) -> Result<()> {
        let Tx { tx, logger, .. } = self;
        log_around(logger.as_deref(), "ROLLBACK", &[], || tx.rollback())
    }
}

impl<'db, D: Driver> Querier for Tx<'db, D> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn logger(&self) -> Option<&dyn Logger> {
        self.logger.as_deref()
    }

    fn tag(&self) -> Option<&str> {
        None
    }

    fn raw_exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.tx.exec(query, params)
    }

    fn raw_query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.tx.query(query, params)
    }

    fn raw_query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        self.tx.query_row(query, params)
    }
}

/// Borrowed wrapper that appends a trailing SQL comment to every statement.
/// Created by [`Querier::with_tag`]; shares the underlying handle.
pub struct Tagged<'q, Q: ?Sized> {
    inner: &'q Q,
    tag: String,
}

impl<Q: Querier + ?Sized> Querier for Tagged<'_, Q> {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn logger(&self) -> Option<&dyn Logger> {
        self.inner.logger()
    }

    fn tag(&self) -> Option<&str> {
        Some(&self.tag)
    }

    fn raw_exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.inner.raw_exec(query, params)
    }

    fn raw_query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.inner.raw_query(query, params)
    }

    fn raw_query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        self.inner.raw_query_row(query, params)
    }
}
