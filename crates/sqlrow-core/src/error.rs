//! Error taxonomy for the mapping runtime.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine.
///
/// Everything except [`Error::InvariantViolation`] is an ordinary error value
/// returned to the immediate caller; nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// A query or primary-key-scoped command matched no rows where one was
    /// expected. Distinct from a driver failure.
    #[error("no rows in result set")]
    NotFound,

    /// An operation requiring an identified row was attempted on a record
    /// with an unset primary key.
    #[error("no primary key set")]
    NoPrimaryKey,

    /// A referenced column or field is not part of the type's metadata, or
    /// metadata construction itself was invalid.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A tail's placeholder count does not match the supplied arguments, or
    /// an argument shape the engine cannot dispatch on.
    #[error("malformed argument: {0}")]
    MalformedArgument(String),

    /// Opaque failure surfaced unchanged from the underlying driver.
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// More than one row was affected by a primary-key-scoped command.
    /// Primary-key uniqueness is broken; callers must treat this as
    /// non-recoverable.
    #[error("{rows} rows affected by {operation} by primary key")]
    InvariantViolation {
        operation: &'static str,
        rows: u64,
    },
}

impl Error {
    /// Wrap a driver-level error.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Driver(Box::new(err))
    }

    /// Wrap a driver-level failure that has no error value of its own.
    pub fn driver_msg(msg: impl Into<String>) -> Self {
        Error::Driver(msg.into().into())
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Error::SchemaMismatch(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedArgument(msg.into())
    }

    /// True for errors that must not be recovered from.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::InvariantViolation { .. })
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}
