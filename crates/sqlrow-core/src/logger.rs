//! Statement logging hooks.

use std::time::Duration;

use crate::error::Error;
use crate::value::Value;

/// Hooks invoked around every statement a connection wrapper issues.
///
/// Logging is best-effort: implementations observe queries, they never
/// influence them. Absence of a logger is a valid, no-op configuration.
pub trait Logger: Send + Sync {
    /// Called before a statement is handed to the driver.
    fn before(&self, query: &str, args: &[Value]);

    /// Called after the driver returns, with the elapsed wall time and the
    /// error, if any.
    fn after(&self, query: &str, args: &[Value], elapsed: Duration, error: Option<&Error>);
}

/// Forwards statement events to `tracing`: debug level for successes, error
/// level for failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn before(&self, query: &str, args: &[Value]) {
        tracing::debug!(query, args = ?args, "statement begin");
    }

    fn after(&self, query: &str, args: &[Value], elapsed: Duration, error: Option<&Error>) {
        let elapsed_us = elapsed.as_micros() as u64;
        match error {
            Some(error) => {
                tracing::error!(query, args = ?args, elapsed_us, error = %error, "statement failed");
            }
            None => {
                tracing::debug!(query, args = ?args, elapsed_us, "statement done");
            }
        }
    }
}
