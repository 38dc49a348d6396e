//! Scope and filter query builder for sqlrow.
//!
//! Turns ad-hoc conditions — raw SQL fragments, primary-key shorthands, and
//! partially-populated filter values — into a single parameterized
//! `WHERE`/`GROUP BY`/`ORDER BY` tail with correctly numbered placeholders.

pub mod scope;
pub mod tail;

pub use scope::Scope;
