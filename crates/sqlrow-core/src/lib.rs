//! Core types and traits for sqlrow.
//!
//! `sqlrow-core` is the foundation layer for the workspace. It defines the
//! contracts every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Model`]/[`Record`] are implemented by generated
//!   per-type glue; [`Driver`] is implemented by database adapters.
//! - **Data model**: [`Value`] and [`Row`] represent statement parameters and
//!   scanned results; [`StructInfo`]/[`FieldInfo`] describe a mapped relation.
//! - **Dialect**: [`Dialect`] captures SQL-syntax differences (placeholders,
//!   quoting, primary-key acquisition, row limiting, DDL rendering).
//!
//! # Who Uses This Crate
//!
//! - `sqlrow-query` consumes metadata and [`Value`] to build WHERE tails.
//! - `sqlrow-session` executes statements through [`Driver`] and maps rows
//!   back through [`Model`].
//! - Driver crates (`sqlrow-sqlite`) implement [`Driver`] and operate on
//!   [`Row`]/[`Value`].
//!
//! Most applications should use the `sqlrow` facade; reach for `sqlrow-core`
//! directly when writing drivers or integrating a metadata source.

pub mod dialect;
pub mod driver;
pub mod error;
pub mod field;
pub mod logger;
pub mod model;
pub mod row;
pub mod value;

pub use dialect::{DefaultValuesMethod, Dialect, LastInsertIdMethod, SelectLimitMethod};
pub use driver::{Driver, DriverTx, ExecResult};
pub use error::{Error, Result};
pub use field::{FieldDef, FieldInfo, FieldType, StructInfo};
pub use logger::{Logger, TracingLogger};
pub use model::{Model, Record};
pub use row::Row;
pub use value::Value;
