//! Struct-to-SQL mapping runtime.
//!
//! Given metadata describing a record type — table/view name, column list,
//! primary key, dialect — `sqlrow` executes CRUD operations and ad-hoc
//! queries against a relational database, translating between struct values
//! and SQL rows.
//!
//! # Quick Tour
//!
//! ```rust,ignore
//! use sqlrow::prelude::*;
//! use sqlrow_sqlite::SqliteDriver;
//!
//! let db = Db::new(SqliteDriver::open_in_memory()?, Dialect::Sqlite);
//! db.create_table_if_not_exists::<Person>()?;
//!
//! let mut person = Person { name: "Ann".into(), ..Person::default() };
//! db.insert(&mut person)?;                       // primary key assigned
//!
//! let found: Person = db.find_by_primary_key_from(person.pk_value())?;
//!
//! let filter = Person { name: "Ann".into(), ..Person::default() };
//! let matches: Vec<Person> = db.select_where(&Scope::new().filter(&filter))?;
//!
//! db.in_transaction(|tx| {
//!     tx.delete(&mut person)?;
//!     Ok(())
//! })?;
//! ```
//!
//! Metadata ([`StructInfo`]) and the [`Model`]/[`Record`] implementations
//! come from an external collaborator (a parser or code generator); the
//! runtime only consumes them.

pub use sqlrow_core::{
    DefaultValuesMethod, Dialect, Driver, DriverTx, Error, ExecResult, FieldDef, FieldInfo,
    FieldType, LastInsertIdMethod, Logger, Model, Record, Result, Row, SelectLimitMethod,
    StructInfo, TracingLogger, Value,
};
pub use sqlrow_query::Scope;
pub use sqlrow_session::{Commands, Db, Ddl, LogEntry, Querier, Rows, Selects, Tagged, Tx};

/// The commonly-needed surface in one import.
pub mod prelude {
    pub use sqlrow_core::{
        Dialect, Error, FieldDef, FieldInfo, FieldType, Model, Record, Result, Row, StructInfo,
        Value,
    };
    pub use sqlrow_query::Scope;
    pub use sqlrow_session::{Commands, Db, Ddl, LogEntry, Querier, Selects};
}
