//! SQL dialect descriptors.
//!
//! A [`Dialect`] is a pure value: no state, no I/O, safe to share across any
//! number of threads. It captures the syntax differences the engine must
//! render correctly — placeholder numbering, identifier quoting, the
//! primary-key acquisition strategy, row limiting, all-default inserts, and
//! column DDL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::field::{FieldInfo, FieldType, StructInfo};

/// How the primary key of the last inserted row is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastInsertIdMethod {
    /// Read the driver-reported inserted id after executing.
    LastInsertId,
    /// Append `RETURNING <pk>` and scan the result row.
    Returning,
    /// Inject `OUTPUT INSERTED.<pk>` and scan the result row.
    OutputInserted,
}

/// How the number of result rows is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectLimitMethod {
    /// `... LIMIT n` suffix.
    Limit,
    /// `SELECT TOP n ...` injection.
    SelectTop,
}

/// How a row with only default values is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValuesMethod {
    /// `INSERT INTO t DEFAULT VALUES`
    DefaultValues,
    /// `INSERT INTO t () VALUES ()`
    EmptyLists,
}

/// A supported SQL dialect. Fixed per connection; never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
    SqlServer,
}

impl Dialect {
    /// Dialect name, matching the `for_driver` spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
        }
    }

    /// Map a driver-name string to a dialect, accepting common aliases.
    #[must_use]
    pub fn for_driver(driver: &str) -> Option<Self> {
        match driver {
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "mysql" => Some(Dialect::MySql),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            "mssql" | "sqlserver" => Some(Dialect::SqlServer),
            _ => None,
        }
    }

    /// Placeholder token for a 1-based parameter index.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            _ => "?".to_string(),
        }
    }

    /// Placeholder tokens for `count` parameters starting at `start`.
    /// Monotonic for numbered dialects.
    #[must_use]
    pub fn placeholders(self, start: usize, count: usize) -> Vec<String> {
        (start..start + count).map(|i| self.placeholder(i)).collect()
    }

    /// Quote a database identifier. Callers quote exactly once.
    #[must_use]
    pub fn quote_identifier(self, identifier: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{identifier}\""),
            Dialect::MySql => format!("`{identifier}`"),
            Dialect::SqlServer => format!("[{identifier}]"),
        }
    }

    #[must_use]
    pub const fn last_insert_id_method(self) -> LastInsertIdMethod {
        match self {
            Dialect::Postgres => LastInsertIdMethod::Returning,
            Dialect::MySql | Dialect::Sqlite => LastInsertIdMethod::LastInsertId,
            Dialect::SqlServer => LastInsertIdMethod::OutputInserted,
        }
    }

    #[must_use]
    pub const fn select_limit_method(self) -> SelectLimitMethod {
        match self {
            Dialect::SqlServer => SelectLimitMethod::SelectTop,
            _ => SelectLimitMethod::Limit,
        }
    }

    #[must_use]
    pub const fn default_values_method(self) -> DefaultValuesMethod {
        match self {
            Dialect::MySql => DefaultValuesMethod::EmptyLists,
            _ => DefaultValuesMethod::DefaultValues,
        }
    }

    /// Column type for DDL generation. Integer primary keys render the
    /// dialect's auto-increment type where the type itself carries it.
    #[must_use]
    pub fn column_type(self, field: &FieldInfo) -> String {
        let ty = field.field_type;
        let s = match self {
            Dialect::Postgres => match ty {
                FieldType::Bool => "boolean",
                FieldType::Int => {
                    if field.is_pk {
                        "serial"
                    } else {
                        "integer"
                    }
                }
                FieldType::BigInt => {
                    if field.is_pk {
                        "bigserial"
                    } else {
                        "bigint"
                    }
                }
                FieldType::Float => "real",
                FieldType::Double => "double precision",
                FieldType::Text => "text",
                FieldType::Bytes => "bytea",
                FieldType::Time => "timestamp",
                FieldType::Json => "jsonb",
            },
            Dialect::MySql => match ty {
                FieldType::Bool => "tinyint(1)",
                FieldType::Int => "integer",
                FieldType::BigInt => "bigint",
                FieldType::Float => "float",
                FieldType::Double => "double",
                FieldType::Text => "text",
                FieldType::Bytes => "blob",
                FieldType::Time => "datetime",
                FieldType::Json => "json",
            },
            Dialect::Sqlite => match ty {
                FieldType::Bool | FieldType::Int | FieldType::BigInt => "integer",
                FieldType::Float | FieldType::Double => "real",
                FieldType::Text | FieldType::Json => "text",
                FieldType::Bytes => "blob",
                FieldType::Time => "datetime",
            },
            Dialect::SqlServer => match ty {
                FieldType::Bool => "bit",
                FieldType::Int => "int",
                FieldType::BigInt => "bigint",
                FieldType::Float => "real",
                FieldType::Double => "float",
                FieldType::Text | FieldType::Json => "nvarchar(max)",
                FieldType::Bytes => "varbinary(max)",
                FieldType::Time => "datetime2",
            },
        };
        s.to_string()
    }

    /// Full column definition for `CREATE TABLE`.
    ///
    /// Integer primary keys get the dialect's auto-increment clause,
    /// mirroring the acquisition strategy the command engine relies on.
    #[must_use]
    pub fn column_definition(self, field: &FieldInfo) -> String {
        let integer = matches!(field.field_type, FieldType::Int | FieldType::BigInt);
        let mut definition = format!(
            "{} {}",
            self.quote_identifier(&field.column),
            self.column_type(field)
        );

        if field.is_pk {
            if self == Dialect::SqlServer && integer {
                definition.push_str(" IDENTITY(1,1)");
            }
            definition.push_str(" PRIMARY KEY");
            match self {
                Dialect::Sqlite if integer => definition.push_str(" AUTOINCREMENT"),
                Dialect::MySql if integer => definition.push_str(" AUTO_INCREMENT"),
                _ => {}
            }
        }

        if field.is_unique {
            definition.push_str(" UNIQUE");
        }

        if !field.nullable && !field.is_pk {
            definition.push_str(" NOT NULL");
        }

        if self == Dialect::MySql && field.has_index {
            definition.push_str(&format!(", INDEX ({})", self.quote_identifier(&field.column)));
        }

        definition
    }

    /// Statement to run after table creation for this column, if any.
    /// MySQL declares indexes inline; the other dialects create them here.
    #[must_use]
    pub fn column_post_query(self, info: &StructInfo, field: &FieldInfo) -> Option<String> {
        if !field.has_index || self == Dialect::MySql {
            return None;
        }
        let index_name = format!("idx_{}_{}", info.sql_name(), field.column);
        let if_not_exists = match self {
            Dialect::SqlServer => "",
            _ => "IF NOT EXISTS ",
        };
        Some(format!(
            "CREATE INDEX {if_not_exists}{} ON {} ({})",
            self.quote_identifier(&index_name),
            self.quote_identifier(info.sql_name()),
            self.quote_identifier(&field.column),
        ))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Dialect::for_driver(s).ok_or_else(|| format!("unknown dialect: {s}"))
    }
}
