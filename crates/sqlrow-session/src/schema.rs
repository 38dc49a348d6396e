//! Optional table creation.
//!
//! The only schema management the engine offers: render each field's column
//! definition through the dialect and create the table when absent.
//! Anything beyond that (migrations, diffing) is out of scope.

use sqlrow_core::{Model, Result};

use crate::querier::Querier;

/// DDL execution, available on every [`Querier`].
pub trait Ddl: Querier {
    /// Create `S`'s table if it does not exist, then run per-column post
    /// queries (index creation on dialects that do not declare indexes
    /// inline).
    fn create_table_if_not_exists<S: Model>(&self) -> Result<()> {
        let info = S::info();
        let dialect = self.dialect();

        let definitions: Vec<String> = info
            .fields()
            .iter()
            .map(|field| dialect.column_definition(field))
            .collect();
        let query = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            info.qualified_name(dialect),
            definitions.join(", "),
        );

        tracing::debug!(table = info.sql_name(), "create table if not exists");
        self.exec(&query, &[])?;

        for field in info.fields() {
            if let Some(post) = dialect.column_post_query(info, field) {
                self.exec(&post, &[])?;
            }
        }
        Ok(())
    }
}

impl<Q: Querier + ?Sized> Ddl for Q {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, Person};
    use crate::querier::Db;
    use sqlrow_core::Dialect;

    #[test]
    fn test_create_table_sqlite() {
        let db = Db::new(MockDriver::new(), Dialect::Sqlite);
        db.create_table_if_not_exists::<Person>().unwrap();
        let (query, _) = db.driver().last_statement();
        assert_eq!(
            query,
            "CREATE TABLE IF NOT EXISTS \"people\" (\"id\" integer PRIMARY KEY AUTOINCREMENT, \
             \"name\" text NOT NULL, \"email\" text)"
        );
    }

    #[test]
    fn test_create_table_postgres_serial() {
        let db = Db::new(MockDriver::new(), Dialect::Postgres);
        db.create_table_if_not_exists::<Person>().unwrap();
        let (query, _) = db.driver().last_statement();
        assert!(query.contains("\"id\" bigserial PRIMARY KEY"));
    }
}
