//! The CRUD command engine.
//!
//! Builds and executes INSERT / UPDATE / DELETE statements from a record's
//! current field values and the dialect's primary-key acquisition strategy,
//! invoking lifecycle hooks around each operation.

use std::collections::HashSet;

use sqlrow_core::{
    DefaultValuesMethod, Dialect, Error, LastInsertIdMethod, Model, Record, Result, StructInfo,
    Value,
};

use crate::querier::Querier;

/// Audit row appended next to a tracked record by
/// [`Commands::insert_log`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub author: Option<String>,
    pub action: String,
    /// Microseconds since the Unix epoch; the engine owns no clock.
    pub date: i64,
    pub comment: String,
}

/// CRUD operations, available on every [`Querier`].
pub trait Commands: Querier {
    /// Insert `record`, assigning its primary key.
    ///
    /// The primary-key column is omitted while the key is unset and
    /// acquired back through the dialect's strategy (driver-reported id,
    /// `RETURNING`, or `OUTPUT INSERTED`). NULL-valued columns are omitted
    /// so column defaults apply; use [`Commands::insert_columns`] to force
    /// an explicit column set.
    fn insert<R: Record>(&self, record: &mut R) -> Result<()> {
        record.before_insert()?;

        let info = R::info();
        let pk = info.pk_column_index();
        let has_pk = record.has_pk();

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (i, (field, value)) in info.fields().iter().zip(record.values()).enumerate() {
            if i == pk && !has_pk {
                continue;
            }
            if value.is_null() {
                continue;
            }
            columns.push(field.column.as_str());
            values.push(value);
        }

        insert_record_inner(self, record, &columns, values)?;
        record.after_insert()
    }

    /// Insert a row for a keyless mapped type (a view in the glossary
    /// sense). No primary-key handling; NULL columns are omitted.
    fn insert_struct<S: Model>(&self, row: &mut S) -> Result<()> {
        row.before_insert()?;

        let info = S::info();
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (field, value) in info.fields().iter().zip(row.values()) {
            if value.is_null() {
                continue;
            }
            columns.push(field.column.as_str());
            values.push(value);
        }

        let query = build_insert(self.dialect(), info, &columns, None);
        self.exec(&query, &values)?;
        row.after_insert()
    }

    /// Insert `record` with exactly the given columns.
    ///
    /// A requested column absent from the metadata is a [`Error::SchemaMismatch`],
    /// never silently ignored; so is the primary-key column — a subset never
    /// re-specifies identity. Primary-key acquisition still applies.
    fn insert_columns<R: Record>(&self, record: &mut R, columns: &[&str]) -> Result<()> {
        record.before_insert()?;

        let (columns, values) = filtered_columns_and_values(R::info(), &record.values(), columns)?;
        insert_record_inner(self, record, &columns, values)?;
        record.after_insert()
    }

    /// Insert several records with one multi-row statement.
    ///
    /// All records must uniformly have or lack a primary key
    /// ([`Error::MalformedArgument`] otherwise). Primary keys are never
    /// assigned back; callers needing them insert individually.
    fn insert_multi<R: Record>(&self, records: &mut [R]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records.iter_mut() {
            record.before_insert()?;
        }

        let has_pk = records[0].has_pk();
        if records.iter().any(|r| r.has_pk() != has_pk) {
            return Err(Error::malformed(
                "primary key is set on some records and absent on others",
            ));
        }

        let info = R::info();
        let dialect = self.dialect();
        let pk = info.pk_column_index();
        let mut columns = info.columns();
        if !has_pk {
            columns.remove(pk);
        }

        let quoted: Vec<String> = columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let placeholders = dialect.placeholders(1, columns.len() * records.len());
        let groups: Vec<String> = (0..records.len())
            .map(|i| {
                format!(
                    "({})",
                    placeholders[columns.len() * i..columns.len() * (i + 1)].join(", ")
                )
            })
            .collect();

        let query = format!(
            "INSERT INTO {} ({}) VALUES {}",
            info.qualified_name(dialect),
            quoted.join(", "),
            groups.join(", "),
        );

        let mut values = Vec::with_capacity(columns.len() * records.len());
        for record in records.iter() {
            let mut row = record.values();
            if !has_pk {
                row.remove(pk);
            }
            values.extend(row);
        }

        tracing::debug!(table = info.sql_name(), rows = records.len(), "insert multi");
        self.exec(&query, &values)?;
        Ok(())
    }

    /// Update all non-primary-key columns of the row identified by
    /// `record`'s primary key.
    ///
    /// Returns [`Error::NoPrimaryKey`] for an unset key and
    /// [`Error::NotFound`] when no row matched. More than one affected row
    /// is an [`Error::InvariantViolation`].
    fn update<R: Record>(&self, record: &mut R) -> Result<()> {
        if !record.has_pk() {
            return Err(Error::NoPrimaryKey);
        }
        record.before_update()?;

        let info = R::info();
        let pk = info.pk_column_index();
        let mut columns = info.columns();
        let mut values = record.values();
        columns.remove(pk);
        values.remove(pk);

        update_inner(self, record, &columns, values)?;
        record.after_update()
    }

    /// Update exactly the given columns. Same key and affected-row contract
    /// as [`Commands::update`]; the primary-key column is rejected, and an
    /// empty effective column set is an error.
    fn update_columns<R: Record>(&self, record: &mut R, columns: &[&str]) -> Result<()> {
        if !record.has_pk() {
            return Err(Error::NoPrimaryKey);
        }
        record.before_update()?;

        let (columns, values) = filtered_columns_and_values(R::info(), &record.values(), columns)?;
        if values.is_empty() {
            return Err(Error::malformed("nothing to update"));
        }

        update_inner(self, record, &columns, values)?;
        record.after_update()
    }

    /// Update-else-insert.
    ///
    /// Best-effort upsert: with a set primary key the update runs first and
    /// only [`Error::NotFound`] falls through to an insert, so two
    /// concurrent writers can still both insert. Not atomic.
    fn save<R: Record>(&self, record: &mut R) -> Result<()> {
        if record.has_pk() {
            match self.update(record) {
                Err(err) if err.is_not_found() => {}
                other => return other,
            }
        }
        self.insert(record)
    }

    /// Delete the row identified by `record`'s primary key. Same key and
    /// affected-row contract as [`Commands::update`].
    fn delete<R: Record>(&self, record: &mut R) -> Result<()> {
        if !record.has_pk() {
            return Err(Error::NoPrimaryKey);
        }
        record.before_delete()?;

        let info = R::info();
        let dialect = self.dialect();
        let query = format!(
            "DELETE FROM {} WHERE {} = {}",
            info.qualified_name(dialect),
            dialect.quote_identifier(&info.pk_field().column),
            dialect.placeholder(1),
        );

        let result = self.exec(&query, &[record.pk_value()])?;
        expect_one_row(result.rows_affected, "DELETE")?;
        record.after_delete()
    }

    /// Bulk delete with a caller-supplied tail. Returns the number of
    /// deleted rows; zero deletions is a valid outcome, never an error.
    fn delete_from<S: Model>(&self, tail: &str, args: &[Value]) -> Result<u64> {
        let info = S::info();
        let mut query = format!("DELETE FROM {}", info.qualified_name(self.dialect()));
        if !tail.is_empty() {
            query.push(' ');
            query.push_str(tail);
        }
        Ok(self.exec(&query, args)?.rows_affected)
    }

    /// Append an audit row for `record` to its `_log` shadow relation: the
    /// record's full column list plus author, action, date, and comment.
    fn insert_log<R: Record>(&self, record: &R, entry: &LogEntry) -> Result<()> {
        let info = R::info().to_log();
        let dialect = self.dialect();
        let columns = info.columns();
        let quoted: Vec<String> = columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let placeholders = dialect.placeholders(1, columns.len());

        let query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            info.qualified_name(dialect),
            quoted.join(", "),
            placeholders.join(", "),
        );

        let mut values = record.values();
        values.push(entry.author.clone().map_or(Value::Null, Value::Text));
        values.push(Value::Text(entry.action.clone()));
        values.push(Value::Timestamp(entry.date));
        values.push(Value::Text(entry.comment.clone()));

        self.exec(&query, &values)?;
        Ok(())
    }
}

impl<Q: Querier + ?Sized> Commands for Q {}

/// Select `requested` columns out of the metadata, pairing each with the
/// record's value. Unknown columns and the primary-key column are rejected.
fn filtered_columns_and_values<'a>(
    info: &'a StructInfo,
    all_values: &[Value],
    requested: &[&str],
) -> Result<(Vec<&'a str>, Vec<Value>)> {
    let mut wanted: HashSet<&str> = requested.iter().copied().collect();
    let pk = info.pk_index();

    let mut columns = Vec::with_capacity(wanted.len());
    let mut values = Vec::with_capacity(wanted.len());
    for (i, field) in info.fields().iter().enumerate() {
        if wanted.remove(field.column.as_str()) {
            if Some(i) == pk {
                return Err(Error::schema_mismatch(format!(
                    "{}: refusing primary key column {} in a column subset",
                    info.sql_name(),
                    field.column,
                )));
            }
            columns.push(field.column.as_str());
            values.push(all_values[i].clone());
        }
    }

    if !wanted.is_empty() {
        let mut extra: Vec<&str> = wanted.into_iter().collect();
        extra.sort_unstable();
        return Err(Error::schema_mismatch(format!(
            "{}: unexpected columns: {}",
            info.sql_name(),
            extra.join(", "),
        )));
    }

    Ok((columns, values))
}

/// Assemble an INSERT statement. `pk_column` enables the dialect's
/// acquisition clause for record inserts; `None` for keyless rows.
fn build_insert(
    dialect: Dialect,
    info: &StructInfo,
    columns: &[&str],
    pk_column: Option<&str>,
) -> String {
    let quoted: Vec<String> = columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect();
    let placeholders = dialect.placeholders(1, columns.len());
    let empty_lists = dialect.default_values_method() == DefaultValuesMethod::EmptyLists;

    let mut query = format!("INSERT INTO {}", info.qualified_name(dialect));
    if !quoted.is_empty() || empty_lists {
        query.push_str(&format!(" ({})", quoted.join(", ")));
    }
    if let Some(pk) = pk_column {
        if dialect.last_insert_id_method() == LastInsertIdMethod::OutputInserted {
            query.push_str(&format!(" OUTPUT INSERTED.{}", dialect.quote_identifier(pk)));
        }
    }
    if !placeholders.is_empty() || empty_lists {
        query.push_str(&format!(" VALUES ({})", placeholders.join(", ")));
    } else {
        query.push_str(" DEFAULT VALUES");
    }
    if let Some(pk) = pk_column {
        if dialect.last_insert_id_method() == LastInsertIdMethod::Returning {
            query.push_str(&format!(" RETURNING {}", dialect.quote_identifier(pk)));
        }
    }
    query
}

/// Execute a record insert and acquire the primary key back per dialect.
fn insert_record_inner<Q: Querier + ?Sized, R: Record>(
    q: &Q,
    record: &mut R,
    columns: &[&str],
    values: Vec<Value>,
) -> Result<()> {
    let info = R::info();
    let dialect = q.dialect();
    let pk_column = info.pk_field().column.as_str();
    let query = build_insert(dialect, info, columns, Some(pk_column));

    tracing::debug!(table = info.sql_name(), columns = columns.len(), "insert");

    match dialect.last_insert_id_method() {
        LastInsertIdMethod::LastInsertId => {
            let result = q.exec(&query, &values)?;
            if !record.has_pk() {
                let id = result
                    .last_insert_id
                    .ok_or_else(|| Error::driver_msg("driver reported no inserted id"))?;
                record.set_pk(Value::Int(id))?;
            }
            Ok(())
        }
        LastInsertIdMethod::Returning | LastInsertIdMethod::OutputInserted => {
            let row = q
                .query_row(&query, &values)?
                .ok_or_else(|| Error::driver_msg("no row returned from insert"))?;
            let pk = row
                .into_values()
                .into_iter()
                .next()
                .ok_or_else(|| Error::driver_msg("empty row returned from insert"))?;
            record.set_pk(pk)?;
            Ok(())
        }
    }
}

/// Execute a primary-key-scoped UPDATE and enforce the 0/1/many contract.
fn update_inner<Q: Querier + ?Sized, R: Record>(
    q: &Q,
    record: &R,
    columns: &[&str],
    values: Vec<Value>,
) -> Result<()> {
    let info = R::info();
    let dialect = q.dialect();

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{} = {}",
                dialect.quote_identifier(c),
                dialect.placeholder(i + 1)
            )
        })
        .collect();

    let query = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        info.qualified_name(dialect),
        assignments.join(", "),
        dialect.quote_identifier(&info.pk_field().column),
        dialect.placeholder(columns.len() + 1),
    );

    tracing::debug!(table = info.sql_name(), columns = columns.len(), "update");

    let mut args = values;
    args.push(record.pk_value());
    let result = q.exec(&query, &args)?;
    expect_one_row(result.rows_affected, "UPDATE")
}

/// Zero rows is NotFound; more than one breaks primary-key uniqueness.
fn expect_one_row(rows_affected: u64, operation: &'static str) -> Result<()> {
    match rows_affected {
        0 => Err(Error::NotFound),
        1 => Ok(()),
        rows => Err(Error::InvariantViolation {
            operation,
            rows,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, Person, PersonProject};
    use crate::querier::Db;
    use sqlrow_core::{ExecResult, FieldDef, FieldInfo, FieldType, Row};
    use std::sync::LazyLock;

    fn db(dialect: Dialect) -> Db<MockDriver> {
        Db::new(MockDriver::new(), dialect)
    }

    #[test]
    fn test_insert_postgres_returning() {
        let db = db(Dialect::Postgres);
        db.driver().push_rows(vec![Row::new(vec![Value::Int(7)])]);

        let mut person = Person {
            id: 0,
            name: "Ann".to_string(),
            email: None,
        };
        db.insert(&mut person).unwrap();

        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"people\" (\"name\") VALUES ($1) RETURNING \"id\""
        );
        assert_eq!(args, vec![Value::from("Ann")]);
        assert_eq!(person.id, 7);
    }

    #[test]
    fn test_insert_includes_non_null_columns() {
        let db = db(Dialect::Postgres);
        db.driver().push_rows(vec![Row::new(vec![Value::Int(1)])]);

        let mut person = Person {
            id: 0,
            name: "Ann".to_string(),
            email: Some("ann@example.org".to_string()),
        };
        db.insert(&mut person).unwrap();

        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"people\" (\"name\", \"email\") VALUES ($1, $2) RETURNING \"id\""
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_insert_sqlite_assigns_driver_id() {
        let db = db(Dialect::Sqlite);
        db.driver().push_exec(ExecResult {
            rows_affected: 1,
            last_insert_id: Some(41),
        });

        let mut person = Person {
            id: 0,
            name: "Bo".to_string(),
            email: None,
        };
        db.insert(&mut person).unwrap();

        let (query, _) = db.driver().last_statement();
        assert_eq!(query, "INSERT INTO \"people\" (\"name\") VALUES (?)");
        assert_eq!(person.id, 41);
    }

    #[test]
    fn test_insert_with_preset_pk_keeps_it() {
        let db = db(Dialect::Sqlite);
        let mut person = Person {
            id: 50,
            name: "Cy".to_string(),
            email: None,
        };
        db.insert(&mut person).unwrap();

        let (query, args) = db.driver().last_statement();
        assert_eq!(query, "INSERT INTO \"people\" (\"id\", \"name\") VALUES (?, ?)");
        assert_eq!(args[0], Value::Int(50));
        assert_eq!(person.id, 50);
    }

    #[test]
    fn test_insert_mssql_output_inserted() {
        let db = db(Dialect::SqlServer);
        db.driver().push_rows(vec![Row::new(vec![Value::Int(3)])]);

        let mut person = Person {
            id: 0,
            name: "Di".to_string(),
            email: None,
        };
        db.insert(&mut person).unwrap();

        let (query, _) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO [people] ([name]) OUTPUT INSERTED.[id] VALUES (?)"
        );
        assert_eq!(person.id, 3);
    }

    // A record whose non-key columns are all nullable, for the all-default
    // insert forms.
    static BLANK_INFO: LazyLock<sqlrow_core::StructInfo> = LazyLock::new(|| {
        sqlrow_core::StructInfo::new(
            None,
            "blanks",
            vec![
                FieldDef::column(FieldInfo::new("id", "id", FieldType::BigInt).primary_key(true)),
                FieldDef::column(FieldInfo::new("note", "note", FieldType::Text).nullable(true)),
            ],
        )
        .expect("blank metadata")
    });

    #[derive(Debug, Default)]
    struct Blank {
        id: i64,
        note: Option<String>,
    }

    impl Model for Blank {
        fn info() -> &'static sqlrow_core::StructInfo {
            &BLANK_INFO
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Int(self.id), Value::from(self.note.clone())]
        }

        fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = value.as_int().unwrap_or_default(),
                "note" => self.note = value.as_str().map(str::to_string),
                other => return Err(Error::schema_mismatch(format!("unknown field: {other}"))),
            }
            Ok(())
        }

        fn field_value(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::Int(self.id)),
                "note" => Some(Value::from(self.note.clone())),
                _ => None,
            }
        }
    }

    impl Record for Blank {}

    #[test]
    fn test_insert_all_defaults_sqlite() {
        let db = db(Dialect::Sqlite);
        let mut blank = Blank::default();
        db.insert(&mut blank).unwrap();
        let (query, args) = db.driver().last_statement();
        assert_eq!(query, "INSERT INTO \"blanks\" DEFAULT VALUES");
        assert!(args.is_empty());
    }

    #[test]
    fn test_insert_all_defaults_mysql_empty_lists() {
        let db = db(Dialect::MySql);
        let mut blank = Blank::default();
        db.insert(&mut blank).unwrap();
        let (query, _) = db.driver().last_statement();
        assert_eq!(query, "INSERT INTO `blanks` () VALUES ()");
    }

    #[test]
    fn test_insert_struct_keyless() {
        let db = db(Dialect::Postgres);
        let mut link = PersonProject {
            person_id: 1,
            project_id: "baron".to_string(),
        };
        db.insert_struct(&mut link).unwrap();
        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"person_project\" (\"person_id\", \"project_id\") VALUES ($1, $2)"
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_insert_columns_subset() {
        let db = db(Dialect::Postgres);
        db.driver().push_rows(vec![Row::new(vec![Value::Int(9)])]);

        let mut person = Person {
            id: 0,
            name: "Ed".to_string(),
            email: Some("ed@example.org".to_string()),
        };
        db.insert_columns(&mut person, &["name"]).unwrap();

        let (query, _) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"people\" (\"name\") VALUES ($1) RETURNING \"id\""
        );
        assert_eq!(person.id, 9);
    }

    #[test]
    fn test_insert_columns_rejects_unknown() {
        let db = db(Dialect::Postgres);
        let mut person = Person::default();
        let err = db
            .insert_columns(&mut person, &["name", "shoe_size"])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
        assert!(err.to_string().contains("shoe_size"));
        assert!(db.driver().recorded().is_empty());
    }

    #[test]
    fn test_insert_columns_rejects_primary_key() {
        let db = db(Dialect::Postgres);
        let mut person = Person::default();
        let err = db.insert_columns(&mut person, &["id"]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
        assert!(db.driver().recorded().is_empty());
    }

    #[test]
    fn test_insert_multi_single_statement() {
        let db = db(Dialect::Postgres);
        let mut people = vec![
            Person {
                id: 0,
                name: "Ann".to_string(),
                email: None,
            },
            Person {
                id: 0,
                name: "Bo".to_string(),
                email: Some("bo@example.org".to_string()),
            },
        ];
        db.insert_multi(&mut people).unwrap();

        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"people\" (\"name\", \"email\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(args.len(), 4);
        assert_eq!(args[1], Value::Null);
        // Primary keys are never assigned back by the batch form.
        assert_eq!(people[0].id, 0);
        assert_eq!(people[1].id, 0);
    }

    #[test]
    fn test_insert_multi_mixed_pk_is_error() {
        let db = db(Dialect::Postgres);
        let mut people = vec![
            Person {
                id: 1,
                name: "Ann".to_string(),
                email: None,
            },
            Person {
                id: 0,
                name: "Bo".to_string(),
                email: None,
            },
        ];
        let err = db.insert_multi(&mut people).unwrap_err();
        assert!(matches!(err, Error::MalformedArgument(_)));
        assert!(db.driver().recorded().is_empty());
    }

    #[test]
    fn test_insert_multi_empty_is_noop() {
        let db = db(Dialect::Postgres);
        db.insert_multi::<Person>(&mut []).unwrap();
        assert!(db.driver().recorded().is_empty());
    }

    #[test]
    fn test_update_statement_and_args() {
        let db = db(Dialect::Postgres);
        let mut person = Person {
            id: 5,
            name: "Ann".to_string(),
            email: None,
        };
        db.update(&mut person).unwrap();

        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "UPDATE \"people\" SET \"name\" = $1, \"email\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(
            args,
            vec![Value::from("Ann"), Value::Null, Value::Int(5)]
        );
    }

    #[test]
    fn test_update_without_pk() {
        let db = db(Dialect::Postgres);
        let mut person = Person::default();
        let err = db.update(&mut person).unwrap_err();
        assert!(matches!(err, Error::NoPrimaryKey));
        assert!(db.driver().recorded().is_empty());
    }

    #[test]
    fn test_update_zero_rows_is_not_found() {
        let db = db(Dialect::Postgres);
        db.driver().push_exec(ExecResult {
            rows_affected: 0,
            last_insert_id: None,
        });
        let mut person = Person {
            id: 99,
            name: "Gone".to_string(),
            email: None,
        };
        assert!(db.update(&mut person).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_many_rows_is_fatal() {
        let db = db(Dialect::Postgres);
        db.driver().push_exec(ExecResult {
            rows_affected: 2,
            last_insert_id: None,
        });
        let mut person = Person {
            id: 1,
            name: "Dup".to_string(),
            email: None,
        };
        let err = db.update(&mut person).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_update_columns_rejects_primary_key() {
        let db = db(Dialect::Postgres);
        let mut person = Person {
            id: 1,
            name: "Ann".to_string(),
            email: None,
        };
        let err = db.update_columns(&mut person, &["id"]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_update_columns_empty_set_is_error() {
        let db = db(Dialect::Postgres);
        let mut person = Person {
            id: 1,
            name: "Ann".to_string(),
            email: None,
        };
        let err = db.update_columns(&mut person, &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedArgument(_)));
    }

    #[test]
    fn test_update_columns_subset() {
        let db = db(Dialect::Postgres);
        let mut person = Person {
            id: 1,
            name: "Ann".to_string(),
            email: Some("ann@example.org".to_string()),
        };
        db.update_columns(&mut person, &["name"]).unwrap();
        let (query, args) = db.driver().last_statement();
        assert_eq!(query, "UPDATE \"people\" SET \"name\" = $1 WHERE \"id\" = $2");
        assert_eq!(args, vec![Value::from("Ann"), Value::Int(1)]);
    }

    #[test]
    fn test_save_inserts_without_pk() {
        let db = db(Dialect::Postgres);
        db.driver().push_rows(vec![Row::new(vec![Value::Int(1)])]);
        let mut person = Person {
            id: 0,
            name: "New".to_string(),
            email: None,
        };
        db.save(&mut person).unwrap();
        let (query, _) = db.driver().last_statement();
        assert!(query.starts_with("INSERT INTO"));
    }

    #[test]
    fn test_save_falls_back_to_insert_on_not_found() {
        let db = db(Dialect::Postgres);
        db.driver().push_exec(ExecResult {
            rows_affected: 0,
            last_insert_id: None,
        });
        db.driver().push_rows(vec![Row::new(vec![Value::Int(8)])]);
        let mut person = Person {
            id: 8,
            name: "Re".to_string(),
            email: None,
        };
        db.save(&mut person).unwrap();
        let statements = db.driver().recorded();
        assert!(statements[0].0.starts_with("UPDATE"));
        assert!(statements[1].0.starts_with("INSERT"));
    }

    #[test]
    fn test_save_propagates_other_update_errors() {
        let db = db(Dialect::Postgres);
        db.driver().fail_next_exec("deadlock");
        let mut person = Person {
            id: 8,
            name: "Re".to_string(),
            email: None,
        };
        let err = db.save(&mut person).unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(db.driver().recorded().len(), 1);
    }

    #[test]
    fn test_delete_by_primary_key() {
        let db = db(Dialect::Postgres);
        let mut person = Person {
            id: 4,
            name: "Del".to_string(),
            email: None,
        };
        db.delete(&mut person).unwrap();
        let (query, args) = db.driver().last_statement();
        assert_eq!(query, "DELETE FROM \"people\" WHERE \"id\" = $1");
        assert_eq!(args, vec![Value::Int(4)]);
    }

    #[test]
    fn test_delete_without_pk() {
        let db = db(Dialect::Postgres);
        let mut person = Person::default();
        assert!(matches!(
            db.delete(&mut person).unwrap_err(),
            Error::NoPrimaryKey
        ));
    }

    #[test]
    fn test_delete_many_rows_is_fatal() {
        let db = db(Dialect::Postgres);
        db.driver().push_exec(ExecResult {
            rows_affected: 3,
            last_insert_id: None,
        });
        let mut person = Person {
            id: 4,
            name: "Del".to_string(),
            email: None,
        };
        assert!(db.delete(&mut person).unwrap_err().is_fatal());
    }

    #[test]
    fn test_delete_from_returns_count() {
        let db = db(Dialect::Postgres);
        db.driver().push_exec(ExecResult {
            rows_affected: 0,
            last_insert_id: None,
        });
        let deleted = db
            .delete_from::<Person>("WHERE name = $1", &[Value::from("x")])
            .unwrap();
        assert_eq!(deleted, 0);
        let (query, _) = db.driver().last_statement();
        assert_eq!(query, "DELETE FROM \"people\" WHERE name = $1");
    }

    #[test]
    fn test_insert_log_appends_audit_columns() {
        let db = db(Dialect::Postgres);
        let person = Person {
            id: 2,
            name: "Ann".to_string(),
            email: None,
        };
        let entry = LogEntry {
            author: Some("ops".to_string()),
            action: "update".to_string(),
            date: 1_700_000_000_000_000,
            comment: "manual fix".to_string(),
        };
        db.insert_log(&person, &entry).unwrap();
        let (query, args) = db.driver().last_statement();
        assert_eq!(
            query,
            "INSERT INTO \"people_log\" (\"id\", \"name\", \"email\", \"log_author\", \
             \"log_action\", \"log_date\", \"log_comment\") VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        assert_eq!(args.len(), 7);
        assert_eq!(args[3], Value::from("ops"));
        assert_eq!(args[5], Value::Timestamp(1_700_000_000_000_000));
    }

    #[test]
    fn test_before_hook_error_aborts() {
        struct Hooked(Person);

        impl Model for Hooked {
            fn info() -> &'static sqlrow_core::StructInfo {
                Person::info()
            }
            fn values(&self) -> Vec<Value> {
                self.0.values()
            }
            fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
                self.0.set_field(field, value)
            }
            fn field_value(&self, field: &str) -> Option<Value> {
                self.0.field_value(field)
            }
            fn before_insert(&mut self) -> Result<()> {
                Err(Error::malformed("rejected by hook"))
            }
        }
        impl Record for Hooked {}

        let db = db(Dialect::Postgres);
        let mut hooked = Hooked(Person::default());
        let err = db.insert(&mut hooked).unwrap_err();
        assert!(err.to_string().contains("rejected by hook"));
        assert!(db.driver().recorded().is_empty());
    }
}
