//! Shared fixtures for the end-to-end tests: hand-written glue in the shape
//! the code generator would emit, plus a query-collecting logger.
#![allow(dead_code)]

use std::sync::{LazyLock, Mutex};
use std::time::Duration;

use sqlrow::prelude::*;
use sqlrow::Logger;
use sqlrow_sqlite::SqliteDriver;

static PERSON_INFO: LazyLock<StructInfo> = LazyLock::new(|| {
    StructInfo::new(
        None,
        "people",
        vec![
            FieldDef::column(FieldInfo::new("id", "id", FieldType::BigInt).primary_key(true)),
            FieldDef::column(FieldInfo::new("name", "name", FieldType::Text)),
            FieldDef::column(FieldInfo::new("email", "email", FieldType::Text).nullable(true)),
            FieldDef::column(FieldInfo::new("age", "age", FieldType::Int)),
        ],
    )
    .expect("person metadata")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl Model for Person {
    fn info() -> &'static StructInfo {
        &PERSON_INFO
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.id),
            Value::from(self.name.as_str()),
            Value::from(self.email.clone()),
            Value::Int(self.age),
        ]
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_int().unwrap_or_default(),
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            "email" => self.email = value.as_str().map(str::to_string),
            "age" => self.age = value.as_int().unwrap_or_default(),
            other => return Err(Error::schema_mismatch(format!("unknown field: {other}"))),
        }
        Ok(())
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Int(self.id)),
            "name" => Some(Value::from(self.name.as_str())),
            "email" => Some(Value::from(self.email.clone())),
            "age" => Some(Value::Int(self.age)),
            _ => None,
        }
    }
}

impl Record for Person {}

/// A logger that keeps every statement it sees.
#[derive(Default)]
pub struct CollectingLogger {
    pub queries: Mutex<Vec<String>>,
}

impl Logger for CollectingLogger {
    fn before(&self, query: &str, _args: &[Value]) {
        self.queries.lock().unwrap().push(query.to_string());
    }

    fn after(&self, _query: &str, _args: &[Value], _elapsed: Duration, _error: Option<&Error>) {}
}

/// Fresh in-memory database with the people table created.
pub fn people_db() -> Db<SqliteDriver> {
    let db = Db::new(
        SqliteDriver::open_in_memory().expect("open in-memory sqlite"),
        Dialect::Sqlite,
    );
    db.create_table_if_not_exists::<Person>()
        .expect("create people table");
    db
}

pub fn person(name: &str, email: Option<&str>, age: i64) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        email: email.map(str::to_string),
        age,
    }
}
