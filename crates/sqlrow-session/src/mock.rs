//! Test doubles shared by the engine's unit tests: a scripted driver and a
//! hand-implemented fixture record (standing in for generated glue).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::LazyLock;

use sqlrow_core::{
    Driver, DriverTx, Error, ExecResult, FieldDef, FieldInfo, FieldType, Model, Record, Result,
    Row, StructInfo, Value,
};

/// Records every statement and replays canned results.
pub struct MockDriver {
    statements: RefCell<Vec<(String, Vec<Value>)>>,
    exec_results: RefCell<VecDeque<ExecResult>>,
    query_results: RefCell<VecDeque<Vec<Row>>>,
    exec_failure: RefCell<Option<String>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            statements: RefCell::new(Vec::new()),
            exec_results: RefCell::new(VecDeque::new()),
            query_results: RefCell::new(VecDeque::new()),
            exec_failure: RefCell::new(None),
        }
    }

    /// Queue an exec result; when the queue is empty, exec reports one
    /// affected row with `last_insert_id = Some(1)`.
    pub fn push_exec(&self, result: ExecResult) {
        self.exec_results.borrow_mut().push_back(result);
    }

    /// Queue a result set for the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.query_results.borrow_mut().push_back(rows);
    }

    /// Make the next exec fail with a driver error.
    pub fn fail_next_exec(&self, message: &str) {
        *self.exec_failure.borrow_mut() = Some(message.to_string());
    }

    /// Every statement issued so far, with its bound parameters.
    pub fn recorded(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.borrow().clone()
    }

    /// The most recent statement.
    pub fn last_statement(&self) -> (String, Vec<Value>) {
        self.statements
            .borrow()
            .last()
            .cloned()
            .expect("no statements recorded")
    }

    fn record(&self, query: &str, params: &[Value]) {
        self.statements
            .borrow_mut()
            .push((query.to_string(), params.to_vec()));
    }

    fn next_exec(&self) -> Result<ExecResult> {
        if let Some(message) = self.exec_failure.borrow_mut().take() {
            return Err(Error::driver_msg(message));
        }
        Ok(self
            .exec_results
            .borrow_mut()
            .pop_front()
            .unwrap_or(ExecResult {
                rows_affected: 1,
                last_insert_id: Some(1),
            }))
    }

    fn next_rows(&self) -> Vec<Row> {
        self.query_results.borrow_mut().pop_front().unwrap_or_default()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MockDriver {
    type Tx<'conn>
        = MockTx<'conn>
    where
        Self: 'conn;

    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.record(query, params);
        self.next_exec()
    }

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(query, params);
        Ok(self.next_rows())
    }

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        self.record(query, params);
        Ok(self.next_rows().into_iter().next())
    }

    fn begin(&self) -> Result<Self::Tx<'_>> {
        Ok(MockTx { driver: self })
    }
}

pub struct MockTx<'conn> {
    driver: &'conn MockDriver,
}

impl DriverTx for MockTx<'_> {
    fn exec(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.driver.exec(query, params)
    }

    fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.driver.query(query, params)
    }

    fn query_row(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        self.driver.query_row(query, params)
    }

    fn commit(self) -> Result<()> {
        self.driver.record("COMMIT", &[]);
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.driver.record("ROLLBACK", &[]);
        Ok(())
    }
}

static PERSON_INFO: LazyLock<StructInfo> = LazyLock::new(|| {
    StructInfo::new(
        None,
        "people",
        vec![
            FieldDef::column(FieldInfo::new("id", "id", FieldType::BigInt).primary_key(true)),
            FieldDef::column(FieldInfo::new("name", "name", FieldType::Text)),
            FieldDef::column(FieldInfo::new("email", "email", FieldType::Text).nullable(true)),
        ],
    )
    .expect("person metadata")
});

/// Fixture record in the shape generated glue would take.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
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
        ]
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_int().unwrap_or_default(),
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            "email" => self.email = value.as_str().map(str::to_string),
            other => return Err(Error::schema_mismatch(format!("unknown field: {other}"))),
        }
        Ok(())
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Int(self.id)),
            "name" => Some(Value::from(self.name.as_str())),
            "email" => Some(Value::from(self.email.clone())),
            _ => None,
        }
    }
}

impl Record for Person {}

static PERSON_PROJECT_INFO: LazyLock<StructInfo> = LazyLock::new(|| {
    StructInfo::new(
        None,
        "person_project",
        vec![
            FieldDef::column(FieldInfo::new("person_id", "person_id", FieldType::BigInt)),
            FieldDef::column(FieldInfo::new("project_id", "project_id", FieldType::Text)),
        ],
    )
    .expect("person_project metadata")
});

/// Fixture for a keyless mapped type (a junction relation).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonProject {
    pub person_id: i64,
    pub project_id: String,
}

impl Model for PersonProject {
    fn info() -> &'static StructInfo {
        &PERSON_PROJECT_INFO
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.person_id),
            Value::from(self.project_id.as_str()),
        ]
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "person_id" => self.person_id = value.as_int().unwrap_or_default(),
            "project_id" => self.project_id = value.as_str().unwrap_or_default().to_string(),
            other => return Err(Error::schema_mismatch(format!("unknown field: {other}"))),
        }
        Ok(())
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "person_id" => Some(Value::Int(self.person_id)),
            "project_id" => Some(Value::from(self.project_id.as_str())),
            _ => None,
        }
    }
}
