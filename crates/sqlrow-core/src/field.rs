//! Field and relation metadata.
//!
//! [`StructInfo`] is the single interface between the engine and its
//! metadata-producing collaborators (source parser, reflection extractor,
//! code generator): an immutable description of a mapped view or table,
//! constructed once and shared read-only for the lifetime of the process.
//!
//! Nested structures are flattened *at construction*: the engine's query
//! builders walk a flat field table and never re-derive nesting at call
//! time. Each flattened field keeps the chain of embedding ancestors in its
//! `path` for diagnostics.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Semantic column type, used by the DDL renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    BigInt,
    Float,
    Double,
    Text,
    Bytes,
    Time,
    Json,
}

/// Metadata about one mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name in the host struct.
    pub name: String,
    /// SQL column name. Prefixed flattening prepends `<ancestor column>__`.
    pub column: String,
    pub field_type: FieldType,
    /// Nullable column; the host field is an `Option`.
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_pk: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub has_index: bool,
    /// Participates in filter building. Non-participating fields are skipped
    /// by the scope builder.
    #[serde(default = "default_true")]
    pub filterable: bool,
    /// Field names of embedding ancestors, outermost first. Empty for
    /// top-level fields.
    #[serde(default)]
    pub path: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, column: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            field_type,
            nullable: false,
            is_pk: false,
            is_unique: false,
            has_index: false,
            filterable: true,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.is_pk = value;
        self
    }

    #[must_use]
    pub fn unique(mut self, value: bool) -> Self {
        self.is_unique = value;
        self
    }

    #[must_use]
    pub fn indexed(mut self, value: bool) -> Self {
        self.has_index = value;
        self
    }

    /// Exclude this field from filter building.
    #[must_use]
    pub fn no_filter(mut self) -> Self {
        self.filterable = false;
        self
    }

    /// Dotted path to the field through its embedding ancestors.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.path.is_empty() {
            return self.name.clone();
        }
        let mut full = self.path.join(".");
        full.push('.');
        full.push_str(&self.name);
        full
    }
}

/// One entry in the metadata a collaborator hands to [`StructInfo::new`]:
/// a plain column, or a nested structure flattened into the parent.
#[derive(Debug, Clone)]
pub enum FieldDef {
    /// A plain column.
    Column(FieldInfo),
    /// Nested structure flattened without a column prefix.
    Embedded {
        field_name: String,
        fields: Vec<FieldDef>,
    },
    /// Nested structure flattened with every column prefixed by
    /// `<column>__`, recursively.
    Prefixed {
        field_name: String,
        column: String,
        fields: Vec<FieldDef>,
    },
}

impl FieldDef {
    /// Shorthand for a plain column definition.
    pub fn column(info: FieldInfo) -> Self {
        FieldDef::Column(info)
    }

    pub fn embedded(field_name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        FieldDef::Embedded {
            field_name: field_name.into(),
            fields,
        }
    }

    pub fn prefixed(
        field_name: impl Into<String>,
        column: impl Into<String>,
        fields: Vec<FieldDef>,
    ) -> Self {
        FieldDef::Prefixed {
            field_name: field_name.into(),
            column: column.into(),
            fields,
        }
    }
}

/// Immutable metadata for a mapped view or table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructInfo {
    schema: Option<String>,
    sql_name: String,
    fields: Vec<FieldInfo>,
    pk_index: Option<usize>,
}

impl StructInfo {
    /// Build metadata from a (possibly nested) field definition tree.
    ///
    /// Nested definitions are flattened here, once. Construction fails on
    /// duplicate column names and on more than one primary-key field.
    pub fn new(
        schema: Option<&str>,
        sql_name: impl Into<String>,
        defs: Vec<FieldDef>,
    ) -> Result<Self> {
        let sql_name = sql_name.into();
        let mut fields = Vec::new();
        flatten_defs(&mut fields, defs, "", &[]);

        let mut pk_index = None;
        for (i, field) in fields.iter().enumerate() {
            for other in &fields[..i] {
                if other.column == field.column {
                    return Err(Error::schema_mismatch(format!(
                        "{sql_name}: duplicate column name {} (used by {} and {})",
                        field.column,
                        other.full_name(),
                        field.full_name(),
                    )));
                }
            }
            if field.is_pk {
                if pk_index.is_some() {
                    return Err(Error::schema_mismatch(format!(
                        "{sql_name}: more than one primary key field"
                    )));
                }
                pk_index = Some(i);
            }
        }

        Ok(Self {
            schema: schema.map(str::to_string),
            sql_name,
            fields,
            pk_index,
        })
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    #[must_use]
    pub fn sql_name(&self) -> &str {
        &self.sql_name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Column names, in field order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }

    /// Index of the primary-key field, `None` for views.
    #[must_use]
    pub fn pk_index(&self) -> Option<usize> {
        self.pk_index
    }

    /// True for tables (single-column primary key), false for views.
    #[must_use]
    pub fn is_table(&self) -> bool {
        self.pk_index.is_some()
    }

    /// The primary-key field. Panics for views; calling this on view
    /// metadata is a precondition violation, not a recoverable state.
    #[must_use]
    pub fn pk_field(&self) -> &FieldInfo {
        match self.pk_index {
            Some(index) => &self.fields[index],
            None => panic!("sqlrow: {} is not a table", self.sql_name),
        }
    }

    /// Like [`pk_field`](Self::pk_field), as an index. Panics for views.
    #[must_use]
    pub fn pk_column_index(&self) -> usize {
        match self.pk_index {
            Some(index) => index,
            None => panic!("sqlrow: {} is not a table", self.sql_name),
        }
    }

    /// Position of a column name, if mapped.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.column == column)
    }

    /// Field metadata by host-struct field name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column name for a host-struct field name.
    #[must_use]
    pub fn column_by_field(&self, name: &str) -> Option<&str> {
        self.field_by_name(name).map(|f| f.column.as_str())
    }

    /// Quoted, schema-qualified relation name.
    #[must_use]
    pub fn qualified_name(&self, dialect: Dialect) -> String {
        let name = dialect.quote_identifier(&self.sql_name);
        match &self.schema {
            Some(schema) => format!("{}.{name}", dialect.quote_identifier(schema)),
            None => name,
        }
    }

    /// Quoted column names, each qualified by the relation name.
    #[must_use]
    pub fn qualified_columns(&self, dialect: Dialect) -> Vec<String> {
        let relation = self.qualified_name(dialect);
        self.fields
            .iter()
            .map(|f| format!("{relation}.{}", dialect.quote_identifier(&f.column)))
            .collect()
    }

    /// Shadow metadata for the audit-log relation: same columns plus the
    /// four audit columns, under `<sql_name>_log`.
    #[must_use]
    pub fn to_log(&self) -> StructInfo {
        let mut log = self.clone();
        log.sql_name.push_str("_log");
        log.fields.extend([
            FieldInfo::new("log_author", "log_author", FieldType::Text).nullable(true),
            FieldInfo::new("log_action", "log_action", FieldType::Text),
            FieldInfo::new("log_date", "log_date", FieldType::Time),
            FieldInfo::new("log_comment", "log_comment", FieldType::Text),
        ]);
        log
    }
}

fn flatten_defs(out: &mut Vec<FieldInfo>, defs: Vec<FieldDef>, prefix: &str, path: &[String]) {
    for def in defs {
        match def {
            FieldDef::Column(mut field) => {
                if !prefix.is_empty() {
                    field.column = format!("{prefix}{}", field.column);
                }
                field.path = path.to_vec();
                out.push(field);
            }
            FieldDef::Embedded { field_name, fields } => {
                let mut nested_path = path.to_vec();
                nested_path.push(field_name);
                flatten_defs(out, fields, prefix, &nested_path);
            }
            FieldDef::Prefixed {
                field_name,
                column,
                fields,
            } => {
                let mut nested_path = path.to_vec();
                nested_path.push(field_name);
                let nested_prefix = format!("{prefix}{column}__");
                flatten_defs(out, fields, &nested_prefix, &nested_path);
            }
        }
    }
}
