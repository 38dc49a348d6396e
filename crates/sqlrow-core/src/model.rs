//! Capability traits implemented by mapped types.
//!
//! Generated per-type glue (an external collaborator) implements [`Model`]
//! for every mapped struct and additionally [`Record`] for structs whose
//! relation has a single-column primary key. The engine only ever talks to
//! these traits, never to concrete generated types.
//!
//! Lifecycle hooks are ordinary trait methods with default no-op bodies: a
//! type opts into a hook by overriding it. A hook returning an error aborts
//! the enclosing operation; before-hooks run before any statement reaches
//! the database.

use crate::error::{Error, Result};
use crate::field::StructInfo;
use crate::row::Row;
use crate::value::Value;

/// A type mapped to a SQL view or table.
pub trait Model {
    /// Metadata for the mapped relation. Produced once by the metadata
    /// collaborator and shared read-only.
    fn info() -> &'static StructInfo;

    /// Current field values, in metadata column order.
    fn values(&self) -> Vec<Value>;

    /// Overwrite one field, addressed by its host-struct name.
    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;

    /// Current value of one field, addressed by its host-struct name.
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Overwrite all fields from a scanned row, positionally.
    fn load_row(&mut self, row: Row) -> Result<()> {
        let info = Self::info();
        if row.len() != info.fields().len() {
            return Err(Error::schema_mismatch(format!(
                "{}: expected {} columns, row has {}",
                info.sql_name(),
                info.fields().len(),
                row.len()
            )));
        }
        for (field, value) in info.fields().iter().zip(row) {
            self.set_field(&field.name, value)?;
        }
        Ok(())
    }

    /// Overwrite the named fields from a scanned row, positionally.
    fn load_fields(&mut self, fields: &[&str], row: Row) -> Result<()> {
        if row.len() != fields.len() {
            return Err(Error::schema_mismatch(format!(
                "expected {} columns, row has {}",
                fields.len(),
                row.len()
            )));
        }
        for (name, value) in fields.iter().zip(row) {
            self.set_field(name, value)?;
        }
        Ok(())
    }

    fn before_insert(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_insert(&mut self) -> Result<()> {
        Ok(())
    }

    /// Runs after every successful scan into this value.
    fn after_find(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [`Model`] whose relation is a table with a single-column primary key.
///
/// Every method has a default body derived from the [`Model`] accessors, so
/// generated glue usually implements this trait with an empty block.
pub trait Record: Model {
    /// Value of the primary-key field. Never borrows from the record.
    fn pk_value(&self) -> Value {
        let pk = Self::info().pk_field();
        self.field_value(&pk.name).unwrap_or(Value::Null)
    }

    /// Assign the primary-key field.
    fn set_pk(&mut self, pk: Value) -> Result<()> {
        let field = Self::info().pk_field();
        self.set_field(&field.name, pk)
    }

    /// True iff the primary key differs from its zero value.
    fn has_pk(&self) -> bool {
        !self.pk_value().is_zero()
    }

    fn before_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_delete(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_delete(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDef, FieldInfo, FieldType};
    use std::sync::LazyLock;

    static INFO: LazyLock<StructInfo> = LazyLock::new(|| {
        StructInfo::new(
            None,
            "widgets",
            vec![
                FieldDef::column(FieldInfo::new("id", "id", FieldType::BigInt).primary_key(true)),
                FieldDef::column(FieldInfo::new("label", "label", FieldType::Text)),
            ],
        )
        .expect("widget metadata")
    });

    #[derive(Debug, Default)]
    struct Widget {
        id: i64,
        label: String,
    }

    impl Model for Widget {
        fn info() -> &'static StructInfo {
            &INFO
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Int(self.id), Value::from(self.label.as_str())]
        }

        fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = value.as_int().unwrap_or_default(),
                "label" => self.label = value.as_str().unwrap_or_default().to_string(),
                other => {
                    return Err(Error::schema_mismatch(format!("unknown field: {other}")));
                }
            }
            Ok(())
        }

        fn field_value(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::Int(self.id)),
                "label" => Some(Value::from(self.label.as_str())),
                _ => None,
            }
        }
    }

    impl Record for Widget {}

    #[test]
    fn test_load_row() {
        let mut widget = Widget::default();
        widget
            .load_row(Row::new(vec![Value::Int(3), Value::from("bolt")]))
            .unwrap();
        assert_eq!(widget.id, 3);
        assert_eq!(widget.label, "bolt");
    }

    #[test]
    fn test_load_row_arity_mismatch() {
        let mut widget = Widget::default();
        let err = widget.load_row(Row::new(vec![Value::Int(3)])).unwrap_err();
        assert!(err.to_string().contains("expected 2 columns"));
    }

    #[test]
    fn test_load_fields_subset() {
        let mut widget = Widget::default();
        widget
            .load_fields(&["label"], Row::new(vec![Value::from("nut")]))
            .unwrap();
        assert_eq!(widget.label, "nut");
        assert_eq!(widget.id, 0);
    }

    #[test]
    fn test_pk_defaults() {
        let mut widget = Widget::default();
        assert!(!widget.has_pk());
        assert_eq!(widget.pk_value(), Value::Int(0));
        widget.set_pk(Value::Int(9)).unwrap();
        assert!(widget.has_pk());
        assert_eq!(widget.pk_value(), Value::Int(9));
    }

    #[test]
    fn test_unknown_field_is_schema_mismatch() {
        let mut widget = Widget::default();
        assert!(widget.set_field("nope", Value::Null).is_err());
    }
}
