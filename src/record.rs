//! Structured records for rdbc-bridge
//!
//! A `StructuredRecord` is an immutable, schema-conformant mapping from field
//! name to typed value. Records are only constructed through the validating
//! builder, so a record in hand always conforms to its schema.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::{FieldType, Schema};
use crate::types::Value;

/// An immutable, schema-conformant record
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecord {
    schema: Arc<Schema>,
    /// Values in schema field order
    values: Vec<Value>,
}

impl StructuredRecord {
    /// Start building a record against a schema
    pub fn builder(schema: Arc<Schema>) -> RecordBuilder {
        let len = schema.len();
        RecordBuilder {
            schema,
            values: vec![None; len],
        }
    }

    /// The record's schema
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a value by field name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.field_index(name).map(|i| &self.values[i])
    }

    /// Get a value by field position
    #[inline]
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Values in schema field order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Builder for `StructuredRecord`
#[derive(Debug)]
pub struct RecordBuilder {
    schema: Arc<Schema>,
    values: Vec<Option<Value>>,
}

impl RecordBuilder {
    /// Set a field value.
    ///
    /// Unknown field names and values whose type does not conform to the
    /// field's declared type are rejected.
    pub fn set(mut self, name: &str, value: Value) -> Result<Self> {
        let idx = self.schema.field_index(name).ok_or_else(|| {
            Error::config(name.to_string(), "field is not declared in the schema")
        })?;
        let field = &self.schema.fields[idx];

        if value.is_null() {
            if !field.nullable {
                return Err(Error::serialization(
                    &field.name,
                    "NULL",
                    field.field_type.display_name(),
                    "field is not nullable",
                ));
            }
        } else if !conforms(&field.field_type, &value) {
            return Err(Error::serialization(
                &field.name,
                value.type_name(),
                field.field_type.display_name(),
                "value does not conform to the declared field type",
            ));
        }

        self.values[idx] = Some(value);
        Ok(self)
    }

    /// Finish the record. Unset nullable fields become NULL; an unset
    /// non-nullable field is an error.
    pub fn build(self) -> Result<StructuredRecord> {
        let mut values = Vec::with_capacity(self.values.len());
        for (slot, field) in self.values.into_iter().zip(&self.schema.fields) {
            match slot {
                Some(v) => values.push(v),
                None if field.nullable => values.push(Value::Null),
                None => {
                    return Err(Error::serialization(
                        &field.name,
                        "NULL",
                        field.field_type.display_name(),
                        "non-nullable field was never set",
                    ));
                }
            }
        }
        Ok(StructuredRecord {
            schema: self.schema,
            values,
        })
    }
}

/// Whether a (non-null) value conforms to a declared field type
fn conforms(field_type: &FieldType, value: &Value) -> bool {
    matches!(
        (field_type, value),
        (FieldType::String, Value::String(_))
            | (FieldType::Bool, Value::Bool(_))
            | (FieldType::Int32, Value::Int32(_))
            | (FieldType::Int64, Value::Int64(_))
            | (FieldType::Float32, Value::Float32(_))
            | (FieldType::Float64, Value::Float64(_))
            | (FieldType::Bytes, Value::Bytes(_))
            | (FieldType::Date, Value::Date(_))
            | (FieldType::Time, Value::Time(_))
            | (FieldType::Datetime, Value::DateTime(_))
            | (FieldType::Timestamp, Value::Timestamp(_))
            | (FieldType::Decimal { .. }, Value::Decimal(_))
    )
}
