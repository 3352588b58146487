//! Record codec for rdbc-bridge
//!
//! Converts between native rows and typed records in both directions:
//! - `decode_row`: native result row -> `StructuredRecord`, positionally,
//!   using the coercion implied by each field's logical type
//! - `encode_record`: `StructuredRecord` -> bound write parameters for the
//!   destination's reported column types
//!
//! Decimal handling is exact: rescaling uses round-half-to-even and a value
//! whose digits exceed the declared precision is a serialization error, never
//! a silent truncation.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::dialect::DialectDescriptor;
use crate::error::{Error, Result};
use crate::record::StructuredRecord;
use crate::schema::{FieldType, Schema, SchemaField};
use crate::types::{ColumnType, Row, TypeCode, Value};

/// Decode one native row into a typed record, by position against the schema.
pub fn decode_row(row: &Row, schema: &Arc<Schema>) -> Result<StructuredRecord> {
    if row.len() < schema.len() {
        return Err(Error::internal(format!(
            "row has {} columns but the schema declares {} fields",
            row.len(),
            schema.len()
        )));
    }

    let mut builder = StructuredRecord::builder(Arc::clone(schema));
    for (idx, field) in schema.fields.iter().enumerate() {
        let raw = row
            .get(idx)
            .ok_or_else(|| Error::internal(format!("missing column {idx}")))?;
        let value = decode_value(field, raw)?;
        builder = builder.set(&field.name, value)?;
    }
    builder.build()
}

/// Coerce one raw value into a field's declared type
fn decode_value(field: &SchemaField, raw: &Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || {
        Error::serialization(
            &field.name,
            raw.type_name(),
            field.field_type.display_name(),
            "no conversion path for this value",
        )
    };

    Ok(match &field.field_type {
        FieldType::String => {
            // Numerics decode through their exact textual form; this is the
            // path zero-precision numerics take, so no rounding ever happens.
            Value::String(raw.as_string().ok_or_else(mismatch)?)
        }
        FieldType::Bool => Value::Bool(raw.as_bool().ok_or_else(mismatch)?),
        FieldType::Int32 => match raw {
            Value::Int32(n) => Value::Int32(*n),
            Value::Int64(n) => {
                Value::Int32(i32::try_from(*n).map_err(|_| out_of_range(field, raw, "INT32"))?)
            }
            _ => return Err(mismatch()),
        },
        FieldType::Int64 => match raw {
            Value::Int32(n) => Value::Int64(i64::from(*n)),
            Value::Int64(n) => Value::Int64(*n),
            _ => return Err(mismatch()),
        },
        FieldType::Float32 => match raw {
            Value::Float32(n) => Value::Float32(*n),
            Value::Int32(n) => Value::Float32(*n as f32),
            _ => return Err(mismatch()),
        },
        FieldType::Float64 => match raw {
            Value::Float32(n) => Value::Float64(f64::from(*n)),
            Value::Float64(n) => Value::Float64(*n),
            Value::Int32(n) => Value::Float64(f64::from(*n)),
            Value::Int64(n) => Value::Float64(*n as f64),
            _ => return Err(mismatch()),
        },
        FieldType::Bytes => match raw {
            Value::Bytes(b) => Value::Bytes(b.clone()),
            Value::String(s) => Value::Bytes(s.clone().into_bytes()),
            _ => return Err(mismatch()),
        },
        FieldType::Date => match raw {
            Value::Date(d) => Value::Date(*d),
            Value::DateTime(dt) => Value::Date(dt.date()),
            _ => return Err(mismatch()),
        },
        FieldType::Time => match raw {
            Value::Time(t) => Value::Time(*t),
            Value::DateTime(dt) => Value::Time(dt.time()),
            _ => return Err(mismatch()),
        },
        // A naive reading stays wall-clock; a zoned reading drops its zone.
        FieldType::Datetime => match raw {
            Value::DateTime(dt) => Value::DateTime(*dt),
            Value::Timestamp(ts) => Value::DateTime(ts.naive_utc()),
            _ => return Err(mismatch()),
        },
        // A naive reading is reinterpreted as UTC; a zoned reading passes.
        FieldType::Timestamp => match raw {
            Value::Timestamp(ts) => Value::Timestamp(*ts),
            Value::DateTime(dt) => Value::Timestamp(Utc.from_utc_datetime(dt)),
            _ => return Err(mismatch()),
        },
        FieldType::Decimal { precision, scale } => {
            let decimal = match raw {
                Value::Decimal(d) => *d,
                Value::Int32(n) => Decimal::from(*n),
                Value::Int64(n) => Decimal::from(*n),
                Value::String(s) => s
                    .parse::<Decimal>()
                    .map_err(|e| decimal_error(field, raw, &e.to_string()))?,
                Value::Float64(f) => {
                    Decimal::from_f64_retain(*f).ok_or_else(|| mismatch())?
                }
                _ => return Err(mismatch()),
            };
            Value::Decimal(rescale(field, decimal, *precision, *scale)?)
        }
    })
}

/// Rescale a decimal to the declared scale using round-half-to-even and
/// verify it fits the declared precision.
fn rescale(field: &SchemaField, value: Decimal, precision: u32, scale: u32) -> Result<Decimal> {
    let mut scaled = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    scaled.rescale(scale);

    if precision >= scale {
        let integral_digits = precision - scale;
        let limit = Decimal::from(10i64.pow(integral_digits.min(18)));
        if integral_digits <= 18 && scaled.abs() >= limit {
            return Err(Error::serialization(
                &field.name,
                value.to_string(),
                field.field_type.display_name(),
                format!("value does not fit precision {precision}"),
            ));
        }
    }
    Ok(scaled)
}

fn out_of_range(field: &SchemaField, raw: &Value, target: &str) -> Error {
    Error::serialization(
        &field.name,
        raw.type_name(),
        target,
        format!("value {} is out of range", raw.as_string().unwrap_or_default()),
    )
}

fn decimal_error(field: &SchemaField, raw: &Value, detail: &str) -> Error {
    Error::serialization(
        &field.name,
        raw.type_name(),
        field.field_type.display_name(),
        detail,
    )
}

/// Encode a typed record into bound write parameters, one per destination
/// column, in column order.
pub fn encode_record(
    record: &StructuredRecord,
    columns: &[ColumnType],
    dialect: &DialectDescriptor,
) -> Result<Vec<Value>> {
    let mut params = Vec::with_capacity(columns.len());
    for column in columns {
        let value = record.get(&column.name).ok_or_else(|| {
            Error::config(
                column.name.clone(),
                "destination column has no matching record field",
            )
        })?;
        params.push(encode_value(&column.name, value, column, dialect)?);
    }
    Ok(params)
}

/// Encode one field value for a destination column
fn encode_value(
    field: &str,
    value: &Value,
    column: &ColumnType,
    dialect: &DialectDescriptor,
) -> Result<Value> {
    // Typed SQL null: the bind layer carries the column's type alongside.
    if value.is_null() {
        return Ok(Value::Null);
    }

    // Driver-specific extension types go through the dialect's adapter.
    if column.type_code.is_extension() {
        return dialect.adapter.bind(field, value, column);
    }

    let mismatch = || {
        Error::serialization(
            field,
            value.type_name(),
            format!("{} (code {})", column.type_name, column.type_code.code()),
            "no conversion path for this value",
        )
    };
    let narrow_err = |width: &str| {
        Error::serialization(
            field,
            value.type_name(),
            format!("{} (code {})", column.type_name, column.type_code.code()),
            format!(
                "value {} does not fit {width}",
                value.as_string().unwrap_or_default()
            ),
        )
    };

    Ok(match column.type_code {
        TypeCode::Bit | TypeCode::Boolean => Value::Bool(value.as_bool().ok_or_else(mismatch)?),
        TypeCode::TinyInt => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            i8::try_from(n).map_err(|_| narrow_err("TINYINT"))?;
            Value::Int32(n as i32)
        }
        TypeCode::SmallInt => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            i16::try_from(n).map_err(|_| narrow_err("SMALLINT"))?;
            Value::Int32(n as i32)
        }
        TypeCode::Integer => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            Value::Int32(i32::try_from(n).map_err(|_| narrow_err("INTEGER"))?)
        }
        TypeCode::BigInt => Value::Int64(value.as_i64().ok_or_else(mismatch)?),
        TypeCode::Real => match value {
            Value::Float32(n) => Value::Float32(*n),
            Value::Float64(n) => Value::Float32(*n as f32),
            Value::Int32(n) => Value::Float32(*n as f32),
            _ => return Err(mismatch()),
        },
        TypeCode::Float | TypeCode::Double => Value::Float64(value.as_f64().ok_or_else(mismatch)?),
        TypeCode::Numeric | TypeCode::Decimal => match value {
            Value::Decimal(d) => Value::Decimal(*d),
            Value::Int32(n) => Value::Decimal(Decimal::from(*n)),
            Value::Int64(n) => Value::Decimal(Decimal::from(*n)),
            // String fields backing a zero-precision numeric write their
            // exact textual form back as an exact decimal bind.
            Value::String(s) => Value::Decimal(s.parse::<Decimal>().map_err(|_| mismatch())?),
            _ => return Err(mismatch()),
        },
        TypeCode::Char
        | TypeCode::Varchar
        | TypeCode::LongVarchar
        | TypeCode::NChar
        | TypeCode::NVarchar
        | TypeCode::LongNVarchar
        | TypeCode::Clob
        | TypeCode::NClob => Value::String(value.as_string().ok_or_else(mismatch)?),
        TypeCode::Date => match value {
            Value::Date(d) => Value::Date(*d),
            Value::DateTime(dt) => Value::Date(dt.date()),
            _ => return Err(mismatch()),
        },
        TypeCode::Time | TypeCode::TimeWithTimezone => match value {
            Value::Time(t) => Value::Time(*t),
            _ => return Err(mismatch()),
        },
        TypeCode::Timestamp => match value {
            Value::DateTime(dt) => Value::DateTime(*dt),
            Value::Timestamp(ts) => Value::DateTime(ts.naive_utc()),
            _ => return Err(mismatch()),
        },
        TypeCode::TimestampWithTimezone => match value {
            Value::Timestamp(ts) => Value::Timestamp(*ts),
            Value::DateTime(dt) => Value::Timestamp(Utc.from_utc_datetime(dt)),
            _ => return Err(mismatch()),
        },
        // Large-object and raw-binary destinations take the same bytes bind.
        TypeCode::Binary | TypeCode::VarBinary | TypeCode::LongVarBinary | TypeCode::Blob => {
            match value {
                Value::Bytes(b) => Value::Bytes(b.clone()),
                Value::String(s) => Value::Bytes(s.clone().into_bytes()),
                _ => return Err(mismatch()),
            }
        }
        _ => return Err(mismatch()),
    })
}
