//! Value and column types for rdbc-bridge
//!
//! The runtime value model the bridge moves between native rows and typed
//! records:
//! - All primitive types (bool, integers, floats, exact decimal)
//! - Date/time types, split into naive (no zone) and UTC-zoned
//! - Binary data
//! - Native column metadata as reported by the backend

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// SQL value that can hold any database value the bridge understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer (covers TINYINT, SMALLINT, INTEGER)
    Int32(i32),
    /// 64-bit signed integer (BIGINT)
    Int64(i64),
    /// 32-bit floating point (REAL)
    Float32(f32),
    /// 64-bit floating point (DOUBLE PRECISION)
    Float64(f64),
    /// Arbitrary precision decimal (NUMERIC, DECIMAL)
    Decimal(Decimal),
    /// Text string (VARCHAR, TEXT, CHAR, CLOB)
    String(String),
    /// Binary data (BLOB, VARBINARY, raw binary)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Wall-clock timestamp without zone (TIMESTAMP / DATETIME)
    DateTime(NaiveDateTime),
    /// Zoned instant (TIMESTAMP WITH TIME ZONE)
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get a SQL-ish name for the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int32(_) => "INTEGER",
            Self::Int64(_) => "BIGINT",
            Self::Float32(_) => "REAL",
            Self::Float64(_) => "DOUBLE PRECISION",
            Self::Decimal(_) => "DECIMAL",
            Self::String(_) => "VARCHAR",
            Self::Bytes(_) => "BINARY",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::DateTime(_) => "TIMESTAMP",
            Self::Timestamp(_) => "TIMESTAMP WITH TIME ZONE",
        }
    }

    /// Try to convert to bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int32(n) => Some(*n != 0),
            Self::Int64(n) => Some(*n != 0),
            _ => None,
        }
    }

    /// Try to convert to i64 (lossless paths only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            Self::Decimal(d) if d.is_integer() => i64::try_from(d.mantissa() / 10i128.pow(d.scale())).ok(),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(n) => Some(f64::from(*n)),
            Self::Int64(n) => Some(*n as f64),
            Self::Float32(n) => Some(f64::from(*n)),
            Self::Float64(n) => Some(*n),
            Self::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }

    /// Try to borrow as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to borrow as bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            Self::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Convert to owned string representation, exact for numerics.
    ///
    /// Decimals render their exact textual form; this is the path that keeps
    /// zero-precision numerics from ever turning into rounded floats.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int32(n) => Some(n.to_string()),
            Self::Int64(n) => Some(n.to_string()),
            Self::Float32(n) => Some(n.to_string()),
            Self::Float64(n) => Some(n.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::Date(d) => Some(d.to_string()),
            Self::Time(t) => Some(t.to_string()),
            Self::DateTime(dt) => Some(dt.to_string()),
            Self::Timestamp(ts) => Some(ts.to_rfc3339()),
            Self::Null | Self::Bytes(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

/// Portable native type code taxonomy.
///
/// Mirrors the numeric type codes database drivers report for result-set
/// columns, so a dialect override table can match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    /// Single bit
    Bit,
    /// 8-bit integer
    TinyInt,
    /// 16-bit integer
    SmallInt,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Approximate float (driver-defined precision)
    Float,
    /// 32-bit float
    Real,
    /// 64-bit float
    Double,
    /// Exact numeric
    Numeric,
    /// Exact numeric
    Decimal,
    /// Fixed-length character
    Char,
    /// Variable-length character
    Varchar,
    /// Long variable-length character
    LongVarchar,
    /// Date without time
    Date,
    /// Time without date
    Time,
    /// Timestamp without zone
    Timestamp,
    /// Fixed-length binary
    Binary,
    /// Variable-length binary
    VarBinary,
    /// Long variable-length binary
    LongVarBinary,
    /// Typed NULL
    NullType,
    /// Driver-specific extension type
    Other,
    /// Serialized language object
    JavaObject,
    /// Distinct user-defined type
    Distinct,
    /// Structured user-defined type
    Struct,
    /// SQL array
    Array,
    /// Large character object
    Clob,
    /// Large binary object
    Blob,
    /// Reference type
    Ref,
    /// External link
    DataLink,
    /// Boolean
    Boolean,
    /// Row identifier
    RowId,
    /// National fixed-length character
    NChar,
    /// National variable-length character
    NVarchar,
    /// National long variable-length character
    LongNVarchar,
    /// National large character object
    NClob,
    /// SQL XML document
    SqlXml,
    /// Time with zone offset
    TimeWithTimezone,
    /// Timestamp with zone offset
    TimestampWithTimezone,
    /// Any code this taxonomy does not name
    Unknown(i32),
}

impl TypeCode {
    /// Map a driver-reported numeric code to the taxonomy
    pub fn from_code(code: i32) -> Self {
        match code {
            -7 => Self::Bit,
            -6 => Self::TinyInt,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            6 => Self::Float,
            7 => Self::Real,
            8 => Self::Double,
            2 => Self::Numeric,
            3 => Self::Decimal,
            1 => Self::Char,
            12 => Self::Varchar,
            -1 => Self::LongVarchar,
            91 => Self::Date,
            92 => Self::Time,
            93 => Self::Timestamp,
            -2 => Self::Binary,
            -3 => Self::VarBinary,
            -4 => Self::LongVarBinary,
            0 => Self::NullType,
            1111 => Self::Other,
            2000 => Self::JavaObject,
            2001 => Self::Distinct,
            2002 => Self::Struct,
            2003 => Self::Array,
            2005 => Self::Clob,
            2004 => Self::Blob,
            2006 => Self::Ref,
            70 => Self::DataLink,
            16 => Self::Boolean,
            -8 => Self::RowId,
            -15 => Self::NChar,
            -9 => Self::NVarchar,
            -16 => Self::LongNVarchar,
            2011 => Self::NClob,
            2009 => Self::SqlXml,
            2013 => Self::TimeWithTimezone,
            2014 => Self::TimestampWithTimezone,
            other => Self::Unknown(other),
        }
    }

    /// The driver-level numeric code for this type
    pub fn code(&self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::Binary => -2,
            Self::VarBinary => -3,
            Self::LongVarBinary => -4,
            Self::NullType => 0,
            Self::Other => 1111,
            Self::JavaObject => 2000,
            Self::Distinct => 2001,
            Self::Struct => 2002,
            Self::Array => 2003,
            Self::Clob => 2005,
            Self::Blob => 2004,
            Self::Ref => 2006,
            Self::DataLink => 70,
            Self::Boolean => 16,
            Self::RowId => -8,
            Self::NChar => -15,
            Self::NVarchar => -9,
            Self::LongNVarchar => -16,
            Self::NClob => 2011,
            Self::SqlXml => 2009,
            Self::TimeWithTimezone => 2013,
            Self::TimestampWithTimezone => 2014,
            Self::Unknown(other) => *other,
        }
    }

    /// Whether this code is a driver-specific extension with no standard
    /// bind representation (routed through the dialect's value adapter)
    pub fn is_extension(&self) -> bool {
        matches!(
            self,
            Self::Other
                | Self::JavaObject
                | Self::Distinct
                | Self::RowId
                | Self::SqlXml
                | Self::Unknown(_)
        )
    }
}

impl std::fmt::Display for TypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Database row as ordered column values
#[derive(Debug, Clone)]
pub struct Row {
    /// Column names
    columns: Vec<String>,
    /// Column values (same order as columns)
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column names
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get all values
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column index
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Get value by column name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }
}

/// Native column metadata as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Native type name (vendor-specific, e.g. `int8`, `YEAR`, `timestamptz`)
    pub type_name: String,
    /// Native type code as reported by the driver
    pub type_code: TypeCode,
    /// Precision for numeric types (0 = undeclared)
    pub precision: u32,
    /// Scale for numeric types
    pub scale: i32,
    /// Whether column is nullable
    pub nullable: bool,
    /// Column ordinal (1-based)
    pub ordinal: u32,
}

impl ColumnMetadata {
    /// Create column metadata with the common fields
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            type_code,
            precision: 0,
            scale: 0,
            nullable: true,
            ordinal: 0,
        }
    }

    /// Set declared precision and scale
    pub fn with_precision(mut self, precision: u32, scale: i32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Binding between a record field and the physical destination column
/// used when writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Field/column name
    pub name: String,
    /// Native type name of the destination column
    pub type_name: String,
    /// Native type code of the destination column
    pub type_code: TypeCode,
}

impl ColumnType {
    /// Create a column type binding
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            type_code,
        }
    }

    /// Match record field names against the destination table's reported
    /// columns by case-insensitive name lookup.
    ///
    /// A missing or ambiguous match is a configuration error, never a
    /// silently dropped field.
    pub fn resolve(field_names: &[&str], reported: &[ColumnMetadata]) -> Result<Vec<ColumnType>> {
        let mut resolved = Vec::with_capacity(field_names.len());
        for field in field_names {
            let mut matches = reported
                .iter()
                .filter(|c| c.name.eq_ignore_ascii_case(field));

            let column = matches.next().ok_or_else(|| {
                Error::config(
                    field.to_string(),
                    "field has no matching column in the destination table",
                )
            })?;
            if matches.next().is_some() {
                return Err(Error::config(
                    field.to_string(),
                    "field matches more than one destination column (case-insensitive)",
                ));
            }
            resolved.push(ColumnType::new(
                column.name.clone(),
                column.type_name.clone(),
                column.type_code,
            ));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int32(0).is_null());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(1).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Float64(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_decimal_exact_text() {
        let d: Decimal = "123.4568".parse().unwrap();
        assert_eq!(Value::Decimal(d).as_string(), Some("123.4568".to_string()));
    }

    #[test]
    fn test_type_code_round_trip() {
        for code in [-7, -6, 5, 4, -5, 6, 7, 8, 2, 3, 1, 12, -1, 91, 92, 93, 2014, 1111] {
            assert_eq!(TypeCode::from_code(code).code(), code);
        }
        assert_eq!(TypeCode::from_code(4242), TypeCode::Unknown(4242));
        assert_eq!(TypeCode::Unknown(4242).code(), 4242);
    }

    #[test]
    fn test_type_code_extension() {
        assert!(TypeCode::Other.is_extension());
        assert!(TypeCode::RowId.is_extension());
        assert!(!TypeCode::Varchar.is_extension());
        assert!(!TypeCode::Timestamp.is_extension());
    }

    #[test]
    fn test_row_lookup_case_insensitive() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int32(1), Value::String("Alice".into())],
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::Int32(1)));
        assert_eq!(row.get_by_name("NAME"), Some(&Value::String("Alice".into())));
    }

    #[test]
    fn test_column_type_resolve() {
        let reported = vec![
            ColumnMetadata::new("ID", "int4", TypeCode::Integer),
            ColumnMetadata::new("Name", "varchar", TypeCode::Varchar),
        ];

        let resolved = ColumnType::resolve(&["id", "name"], &reported).unwrap();
        assert_eq!(resolved[0].name, "ID");
        assert_eq!(resolved[1].type_code, TypeCode::Varchar);
    }

    #[test]
    fn test_column_type_resolve_missing() {
        let reported = vec![ColumnMetadata::new("id", "int4", TypeCode::Integer)];
        let err = ColumnType::resolve(&["id", "missing"], &reported).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_column_type_resolve_ambiguous() {
        let reported = vec![
            ColumnMetadata::new("id", "int4", TypeCode::Integer),
            ColumnMetadata::new("ID", "int8", TypeCode::BigInt),
        ];
        let err = ColumnType::resolve(&["id"], &reported).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }
}
