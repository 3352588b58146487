//! Typed schema model and native-type mapping for rdbc-bridge
//!
//! Provides:
//! - Schema / SchemaField / FieldType: the portable typed schema, with a
//!   serde document form usable as an explicit override schema
//! - map_column: native column metadata -> typed schema field, a base table
//!   plus a per-dialect override layer
//! - derive_schema: schema derivation with an ignore predicate for synthetic
//!   bookkeeping columns injected by query rewriting

use serde::{Deserialize, Serialize};

use crate::dialect::DialectDescriptor;
use crate::error::{Error, Result};
use crate::types::{ColumnMetadata, TypeCode};

/// Field type: a primitive, or a logical type layered over a primitive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldType {
    /// Text string
    String,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Binary data
    Bytes,
    /// Date without time (logical, over int32 days)
    Date,
    /// Time without date (logical, over int64 micros)
    Time,
    /// Wall-clock timestamp without zone (logical)
    Datetime,
    /// Zoned instant (logical)
    Timestamp,
    /// Exact decimal with declared precision and scale (logical, over bytes)
    Decimal {
        /// Total significant digits
        precision: u32,
        /// Digits right of the decimal point
        scale: u32,
    },
}

impl FieldType {
    /// Human-readable name used in error messages
    pub fn display_name(&self) -> String {
        match self {
            Self::String => "STRING".into(),
            Self::Bool => "BOOL".into(),
            Self::Int32 => "INT32".into(),
            Self::Int64 => "INT64".into(),
            Self::Float32 => "FLOAT32".into(),
            Self::Float64 => "FLOAT64".into(),
            Self::Bytes => "BYTES".into(),
            Self::Date => "DATE".into(),
            Self::Time => "TIME".into(),
            Self::Datetime => "DATETIME".into(),
            Self::Timestamp => "TIMESTAMP".into(),
            Self::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One named, independently nullable field of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field admits NULL
    pub nullable: bool,
}

impl SchemaField {
    /// Create a nullable field
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Create a non-nullable field
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }
}

/// An ordered collection of named fields.
///
/// Field order is fixed for the lifetime of one query execution; the codec
/// decodes rows by position against this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Fields in declaration order
    pub fields: Vec<SchemaField>,
}

impl Schema {
    /// Create a schema from fields
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name (case-insensitive, like column matching)
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Position of a field by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Serialize to the JSON document form used for override schemas
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::internal(format!("cannot serialize schema: {e}")))
    }

    /// Parse the JSON document form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config("schema", format!("invalid schema document: {e}")))
    }
}

/// Generate the session token embedded in the names of synthetic bookkeeping
/// columns injected by query rewriting.
pub fn session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Whether a column name carries the given session token and should be
/// suppressed during schema derivation.
pub fn is_synthetic_column(name: &str, token: &str) -> bool {
    !token.is_empty() && name.contains(token)
}

/// Map one native column to a typed schema field.
///
/// The dialect's override table is consulted first; the base table covers the
/// standard numeric/character/binary/temporal taxonomy. Unmappable native
/// types (opaque, structural, unsupported) fail here, synchronously, never at
/// row-decode time.
pub fn map_column(column: &ColumnMetadata, dialect: &DialectDescriptor) -> Result<SchemaField> {
    if let Some(ty) = dialect.type_override(column) {
        return Ok(SchemaField {
            name: column.name.clone(),
            field_type: ty,
            nullable: column.nullable,
        });
    }

    let field_type = match column.type_code {
        TypeCode::Bit | TypeCode::Boolean => FieldType::Bool,
        TypeCode::TinyInt | TypeCode::SmallInt | TypeCode::Integer => FieldType::Int32,
        TypeCode::BigInt => FieldType::Int64,
        TypeCode::Real => FieldType::Float32,
        TypeCode::Float | TypeCode::Double => FieldType::Float64,
        TypeCode::Numeric | TypeCode::Decimal => {
            // A numeric column with zero declared precision has no bounded
            // decimal representation; it maps to string so no digit is ever
            // silently rounded away.
            if column.precision == 0 {
                FieldType::String
            } else {
                FieldType::Decimal {
                    precision: column.precision,
                    scale: column.scale.max(0) as u32,
                }
            }
        }
        TypeCode::Char
        | TypeCode::Varchar
        | TypeCode::LongVarchar
        | TypeCode::NChar
        | TypeCode::NVarchar
        | TypeCode::LongNVarchar
        | TypeCode::Clob
        | TypeCode::NClob => FieldType::String,
        TypeCode::Date => FieldType::Date,
        TypeCode::Time | TypeCode::TimeWithTimezone => FieldType::Time,
        TypeCode::Timestamp => {
            if dialect.is_zone_aware(&column.type_name) {
                FieldType::Timestamp
            } else {
                FieldType::Datetime
            }
        }
        TypeCode::TimestampWithTimezone => FieldType::Timestamp,
        TypeCode::Binary | TypeCode::VarBinary | TypeCode::LongVarBinary | TypeCode::Blob => {
            FieldType::Bytes
        }
        TypeCode::NullType
        | TypeCode::Other
        | TypeCode::JavaObject
        | TypeCode::Distinct
        | TypeCode::Struct
        | TypeCode::Array
        | TypeCode::Ref
        | TypeCode::DataLink
        | TypeCode::RowId
        | TypeCode::SqlXml
        | TypeCode::Unknown(_) => {
            return Err(Error::mapping(
                column.name.clone(),
                column.type_name.clone(),
                column.type_code.code(),
                "native type has no portable schema representation",
            ));
        }
    };

    Ok(SchemaField {
        name: column.name.clone(),
        field_type,
        nullable: column.nullable,
    })
}

/// Derive a schema from reported column metadata.
///
/// Columns matching the ignore predicate (synthetic bookkeeping columns) are
/// suppressed. Any unmappable column is a fatal mapping error.
pub fn derive_schema<F>(
    columns: &[ColumnMetadata],
    dialect: &DialectDescriptor,
    ignore: F,
) -> Result<Schema>
where
    F: Fn(&str) -> bool,
{
    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        if ignore(&column.name) {
            continue;
        }
        fields.push(map_column(column, dialect)?);
    }
    Ok(Schema::new(fields))
}

/// Validate an explicit override schema against the derived schema.
///
/// The override must cover exactly the derived field names (case-insensitive)
/// and may not declare a decimal with zero precision; within those rules it
/// may redirect types (e.g. declare a decimal for a zero-precision numeric).
pub fn validate_override(derived: &Schema, over: &Schema) -> Result<()> {
    for field in &over.fields {
        if derived.field(&field.name).is_none() {
            return Err(Error::config(
                field.name.clone(),
                "override schema names a field absent from the derived schema",
            ));
        }
        if let FieldType::Decimal { precision: 0, .. } = field.field_type {
            return Err(Error::config(
                field.name.clone(),
                "override schema declares a decimal with zero precision",
            ));
        }
    }
    for field in &derived.fields {
        if over.field(&field.name).is_none() {
            return Err(Error::config(
                field.name.clone(),
                "override schema is missing a derived field",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectDescriptor;

    fn col(name: &str, type_name: &str, code: TypeCode) -> ColumnMetadata {
        ColumnMetadata::new(name, type_name, code)
    }

    #[test]
    fn test_base_mapping() {
        let dialect = DialectDescriptor::generic();

        let f = map_column(&col("flag", "bool", TypeCode::Boolean), &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::Bool);

        let f = map_column(&col("n", "smallint", TypeCode::SmallInt), &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::Int32);

        let f = map_column(&col("n", "bigint", TypeCode::BigInt), &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::Int64);

        let f = map_column(&col("body", "clob", TypeCode::Clob), &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::String);

        let f = map_column(&col("raw", "blob", TypeCode::Blob), &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::Bytes);
    }

    #[test]
    fn test_decimal_with_precision() {
        let dialect = DialectDescriptor::generic();
        let c = col("amount", "numeric", TypeCode::Numeric).with_precision(10, 2);
        let f = map_column(&c, &dialect).unwrap();
        assert_eq!(
            f.field_type,
            FieldType::Decimal {
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_zero_precision_numeric_maps_to_string() {
        let dialect = DialectDescriptor::generic();
        let c = col("amount", "numeric", TypeCode::Numeric);
        let f = map_column(&c, &dialect).unwrap();
        assert_eq!(f.field_type, FieldType::String);
    }

    #[test]
    fn test_timestamp_zone_split() {
        let generic = DialectDescriptor::generic();
        let f = map_column(&col("ts", "timestamp", TypeCode::Timestamp), &generic).unwrap();
        assert_eq!(f.field_type, FieldType::Datetime);

        let f = map_column(
            &col("ts", "timestamp", TypeCode::TimestampWithTimezone),
            &generic,
        )
        .unwrap();
        assert_eq!(f.field_type, FieldType::Timestamp);

        let pg = DialectDescriptor::postgres();
        let f = map_column(&col("ts", "timestamptz", TypeCode::Timestamp), &pg).unwrap();
        assert_eq!(f.field_type, FieldType::Timestamp);
    }

    #[test]
    fn test_unmappable_type_is_fatal() {
        let dialect = DialectDescriptor::generic();
        let err = map_column(&col("geom", "geometry", TypeCode::Struct), &dialect).unwrap_err();
        assert!(err.to_string().contains("geom"));
        assert!(err.to_string().contains("geometry"));
    }

    #[test]
    fn test_derive_schema_ignores_synthetic_columns() {
        let token = session_token();
        let dialect = DialectDescriptor::generic();
        let columns = vec![
            col("id", "int4", TypeCode::Integer),
            col(&format!("rowid_{token}"), "int8", TypeCode::BigInt),
            col("name", "varchar", TypeCode::Varchar),
        ];

        let schema =
            derive_schema(&columns, &dialect, |name| is_synthetic_column(name, &token)).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.field("id").is_some());
        assert!(schema.field("name").is_some());
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = Schema::new(vec![
            SchemaField::required("id", FieldType::Int64),
            SchemaField::nullable(
                "amount",
                FieldType::Decimal {
                    precision: 12,
                    scale: 4,
                },
            ),
            SchemaField::nullable("created", FieldType::Timestamp),
        ]);

        let json = schema.to_json().unwrap();
        let parsed = Schema::from_json(&json).unwrap();
        assert_eq!(schema, parsed);
    }

    #[test]
    fn test_validate_override() {
        let derived = Schema::new(vec![SchemaField::nullable("amount", FieldType::String)]);

        let ok = Schema::new(vec![SchemaField::nullable(
            "amount",
            FieldType::Decimal {
                precision: 18,
                scale: 4,
            },
        )]);
        assert!(validate_override(&derived, &ok).is_ok());

        let zero = Schema::new(vec![SchemaField::nullable(
            "amount",
            FieldType::Decimal {
                precision: 0,
                scale: 0,
            },
        )]);
        assert!(validate_override(&derived, &zero).is_err());

        let extra = Schema::new(vec![
            SchemaField::nullable("amount", FieldType::String),
            SchemaField::nullable("ghost", FieldType::String),
        ]);
        assert!(validate_override(&derived, &extra).is_err());
    }
}
