//! Tests for the rdbc-bridge schema module

use rdbc_bridge::prelude::*;

fn col(name: &str, type_name: &str, code: TypeCode) -> ColumnMetadata {
    ColumnMetadata::new(name, type_name, code)
}

// ==================== Base mapping table ====================

#[test]
fn test_numeric_and_character_taxonomy() {
    let dialect = dialect_for("generic");
    let cases = vec![
        (col("a", "smallint", TypeCode::SmallInt), FieldType::Int32),
        (col("b", "bigint", TypeCode::BigInt), FieldType::Int64),
        (col("c", "real", TypeCode::Real), FieldType::Float32),
        (col("d", "double", TypeCode::Double), FieldType::Float64),
        (col("e", "varchar", TypeCode::Varchar), FieldType::String),
        (col("f", "clob", TypeCode::Clob), FieldType::String),
        (col("g", "blob", TypeCode::Blob), FieldType::Bytes),
        (col("h", "date", TypeCode::Date), FieldType::Date),
        (col("i", "time", TypeCode::Time), FieldType::Time),
        (col("j", "boolean", TypeCode::Boolean), FieldType::Bool),
    ];
    for (column, expected) in cases {
        let field = map_column(&column, &dialect).unwrap();
        assert_eq!(field.field_type, expected, "column {}", column.name);
    }
}

#[test]
fn test_decimal_keeps_declared_precision() {
    let dialect = dialect_for("generic");
    let column = col("amount", "numeric", TypeCode::Numeric).with_precision(12, 4);
    let field = map_column(&column, &dialect).unwrap();
    assert_eq!(
        field.field_type,
        FieldType::Decimal {
            precision: 12,
            scale: 4
        }
    );
}

#[test]
fn test_zero_precision_numeric_maps_to_string() {
    let dialect = dialect_for("generic");
    let column = col("amount", "number", TypeCode::Numeric);
    let field = map_column(&column, &dialect).unwrap();
    assert_eq!(field.field_type, FieldType::String);
}

#[test]
fn test_negative_scale_clamped() {
    let dialect = dialect_for("generic");
    let column = col("amount", "number", TypeCode::Numeric).with_precision(10, -2);
    let field = map_column(&column, &dialect).unwrap();
    assert_eq!(
        field.field_type,
        FieldType::Decimal {
            precision: 10,
            scale: 0
        }
    );
}

#[test]
fn test_unmappable_type_is_fatal_mapping_error() {
    let dialect = dialect_for("generic");
    for code in [TypeCode::Struct, TypeCode::Array, TypeCode::Other] {
        let err = map_column(&col("geom", "GEOMETRY", code), &dialect).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Mapping);
        let msg = err.to_string();
        assert!(msg.contains("geom"));
        assert!(msg.contains("GEOMETRY"));
        assert!(msg.contains(&code.code().to_string()));
    }
}

// ==================== Timestamp zone-awareness ====================

#[test]
fn test_timestamp_split_by_zone_awareness() {
    let postgres = dialect_for("postgres");

    let naive = col("created", "timestamp", TypeCode::Timestamp);
    assert_eq!(
        map_column(&naive, &postgres).unwrap().field_type,
        FieldType::Datetime
    );

    let zoned = col("created", "timestamptz", TypeCode::Timestamp);
    assert_eq!(
        map_column(&zoned, &postgres).unwrap().field_type,
        FieldType::Timestamp
    );

    let explicit = col("created", "timestamp", TypeCode::TimestampWithTimezone);
    assert_eq!(
        map_column(&explicit, &postgres).unwrap().field_type,
        FieldType::Timestamp
    );
}

// ==================== Dialect overrides ====================

#[test]
fn test_mysql_year_override() {
    let mysql = dialect_for("mysql");
    let column = col("y", "YEAR", TypeCode::Date);
    assert_eq!(
        map_column(&column, &mysql).unwrap().field_type,
        FieldType::Int32
    );
}

#[test]
fn test_mysql_unsigned_bigint_override() {
    let mysql = dialect_for("mysql");
    let column = col("n", "BIGINT UNSIGNED", TypeCode::BigInt).with_precision(20, 0);
    assert_eq!(
        map_column(&column, &mysql).unwrap().field_type,
        FieldType::Decimal {
            precision: 20,
            scale: 0
        }
    );
}

// ==================== Synthetic columns ====================

#[test]
fn test_synthetic_columns_suppressed_during_derivation() {
    let token = session_token();
    let dialect = dialect_for("generic");
    let columns = vec![
        col("id", "integer", TypeCode::Integer),
        col(
            &format!("row_marker_{token}"),
            "integer",
            TypeCode::Integer,
        ),
        col("name", "varchar", TypeCode::Varchar),
    ];
    let schema = derive_schema(&columns, &dialect, |name| {
        is_synthetic_column(name, &token)
    })
    .unwrap();

    assert_eq!(schema.len(), 2);
    assert!(schema.field("id").is_some());
    assert!(schema.field("name").is_some());
}

#[test]
fn test_empty_token_matches_nothing() {
    assert!(!is_synthetic_column("anything", ""));
}

// ==================== Override schema validation ====================

fn derived() -> Schema {
    Schema::new(vec![
        SchemaField::required("id", FieldType::Int64),
        SchemaField::nullable("amount", FieldType::String),
    ])
}

#[test]
fn test_override_may_redirect_zero_precision_to_decimal() {
    let over = Schema::new(vec![
        SchemaField::required("id", FieldType::Int64),
        SchemaField::nullable(
            "amount",
            FieldType::Decimal {
                precision: 20,
                scale: 5,
            },
        ),
    ]);
    validate_override(&derived(), &over).unwrap();
}

#[test]
fn test_override_rejects_zero_precision_decimal() {
    let over = Schema::new(vec![
        SchemaField::required("id", FieldType::Int64),
        SchemaField::nullable(
            "amount",
            FieldType::Decimal {
                precision: 0,
                scale: 0,
            },
        ),
    ]);
    let err = validate_override(&derived(), &over).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_override_must_cover_exact_field_set() {
    let missing = Schema::new(vec![SchemaField::required("id", FieldType::Int64)]);
    assert!(validate_override(&derived(), &missing).is_err());

    let extra = Schema::new(vec![
        SchemaField::required("id", FieldType::Int64),
        SchemaField::nullable("amount", FieldType::String),
        SchemaField::nullable("ghost", FieldType::String),
    ]);
    let err = validate_override(&derived(), &extra).unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_override_names_match_case_insensitively() {
    let over = Schema::new(vec![
        SchemaField::required("ID", FieldType::Int64),
        SchemaField::nullable("AMOUNT", FieldType::String),
    ]);
    validate_override(&derived(), &over).unwrap();
}

// ==================== Schema JSON round trip ====================

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
    let back = Schema::from_json(&json).unwrap();
    assert_eq!(schema, back);
}
