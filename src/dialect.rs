//! Dialect descriptors for rdbc-bridge
//!
//! Per-engine variation (type-mapping overrides, quoting, placeholders,
//! upsert syntax, native value adapters) is supplied as a plain-data
//! descriptor selected by identifier and consumed by the generic engine
//! through composition. The per-engine layer above this crate contributes
//! its own descriptors; `generic`, `postgres` and `mysql` ship as built-ins.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::FieldType;
use crate::types::{ColumnMetadata, ColumnType, TypeCode, Value};

/// Identifier quoting style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `"name"` (standard SQL, PostgreSQL, Oracle, DB2)
    DoubleQuote,
    /// `` `name` `` (MySQL, MariaDB)
    Backtick,
    /// `[name]` (SQL Server)
    Bracket,
}

/// Bind-parameter placeholder style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (positional, most drivers)
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `@p1`, `@p2`, ... (SQL Server)
    AtP,
}

/// How the dialect expresses insert-or-update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStrategy {
    /// `INSERT ... ON CONFLICT (keys) DO UPDATE SET ...` (PostgreSQL)
    OnConflict,
    /// `INSERT ... ON DUPLICATE KEY UPDATE ...` (MySQL)
    OnDuplicateKey,
    /// Upsert is not expressible for this dialect
    Unsupported,
}

/// One entry of a dialect's type-override table.
///
/// Matched in declaration order against reported column metadata; the first
/// match redirects the column to `to` instead of the base mapping.
#[derive(Debug, Clone)]
pub struct TypeOverride {
    /// Match on the reported type code, if set
    pub code: Option<TypeCode>,
    /// Match on the reported native type name (case-insensitive), if set
    pub type_name: Option<&'static str>,
    /// Target field type
    pub to: FieldType,
}

impl TypeOverride {
    fn matches(&self, column: &ColumnMetadata) -> bool {
        if let Some(code) = self.code {
            if column.type_code != code {
                return false;
            }
        }
        if let Some(name) = self.type_name {
            if !column.type_name.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        self.code.is_some() || self.type_name.is_some()
    }
}

/// Constructs bind values for driver-specific extension types that have no
/// standard representation. Supplied per dialect descriptor as data.
pub trait NativeValueAdapter: Send + Sync {
    /// Produce the bind value for `value` going into `column`, or fail with
    /// a serialization error if the adapter has no conversion for it.
    fn bind(&self, field: &str, value: &Value, column: &ColumnType) -> Result<Value>;
}

/// The default adapter: no extension types are supported.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueAdapter;

impl NativeValueAdapter for DefaultValueAdapter {
    fn bind(&self, field: &str, value: &Value, column: &ColumnType) -> Result<Value> {
        Err(Error::serialization(
            field,
            value.type_name(),
            format!("{} (code {})", column.type_name, column.type_code.code()),
            "no native value adapter supplied for this extension type",
        ))
    }
}

/// Engine-specific behavior as a plain data value
#[derive(Clone)]
pub struct DialectDescriptor {
    /// Dialect identifier
    pub name: &'static str,
    /// Identifier quoting style
    pub quote: QuoteStyle,
    /// Bind placeholder style
    pub placeholder: PlaceholderStyle,
    /// Type-mapping override table, first match wins
    pub type_overrides: Vec<TypeOverride>,
    /// Native type names whose `Timestamp` code carries a zone
    pub zone_aware_type_names: Vec<&'static str>,
    /// Upsert strategy
    pub upsert: UpsertStrategy,
    /// Adapter for extension bind values
    pub adapter: Arc<dyn NativeValueAdapter>,
}

impl std::fmt::Debug for DialectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectDescriptor")
            .field("name", &self.name)
            .field("quote", &self.quote)
            .field("placeholder", &self.placeholder)
            .field("type_overrides", &self.type_overrides.len())
            .field("upsert", &self.upsert)
            .finish()
    }
}

impl DialectDescriptor {
    /// Baseline dialect: standard quoting, `?` placeholders, no overrides,
    /// no upsert support, default (rejecting) value adapter.
    pub fn generic() -> Self {
        Self {
            name: "generic",
            quote: QuoteStyle::DoubleQuote,
            placeholder: PlaceholderStyle::Question,
            type_overrides: Vec::new(),
            zone_aware_type_names: Vec::new(),
            upsert: UpsertStrategy::Unsupported,
            adapter: Arc::new(DefaultValueAdapter),
        }
    }

    /// PostgreSQL descriptor
    pub fn postgres() -> Self {
        Self {
            name: "postgres",
            quote: QuoteStyle::DoubleQuote,
            placeholder: PlaceholderStyle::Dollar,
            type_overrides: Vec::new(),
            zone_aware_type_names: vec!["timestamptz", "timestamp with time zone"],
            upsert: UpsertStrategy::OnConflict,
            adapter: Arc::new(DefaultValueAdapter),
        }
    }

    /// MySQL descriptor.
    ///
    /// - `YEAR` is a pseudo-temporal reported under the date taxonomy but is
    ///   really a small integer
    /// - `BIGINT UNSIGNED` exceeds i64 and is widened to a bounded decimal
    pub fn mysql() -> Self {
        Self {
            name: "mysql",
            quote: QuoteStyle::Backtick,
            placeholder: PlaceholderStyle::Question,
            type_overrides: vec![
                TypeOverride {
                    code: None,
                    type_name: Some("YEAR"),
                    to: FieldType::Int32,
                },
                TypeOverride {
                    code: None,
                    type_name: Some("BIGINT UNSIGNED"),
                    to: FieldType::Decimal {
                        precision: 20,
                        scale: 0,
                    },
                },
            ],
            zone_aware_type_names: vec!["TIMESTAMP"],
            upsert: UpsertStrategy::OnDuplicateKey,
            adapter: Arc::new(DefaultValueAdapter),
        }
    }

    /// Replace the override table
    pub fn with_overrides(mut self, overrides: Vec<TypeOverride>) -> Self {
        self.type_overrides = overrides;
        self
    }

    /// Replace the native value adapter
    pub fn with_adapter(mut self, adapter: Arc<dyn NativeValueAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Consult the override table for a column
    pub fn type_override(&self, column: &ColumnMetadata) -> Option<FieldType> {
        self.type_overrides
            .iter()
            .find(|o| o.matches(column))
            .map(|o| o.to.clone())
    }

    /// Whether a native type name is zone-aware for this dialect
    pub fn is_zone_aware(&self, type_name: &str) -> bool {
        self.zone_aware_type_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(type_name))
    }

    /// Quote an identifier (table, column name)
    pub fn quote_identifier(&self, name: &str) -> String {
        match self.quote {
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Render a qualified table name
    pub fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!(
                "{}.{}",
                self.quote_identifier(s),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// The placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self.placeholder {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${}", index),
            PlaceholderStyle::AtP => format!("@p{}", index),
        }
    }

    /// Escape a string for a single-quoted SQL literal context
    pub fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Render a value as a SQL literal (split predicates only; data values
    /// always travel as bind parameters)
    pub fn render_literal(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Float32(n) => n.to_string(),
            Value::Float64(n) => n.to_string(),
            Value::String(s) => format!("'{}'", self.escape_string(s)),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f+00")),
            Value::Bytes(_) => {
                return Err(Error::internal(
                    "binary values have no SQL literal rendering",
                ));
            }
        })
    }

    /// Render a plain insert statement
    pub fn insert_sql(&self, schema: Option<&str>, table: &str, columns: &[&str]) -> String {
        let cols: Vec<_> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        let params: Vec<_> = (1..=columns.len()).map(|i| self.placeholder(i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_table(schema, table),
            cols.join(", "),
            params.join(", ")
        )
    }

    /// Render an update-by-key statement.
    ///
    /// Bind order is SET columns first, then key columns, matching the
    /// encoded parameter order the writer produces.
    pub fn update_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        set_columns: &[&str],
        key_columns: &[&str],
    ) -> String {
        let mut idx = 0usize;
        let sets: Vec<_> = set_columns
            .iter()
            .map(|c| {
                idx += 1;
                format!("{} = {}", self.quote_identifier(c), self.placeholder(idx))
            })
            .collect();
        let keys: Vec<_> = key_columns
            .iter()
            .map(|c| {
                idx += 1;
                format!("{} = {}", self.quote_identifier(c), self.placeholder(idx))
            })
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {}",
            self.qualified_table(schema, table),
            sets.join(", "),
            keys.join(" AND ")
        )
    }

    /// Render an upsert-by-key statement per the dialect's strategy
    pub fn upsert_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        columns: &[&str],
        key_columns: &[&str],
    ) -> Result<String> {
        let insert = self.insert_sql(schema, table, columns);
        let non_keys: Vec<_> = columns
            .iter()
            .filter(|c| !key_columns.contains(c))
            .collect();

        match self.upsert {
            UpsertStrategy::OnConflict => {
                let conflict: Vec<_> = key_columns
                    .iter()
                    .map(|c| self.quote_identifier(c))
                    .collect();
                let updates: Vec<_> = non_keys
                    .iter()
                    .map(|c| {
                        let q = self.quote_identifier(c);
                        format!("{q} = EXCLUDED.{q}")
                    })
                    .collect();
                Ok(format!(
                    "{} ON CONFLICT ({}) DO UPDATE SET {}",
                    insert,
                    conflict.join(", "),
                    updates.join(", ")
                ))
            }
            UpsertStrategy::OnDuplicateKey => {
                let updates: Vec<_> = non_keys
                    .iter()
                    .map(|c| {
                        let q = self.quote_identifier(c);
                        format!("{q} = VALUES({q})")
                    })
                    .collect();
                Ok(format!(
                    "{} ON DUPLICATE KEY UPDATE {}",
                    insert,
                    updates.join(", ")
                ))
            }
            UpsertStrategy::Unsupported => Err(Error::config(
                "write_mode",
                format!("dialect '{}' does not support upsert", self.name),
            )),
        }
    }
}

/// Select a built-in descriptor by identifier; unknown identifiers fall back
/// to the generic descriptor.
pub fn dialect_for(id: &str) -> DialectDescriptor {
    match id.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => DialectDescriptor::postgres(),
        "mysql" | "mariadb" => DialectDescriptor::mysql(),
        _ => DialectDescriptor::generic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for() {
        assert_eq!(dialect_for("postgresql").name, "postgres");
        assert_eq!(dialect_for("mariadb").name, "mysql");
        assert_eq!(dialect_for("db2").name, "generic");
    }

    #[test]
    fn test_quote_styles() {
        assert_eq!(
            DialectDescriptor::postgres().quote_identifier("us\"er"),
            "\"us\"\"er\""
        );
        assert_eq!(DialectDescriptor::mysql().quote_identifier("user"), "`user`");
    }

    #[test]
    fn test_placeholders() {
        let pg = DialectDescriptor::postgres();
        assert_eq!(pg.placeholder(3), "$3");
        let my = DialectDescriptor::mysql();
        assert_eq!(my.placeholder(3), "?");
    }

    #[test]
    fn test_insert_sql() {
        let pg = DialectDescriptor::postgres();
        assert_eq!(
            pg.insert_sql(Some("public"), "users", &["id", "name"]),
            "INSERT INTO \"public\".\"users\" (\"id\", \"name\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_update_sql_bind_order() {
        let pg = DialectDescriptor::postgres();
        assert_eq!(
            pg.update_sql(None, "users", &["name", "age"], &["id"]),
            "UPDATE \"users\" SET \"name\" = $1, \"age\" = $2 WHERE \"id\" = $3"
        );
    }

    #[test]
    fn test_upsert_sql_postgres() {
        let pg = DialectDescriptor::postgres();
        let sql = pg
            .upsert_sql(None, "users", &["id", "name"], &["id"])
            .unwrap();
        assert!(sql.contains("ON CONFLICT (\"id\") DO UPDATE SET \"name\" = EXCLUDED.\"name\""));
    }

    #[test]
    fn test_upsert_sql_mysql() {
        let my = DialectDescriptor::mysql();
        let sql = my
            .upsert_sql(None, "users", &["id", "name"], &["id"])
            .unwrap();
        assert!(sql.contains("ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"));
    }

    #[test]
    fn test_upsert_unsupported() {
        let g = DialectDescriptor::generic();
        let err = g.upsert_sql(None, "t", &["a"], &["a"]).unwrap_err();
        assert!(err.to_string().contains("write_mode"));
    }

    #[test]
    fn test_mysql_overrides() {
        let my = DialectDescriptor::mysql();
        let year = ColumnMetadata::new("y", "YEAR", TypeCode::Date);
        assert_eq!(my.type_override(&year), Some(FieldType::Int32));

        let wide = ColumnMetadata::new("n", "BIGINT UNSIGNED", TypeCode::BigInt);
        assert_eq!(
            my.type_override(&wide),
            Some(FieldType::Decimal {
                precision: 20,
                scale: 0
            })
        );

        let plain = ColumnMetadata::new("n", "BIGINT", TypeCode::BigInt);
        assert_eq!(my.type_override(&plain), None);
    }

    #[test]
    fn test_render_literal() {
        let g = DialectDescriptor::generic();
        assert_eq!(g.render_literal(&Value::Int64(42)).unwrap(), "42");
        assert_eq!(
            g.render_literal(&Value::String("o'brien".into())).unwrap(),
            "'o''brien'"
        );
        let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(g.render_literal(&Value::Date(d)).unwrap(), "'2024-01-31'");
    }

    #[test]
    fn test_default_adapter_rejects() {
        let adapter = DefaultValueAdapter;
        let column = ColumnType::new("geom", "GEOMETRY", TypeCode::Other);
        let err = adapter
            .bind("geom", &Value::String("POINT(0 0)".into()), &column)
            .unwrap_err();
        assert!(err.to_string().contains("geom"));
        assert!(err.to_string().contains("GEOMETRY"));
    }
}
