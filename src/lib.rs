//! # rdbc-bridge
//!
//! A generic bridge between relational databases and schema-typed record
//! streams, shared by per-engine adapters.
//!
//! The bridge covers the parts every adapter needs and none should rewrite:
//!
//! - **Schema mapping**: native column metadata into a portable typed schema,
//!   with a per-dialect override layer and exact decimal handling
//! - **Record codec**: native rows to typed records and back, both directions
//!   precision-preserving
//! - **Dialect descriptors**: quoting, placeholders, type overrides and
//!   upsert strategy as plain data instead of per-engine subclasses
//! - **Driver registry**: dynamically loaded drivers made usable through a
//!   shared process-wide registry, with refcounted teardown
//! - **Split planning**: an import query partitioned into independently
//!   scannable, non-overlapping sub-scans over a bounding range
//! - **Batch writes**: records written back in committed batches with bounded
//!   atomicity and at-least-once delivery
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rdbc_bridge::prelude::*;
//!
//! // Derive the schema from reported column metadata
//! let dialect = dialect_for("postgres");
//! let schema = derive_schema(&columns, &dialect, |_| false)?;
//!
//! // Plan parallel splits of an import query
//! let splits = SplitPlanner::new("SELECT * FROM t WHERE $CONDITIONS", dialect.clone())
//!     .with_bounding_query("SELECT MIN(id), MAX(id) FROM t")
//!     .with_split_column("id")
//!     .with_num_splits(4)
//!     .plan(conn.as_ref())
//!     .await?;
//!
//! // Write records back in committed batches
//! let mut writer = BatchWriterBuilder::new("t_copy", dialect)
//!     .columns(resolved_columns)
//!     .write_mode(WriteMode::Insert)
//!     .build(conn)
//!     .await?;
//! for record in records {
//!     writer.write(&record).await?;
//! }
//! writer.close().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod record;
pub mod schema;
pub mod sink;
pub mod source;
pub mod split;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{ColumnMetadata, ColumnType, Row, TypeCode, Value};

    // Schema and records
    pub use crate::record::{RecordBuilder, StructuredRecord};
    pub use crate::schema::{
        derive_schema, is_synthetic_column, map_column, session_token, validate_override,
        FieldType, Schema, SchemaField,
    };

    // Codec
    pub use crate::codec::{decode_row, encode_record};

    // Dialect types
    pub use crate::dialect::{
        dialect_for, DialectDescriptor, NativeValueAdapter, PlaceholderStyle, QuoteStyle,
        TypeOverride, UpsertStrategy,
    };

    // Connection traits and config
    pub use crate::config::ConnectionConfig;
    pub use crate::connection::{Connection, Driver, IsolationLevel, PreparedStatement};

    // Driver registry
    pub use crate::driver::{ensure_registered, DriverRegistration, DriverShim};

    // Split planning and reading
    pub use crate::source::{ReaderStats, SplitReader};
    pub use crate::split::{Split, SplitPlanner, CONDITIONS_TOKEN, MAX_NUM_SPLITS};

    // Sink types
    pub use crate::sink::{
        BatchWriter, BatchWriterBuilder, WriteMode, WriterStats, DEFAULT_BATCH_SIZE,
    };
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;
