//! Batch writer for rdbc-bridge
//!
//! Writes typed records back to a destination table in committed batches.
//! One `BatchWriter` owns one connection and one prepared statement for its
//! lifetime; records are encoded, buffered, and flushed in FIFO order each
//! time the batch threshold is crossed. Nothing is committed until `close`,
//! which flushes the remainder and commits exactly once — unless no record
//! was ever written, in which case no statement touches the backend at all.
//!
//! A flush or commit failure triggers a best-effort rollback and is fatal
//! for the writer. Batches committed earlier by the same writer stay
//! committed; delivery is at-least-once under task retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::codec::encode_record;
use crate::config::ConnectionConfig;
use crate::connection::{Connection, Driver, PreparedStatement};
use crate::dialect::DialectDescriptor;
use crate::driver::{ensure_registered, DriverRegistration};
use crate::error::{Error, Result};
use crate::record::StructuredRecord;
use crate::types::{ColumnType, Value};

/// Default number of buffered records per flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How records are applied to the destination table.
///
/// Always a configuration input; the writer never infers a mode from the
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain inserts
    Insert,
    /// Update-by-key
    Update,
    /// Insert-or-update-by-key, where the dialect supports it
    Upsert,
}

impl WriteMode {
    /// Parse a mode from its configuration spelling
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "upsert" => Some(Self::Upsert),
            _ => None,
        }
    }
}

/// Point-in-time snapshot of writer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Records accepted by `write`
    pub records_written: u64,
    /// Batches submitted to the backend
    pub batches_flushed: u64,
}

#[derive(Debug, Default)]
struct AtomicWriterStats {
    records_written: AtomicU64,
    batches_flushed: AtomicU64,
}

impl AtomicWriterStats {
    fn snapshot(&self) -> WriterStats {
        WriterStats {
            records_written: self.records_written.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`BatchWriter`]
pub struct BatchWriterBuilder {
    schema: Option<String>,
    table: String,
    columns: Vec<ColumnType>,
    key_columns: Vec<String>,
    mode: WriteMode,
    batch_size: usize,
    dialect: DialectDescriptor,
    supports_commit: bool,
}

impl BatchWriterBuilder {
    /// Start a builder for a destination table
    pub fn new(table: impl Into<String>, dialect: DialectDescriptor) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            key_columns: Vec::new(),
            mode: WriteMode::Insert,
            batch_size: DEFAULT_BATCH_SIZE,
            dialect,
            supports_commit: true,
        }
    }

    /// Destination schema (namespace) qualifier
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Resolved destination column bindings, in statement order
    pub fn columns(mut self, columns: Vec<ColumnType>) -> Self {
        self.columns = columns;
        self
    }

    /// Key columns for update/upsert modes
    pub fn key_columns(mut self, keys: Vec<String>) -> Self {
        self.key_columns = keys;
        self
    }

    /// Write mode (default: insert)
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Records buffered per flush (default 1000, minimum 1)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Whether the backend honors explicit commit/rollback. When false both
    /// become no-ops on this writer.
    pub fn supports_commit(mut self, supported: bool) -> Self {
        self.supports_commit = supported;
        self
    }

    fn statement_sql(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Err(Error::config("columns", "no destination columns resolved"));
        }
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let keys: Vec<&str> = self.key_columns.iter().map(String::as_str).collect();

        match self.mode {
            WriteMode::Insert => Ok(self
                .dialect
                .insert_sql(self.schema.as_deref(), &self.table, &names)),
            WriteMode::Update => {
                if keys.is_empty() {
                    return Err(Error::config(
                        "key-columns",
                        "update mode requires key columns",
                    ));
                }
                let sets: Vec<&str> = names
                    .iter()
                    .copied()
                    .filter(|n| !keys.iter().any(|k| k.eq_ignore_ascii_case(n)))
                    .collect();
                if sets.is_empty() {
                    return Err(Error::config(
                        "key-columns",
                        "update mode requires at least one non-key column",
                    ));
                }
                Ok(self
                    .dialect
                    .update_sql(self.schema.as_deref(), &self.table, &sets, &keys))
            }
            WriteMode::Upsert => {
                if keys.is_empty() {
                    return Err(Error::config(
                        "key-columns",
                        "upsert mode requires key columns",
                    ));
                }
                self.dialect
                    .upsert_sql(self.schema.as_deref(), &self.table, &names, &keys)
            }
        }
    }

    /// Columns in bind order: insert/upsert bind all columns in statement
    /// order, update binds SET columns first and key columns last.
    fn bind_columns(&self) -> Vec<ColumnType> {
        match self.mode {
            WriteMode::Insert | WriteMode::Upsert => self.columns.clone(),
            WriteMode::Update => {
                let is_key = |name: &str| {
                    self.key_columns.iter().any(|k| k.eq_ignore_ascii_case(name))
                };
                let mut ordered: Vec<ColumnType> = self
                    .columns
                    .iter()
                    .filter(|c| !is_key(&c.name))
                    .cloned()
                    .collect();
                ordered.extend(self.columns.iter().filter(|c| is_key(&c.name)).cloned());
                ordered
            }
        }
    }

    /// Open a writer on its own connection: register the driver, connect,
    /// apply the connection configuration and prepare the write statement.
    pub async fn open(
        self,
        driver: Arc<dyn Driver>,
        url: &str,
        plugin_id: &str,
        config: &ConnectionConfig,
    ) -> Result<BatchWriter> {
        let registration = ensure_registered(driver, url, plugin_id)?;
        let resolved = crate::driver::resolve(url).ok_or_else(|| {
            Error::connection(config.redacted_target(), "no registered driver accepts the URL")
        })?;
        let conn = resolved.connect(config).await?;
        config.apply(conn.as_ref()).await?;
        self.build_inner(conn, Some(registration)).await
    }

    /// Build a writer around an already-open connection. The caller keeps
    /// ownership of any driver registration.
    pub async fn build(self, conn: Box<dyn Connection>) -> Result<BatchWriter> {
        self.build_inner(conn, None).await
    }

    async fn build_inner(
        self,
        conn: Box<dyn Connection>,
        registration: Option<DriverRegistration>,
    ) -> Result<BatchWriter> {
        let sql = self.statement_sql()?;
        let stmt = conn.prepare(&sql).await?;
        Ok(BatchWriter {
            bind_columns: self.bind_columns(),
            dialect: self.dialect,
            batch_size: self.batch_size,
            supports_commit: self.supports_commit,
            buffer: Vec::new(),
            written_any: false,
            conn: Some(conn),
            stmt: Some(stmt),
            registration,
            stats: Arc::new(AtomicWriterStats::default()),
        })
    }
}

/// Writes records to one destination table in committed batches.
pub struct BatchWriter {
    bind_columns: Vec<ColumnType>,
    dialect: DialectDescriptor,
    batch_size: usize,
    supports_commit: bool,
    buffer: Vec<Vec<Value>>,
    written_any: bool,
    conn: Option<Box<dyn Connection>>,
    stmt: Option<Box<dyn PreparedStatement>>,
    registration: Option<DriverRegistration>,
    stats: Arc<AtomicWriterStats>,
}

impl BatchWriter {
    /// Encode and buffer one record, flushing when the batch threshold is
    /// crossed. Flushing submits the batch but does not commit.
    pub async fn write(&mut self, record: &StructuredRecord) -> Result<()> {
        let params = encode_record(record, &self.bind_columns, &self.dialect)?;
        self.buffer.push(params);
        self.written_any = true;
        self.stats.records_written.fetch_add(1, Ordering::Relaxed);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Submit the buffered batch in FIFO order without committing.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let stmt = self
            .stmt
            .as_ref()
            .ok_or_else(|| Error::internal("writer already closed"))?;

        let batch = std::mem::take(&mut self.buffer);
        let size = batch.len();
        if let Err(e) = stmt.execute_batch(&batch).await {
            self.rollback_best_effort().await;
            return Err(Error::write_with_source(
                format!("batch submission of {size} records failed"),
                e,
            ));
        }
        self.stats.batches_flushed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(records = size, "flushed batch");
        Ok(())
    }

    /// Flush any remainder, commit once if anything was written, and release
    /// the connection and driver registration.
    pub async fn close(mut self) -> Result<WriterStats> {
        if self.written_any {
            self.flush().await?;
            self.commit().await?;
        }
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        if let Some(registration) = self.registration.take() {
            registration.deregister();
        }
        Ok(self.stats.snapshot())
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.supports_commit {
            return Ok(());
        }
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::internal("writer already closed"))?;
        if let Err(e) = conn.commit().await {
            self.rollback_best_effort().await;
            return Err(Error::write_with_source("commit failed", e));
        }
        Ok(())
    }

    async fn rollback_best_effort(&self) {
        if !self.supports_commit {
            return;
        }
        if let Some(conn) = self.conn.as_ref() {
            if let Err(e) = conn.rollback().await {
                tracing::warn!(error = %e, "rollback after failed write was not successful");
            }
        }
    }

    /// Records currently buffered and not yet submitted
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Current statistics
    pub fn stats(&self) -> WriterStats {
        self.stats.snapshot()
    }
}
