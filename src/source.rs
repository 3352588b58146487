//! Split reader for rdbc-bridge
//!
//! One `SplitReader` owns one connection for the lifetime of one split: it
//! resolves the driver through the process-wide registry, connects, applies
//! the connection configuration (isolation, then init statements), runs the
//! split's query and decodes the rows into typed records. Teardown releases
//! the connection and the driver registration exactly once, whether through
//! `close` or drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::codec::decode_row;
use crate::config::ConnectionConfig;
use crate::connection::{Connection, Driver};
use crate::driver::{ensure_registered, DriverRegistration};
use crate::error::{Error, Result};
use crate::record::StructuredRecord;
use crate::schema::Schema;
use crate::split::Split;

/// Point-in-time snapshot of reader statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Rows fetched from the backend
    pub rows_read: u64,
    /// Rows successfully decoded into records
    pub records_decoded: u64,
}

#[derive(Debug, Default)]
struct AtomicReaderStats {
    rows_read: AtomicU64,
    records_decoded: AtomicU64,
}

impl AtomicReaderStats {
    fn snapshot(&self) -> ReaderStats {
        ReaderStats {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
        }
    }
}

/// Reads one split of an import query as typed records.
pub struct SplitReader {
    split: Split,
    schema: Arc<Schema>,
    conn: Option<Box<dyn Connection>>,
    registration: Option<DriverRegistration>,
    stats: Arc<AtomicReaderStats>,
}

impl SplitReader {
    /// Open a reader for one split: register the driver, connect and apply
    /// the connection configuration.
    pub async fn open(
        driver: Arc<dyn Driver>,
        url: &str,
        plugin_id: &str,
        config: &ConnectionConfig,
        schema: Arc<Schema>,
        split: Split,
    ) -> Result<Self> {
        let registration = ensure_registered(driver, url, plugin_id)?;
        let resolved = crate::driver::resolve(url).ok_or_else(|| {
            Error::connection(config.redacted_target(), "no registered driver accepts the URL")
        })?;
        let conn = resolved.connect(config).await?;
        config.apply(conn.as_ref()).await?;

        Ok(Self {
            split,
            schema,
            conn: Some(conn),
            registration: Some(registration),
            stats: Arc::new(AtomicReaderStats::default()),
        })
    }

    /// Build a reader around an already-open connection. The caller keeps
    /// ownership of any driver registration.
    pub fn from_connection(
        conn: Box<dyn Connection>,
        schema: Arc<Schema>,
        split: Split,
    ) -> Self {
        Self {
            split,
            schema,
            conn: Some(conn),
            registration: None,
            stats: Arc::new(AtomicReaderStats::default()),
        }
    }

    /// The split this reader scans
    pub fn split(&self) -> &Split {
        &self.split
    }

    /// Run the split query and decode every row.
    ///
    /// A decode failure is fatal for this reader; partial output is not
    /// returned.
    pub async fn read_all(&mut self) -> Result<Vec<StructuredRecord>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::internal("reader already closed"))?;

        let rows = conn.query(&self.split.query, &[]).await?;
        self.stats
            .rows_read
            .fetch_add(rows.len() as u64, Ordering::Relaxed);

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(decode_row(row, &self.schema)?);
            self.stats.records_decoded.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(
            split = self.split.index,
            rows = records.len(),
            "split read complete"
        );
        Ok(records)
    }

    /// Current statistics
    pub fn stats(&self) -> ReaderStats {
        self.stats.snapshot()
    }

    /// Release the connection and the driver registration. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        if let Some(registration) = self.registration.take() {
            registration.deregister();
        }
        Ok(())
    }
}

// A dropped reader cannot close its connection asynchronously, but the
// registration handle still releases the registry entry on drop.
