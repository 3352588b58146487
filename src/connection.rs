//! Connection traits for rdbc-bridge
//!
//! Core abstractions the bridge drives a backend through:
//! - Driver: an externally provided driver module implementing the wire protocol
//! - Connection: one physical connection with query execution and commit/rollback
//! - PreparedStatement: parameterized statement with batch submission
//!
//! The bridge never links a concrete backend crate; workers receive driver
//! instances through the process-wide registry (`crate::driver`).

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::types::{Row, Value};

/// An externally provided database driver
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver name, used as part of its registry identity
    fn name(&self) -> &str;

    /// Whether this driver understands the given connection URL
    fn accepts_url(&self, url: &str) -> bool;

    /// Open a new physical connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}

/// A connection to a database.
///
/// The bridge runs connections with autocommit off; data statements
/// accumulate in the current transaction until `commit` or `rollback`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement that modifies data, returns affected row count
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Prepare a statement for repeated execution
    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Roll back the current transaction
    async fn rollback(&self) -> Result<()>;

    /// Set the transaction isolation level for this connection
    async fn set_isolation(&self, level: IsolationLevel) -> Result<()>;

    /// Check if connection is valid/alive
    async fn is_valid(&self) -> bool;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// A prepared statement
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// Execute with one parameter row, returns affected row count
    async fn execute(&self, params: &[Value]) -> Result<u64>;

    /// Submit a batch of parameter rows in order, returns affected counts.
    ///
    /// Submission does not commit; the owning connection's transaction
    /// still controls visibility.
    async fn execute_batch(&self, batch: &[Vec<Value>]) -> Result<Vec<u64>>;

    /// The SQL string this statement was prepared from
    fn sql(&self) -> &str;
}

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Dirty reads possible
    ReadUncommitted,
    /// No dirty reads
    ReadCommitted,
    /// No non-repeatable reads
    RepeatableRead,
    /// Full isolation
    Serializable,
}

impl IsolationLevel {
    /// Convert to the SQL fragment for SET TRANSACTION statements
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }

    /// Parse a level from its configuration spelling
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "READ UNCOMMITTED" => Some(Self::ReadUncommitted),
            "READ COMMITTED" => Some(Self::ReadCommitted),
            "REPEATABLE READ" => Some(Self::RepeatableRead),
            "SERIALIZABLE" => Some(Self::Serializable),
            _ => None,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}
