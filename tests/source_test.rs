//! Tests for the rdbc-bridge source module

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rdbc_bridge::prelude::*;

struct RowsConnection {
    rows: Vec<Row>,
    queries: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

#[async_trait]
impl Connection for RowsConnection {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
        Ok(0)
    }

    async fn prepare(&self, _sql: &str) -> Result<Box<dyn PreparedStatement>> {
        Err(Error::internal("not used"))
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }

    async fn set_isolation(&self, _level: IsolationLevel) -> Result<()> {
        Ok(())
    }

    async fn is_valid(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        SchemaField::required("id", FieldType::Int64),
        SchemaField::nullable("name", FieldType::String),
    ]))
}

fn split(query: &str) -> Split {
    Split {
        index: 0,
        query: query.to_string(),
        predicate: None,
    }
}

fn row(id: i64, name: &str) -> Row {
    Row::new(
        vec!["id".into(), "name".into()],
        vec![Value::Int64(id), Value::String(name.into())],
    )
}

#[tokio::test]
async fn test_reader_runs_split_query_and_decodes() {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let conn = RowsConnection {
        rows: vec![row(1, "alice"), row(2, "bob")],
        queries: Arc::clone(&queries),
        closed: Arc::new(Mutex::new(false)),
    };

    let mut reader = SplitReader::from_connection(
        Box::new(conn),
        schema(),
        split("SELECT id, name FROM people WHERE id >= 1 AND id <= 2"),
    );

    let records = reader.read_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("id"), Some(&Value::Int64(1)));
    assert_eq!(records[1].get("name"), Some(&Value::String("bob".into())));

    let stats = reader.stats();
    assert_eq!(stats.rows_read, 2);
    assert_eq!(stats.records_decoded, 2);

    assert_eq!(
        queries.lock().unwrap().as_slice(),
        ["SELECT id, name FROM people WHERE id >= 1 AND id <= 2"]
    );
}

#[tokio::test]
async fn test_decode_failure_is_fatal_for_reader() {
    let conn = RowsConnection {
        rows: vec![Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Bytes(vec![1]), Value::Null],
        )],
        queries: Arc::new(Mutex::new(Vec::new())),
        closed: Arc::new(Mutex::new(false)),
    };

    let mut reader = SplitReader::from_connection(Box::new(conn), schema(), split("SELECT 1"));
    let err = reader.read_all().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Serialization);
}

#[tokio::test]
async fn test_close_releases_connection_and_is_idempotent() {
    let closed = Arc::new(Mutex::new(false));
    let conn = RowsConnection {
        rows: Vec::new(),
        queries: Arc::new(Mutex::new(Vec::new())),
        closed: Arc::clone(&closed),
    };

    let mut reader = SplitReader::from_connection(Box::new(conn), schema(), split("SELECT 1"));
    reader.close().await.unwrap();
    assert!(*closed.lock().unwrap());
    // second close is a no-op
    reader.close().await.unwrap();

    // reads after close fail cleanly
    assert!(reader.read_all().await.is_err());
}
