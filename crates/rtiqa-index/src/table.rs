//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open, table creation from record batches, full-table
//! reads, and the key/value `meta` table that records which embedding model
//! produced the stored vectors.

use anyhow::{Context, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_array::cast::AsArray;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::{build_meta_schema, META_TABLE};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Create `name` from `batches`; an empty batch list creates an empty table.
pub async fn create_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>, batches: Vec<RecordBatch>) -> Result<()> {
    let iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
    conn.create_table(name, Box::new(iter)).execute().await.with_context(|| format!("creating table '{name}'"))?;
    Ok(())
}

pub async fn read_all(conn: &Connection, name: &str) -> Result<Vec<RecordBatch>> {
    let table = conn.open_table(name).execute().await.with_context(|| format!("opening table '{name}'"))?;
    let mut stream = table.query().execute().await?;
    let mut batches = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        batches.push(batch);
    }
    Ok(batches)
}

pub async fn write_meta(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(entries.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(entries.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
        ],
    )?;
    create_table(conn, META_TABLE, build_meta_schema(), vec![rb]).await
}

pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut meta = HashMap::new();
    for batch in read_all(conn, META_TABLE).await? {
        let keys = batch.column_by_name("key").and_then(|c| c.as_string_opt::<i32>()).context("meta.key column missing")?;
        let values = batch.column_by_name("value").and_then(|c| c.as_string_opt::<i32>()).context("meta.value column missing")?;
        for i in 0..batch.num_rows() {
            meta.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(meta)
}
