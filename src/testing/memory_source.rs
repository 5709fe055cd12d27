//! Row source backed by in-memory tables.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use iot4ag_sync_postgresql_source::{PollQuery, RowSource};
use sync_core::{RawRow, RowValue, SyncError};

use super::lock;

/// Serves rows per table, honoring the query's lower bound, order and limit
/// the way the source database would.
#[derive(Default)]
pub struct MemoryRowSource {
    tables: Mutex<HashMap<String, Vec<RawRow>>>,
    unreachable: Mutex<HashMap<String, String>>,
    queries: Mutex<Vec<PollQuery>>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to `table`.
    pub fn insert_rows(&self, table: &str, rows: impl IntoIterator<Item = RawRow>) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Make fetches of `table` fail with a connection error.
    pub fn set_unreachable(&self, table: &str, message: &str) {
        lock(&self.unreachable).insert(table.to_string(), message.to_string());
    }

    pub fn set_reachable(&self, table: &str) {
        lock(&self.unreachable).remove(table);
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<PollQuery> {
        lock(&self.queries).clone()
    }

    /// Queries received for `table`, in order.
    pub fn queries_for(&self, table: &str) -> Vec<PollQuery> {
        lock(&self.queries)
            .iter()
            .filter(|q| q.table == table)
            .cloned()
            .collect()
    }
}

fn row_time(row: &RawRow, column: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    row.get(column).and_then(RowValue::as_timestamp)
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn fetch_rows(&self, query: &PollQuery) -> Result<Vec<RawRow>, SyncError> {
        lock(&self.queries).push(query.clone());

        if let Some(message) = lock(&self.unreachable).get(&query.table) {
            return Err(SyncError::Connection {
                source_tag: query.source.to_string(),
                table: query.table.clone(),
                message: message.clone(),
            });
        }

        let tables = lock(&self.tables);
        let mut rows: Vec<RawRow> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| match (query.after, row_time(row, &query.time_column)) {
                        (Some(after), Some(ts)) => ts > after,
                        _ => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|row| row_time(row, &query.time_column));
        rows.truncate(query.limit);
        Ok(rows)
    }
}
