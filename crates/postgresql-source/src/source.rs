//! Row sources.

use async_trait::async_trait;
use sync_core::{RawRow, SourceTag, SyncError};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use crate::convert::convert_row;
use crate::query::PollQuery;

/// Something the poller can run a [`PollQuery`] against.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch the rows selected by `query`, in ascending time order.
    ///
    /// An unreachable source is `SyncError::Connection`; a failing query is
    /// `SyncError::Query`.
    async fn fetch_rows(&self, query: &PollQuery) -> Result<Vec<RawRow>, SyncError>;
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for std::sync::Arc<T> {
    async fn fetch_rows(&self, query: &PollQuery) -> Result<Vec<RawRow>, SyncError> {
        (**self).fetch_rows(query).await
    }
}

/// PostgreSQL connection strings of the two deployed sources.
#[derive(Clone, Debug)]
pub struct PostgresSourceConfig {
    pub old_uri: Option<String>,
    pub new_uri: Option<String>,
}

/// Reads rows from the PostgreSQL source a table's tag selects.
///
/// A fresh connection is opened per fetch and dropped afterwards, so a source
/// that goes away between cycles is retried on the next cycle.
pub struct PostgresRowSource {
    config: PostgresSourceConfig,
}

impl PostgresRowSource {
    pub fn new(config: PostgresSourceConfig) -> Self {
        Self { config }
    }

    fn uri(&self, source: SourceTag) -> Option<&str> {
        match source {
            SourceTag::Old => self.config.old_uri.as_deref(),
            SourceTag::New => self.config.new_uri.as_deref(),
        }
    }
}

/// Connect and spawn the connection task.
pub async fn new_postgresql_client(connection_string: &str) -> Result<Client, tokio_postgres::Error> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    // Spawn connection handler
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {e}");
        }
    });

    Ok(client)
}

#[async_trait]
impl RowSource for PostgresRowSource {
    async fn fetch_rows(&self, query: &PollQuery) -> Result<Vec<RawRow>, SyncError> {
        let connection_error = |message: String| SyncError::Connection {
            source_tag: query.source.to_string(),
            table: query.table.clone(),
            message,
        };

        let uri = self
            .uri(query.source)
            .ok_or_else(|| connection_error("no connection string configured".to_string()))?;
        let client = new_postgresql_client(uri)
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let sql = query.to_sql();
        debug!("Querying {} source: {sql}", query.source);
        let query_error = |e: tokio_postgres::Error| SyncError::Query {
            table: query.table.clone(),
            query: sql.clone(),
            message: e.to_string(),
        };

        let rows = client.query(sql.as_str(), &[]).await.map_err(query_error)?;
        rows.iter()
            .map(|row| convert_row(row).map_err(query_error))
            .collect()
    }
}
