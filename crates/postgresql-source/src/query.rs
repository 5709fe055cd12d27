//! Poll query construction.

use chrono::{DateTime, SecondsFormat, Utc};
use sync_core::{SourceTag, TableConfig};

/// Rows fetched per table per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One bounded, ascending range query against a source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollQuery {
    pub table: String,
    pub source: SourceTag,
    pub time_column: String,
    /// Exclusive lower bound; `None` polls from epoch
    pub after: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl PollQuery {
    pub fn new(config: &TableConfig, after: Option<DateTime<Utc>>, limit: usize) -> Self {
        Self {
            table: config.table.clone(),
            source: config.source,
            time_column: config.time_column.clone(),
            after,
            limit,
        }
    }

    /// Render the query text.
    ///
    /// `SELECT * FROM "t" WHERE "time" > '<checkpoint>' ORDER BY "time" ASC LIMIT n`
    pub fn to_sql(&self) -> String {
        let table = quote_ident(&self.table);
        let time = quote_ident(&self.time_column);
        let mut sql = format!("SELECT * FROM {table}");
        if let Some(after) = &self.after {
            let literal = after.to_rfc3339_opts(SecondsFormat::AutoSi, true);
            sql.push_str(&format!(" WHERE {time} > '{literal}'"));
        }
        sql.push_str(&format!(" ORDER BY {time} ASC LIMIT {}", self.limit));
        sql
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
