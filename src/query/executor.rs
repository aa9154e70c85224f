use crate::query::filter::AggregationQuery;
use duckdb::Connection;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status id of the terminal "converted" response state.
pub const DEFAULT_CONVERTED_STATUS: i32 = 6;

/// A count as handed back by a store: integer, float, or numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Int(i64),
    Float(f64),
    Text(String),
}

/// One grouped (period, channel) row straight from the store, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub period: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub total_sent: Option<RawCount>,
    #[serde(default)]
    pub converted: Option<RawCount>,
}

/// Failure talking to the data store. Never a parsed-result shape.
#[derive(Debug)]
pub enum DataAccessError {
    /// Store unreachable or connection unusable.
    Connection(String),
    /// Preparing or running the aggregation failed.
    Query(duckdb::Error),
    /// The blocking worker running the query died.
    Task(String),
}

impl std::fmt::Display for DataAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Task(msg) => write!(f, "Query task failed: {msg}"),
        }
    }
}

impl std::error::Error for DataAccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<duckdb::Error> for DataAccessError {
    fn from(e: duckdb::Error) -> Self {
        Self::Query(e)
    }
}

/// Runs an aggregation descriptor against a data store.
///
/// Implementations are blocking; async callers go through `spawn_blocking`.
pub trait AggregationExecutor: Send + Sync {
    fn execute(&self, query: &AggregationQuery) -> Result<Vec<RawRow>, DataAccessError>;

    /// Cheap liveness probe for health checks.
    fn ping(&self) -> Result<(), DataAccessError> {
        Ok(())
    }
}

/// DuckDB-backed executor over the `survey_responses` table.
#[derive(Clone)]
pub struct DuckDbExecutor {
    conn: Arc<Mutex<Connection>>,
    converted_status: i32,
}

impl DuckDbExecutor {
    pub const fn new(conn: Arc<Mutex<Connection>>, converted_status: i32) -> Self {
        Self {
            conn,
            converted_status,
        }
    }

    /// Returns a reference to the shared DuckDB connection.
    pub const fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }
}

impl AggregationExecutor for DuckDbExecutor {
    fn execute(&self, query: &AggregationQuery) -> Result<Vec<RawRow>, DataAccessError> {
        let (sql, params) = query.to_sql(self.converted_status);
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(duckdb::params_from_iter(params.iter()), |row| {
                Ok(RawRow {
                    period: row.get(0)?,
                    channel: row.get(1)?,
                    total_sent: row.get::<_, Option<i64>>(2)?.map(RawCount::Int),
                    converted: row.get::<_, Option<i64>>(3)?.map(RawCount::Int),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            granularity = query.granularity.trunc_unit(),
            rows = rows.len(),
            "Aggregation executed"
        );
        Ok(rows)
    }

    fn ping(&self) -> Result<(), DataAccessError> {
        let conn = self.conn.lock();
        conn.execute_batch("SELECT 1")
            .map_err(|e| DataAccessError::Connection(e.to_string()))
    }
}
