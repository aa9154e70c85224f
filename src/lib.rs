//! Channel conversion-rate reporting.
//!
//! Raw response rows are bucketed by period and channel in DuckDB, turned
//! into typed records with a conversion rate, then reshaped into aligned
//! per-channel time series and summary totals for the dashboard.

pub mod api;
pub mod config;
pub mod query;
pub mod server;
pub mod storage;
