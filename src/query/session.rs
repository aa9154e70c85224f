//! Refresh bookkeeping for a dashboard view.
//!
//! Each filter change issues a ticket with a fresh generation number. A
//! completed fetch is applied only when its ticket is still the newest one
//! issued, so a slow response for an old filter can never overwrite the
//! result of a newer one.
//!
//! This is the client-side refresh API for a dashboard embedding the crate;
//! the HTTP server answers each request on its own and does not use it.

use crate::query::executor::{AggregationExecutor, DataAccessError};
use crate::query::filter::{AggregationQuery, FilterSpec};
use crate::query::metrics::{compute_records, ConversionRecord};
use crate::query::report::ConversionReport;
use parking_lot::Mutex;
use std::sync::Arc;

/// Handle for one in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub filter: FilterSpec,
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Result became the current report.
    Applied,
    /// A newer fetch was issued; result dropped.
    Superseded,
    /// Fetch failed; the previous report is still shown.
    Failed,
}

/// Snapshot of what the view should display.
#[derive(Debug, Clone, Default)]
pub struct ReportView {
    /// Filter the current `report` was computed for.
    pub filter: Option<FilterSpec>,
    pub report: Option<ConversionReport>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct Inner {
    latest: u64,
    view: ReportView,
}

/// Holds the current report and enforces last-response-wins ordering.
#[derive(Default)]
pub struct ReportSession {
    inner: Mutex<Inner>,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch for `filter`, superseding any fetch still in flight.
    pub fn begin(&self, filter: FilterSpec) -> RefreshTicket {
        let mut inner = self.inner.lock();
        inner.latest += 1;
        inner.view.loading = true;
        RefreshTicket {
            generation: inner.latest,
            filter,
        }
    }

    /// Apply a finished fetch if `ticket` is still the newest one.
    pub fn complete(
        &self,
        ticket: RefreshTicket,
        result: Result<Vec<ConversionRecord>, DataAccessError>,
    ) -> RefreshOutcome {
        let mut inner = self.inner.lock();
        if ticket.generation != inner.latest {
            tracing::debug!(
                generation = ticket.generation,
                latest = inner.latest,
                "Discarding superseded refresh"
            );
            return RefreshOutcome::Superseded;
        }

        inner.view.loading = false;
        match result {
            Ok(records) => {
                inner.view.report = Some(ConversionReport::build(records));
                inner.view.filter = Some(ticket.filter);
                inner.view.last_error = None;
                RefreshOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(error = %e, generation = ticket.generation, "Refresh failed");
                inner.view.last_error = Some(e.to_string());
                RefreshOutcome::Failed
            }
        }
    }

    /// Current view state.
    pub fn snapshot(&self) -> ReportView {
        self.inner.lock().view.clone()
    }

    /// Generation of the newest ticket issued so far.
    pub fn latest_generation(&self) -> u64 {
        self.inner.lock().latest
    }

    /// Fetch and apply a report for `filter`.
    ///
    /// The executor call runs on the blocking pool; it is the only suspension point.
    pub async fn refresh(
        &self,
        executor: Arc<dyn AggregationExecutor>,
        filter: FilterSpec,
    ) -> RefreshOutcome {
        let ticket = self.begin(filter);
        let query = AggregationQuery::from_filter(&ticket.filter);

        let result = tokio::task::spawn_blocking(move || executor.execute(&query))
            .await
            .map_err(|e| DataAccessError::Task(e.to_string()))
            .and_then(|r| r)
            .map(compute_records);

        self.complete(ticket, result)
    }
}
