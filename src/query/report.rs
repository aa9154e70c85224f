use crate::query::metrics::ConversionRecord;
use crate::query::reshape::{reshape, AlignedTimeSeries};
use crate::query::summary::{summarize, SummaryTotals};
use serde::Serialize;

/// Everything the dashboard renders for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub records: Vec<ConversionRecord>,
    pub series: AlignedTimeSeries,
    pub chart: Vec<serde_json::Map<String, serde_json::Value>>,
    pub summary: SummaryTotals,
}

impl ConversionReport {
    /// Build series and summary from the same record set.
    pub fn build(records: Vec<ConversionRecord>) -> Self {
        let series = reshape(&records);
        let chart = series.chart_rows();
        let summary = summarize(&records);
        Self {
            records,
            series,
            chart,
            summary,
        }
    }
}
