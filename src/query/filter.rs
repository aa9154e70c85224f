use crate::query::metrics::UNKNOWN_CHANNEL;
use chrono::NaiveDate;
use duckdb::types::Value;
use serde::{Deserialize, Serialize};

/// Time granularity for bucketing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Month,
    Year,
}

impl Granularity {
    /// Bucketing unit handed to `DATE_TRUNC`. Only these literals ever reach SQL.
    pub const fn trunc_unit(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Parse a user-supplied `groupBy` value, falling back to `Day` for
    /// anything outside the fixed set.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Day;
        };
        match raw.to_ascii_lowercase().as_str() {
            "day" => Self::Day,
            "month" => Self::Month,
            "year" => Self::Year,
            _ => {
                tracing::debug!(group_by = %raw, "Unrecognized groupBy, using day");
                Self::Day
            }
        }
    }
}

/// Raw filter inputs as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub group_by: Option<String>,
    pub channel: Option<String>,
}

/// Validated filter state. Every field is safe to feed the query builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSpec {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub channel: Option<String>,
    pub group_by: Granularity,
}

impl FilterSpec {
    /// Validate raw inputs, degrading bad values to "unfiltered" instead of failing.
    ///
    /// - unparseable dates are dropped individually
    /// - an inverted range (`start > end`) drops both bounds
    /// - blank channels mean no channel filter
    pub fn from_params(params: &FilterParams) -> Self {
        let mut start_date = parse_date("startDate", params.start_date.as_deref());
        let mut end_date = parse_date("endDate", params.end_date.as_deref());

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                tracing::warn!(%start, %end, "startDate after endDate, ignoring date range");
                start_date = None;
                end_date = None;
            }
        }

        let channel = params
            .channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Self {
            start_date,
            end_date,
            channel,
            group_by: Granularity::parse_lenient(params.group_by.as_deref()),
        }
    }
}

fn parse_date(field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(field, value = %raw, error = %e, "Ignoring malformed date filter");
            None
        }
    }
}

/// Aggregation descriptor handed to the executor.
///
/// Buckets `created_at` by `granularity`, groups by (bucket, channel) and
/// counts all rows plus those in the converted status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AggregationQuery {
    pub granularity: Granularity,
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
    pub channel: Option<String>,
}

impl AggregationQuery {
    pub fn from_filter(filter: &FilterSpec) -> Self {
        Self {
            granularity: filter.group_by,
            start: filter.start_date,
            end: filter.end_date,
            channel: filter.channel.clone(),
        }
    }

    /// Render the parameterized SQL and its positional parameters.
    ///
    /// The bucket unit is the only interpolated fragment and comes from
    /// [`Granularity::trunc_unit`]; every filter value is bound.
    pub fn to_sql(&self, converted_status: i32) -> (String, Vec<Value>) {
        let trunc = self.granularity.trunc_unit();
        let table = crate::storage::schema::RESPONSES_TABLE;

        let mut params = vec![Value::Int(converted_status)];
        let mut clauses = Vec::new();

        if let Some(start) = self.start {
            clauses.push("created_at >= CAST(? AS TIMESTAMP)");
            params.push(Value::Text(start.to_string()));
        }
        if let Some(end) = self.end {
            // Inclusive day bound: everything before the following midnight.
            let upper = end.succ_opt().unwrap_or(NaiveDate::MAX);
            clauses.push("created_at < CAST(? AS TIMESTAMP)");
            params.push(Value::Text(upper.to_string()));
        }
        if let Some(channel) = &self.channel {
            // Missing origins are reported as `unknown`, so that name selects them too.
            if channel == UNKNOWN_CHANNEL {
                clauses.push("(origin = ? OR origin IS NULL OR TRIM(origin) = '')");
            } else {
                clauses.push("origin = ?");
            }
            params.push(Value::Text(channel.clone()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT strftime(DATE_TRUNC('{trunc}', created_at), '%Y-%m-%dT%H:%M:%S.000Z') AS period,
                    origin AS channel,
                    COUNT(*) AS total_sent,
                    COUNT(*) FILTER (WHERE response_status_id = ?) AS converted
             FROM {table}
             {where_sql}
             GROUP BY period, channel
             ORDER BY period, channel"
        );

        (sql, params)
    }
}
