use crate::query::executor::{RawCount, RawRow};
use serde::{Deserialize, Serialize};

/// Channel name used when the store reports none.
///
/// Rows with a missing origin share this bucket with rows whose origin is
/// literally `unknown`, and a `channel=unknown` filter selects both.
pub const UNKNOWN_CHANNEL: &str = "unknown";

/// Send/convert counts for one (period, channel) bucket, with the derived rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Bucket start, `YYYY-MM-DDTHH:MM:SS.000Z`.
    pub period: String,
    pub channel: String,
    pub total_sent: u64,
    pub converted: u64,
    pub conversion_rate: f64,
}

impl ConversionRecord {
    pub fn new(period: impl Into<String>, channel: impl Into<String>, total_sent: u64, converted: u64) -> Self {
        Self {
            period: period.into(),
            channel: channel.into(),
            total_sent,
            converted,
            conversion_rate: conversion_rate(total_sent, converted),
        }
    }

    /// Date-only part of the period, used as the chart x-axis key.
    pub fn date_key(&self) -> &str {
        period_date_key(&self.period)
    }
}

/// Strip the time-of-day from a period string (`2025-05-23T00:00:00.000Z` → `2025-05-23`).
pub fn period_date_key(period: &str) -> &str {
    period
        .split_once(['T', ' '])
        .map_or(period, |(date, _)| date)
}

/// `converted / total_sent`, or 0 when nothing was sent.
///
/// Not clamped: `converted > total_sent` yields a rate above 1.
pub fn conversion_rate(total_sent: u64, converted: u64) -> f64 {
    if total_sent == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = converted as f64 / total_sent as f64;
    rate
}

/// Coerce a store count to a non-negative integer. Anything unusable is 0.
pub fn coerce_count(raw: Option<&RawCount>) -> u64 {
    match raw {
        None => 0,
        Some(RawCount::Int(n)) => u64::try_from(*n).unwrap_or(0),
        Some(RawCount::Float(f)) => float_to_count(*f),
        Some(RawCount::Text(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(float_to_count))
                .unwrap_or(0)
        }
    }
}

fn float_to_count(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        // `as` saturates at u64::MAX
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = f.trunc() as u64;
        n
    } else {
        0
    }
}

/// Turn raw store rows into typed records with the conversion rate filled in.
pub fn compute_records(rows: Vec<RawRow>) -> Vec<ConversionRecord> {
    rows.into_iter().map(compute_record).collect()
}

fn compute_record(row: RawRow) -> ConversionRecord {
    let channel = row
        .channel
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());
    let total_sent = coerce_count(row.total_sent.as_ref());
    let converted = coerce_count(row.converted.as_ref());
    ConversionRecord::new(row.period, channel, total_sent, converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(channel: Option<&str>, total_sent: Option<RawCount>, converted: Option<RawCount>) -> RawRow {
        RawRow {
            period: "2025-05-23T00:00:00.000Z".to_string(),
            channel: channel.map(String::from),
            total_sent,
            converted,
        }
    }

    fn text(s: &str) -> Option<RawCount> {
        Some(RawCount::Text(s.to_string()))
    }

    #[test]
    fn test_rate_zero_when_nothing_sent() {
        assert!(conversion_rate(0, 0).abs() < f64::EPSILON);
        assert!(conversion_rate(0, 5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rate_division() {
        assert!((conversion_rate(100, 25) - 0.25).abs() < f64::EPSILON);
        assert!((conversion_rate(200, 10) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rate_not_clamped_above_one() {
        assert!((conversion_rate(2, 3) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coerce_count_variants() {
        assert_eq!(coerce_count(None), 0);
        assert_eq!(coerce_count(Some(&RawCount::Int(42))), 42);
        assert_eq!(coerce_count(Some(&RawCount::Int(-3))), 0);
        assert_eq!(coerce_count(Some(&RawCount::Float(7.9))), 7);
        assert_eq!(coerce_count(Some(&RawCount::Float(f64::NAN))), 0);
        assert_eq!(coerce_count(Some(&RawCount::Float(-1.0))), 0);
        assert_eq!(coerce_count(text("100").as_ref()), 100);
        assert_eq!(coerce_count(text(" 12 ").as_ref()), 12);
        assert_eq!(coerce_count(text("12.0").as_ref()), 12);
        assert_eq!(coerce_count(text("abc").as_ref()), 0);
        assert_eq!(coerce_count(text("").as_ref()), 0);
    }

    #[test]
    fn test_compute_records_from_string_counts() {
        let records = compute_records(vec![
            raw(Some("email"), text("100"), text("25")),
            raw(Some("wpp"), text("200"), text("10")),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].channel, "email");
        assert_eq!(records[0].total_sent, 100);
        assert_eq!(records[0].converted, 25);
        assert!((records[0].conversion_rate - 0.25).abs() < f64::EPSILON);
        assert!((records[1].conversion_rate - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_counts_become_zero() {
        let records = compute_records(vec![raw(Some("email"), None, None)]);
        assert_eq!(records[0].total_sent, 0);
        assert_eq!(records[0].converted, 0);
        assert!(records[0].conversion_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_channel_is_unknown() {
        let records = compute_records(vec![
            raw(None, text("1"), text("0")),
            raw(Some("  "), text("1"), text("0")),
        ]);
        assert_eq!(records[0].channel, UNKNOWN_CHANNEL);
        assert_eq!(records[1].channel, UNKNOWN_CHANNEL);
    }

    #[test]
    fn test_converted_without_sends() {
        let records = compute_records(vec![raw(Some("email"), Some(RawCount::Int(0)), Some(RawCount::Int(4)))]);
        assert_eq!(records[0].converted, 4);
        assert!(records[0].conversion_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_period_date_key() {
        assert_eq!(period_date_key("2025-05-23T00:00:00.000Z"), "2025-05-23");
        assert_eq!(period_date_key("2025-05-23 00:00:00"), "2025-05-23");
        assert_eq!(period_date_key("2025-05-23"), "2025-05-23");
    }

    #[test]
    fn test_record_serializes_snake_case() {
        let json = serde_json::to_value(ConversionRecord::new("2025-05-23T00:00:00.000Z", "email", 100, 25)).unwrap();
        assert_eq!(json["period"], "2025-05-23T00:00:00.000Z");
        assert_eq!(json["total_sent"], 100);
        assert_eq!(json["converted"], 25);
        assert_eq!(json["conversion_rate"], 0.25);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Nothing sent always means a zero rate, whatever the converted count says.
        #[test]
        fn prop_zero_sent_zero_rate(converted in any::<u64>()) {
            prop_assert_eq!(conversion_rate(0, converted), 0.0);
        }

        #[test]
        fn prop_rate_is_ratio(total_sent in 1u64..1_000_000, converted in 0u64..1_000_000) {
            #[allow(clippy::cast_precision_loss)]
            let expected = converted as f64 / total_sent as f64;
            prop_assert!((conversion_rate(total_sent, converted) - expected).abs() < 1e-12);
        }

        #[test]
        fn prop_rate_in_unit_interval_when_sane(total_sent in 0u64..1_000_000, frac in 0.0f64..=1.0) {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let converted = (total_sent as f64 * frac) as u64;
            let rate = conversion_rate(total_sent, converted.min(total_sent));
            prop_assert!((0.0..=1.0).contains(&rate));
        }

        #[test]
        fn prop_numeric_strings_coerce(n in any::<u32>()) {
            let raw = RawCount::Text(n.to_string());
            prop_assert_eq!(coerce_count(Some(&raw)), u64::from(n));
        }
    }
}
