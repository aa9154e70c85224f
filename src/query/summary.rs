use crate::query::metrics::{conversion_rate, ConversionRecord};
use serde::{Deserialize, Serialize};

/// Totals across every record currently in scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub total_sent: u64,
    pub total_converted: u64,
    /// Percentage (`11.67` means 11.67%), 0 when nothing was sent.
    pub overall_rate: f64,
}

/// Reduce the record set to global totals. No channel breakdown.
pub fn summarize(records: &[ConversionRecord]) -> SummaryTotals {
    let (total_sent, total_converted) = records.iter().fold((0u64, 0u64), |(sent, conv), r| {
        (
            sent.saturating_add(r.total_sent),
            conv.saturating_add(r.converted),
        )
    });

    SummaryTotals {
        total_sent,
        total_converted,
        overall_rate: conversion_rate(total_sent, total_converted) * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(channel: &str, sent: u64, converted: u64) -> ConversionRecord {
        ConversionRecord::new("2025-05-23T00:00:00.000Z", channel, sent, converted)
    }

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(summarize(&[]), SummaryTotals::default());
    }

    #[test]
    fn test_two_channels() {
        let totals = summarize(&[rec("email", 100, 25), rec("wpp", 200, 10)]);
        assert_eq!(totals.total_sent, 300);
        assert_eq!(totals.total_converted, 35);
        assert!((totals.overall_rate - 11.666_666_666_666_666).abs() < 1e-9);
        assert_eq!(format!("{:.2}", totals.overall_rate), "11.67");
    }

    #[test]
    fn test_nothing_sent_rate_is_zero() {
        let totals = summarize(&[rec("email", 0, 3)]);
        assert_eq!(totals.total_converted, 3);
        assert!(totals.overall_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sums_saturate() {
        let totals = summarize(&[rec("email", u64::MAX, 1), rec("wpp", 5, u64::MAX)]);
        assert_eq!(totals.total_sent, u64::MAX);
        assert_eq!(totals.total_converted, u64::MAX);
    }
}
