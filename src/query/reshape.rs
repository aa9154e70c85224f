use crate::query::metrics::{conversion_rate, ConversionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One channel's counts at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub total_sent: u64,
    pub converted: u64,
    pub conversion_rate: f64,
}

impl SeriesPoint {
    fn from_counts(date: String, total_sent: u64, converted: u64) -> Self {
        Self {
            date,
            total_sent,
            converted,
            conversion_rate: conversion_rate(total_sent, converted),
        }
    }
}

/// Channel name → points ordered by ascending date.
pub type ChannelSeries = BTreeMap<String, Vec<SeriesPoint>>;

/// Parallel per-date values for one channel; every vector is as long as the date axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelFacets {
    pub total_sent: Vec<u64>,
    pub converted: Vec<u64>,
    pub conversion_rate: Vec<f64>,
}

impl ChannelFacets {
    fn with_capacity(n: usize) -> Self {
        Self {
            total_sent: Vec::with_capacity(n),
            converted: Vec::with_capacity(n),
            conversion_rate: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, total_sent: u64, converted: u64, rate: f64) {
        self.total_sent.push(total_sent);
        self.converted.push(converted);
        self.conversion_rate.push(rate);
    }
}

/// Every channel reindexed onto the union of observed dates, gaps zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedTimeSeries {
    pub dates: Vec<String>,
    pub channels: BTreeMap<String, ChannelFacets>,
}

impl AlignedTimeSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Values for `channel` at date index `idx`.
    pub fn point(&self, channel: &str, idx: usize) -> Option<SeriesPoint> {
        let facets = self.channels.get(channel)?;
        Some(SeriesPoint {
            date: self.dates.get(idx)?.clone(),
            total_sent: *facets.total_sent.get(idx)?,
            converted: *facets.converted.get(idx)?,
            conversion_rate: *facets.conversion_rate.get(idx)?,
        })
    }

    /// Flatten back to records, zero-filled points included, with the date as period.
    pub fn to_records(&self) -> Vec<ConversionRecord> {
        let mut records = Vec::with_capacity(self.dates.len() * self.channels.len());
        for (idx, date) in self.dates.iter().enumerate() {
            for (channel, facets) in &self.channels {
                records.push(ConversionRecord {
                    period: date.clone(),
                    channel: channel.clone(),
                    total_sent: facets.total_sent[idx],
                    converted: facets.converted[idx],
                    conversion_rate: facets.conversion_rate[idx],
                });
            }
        }
        records
    }

    /// One flat object per date in the shape line-chart widgets consume:
    /// `{date, <channel>: rate, <channel>_total_sent, <channel>_converted}`.
    ///
    /// Channels whose keys would clash with `date` or with another channel's
    /// keys (`a_converted` next to `a`) are left out of the rows; they remain
    /// in `channels`.
    pub fn chart_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        let charted = self.chartable_channels();
        self.dates
            .iter()
            .enumerate()
            .map(|(idx, date)| {
                let mut row = serde_json::Map::new();
                row.insert(CHART_DATE_KEY.to_string(), date.clone().into());
                for (channel, facets) in &charted {
                    let [rate_key, sent_key, converted_key] = chart_keys(channel);
                    row.insert(rate_key, facets.conversion_rate[idx].into());
                    row.insert(sent_key, facets.total_sent[idx].into());
                    row.insert(converted_key, facets.converted[idx].into());
                }
                row
            })
            .collect()
    }

    fn chartable_channels(&self) -> Vec<(&String, &ChannelFacets)> {
        let mut key_uses: HashMap<String, usize> = HashMap::new();
        key_uses.insert(CHART_DATE_KEY.to_string(), 1);
        for channel in self.channels.keys() {
            for key in chart_keys(channel) {
                *key_uses.entry(key).or_default() += 1;
            }
        }

        self.channels
            .iter()
            .filter(|(channel, _)| {
                let clear = chart_keys(channel).iter().all(|key| key_uses[key] == 1);
                if !clear {
                    tracing::warn!(channel = %channel, "Channel name clashes with a chart key, left out of chart rows");
                }
                clear
            })
            .collect()
    }
}

const CHART_DATE_KEY: &str = "date";

fn chart_keys(channel: &str) -> [String; 3] {
    [
        channel.to_string(),
        format!("{channel}_total_sent"),
        format!("{channel}_converted"),
    ]
}

/// Group records by channel, keyed on the date part of each period.
///
/// Records that collapse onto the same (channel, date) are summed and the
/// rate recomputed from the sums.
pub fn group_by_channel(records: &[ConversionRecord]) -> ChannelSeries {
    let mut counts: BTreeMap<&str, BTreeMap<&str, (u64, u64)>> = BTreeMap::new();
    for record in records {
        let entry = counts
            .entry(record.channel.as_str())
            .or_default()
            .entry(record.date_key())
            .or_default();
        entry.0 = entry.0.saturating_add(record.total_sent);
        entry.1 = entry.1.saturating_add(record.converted);
    }

    counts
        .into_iter()
        .map(|(channel, by_date)| {
            let points = by_date
                .into_iter()
                .map(|(date, (sent, converted))| {
                    SeriesPoint::from_counts(date.to_string(), sent, converted)
                })
                .collect();
            (channel.to_string(), points)
        })
        .collect()
}

/// Align every channel onto the sorted union of dates, zero-filling gaps.
pub fn reshape(records: &[ConversionRecord]) -> AlignedTimeSeries {
    let dates: Vec<String> = records
        .iter()
        .map(ConversionRecord::date_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let channels = group_by_channel(records)
        .into_iter()
        .map(|(channel, points)| {
            let mut facets = ChannelFacets::with_capacity(dates.len());
            let mut points = points.into_iter().peekable();
            for date in &dates {
                // Both sides ascend, so a single merge pass lines them up.
                match points.next_if(|p| &p.date == date) {
                    Some(p) => facets.push(p.total_sent, p.converted, p.conversion_rate),
                    None => facets.push(0, 0, 0.0),
                }
            }
            (channel, facets)
        })
        .collect();

    AlignedTimeSeries { dates, channels }
}
