// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

/// Aggregate of the values recorded into one histogram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramSummary {
    /// Number of recorded values.
    pub count: u64,
    /// Sum of all recorded values.
    pub sum: f64,
    /// Largest recorded value, or `0.0` if nothing was recorded.
    pub max: f64,
}

impl HistogramSummary {
    pub(crate) fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        values
            .into_iter()
            .fold(HistogramSummary::default(), |acc, value| HistogramSummary {
                count: acc.count + 1,
                sum: acc.sum + value,
                max: if acc.count == 0 { value } else { acc.max.max(value) },
            })
    }

    /// Mean of recorded values, or `0.0` if nothing was recorded.
    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Immutable snapshot of an [`InMemoryMeter`](super::InMemoryMeter).
///
/// Every map is keyed by metric name. Gauges hold the value returned by polling their
/// callback when the snapshot was taken.
///
/// # Consistency Note
///
/// Each instrument is read individually, so a snapshot taken while other threads record
/// may not reflect a single point in time across instruments.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct MeterSnapshot {
    pub counters: BTreeMap<&'static str, u64>,
    pub histograms: BTreeMap<&'static str, HistogramSummary>,
    pub gauges: BTreeMap<&'static str, i64>,
}

impl MeterSnapshot {
    /// Total number of instruments in the snapshot.
    pub fn len(&self) -> usize {
        self.counters.len() + self.histograms.len() + self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
