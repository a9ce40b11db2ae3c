//! Sub-period readings.
//!
//! Raw factor readings taken more often than the evaluation frequency (for
//! example per-minute sentiment scores evaluated daily). Each asset keeps its
//! own timestamp-ordered reading list; aggregation later collapses a window of
//! readings into one factor value per evaluation timestamp.

use crate::panel::Timestamp;
use std::collections::BTreeMap;

/// Per-asset ordered sub-period readings.
#[derive(Debug, Clone, Default)]
pub struct SubPeriodPanel {
    readings: BTreeMap<String, Vec<(Timestamp, f64)>>,
}

impl SubPeriodPanel {
    /// Build from unordered `(timestamp, asset, value)` readings.
    ///
    /// Readings are sorted by timestamp per asset. Repeated timestamps are
    /// kept in input order.
    pub fn from_readings<I, S>(readings: I) -> Self
    where
        I: IntoIterator<Item = (Timestamp, S, f64)>,
        S: Into<String>,
    {
        let mut by_asset: BTreeMap<String, Vec<(Timestamp, f64)>> = BTreeMap::new();
        for (ts, asset, value) in readings {
            by_asset.entry(asset.into()).or_default().push((ts, value));
        }
        for series in by_asset.values_mut() {
            series.sort_by_key(|(ts, _)| *ts);
        }
        Self { readings: by_asset }
    }

    /// Asset identifiers in lexical order.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.readings.keys().map(String::as_str)
    }

    /// Number of assets with readings.
    pub fn n_assets(&self) -> usize {
        self.readings.len()
    }

    /// All readings of an asset, ordered by timestamp.
    pub fn readings(&self, asset: &str) -> &[(Timestamp, f64)] {
        self.readings.get(asset).map_or(&[], Vec::as_slice)
    }

    /// Readings of an asset with `start <= ts < end`.
    pub fn window(&self, asset: &str, start: Timestamp, end: Timestamp) -> &[(Timestamp, f64)] {
        let series = self.readings(asset);
        let lo = series.partition_point(|(ts, _)| *ts < start);
        let hi = series.partition_point(|(ts, _)| *ts < end);
        if lo >= hi { &[] } else { &series[lo..hi] }
    }
}
