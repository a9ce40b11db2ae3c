//! Time × asset panels.
//!
//! A [`Panel`] stores one real value per (timestamp, asset) cell in a dense
//! `ndarray` matrix, with `NaN` marking a missing observation. Rows follow the
//! strictly ascending timestamp axis and columns follow the asset axis.
//!
//! [`FactorPanel`] and [`PricePanel`] wrap a panel with the meaning of its
//! values. Both are immutable once built; evaluation code only ever borrows
//! them.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;

/// Timestamp type used on every panel axis.
pub type Timestamp = NaiveDateTime;

/// Parse a timestamp from `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DDTHH:MM:SS`. Dates map to midnight.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| DataError::InvalidTimestamp(raw.to_string()))
}

/// Dense timestamp × asset matrix with `NaN` for missing cells.
#[derive(Debug, Clone)]
pub struct Panel {
    timestamps: Vec<Timestamp>,
    assets: Vec<String>,
    asset_index: HashMap<String, usize>,
    values: Array2<f64>,
}

impl Panel {
    /// Create a panel from its axes and value matrix.
    ///
    /// # Errors
    /// Fails if timestamps are not strictly ascending, asset identifiers repeat,
    /// or the matrix is not `timestamps.len() x assets.len()`.
    pub fn new(timestamps: Vec<Timestamp>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != timestamps.len() || cols != assets.len() {
            return Err(DataError::ShapeMismatch {
                expected_rows: timestamps.len(),
                expected_cols: assets.len(),
                rows,
                cols,
            });
        }

        for pair in timestamps.windows(2) {
            if pair[0] >= pair[1] {
                return Err(DataError::UnsortedTimestamps {
                    previous: pair[0].to_string(),
                    next: pair[1].to_string(),
                });
            }
        }

        let mut asset_index = HashMap::with_capacity(assets.len());
        for (i, asset) in assets.iter().enumerate() {
            if asset_index.insert(asset.clone(), i).is_some() {
                return Err(DataError::DuplicateAsset(asset.clone()));
            }
        }

        Ok(Self {
            timestamps,
            assets,
            asset_index,
            values,
        })
    }

    /// Timestamp axis (strictly ascending).
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Asset axis.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Raw value matrix, `NaN` where missing.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of timestamps.
    pub fn n_timestamps(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Column index of an asset.
    pub fn asset_position(&self, asset: &str) -> Option<usize> {
        self.asset_index.get(asset).copied()
    }

    /// Row index of an exact timestamp.
    pub fn timestamp_position(&self, ts: Timestamp) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    /// Row index of the first timestamp at or after `ts`.
    pub fn first_at_or_after(&self, ts: Timestamp) -> Option<usize> {
        let idx = self.timestamps.partition_point(|t| *t < ts);
        (idx < self.timestamps.len()).then_some(idx)
    }

    /// Value at a row/column, `None` when out of range or missing.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied().filter(|v| v.is_finite())
    }

    /// Value for a timestamp and asset, `None` when absent or missing.
    pub fn value(&self, ts: Timestamp, asset: &str) -> Option<f64> {
        self.get(self.timestamp_position(ts)?, self.asset_position(asset)?)
    }

    /// One timestamp's values across all assets.
    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    /// Number of non-missing cells.
    pub fn observation_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Same axes with a new value matrix.
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        Self::new(self.timestamps.clone(), self.assets.clone(), values)
    }
}

/// Accumulates long-format observations and builds a [`Panel`].
///
/// Assets are laid out in lexical order and timestamps in ascending order,
/// so the same observations always produce the same panel.
#[derive(Debug, Default)]
pub struct PanelBuilder {
    rows: BTreeMap<Timestamp, BTreeMap<String, f64>>,
}

impl PanelBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation. Non-finite values are recorded as missing.
    ///
    /// # Errors
    /// Fails if the (timestamp, asset) pair was already supplied.
    pub fn push(&mut self, ts: Timestamp, asset: impl Into<String>, value: f64) -> Result<&mut Self> {
        let asset = asset.into();
        let row = self.rows.entry(ts).or_default();
        if row.contains_key(&asset) {
            return Err(DataError::DuplicateObservation {
                asset,
                timestamp: ts.to_string(),
            });
        }
        row.insert(asset, if value.is_finite() { value } else { f64::NAN });
        Ok(self)
    }

    /// Number of distinct timestamps seen so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no observation has been pushed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the dense panel.
    pub fn build(self) -> Result<Panel> {
        let mut assets: Vec<String> = self
            .rows
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect();
        assets.sort();
        assets.dedup();

        let column: HashMap<&str, usize> = assets
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();

        let mut values = Array2::from_elem((self.rows.len(), assets.len()), f64::NAN);
        for (r, row) in self.rows.values().enumerate() {
            for (asset, value) in row {
                values[[r, column[asset.as_str()]]] = *value;
            }
        }

        let timestamps = self.rows.into_keys().collect();
        Panel::new(timestamps, assets, values)
    }
}

/// Factor signal panel: one factor value per (timestamp, asset).
#[derive(Debug, Clone)]
pub struct FactorPanel {
    panel: Panel,
}

impl FactorPanel {
    /// Create a factor panel from axes and values.
    pub fn new(timestamps: Vec<Timestamp>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        Ok(Self {
            panel: Panel::new(timestamps, assets, values)?,
        })
    }

    /// Build a factor panel from long-format `(timestamp, asset, value)` rows.
    pub fn from_observations<I, S>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Timestamp, S, f64)>,
        S: Into<String>,
    {
        let mut builder = PanelBuilder::new();
        for (ts, asset, value) in observations {
            builder.push(ts, asset, value)?;
        }
        Ok(Self::from(builder.build()?))
    }

    /// Same axes with a new value matrix.
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        Ok(Self {
            panel: self.panel.with_values(values)?,
        })
    }

    /// Underlying panel.
    pub const fn panel(&self) -> &Panel {
        &self.panel
    }
}

impl From<Panel> for FactorPanel {
    fn from(panel: Panel) -> Self {
        Self { panel }
    }
}

impl Deref for FactorPanel {
    type Target = Panel;

    fn deref(&self) -> &Panel {
        &self.panel
    }
}

/// What the values of a [`PricePanel`] represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKind {
    /// Positive asset prices
    #[default]
    Price,
    /// Pre-computed simple returns; the value at row k is the return from
    /// row k-1 to row k
    Return,
}

/// Price (or per-period return) panel.
#[derive(Debug, Clone)]
pub struct PricePanel {
    panel: Panel,
    kind: PriceKind,
}

impl PricePanel {
    /// Create a price panel from axes and values.
    pub fn new(
        timestamps: Vec<Timestamp>,
        assets: Vec<String>,
        values: Array2<f64>,
        kind: PriceKind,
    ) -> Result<Self> {
        Ok(Self {
            panel: Panel::new(timestamps, assets, values)?,
            kind,
        })
    }

    /// Build a price panel from long-format `(timestamp, asset, value)` rows.
    pub fn from_observations<I, S>(observations: I, kind: PriceKind) -> Result<Self>
    where
        I: IntoIterator<Item = (Timestamp, S, f64)>,
        S: Into<String>,
    {
        let mut builder = PanelBuilder::new();
        for (ts, asset, value) in observations {
            builder.push(ts, asset, value)?;
        }
        Ok(Self::from_panel(builder.build()?, kind))
    }

    /// Wrap an existing panel.
    pub const fn from_panel(panel: Panel, kind: PriceKind) -> Self {
        Self { panel, kind }
    }

    /// Whether values are prices or returns.
    pub const fn kind(&self) -> PriceKind {
        self.kind
    }

    /// Underlying panel.
    pub const fn panel(&self) -> &Panel {
        &self.panel
    }
}

impl Deref for PricePanel {
    type Target = Panel;

    fn deref(&self) -> &Panel {
        &self.panel
    }
}
