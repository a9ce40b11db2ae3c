//! Polars DataFrame ingest.
//!
//! Accepts long-format frames with a timestamp column (`Date`, `Datetime` or
//! string), an asset identifier column and a numeric value column.

use super::Observation;
use crate::error::{DataError, Result};
use crate::panel::{FactorPanel, PriceKind, PricePanel, Timestamp, parse_timestamp};
use chrono::NaiveTime;
use polars::prelude::*;
use tracing::debug;

/// Column names of a long-format frame.
#[derive(Debug, Clone, Copy)]
pub struct LongFrameColumns<'a> {
    /// Timestamp column
    pub timestamp: &'a str,
    /// Asset identifier column
    pub asset: &'a str,
    /// Value column (factor value, price or return)
    pub value: &'a str,
}

impl Default for LongFrameColumns<'_> {
    fn default() -> Self {
        Self {
            timestamp: "timestamp",
            asset: "asset",
            value: "value",
        }
    }
}

/// Extract `(timestamp, asset, value)` rows from a long-format frame.
///
/// Rows without a timestamp or asset are skipped; a null value is kept as a
/// missing (`NaN`) observation.
pub fn observations_from_frame(
    df: &DataFrame,
    columns: &LongFrameColumns<'_>,
) -> Result<Vec<Observation>> {
    let timestamps = timestamp_column(df.column(columns.timestamp)?.as_materialized_series())?;

    let asset_series = df.column(columns.asset)?.as_materialized_series();
    let assets = asset_series.str().map_err(|_| DataError::Column {
        name: columns.asset.to_string(),
        reason: format!("expected string identifiers, found {}", asset_series.dtype()),
    })?;

    let values = df
        .column(columns.value)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = values.f64()?;

    let mut observations = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for ((ts, asset), value) in timestamps.into_iter().zip(assets).zip(values) {
        match (ts, asset) {
            (Some(ts), Some(asset)) => {
                observations.push((ts, asset.to_string(), value.unwrap_or(f64::NAN)));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "dropped frame rows without timestamp or asset");
    }
    Ok(observations)
}

fn timestamp_column(series: &Series) -> Result<Vec<Option<Timestamp>>> {
    match series.dtype() {
        DataType::Date => Ok(series
            .date()?
            .as_date_iter()
            .map(|d| d.map(|d| d.and_time(NaiveTime::MIN)))
            .collect()),
        DataType::Datetime(_, _) => Ok(series.datetime()?.as_datetime_iter().collect()),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|raw| raw.map(parse_timestamp).transpose())
            .collect(),
        other => Err(DataError::Column {
            name: series.name().to_string(),
            reason: format!("unsupported timestamp type {other}"),
        }),
    }
}

impl FactorPanel {
    /// Build a factor panel from a long-format DataFrame.
    pub fn from_frame(df: &DataFrame, columns: &LongFrameColumns<'_>) -> Result<Self> {
        Self::from_observations(observations_from_frame(df, columns)?)
    }
}

impl PricePanel {
    /// Build a price panel from a long-format DataFrame.
    pub fn from_frame(
        df: &DataFrame,
        columns: &LongFrameColumns<'_>,
        kind: PriceKind,
    ) -> Result<Self> {
        Self::from_observations(observations_from_frame(df, columns)?, kind)
    }
}
