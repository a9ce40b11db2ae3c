//! Long-format CSV ingest.
//!
//! Expected header: `timestamp,asset,value`. An empty value field is a
//! missing observation.

use super::Observation;
use crate::error::Result;
use crate::panel::{FactorPanel, PriceKind, PricePanel, parse_timestamp};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct LongRecord {
    timestamp: String,
    asset: String,
    value: Option<f64>,
}

/// Read long-format observations from any reader.
pub fn read_long_csv<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut observations = Vec::new();
    for record in reader.deserialize::<LongRecord>() {
        let record = record?;
        observations.push((
            parse_timestamp(&record.timestamp)?,
            record.asset,
            record.value.unwrap_or(f64::NAN),
        ));
    }
    Ok(observations)
}

/// Read long-format observations from a file.
///
/// The file handle lives only for the duration of this call.
pub fn read_long_csv_path(path: impl AsRef<Path>) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let observations = read_long_csv(file)?;
    debug!(path = %path.display(), rows = observations.len(), "loaded long-format csv");
    Ok(observations)
}

impl FactorPanel {
    /// Load a factor panel from a long-format CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_observations(read_long_csv_path(path)?)
    }
}

impl PricePanel {
    /// Load a price or return panel from a long-format CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>, kind: PriceKind) -> Result<Self> {
        Self::from_observations(read_long_csv_path(path)?, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;

    #[test]
    fn test_read_long_csv_with_missing_value() {
        let data = "timestamp,asset,value\n2024-01-01,AAPL,1.5\n2024-01-01,MSFT,\n";
        let rows = read_long_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, "AAPL");
        assert_eq!(rows[0].2, 1.5);
        assert!(rows[1].2.is_nan());
    }

    #[test]
    fn test_read_long_csv_rejects_bad_number() {
        let data = "timestamp,asset,value\n2024-01-01,AAPL,abc\n";
        assert!(matches!(read_long_csv(data.as_bytes()), Err(DataError::Csv(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_long_csv_path("/definitely/not/here.csv"),
            Err(DataError::Io(_))
        ));
    }
}
