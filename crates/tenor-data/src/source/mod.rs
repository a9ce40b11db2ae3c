//! Panel sources.
//!
//! Both sources read long-format observations (one row per timestamp and
//! asset) and hand them to [`PanelBuilder`](crate::PanelBuilder).

pub mod delimited;
pub mod frame;

pub use delimited::{read_long_csv, read_long_csv_path};
pub use frame::{LongFrameColumns, observations_from_frame};

use crate::panel::Timestamp;

/// One long-format observation.
pub type Observation = (Timestamp, String, f64);
