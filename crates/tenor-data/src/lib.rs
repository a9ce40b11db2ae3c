//! Panel data model for the Tenor factor evaluation engine.
//!
//! Factor signals and prices arrive as time × asset panels. This crate owns
//! their in-memory representation and the loaders that build them from
//! long-format CSV files or polars DataFrames. Evaluation crates only borrow
//! the panels.
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tenor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod panel;
pub mod source;
pub mod subperiod;

pub use error::{DataError, Result};
pub use panel::{FactorPanel, Panel, PanelBuilder, PriceKind, PricePanel, Timestamp, parse_timestamp};
pub use source::{LongFrameColumns, Observation};
pub use subperiod::SubPeriodPanel;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
