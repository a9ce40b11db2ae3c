//! Alignment of factor observations with forward returns.
//!
//! For each factor timestamp t the entry point is the first price timestamp at
//! or after t, moved forward by `delay` price steps; the exit point is `horizon`
//! steps after entry. Every asset in one cross-section shares that window, so
//! forward returns within a cross-section are always comparable.

use crate::config::{AlignmentConfig, ReturnKind};
use crate::error::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::AddAssign;
use tenor_data::{FactorPanel, Panel, PriceKind, PricePanel, Timestamp};
use tracing::{debug, warn};

/// Why assets were left out of a cross-section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    /// Factor value missing or non-finite
    pub missing_factor: usize,
    /// Asset has no column in the price panel
    pub missing_price_asset: usize,
    /// Entry or exit falls outside the price history
    pub alignment_gap: usize,
    /// Endpoint price missing or non-positive, or a period return missing or
    /// at or below -100%
    pub invalid_price: usize,
}

impl Exclusions {
    /// Total excluded assets.
    pub const fn total(&self) -> usize {
        self.missing_factor + self.missing_price_asset + self.alignment_gap + self.invalid_price
    }
}

impl AddAssign for Exclusions {
    fn add_assign(&mut self, rhs: Self) {
        self.missing_factor += rhs.missing_factor;
        self.missing_price_asset += rhs.missing_price_asset;
        self.alignment_gap += rhs.alignment_gap;
        self.invalid_price += rhs.invalid_price;
    }
}

/// Matched factor values and forward returns for one evaluation timestamp.
///
/// Assets are ordered by identifier. A cross-section smaller than its
/// minimum count is kept but [`is_degenerate`](Self::is_degenerate), and
/// consumers report `NaN` for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedCrossSection {
    timestamp: Timestamp,
    entry: Option<Timestamp>,
    exit: Option<Timestamp>,
    assets: Vec<String>,
    factors: Vec<f64>,
    returns: Vec<f64>,
    exclusions: Exclusions,
    min_count: usize,
}

impl AlignedCrossSection {
    /// Build a cross-section directly from matched triples.
    ///
    /// Triples are re-ordered by asset identifier.
    pub fn from_triples<S: Into<String>>(
        timestamp: Timestamp,
        triples: impl IntoIterator<Item = (S, f64, f64)>,
        min_count: usize,
    ) -> Self {
        let mut rows: Vec<(String, f64, f64)> = triples
            .into_iter()
            .map(|(asset, factor, ret)| (asset.into(), factor, ret))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let mut section = Self {
            timestamp,
            entry: None,
            exit: None,
            assets: Vec::with_capacity(rows.len()),
            factors: Vec::with_capacity(rows.len()),
            returns: Vec::with_capacity(rows.len()),
            exclusions: Exclusions::default(),
            min_count,
        };
        for (asset, factor, ret) in rows {
            section.assets.push(asset);
            section.factors.push(factor);
            section.returns.push(ret);
        }
        section
    }

    /// Evaluation timestamp.
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Price timestamp where the forward window starts (t+δ).
    pub const fn entry(&self) -> Option<Timestamp> {
        self.entry
    }

    /// Price timestamp where the forward window ends (t+δ+h).
    pub const fn exit(&self) -> Option<Timestamp> {
        self.exit
    }

    /// Asset identifiers, ascending.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Factor values, aligned with [`assets`](Self::assets).
    pub fn factor_values(&self) -> &[f64] {
        &self.factors
    }

    /// Forward returns, aligned with [`assets`](Self::assets).
    pub fn forward_returns(&self) -> &[f64] {
        &self.returns
    }

    /// `(asset, factor value, forward return)` triples.
    pub fn triples(&self) -> impl Iterator<Item = (&str, f64, f64)> + '_ {
        self.assets
            .iter()
            .zip(&self.factors)
            .zip(&self.returns)
            .map(|((a, f), r)| (a.as_str(), *f, *r))
    }

    /// Number of matched assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no asset matched.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Minimum count this cross-section was built with.
    pub const fn min_count(&self) -> usize {
        self.min_count
    }

    /// Fewer matched assets than the minimum count.
    pub fn is_degenerate(&self) -> bool {
        self.len() < self.min_count
    }

    /// Exclusion counters.
    pub const fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }
}

/// Match factor values with forward returns for every factor timestamp.
///
/// Cross-sections are computed in parallel and returned in timestamp order.
///
/// # Errors
/// Fails before processing if the configuration is invalid.
pub fn align(
    factor: &FactorPanel,
    prices: &PricePanel,
    config: &AlignmentConfig,
) -> Result<Vec<AlignedCrossSection>> {
    config.validate()?;

    // factor column -> price column
    let price_columns: Vec<Option<usize>> = factor
        .assets()
        .iter()
        .map(|asset| prices.asset_position(asset))
        .collect();

    let sections: Vec<AlignedCrossSection> = (0..factor.n_timestamps())
        .into_par_iter()
        .map(|row| cross_section(factor, prices, &price_columns, row, config))
        .collect();

    let mut exclusions = Exclusions::default();
    for section in &sections {
        exclusions += section.exclusions;
    }
    let degenerate = sections.iter().filter(|s| s.is_degenerate()).count();
    debug!(
        cross_sections = sections.len(),
        degenerate,
        delay = config.delay,
        horizon = config.horizon,
        missing_factor = exclusions.missing_factor,
        missing_price_asset = exclusions.missing_price_asset,
        alignment_gap = exclusions.alignment_gap,
        invalid_price = exclusions.invalid_price,
        "aligned factor panel"
    );
    if !sections.is_empty() && degenerate == sections.len() {
        warn!(
            cross_sections = sections.len(),
            min_count = config.min_cross_section,
            "every cross-section is below the minimum size"
        );
    }

    Ok(sections)
}

fn cross_section(
    factor: &FactorPanel,
    prices: &PricePanel,
    price_columns: &[Option<usize>],
    row: usize,
    config: &AlignmentConfig,
) -> AlignedCrossSection {
    let timestamp = factor.timestamps()[row];
    let window = prices
        .first_at_or_after(timestamp)
        .and_then(|base| base.checked_add(config.delay))
        .and_then(|entry| {
            // overflow lands past the price history like any other gap
            let exit = entry.checked_add(config.horizon)?;
            (exit < prices.n_timestamps()).then_some((entry, exit))
        });

    let mut section = AlignedCrossSection {
        timestamp,
        entry: window.map(|(entry, _)| prices.timestamps()[entry]),
        exit: window.map(|(_, exit)| prices.timestamps()[exit]),
        assets: Vec::new(),
        factors: Vec::new(),
        returns: Vec::new(),
        exclusions: Exclusions::default(),
        min_count: config.min_cross_section,
    };

    for (col, asset) in factor.assets().iter().enumerate() {
        let Some(value) = factor.get(row, col) else {
            section.exclusions.missing_factor += 1;
            continue;
        };
        let Some(price_col) = price_columns[col] else {
            section.exclusions.missing_price_asset += 1;
            continue;
        };
        let Some((entry, exit)) = window else {
            section.exclusions.alignment_gap += 1;
            continue;
        };
        let Some(ret) = forward_return(prices, price_col, entry, exit, config.return_kind) else {
            section.exclusions.invalid_price += 1;
            continue;
        };
        section.assets.push(asset.clone());
        section.factors.push(value);
        section.returns.push(ret);
    }

    section.sort_by_asset();
    section
}

impl AlignedCrossSection {
    fn sort_by_asset(&mut self) {
        if self.assets.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        let mut order: Vec<usize> = (0..self.assets.len()).collect();
        order.sort_by(|&a, &b| self.assets[a].cmp(&self.assets[b]));
        self.assets = order.iter().map(|&i| self.assets[i].clone()).collect();
        self.factors = order.iter().map(|&i| self.factors[i]).collect();
        self.returns = order.iter().map(|&i| self.returns[i]).collect();
    }
}

/// Forward return of one asset between two price rows.
pub fn forward_return(
    prices: &PricePanel,
    col: usize,
    entry: usize,
    exit: usize,
    kind: ReturnKind,
) -> Option<f64> {
    match prices.kind() {
        PriceKind::Price => price_return(prices.panel(), col, entry, exit, kind),
        PriceKind::Return => compounded_return(prices.panel(), col, entry, exit, kind),
    }
}

fn price_return(
    panel: &Panel,
    col: usize,
    entry: usize,
    exit: usize,
    kind: ReturnKind,
) -> Option<f64> {
    let p0 = panel.get(entry, col).filter(|p| *p > 0.0)?;
    let p1 = panel.get(exit, col).filter(|p| *p > 0.0)?;
    Some(match kind {
        ReturnKind::Simple => p1 / p0 - 1.0,
        ReturnKind::Log => p1.ln() - p0.ln(),
    })
}

fn compounded_return(
    panel: &Panel,
    col: usize,
    entry: usize,
    exit: usize,
    kind: ReturnKind,
) -> Option<f64> {
    let mut log_growth = 0.0;
    let mut growth = 1.0;
    for row in entry + 1..=exit {
        let r = panel.get(row, col).filter(|r| *r > -1.0)?;
        growth *= 1.0 + r;
        log_growth += r.ln_1p();
    }
    Some(match kind {
        ReturnKind::Simple => growth - 1.0,
        ReturnKind::Log => log_growth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveTime};

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn prices() -> PricePanel {
        PricePanel::from_observations(
            vec![
                (day(1), "A", 10.0),
                (day(2), "A", 11.0),
                (day(3), "A", 12.1),
                (day(4), "A", 13.31),
                (day(1), "B", 20.0),
                (day(2), "B", 19.0),
                (day(3), "B", 0.0),
                (day(4), "B", 18.0),
                (day(1), "C", 5.0),
                (day(2), "C", 5.5),
                (day(3), "C", 6.0),
                (day(4), "C", 6.5),
            ],
            PriceKind::Price,
        )
        .unwrap()
    }

    fn factor() -> FactorPanel {
        FactorPanel::from_observations(vec![
            (day(1), "A", 0.3),
            (day(1), "B", 0.1),
            (day(1), "C", 0.2),
            (day(1), "D", 0.9),
            (day(2), "A", f64::NAN),
            (day(2), "B", 0.4),
            (day(2), "C", 0.5),
            (day(4), "A", 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_simple_forward_returns() {
        let config = AlignmentConfig::default();
        let sections = align(&factor(), &prices(), &config).unwrap();
        assert_eq!(sections.len(), 3);

        let first = &sections[0];
        assert_eq!(first.entry(), Some(day(1)));
        assert_eq!(first.exit(), Some(day(2)));
        assert_eq!(first.assets(), &["A", "B", "C"]);
        assert_relative_eq!(first.forward_returns()[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(first.forward_returns()[1], -0.05, epsilon = 1e-12);
        assert_relative_eq!(first.forward_returns()[2], 0.1, epsilon = 1e-12);
        assert_eq!(first.exclusions().missing_price_asset, 1);
        assert!(!first.is_degenerate());
    }

    #[test]
    fn test_non_positive_price_excludes_asset() {
        let sections = align(&factor(), &prices(), &AlignmentConfig::default()).unwrap();
        let second = &sections[1];
        // A and D have no factor value, B exit price is zero
        assert_eq!(second.assets(), &["C"]);
        assert_eq!(second.exclusions().missing_factor, 2);
        assert_eq!(second.exclusions().invalid_price, 1);
        assert!(second.is_degenerate());
    }

    #[test]
    fn test_window_beyond_history_is_a_gap() {
        let sections = align(&factor(), &prices(), &AlignmentConfig::default()).unwrap();
        let last = &sections[2];
        assert!(last.is_empty());
        assert_eq!(last.entry(), None);
        assert_eq!(last.exclusions().alignment_gap, 1);
    }

    #[test]
    fn test_delay_and_log_returns() {
        let config = AlignmentConfig {
            delay: 1,
            horizon: 2,
            return_kind: ReturnKind::Log,
            min_cross_section: 2,
        };
        let sections = align(&factor(), &prices(), &config).unwrap();
        let first = &sections[0];
        assert_eq!(first.entry(), Some(day(2)));
        assert_eq!(first.exit(), Some(day(4)));
        assert_eq!(first.assets(), &["A", "B", "C"]);
        assert_relative_eq!(first.forward_returns()[0], 1.21f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(
            first.forward_returns()[2],
            6.5f64.ln() - 5.5f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_return_panel_compounds() {
        let returns = PricePanel::from_observations(
            vec![
                (day(1), "A", f64::NAN),
                (day(2), "A", 0.1),
                (day(3), "A", 0.1),
                (day(1), "B", f64::NAN),
                (day(2), "B", -0.5),
                (day(3), "B", f64::NAN),
            ],
            PriceKind::Return,
        )
        .unwrap();
        let factor = FactorPanel::from_observations(vec![(day(1), "A", 1.0), (day(1), "B", 2.0)])
            .unwrap();
        let config = AlignmentConfig {
            horizon: 2,
            min_cross_section: 2,
            ..Default::default()
        };
        let sections = align(&factor, &returns, &config).unwrap();
        assert_eq!(sections[0].assets(), &["A"]);
        assert_relative_eq!(sections[0].forward_returns()[0], 0.21, epsilon = 1e-12);
        assert_eq!(sections[0].exclusions().invalid_price, 1);
    }

    #[test]
    fn test_signal_between_price_timestamps_uses_next_price() {
        let prices = PricePanel::from_observations(
            vec![
                (day(1), "A", 1.0),
                (day(3), "A", 2.0),
                (day(5), "A", 3.0),
            ],
            PriceKind::Price,
        )
        .unwrap();
        let factor = FactorPanel::from_observations(vec![(day(2), "A", 1.0)]).unwrap();
        let config = AlignmentConfig {
            min_cross_section: 2,
            ..Default::default()
        };
        let sections = align(&factor, &prices, &config).unwrap();
        assert_eq!(sections[0].entry(), Some(day(3)));
        assert_eq!(sections[0].exit(), Some(day(5)));
        assert_relative_eq!(sections[0].forward_returns()[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_overflowing_window_is_a_gap() {
        let overflowing = [
            AlignmentConfig {
                delay: usize::MAX,
                ..Default::default()
            },
            AlignmentConfig {
                delay: 1,
                horizon: usize::MAX,
                ..Default::default()
            },
        ];
        for config in overflowing {
            let sections = align(&factor(), &prices(), &config).unwrap();
            assert_eq!(sections.len(), 3);
            for section in &sections {
                assert!(section.is_empty());
                assert_eq!(section.entry(), None);
                assert_eq!(section.exit(), None);
            }
            assert_eq!(sections[0].exclusions().alignment_gap, 3);
            assert_eq!(sections[1].exclusions().alignment_gap, 2);
        }
    }

    #[test]
    fn test_invalid_horizon_fails_before_processing() {
        let config = AlignmentConfig {
            horizon: 0,
            ..Default::default()
        };
        assert!(matches!(
            align(&factor(), &prices(), &config),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_triples_orders_by_asset() {
        let section =
            AlignedCrossSection::from_triples(day(1), vec![("Z", 1.0, 0.1), ("A", 2.0, 0.2)], 3);
        assert_eq!(section.assets(), &["A", "Z"]);
        assert_eq!(section.factor_values(), &[2.0, 1.0]);
        assert!(section.is_degenerate());
    }
}
