//! Risk metrics computed from price sequences
//!
//! All metrics work on log returns of the input prices. Degenerate input
//! (too few points, zero variance) yields a documented default rather than
//! NaN; the only non-finite value ever produced is the `+inf` Sortino ratio
//! of a series that never lost money while beating the risk-free rate.

use crate::series::{log_returns, mean, percentile, population_std};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum number of returns for a historical VaR estimate
pub const MIN_VAR_OBSERVATIONS: usize = 30;

/// Symmetric pairwise correlations keyed by symbol
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, f64>>;

/// Annualized volatility of log returns; 0 with fewer than two prices
pub fn volatility(prices: &[f64], periods_per_year: usize) -> f64 {
    let rets = log_returns(prices);
    if rets.is_empty() {
        return 0.0;
    }
    population_std(&rets) * (periods_per_year as f64).sqrt()
}

/// Historical Value at Risk and expected shortfall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    /// Loss threshold at `confidence`, scaled by `sqrt(horizon)`
    pub var: f64,
    /// Mean one-period return beyond the threshold, as a positive loss
    pub cvar: f64,
    pub confidence: f64,
    pub horizon: usize,
    pub worst_day: f64,
    pub best_day: f64,
}

impl VarEstimate {
    fn empty(confidence: f64, horizon: usize) -> Self {
        Self {
            var: 0.0,
            cvar: 0.0,
            confidence,
            horizon,
            worst_day: 0.0,
            best_day: 0.0,
        }
    }
}

/// Historical-method VaR/CVaR
///
/// VaR is scaled by `sqrt(horizon)`; CVaR is the mean of the one-period
/// tail returns and does not depend on the horizon.
///
/// Fewer than [`MIN_VAR_OBSERVATIONS`] returns produce an all-zero estimate.
pub fn value_at_risk(prices: &[f64], confidence: f64, horizon: usize) -> VarEstimate {
    let rets = log_returns(prices);
    if rets.len() < MIN_VAR_OBSERVATIONS {
        return VarEstimate::empty(confidence, horizon);
    }

    let Some(threshold) = percentile(&rets, (1.0 - confidence) * 100.0) else {
        return VarEstimate::empty(confidence, horizon);
    };
    let scale = (horizon as f64).sqrt();

    let tail: Vec<f64> = rets.iter().copied().filter(|r| *r <= threshold).collect();
    let shortfall = if tail.is_empty() { threshold } else { mean(&tail) };

    let worst_day = rets.iter().copied().fold(f64::INFINITY, f64::min);
    let best_day = rets.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    VarEstimate {
        var: (threshold * scale).abs(),
        cvar: shortfall.abs(),
        confidence,
        horizon,
        worst_day,
        best_day,
    }
}

/// Largest peak-to-trough decline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Positive fraction of the peak, e.g. 0.25 for a 25% decline
    pub max_drawdown: f64,
    pub peak_index: usize,
    pub trough_index: usize,
}

/// Maximum drawdown; zeros with fewer than two prices
///
/// Ties resolve to the earliest trough and the earliest peak before it.
pub fn max_drawdown(prices: &[f64]) -> Drawdown {
    if prices.len() < 2 {
        return Drawdown::default();
    }

    let mut running_max = prices[0];
    let mut running_max_index = 0;
    let mut worst = Drawdown::default();
    let mut worst_dd = 0.0_f64;

    for (i, &price) in prices.iter().enumerate() {
        if price > running_max {
            running_max = price;
            running_max_index = i;
        }
        if running_max <= 0.0 {
            continue;
        }
        let dd = (price - running_max) / running_max;
        if dd < worst_dd {
            worst_dd = dd;
            worst = Drawdown {
                max_drawdown: dd.abs(),
                peak_index: running_max_index,
                trough_index: i,
            };
        }
    }

    worst
}

/// Annualized Sharpe ratio; 0 when volatility is zero or data is insufficient
pub fn sharpe_ratio(prices: &[f64], risk_free_rate: f64, periods_per_year: usize) -> f64 {
    let rets = log_returns(prices);
    if rets.len() < 2 {
        return 0.0;
    }
    let periods = periods_per_year as f64;
    let vol = population_std(&rets) * periods.sqrt();
    if vol == 0.0 {
        return 0.0;
    }
    (mean(&rets) * periods - risk_free_rate) / vol
}

/// Annualized Sortino ratio using the deviation of negative returns only
///
/// With no negative returns the ratio is `+inf` when the annualized mean
/// beats `risk_free_rate`, otherwise 0.
pub fn sortino_ratio(prices: &[f64], risk_free_rate: f64, periods_per_year: usize) -> f64 {
    let rets = log_returns(prices);
    if rets.len() < 2 {
        return 0.0;
    }
    let periods = periods_per_year as f64;
    let annual_mean = mean(&rets) * periods;

    let downside: Vec<f64> = rets.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return if annual_mean > risk_free_rate {
            f64::INFINITY
        } else {
            0.0
        };
    }

    let downside_dev = population_std(&downside) * periods.sqrt();
    if downside_dev == 0.0 {
        return 0.0;
    }
    (annual_mean - risk_free_rate) / downside_dev
}

/// Beta of `asset` against `market`
///
/// Covariance and variance both use the population divisor so that a series
/// against itself is exactly 1. Mismatched lengths, fewer than two returns or
/// a flat market all default to 1.0.
pub fn beta(asset: &[f64], market: &[f64]) -> f64 {
    let asset_rets = log_returns(asset);
    let market_rets = log_returns(market);
    if asset_rets.len() != market_rets.len() || asset_rets.len() < 2 {
        return 1.0;
    }

    let asset_mean = mean(&asset_rets);
    let market_mean = mean(&market_rets);
    let n = asset_rets.len() as f64;

    let covariance = asset_rets
        .iter()
        .zip(&market_rets)
        .map(|(a, m)| (a - asset_mean) * (m - market_mean))
        .sum::<f64>()
        / n;
    let market_var = market_rets
        .iter()
        .map(|m| (m - market_mean).powi(2))
        .sum::<f64>()
        / n;

    if market_var == 0.0 {
        return 1.0;
    }
    covariance / market_var
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mx) * (b - my);
        var_x += (a - mx).powi(2);
        var_y += (b - my).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// Pearson correlation of log returns across symbols
///
/// Return series are aligned on their most recent values and truncated to
/// the shortest one. Series without finite returns are skipped. Fewer than
/// two usable series, or a common length below two, give an empty matrix.
pub fn correlation_matrix<'a, I>(series: I) -> CorrelationMatrix
where
    I: IntoIterator<Item = (&'a str, &'a [f64])>,
{
    let usable: Vec<(&str, Vec<f64>)> = series
        .into_iter()
        .map(|(symbol, prices)| (symbol, log_returns(prices)))
        .filter(|(_, rets)| !rets.is_empty() && rets.iter().all(|r| r.is_finite()))
        .collect();

    let Some(common) = usable.iter().map(|(_, rets)| rets.len()).min() else {
        return CorrelationMatrix::new();
    };
    if usable.len() < 2 || common < 2 {
        return CorrelationMatrix::new();
    }

    let aligned: Vec<(&str, &[f64])> = usable
        .iter()
        .map(|(symbol, rets)| (*symbol, &rets[rets.len() - common..]))
        .collect();

    let mut matrix = CorrelationMatrix::new();
    for (sym_a, rets_a) in &aligned {
        let row = matrix.entry((*sym_a).to_string()).or_default();
        for (sym_b, rets_b) in &aligned {
            let value = if sym_a == sym_b {
                1.0
            } else {
                pearson(rets_a, rets_b)
            };
            row.insert((*sym_b).to_string(), value);
        }
    }
    matrix
}

/// Blend volatility, drawdown and daily VaR into a 0-100 score (higher is riskier)
///
/// Weights are 40/35/25 with caps at 50% volatility, 50% drawdown and 10% VaR.
pub fn risk_score(volatility: f64, max_drawdown: f64, var: f64) -> f64 {
    let vol_score = (volatility / 0.5 * 100.0).clamp(0.0, 100.0);
    let dd_score = (max_drawdown / 0.5 * 100.0).clamp(0.0, 100.0);
    let var_score = (var / 0.10 * 100.0).clamp(0.0, 100.0);
    vol_score * 0.4 + dd_score * 0.35 + var_score * 0.25
}

/// Coarse risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Annualized volatility below 15% is low, below 30% moderate
    pub fn from_volatility(volatility: f64) -> Self {
        Self::bucket(volatility)
    }

    /// Drawdowns use the same 15% / 30% cut points
    pub fn from_drawdown(max_drawdown: f64) -> Self {
        Self::bucket(max_drawdown)
    }

    fn bucket(value: f64) -> Self {
        if value < 0.15 {
            Self::Low
        } else if value < 0.30 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Parameters shared by the risk computations of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub risk_free_rate: f64,
    pub periods_per_year: usize,
    pub var_confidence: f64,
    pub var_horizon: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            periods_per_year: 252,
            var_confidence: 0.95,
            var_horizon: 1,
        }
    }
}

/// Full risk picture for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub symbol: String,
    pub volatility: f64,
    pub var: VarEstimate,
    pub drawdown: Drawdown,
    pub sharpe: f64,
    /// `+inf` serializes as JSON `null`
    pub sortino: f64,
    /// Absent when no benchmark series was supplied
    pub beta: Option<f64>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

impl RiskProfile {
    /// Compute every metric for `prices`, with beta against `benchmark` when given
    pub fn compute(
        symbol: impl Into<String>,
        prices: &[f64],
        benchmark: Option<&[f64]>,
        params: &RiskParams,
    ) -> Self {
        let volatility = volatility(prices, params.periods_per_year);
        let var = value_at_risk(prices, params.var_confidence, params.var_horizon);
        let drawdown = max_drawdown(prices);

        Self {
            symbol: symbol.into(),
            volatility,
            var,
            drawdown,
            sharpe: sharpe_ratio(prices, params.risk_free_rate, params.periods_per_year),
            sortino: sortino_ratio(prices, params.risk_free_rate, params.periods_per_year),
            beta: benchmark.map(|market| beta(prices, market)),
            risk_score: risk_score(volatility, drawdown.max_drawdown, var.var),
            risk_level: RiskLevel::from_volatility(volatility),
        }
    }
}

/// How spread out a set of holdings is, judged by average absolute correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diversification {
    Well,
    Moderate,
    Poor,
    Unknown,
}

impl Diversification {
    pub fn assess(matrix: &CorrelationMatrix) -> Self {
        if matrix.len() < 2 {
            return Self::Unknown;
        }

        let symbols: Vec<&String> = matrix.keys().collect();
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, a) in symbols.iter().enumerate() {
            for b in &symbols[i + 1..] {
                total += matrix[*a].get(*b).copied().unwrap_or(0.0).abs();
                pairs += 1;
            }
        }

        let avg = total / pairs as f64;
        if avg < 0.3 {
            Self::Well
        } else if avg < 0.6 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }

    pub fn note(self) -> &'static str {
        match self {
            Self::Well => "Well diversified - low correlation between assets",
            Self::Moderate => "Moderately diversified - some correlation between assets",
            Self::Poor => "Poorly diversified - high correlation between assets",
            Self::Unknown => "Need multiple assets to assess diversification",
        }
    }
}
