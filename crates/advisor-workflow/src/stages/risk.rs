//! Per-symbol risk profiles and portfolio correlation

use super::{require_prices, round2};
use crate::config::WorkflowConfig;
use crate::snapshot::DataSnapshot;
use advisor_analytics::risk::{self, correlation_matrix};
use advisor_analytics::{CorrelationMatrix, Diversification, RiskLevel, RiskProfile};
use advisor_core::Result;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl Rating {
    fn sharpe(value: f64) -> Self {
        if value > 1.5 {
            Self::Excellent
        } else if value > 1.0 {
            Self::Good
        } else if value > 0.5 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }

    fn sortino(value: f64) -> Self {
        if value > 2.0 {
            Self::Excellent
        } else if value > 1.0 {
            Self::Good
        } else if value > 0.5 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSensitivity {
    Defensive,
    Neutral,
    Aggressive,
}

impl MarketSensitivity {
    fn from_beta(beta: f64) -> Self {
        if beta < 0.8 {
            Self::Defensive
        } else if beta < 1.2 {
            Self::Neutral
        } else {
            Self::Aggressive
        }
    }
}

/// Risk profile plus readable interpretations
#[derive(Debug, Clone, Serialize)]
pub struct SymbolRisk {
    #[serde(flatten)]
    pub profile: RiskProfile,
    pub sharpe_rating: Rating,
    pub sortino_rating: Rating,
    pub market_sensitivity: Option<MarketSensitivity>,
    pub drawdown_level: RiskLevel,
    pub volatility_pct: f64,
    pub max_drawdown_pct: f64,
}

/// Output of the risk stage
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub symbols: BTreeMap<String, SymbolRisk>,
    pub benchmark: Option<String>,
    pub correlations: CorrelationMatrix,
    pub diversification: Diversification,
    pub diversification_note: String,
    pub summary: String,
}

/// Profile every requested symbol with prices and correlate them
pub fn analyze(snapshot: &DataSnapshot, config: &WorkflowConfig) -> Result<RiskReport> {
    let available = require_prices(snapshot)?;
    let params = config.risk_params();
    let benchmark = snapshot.closes(&config.benchmark_symbol);

    let mut closes_by_symbol: Vec<(&str, Vec<f64>)> = Vec::with_capacity(available.len());
    for symbol in available {
        if let Some(closes) = snapshot.closes(symbol) {
            closes_by_symbol.push((symbol, closes));
        }
    }

    let mut symbols = BTreeMap::new();
    for (symbol, closes) in &closes_by_symbol {
        let mut profile = RiskProfile::compute(*symbol, closes, None, &params);
        // Histories of different length are compared over their common tail
        profile.beta = benchmark.as_deref().map(|market| {
            let n = closes.len().min(market.len());
            risk::beta(&closes[closes.len() - n..], &market[market.len() - n..])
        });

        let interpreted = SymbolRisk {
            sharpe_rating: Rating::sharpe(profile.sharpe),
            sortino_rating: Rating::sortino(profile.sortino),
            market_sensitivity: profile.beta.map(MarketSensitivity::from_beta),
            drawdown_level: RiskLevel::from_drawdown(profile.drawdown.max_drawdown),
            volatility_pct: round2(profile.volatility * 100.0),
            max_drawdown_pct: round2(profile.drawdown.max_drawdown * 100.0),
            profile,
        };
        symbols.insert((*symbol).to_string(), interpreted);
    }

    let correlations = correlation_matrix(
        closes_by_symbol
            .iter()
            .map(|(symbol, closes)| (*symbol, closes.as_slice())),
    );
    let diversification = Diversification::assess(&correlations);

    let high_risk: Vec<&str> = symbols
        .iter()
        .filter(|(_, r)| r.profile.risk_level == RiskLevel::High)
        .map(|(s, _)| s.as_str())
        .collect();
    let summary = if high_risk.is_empty() {
        format!("Risk analysis complete for {} symbols. No high-risk assets.", symbols.len())
    } else {
        format!(
            "Risk analysis complete for {} symbols. High risk: {}.",
            symbols.len(),
            high_risk.join(", ")
        )
    };

    Ok(RiskReport {
        symbols,
        benchmark: benchmark.map(|_| config.benchmark_symbol.clone()),
        correlations,
        diversification,
        diversification_note: diversification.note().to_string(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{PricePoint, PriceSeries, TimeHorizon};
    use chrono::{Duration, TimeZone, Utc};

    fn wave(n: usize, amplitude: f64, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + amplitude * (i as f64 * 0.3 + phase).sin() + i as f64 * 0.05)
            .collect()
    }

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(start + Duration::days(i as i64), *c, *c, *c, *c, 0.0))
            .collect();
        PriceSeries::new(symbol, points).unwrap()
    }

    fn snapshot(data: &[(&str, Vec<f64>)], requested: &[&str]) -> DataSnapshot {
        let mut snapshot = DataSnapshot::new(
            requested.iter().map(|s| (*s).to_string()).collect(),
            TimeHorizon::Medium,
        );
        for (symbol, closes) in data {
            snapshot.prices.insert((*symbol).to_string(), series(symbol, closes));
        }
        snapshot
    }

    #[test]
    fn test_benchmark_beta_uses_common_tail() {
        let market = wave(200, 2.0, 0.0);
        let asset = market[50..].to_vec();
        let snapshot = snapshot(&[("SPY", market), ("AAPL", asset)], &["AAPL"]);

        let report = analyze(&snapshot, &WorkflowConfig::default()).unwrap();
        let aapl = &report.symbols["AAPL"];
        assert!((aapl.profile.beta.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(aapl.market_sensitivity, Some(MarketSensitivity::Neutral));
        assert_eq!(report.benchmark.as_deref(), Some("SPY"));
        // benchmark is not part of the requested set
        assert!(report.correlations.is_empty());
        assert_eq!(report.diversification, Diversification::Unknown);
    }

    #[test]
    fn test_no_benchmark_leaves_beta_empty() {
        let snapshot = snapshot(
            &[("AAPL", wave(120, 2.0, 0.0)), ("MSFT", wave(120, 2.0, 0.5))],
            &["AAPL", "MSFT", "NOPE"],
        );

        let report = analyze(&snapshot, &WorkflowConfig::default()).unwrap();
        assert_eq!(report.symbols.len(), 2);
        assert!(report.benchmark.is_none());
        assert!(report.symbols["MSFT"].profile.beta.is_none());
        assert!(report.symbols["MSFT"].market_sensitivity.is_none());
        assert_eq!(report.correlations["AAPL"]["AAPL"], 1.0);
        assert_ne!(report.diversification, Diversification::Unknown);
        assert_eq!(report.diversification_note, report.diversification.note());
    }

    #[test]
    fn test_volatile_asset_flagged() {
        let snapshot = snapshot(&[("COIN", wave(120, 20.0, 0.0))], &["COIN"]);
        let report = analyze(&snapshot, &WorkflowConfig::default()).unwrap();

        let coin = &report.symbols["COIN"];
        assert_eq!(coin.profile.risk_level, RiskLevel::High);
        assert!(report.summary.contains("High risk: COIN"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["symbols"]["COIN"]["risk_level"], "high");
        assert!(json["symbols"]["COIN"]["var"]["cvar"].is_number());
    }
}
