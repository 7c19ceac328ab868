//! Collected data shared by all analysis stages

use advisor_core::{CompanyProfile, MacroSnapshot, NewsItem, PriceSeries, TimeHorizon};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything data collection produced for one session
///
/// Stages only read from the snapshot, so it can be shared across
/// concurrently running stages behind an `Arc`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSnapshot {
    /// Symbols requested by the caller, in request order
    pub symbols: Vec<String>,
    pub time_horizon: TimeHorizon,
    pub prices: BTreeMap<String, PriceSeries>,
    pub companies: BTreeMap<String, CompanyProfile>,
    pub macro_indicators: MacroSnapshot,
    pub news: BTreeMap<String, Vec<NewsItem>>,
}

/// Short description of one symbol's price history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub data_points: usize,
    pub latest_price: f64,
    pub date_range: String,
}

impl DataSnapshot {
    pub fn new(symbols: Vec<String>, time_horizon: TimeHorizon) -> Self {
        Self {
            symbols,
            time_horizon,
            ..Self::default()
        }
    }

    /// Closing prices for `symbol`, if collected
    pub fn closes(&self, symbol: &str) -> Option<Vec<f64>> {
        self.prices.get(symbol).map(PriceSeries::closes)
    }

    /// Requested symbols that have price data, in request order
    pub fn symbols_with_prices(&self) -> Vec<&str> {
        self.symbols
            .iter()
            .filter(|s| self.prices.contains_key(s.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Summaries for every collected price series, benchmark included
    pub fn price_summaries(&self) -> BTreeMap<String, PriceSummary> {
        self.prices
            .iter()
            .map(|(symbol, series)| {
                let summary = PriceSummary {
                    data_points: series.len(),
                    latest_price: series.latest().close,
                    date_range: format!(
                        "{} to {}",
                        series.first_timestamp().format("%Y-%m-%d"),
                        series.last_timestamp().format("%Y-%m-%d")
                    ),
                };
                (symbol.clone(), summary)
            })
            .collect()
    }
}
