//! Configuration for analysis workflow runs

use advisor_analytics::{LevelParams, RiskParams};
use advisor_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Symbols treated as crypto assets (no company fundamentals)
pub const DEFAULT_CRYPTO_SYMBOLS: [&str; 15] = [
    "BTC", "ETH", "BNB", "SOL", "XRP", "ADA", "DOGE", "DOT", "MATIC", "LINK", "AVAX", "UNI", "ATOM",
    "LTC", "FIL",
];

/// Configuration for an analysis workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Market benchmark used for beta
    pub benchmark_symbol: String,

    /// Annual risk-free rate for Sharpe/Sortino
    pub risk_free_rate: f64,

    /// Return periods per year used for annualization
    pub periods_per_year: usize,

    /// VaR confidence level, strictly between 0 and 1
    pub var_confidence: f64,

    /// VaR horizon in periods
    pub var_horizon: usize,

    /// Look-around window for support/resistance detection
    pub level_window: usize,

    /// Relative merge distance for support/resistance clusters
    pub level_threshold: f64,

    /// Run the five analysis stages concurrently
    pub parallel_stages: bool,

    /// Symbols skipped by company-profile collection and fundamental analysis
    pub crypto_symbols: BTreeSet<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            benchmark_symbol: "SPY".to_string(),
            risk_free_rate: 0.05,
            periods_per_year: 252,
            var_confidence: 0.95,
            var_horizon: 1,
            level_window: 10,
            level_threshold: 0.02,
            parallel_stages: false,
            crypto_symbols: DEFAULT_CRYPTO_SYMBOLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl WorkflowConfig {
    /// Create a new configuration builder
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.benchmark_symbol.trim().is_empty() {
            return Err(Error::Config("benchmark_symbol must not be empty".to_string()));
        }

        let confidence = self.var_confidence;
        if confidence.is_nan() || confidence <= 0.0 || confidence >= 1.0 {
            return Err(Error::Config(
                "var_confidence must lie strictly between 0 and 1".to_string(),
            ));
        }

        if self.var_horizon == 0 {
            return Err(Error::Config("var_horizon must be greater than 0".to_string()));
        }

        if self.periods_per_year == 0 {
            return Err(Error::Config(
                "periods_per_year must be greater than 0".to_string(),
            ));
        }

        if self.level_window == 0 {
            return Err(Error::Config("level_window must be greater than 0".to_string()));
        }

        if self.level_threshold <= 0.0 {
            return Err(Error::Config(
                "level_threshold must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `symbol` is configured as a crypto asset
    pub fn is_crypto(&self, symbol: &str) -> bool {
        self.crypto_symbols.contains(&symbol.to_uppercase())
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            risk_free_rate: self.risk_free_rate,
            periods_per_year: self.periods_per_year,
            var_confidence: self.var_confidence,
            var_horizon: self.var_horizon,
        }
    }

    pub fn level_params(&self) -> LevelParams {
        LevelParams {
            window: self.level_window,
            threshold: self.level_threshold,
        }
    }
}

/// Builder for WorkflowConfig
#[derive(Debug, Default)]
pub struct WorkflowConfigBuilder {
    benchmark_symbol: Option<String>,
    risk_free_rate: Option<f64>,
    periods_per_year: Option<usize>,
    var_confidence: Option<f64>,
    var_horizon: Option<usize>,
    level_window: Option<usize>,
    level_threshold: Option<f64>,
    parallel_stages: Option<bool>,
    crypto_symbols: Option<BTreeSet<String>>,
}

impl WorkflowConfigBuilder {
    /// Set the benchmark symbol
    pub fn benchmark_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.benchmark_symbol = Some(symbol.into().to_uppercase());
        self
    }

    /// Set the annual risk-free rate
    pub fn risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    /// Set periods per year
    pub fn periods_per_year(mut self, periods: usize) -> Self {
        self.periods_per_year = Some(periods);
        self
    }

    /// Set VaR confidence
    pub fn var_confidence(mut self, confidence: f64) -> Self {
        self.var_confidence = Some(confidence);
        self
    }

    /// Set VaR horizon
    pub fn var_horizon(mut self, horizon: usize) -> Self {
        self.var_horizon = Some(horizon);
        self
    }

    /// Set support/resistance window
    pub fn level_window(mut self, window: usize) -> Self {
        self.level_window = Some(window);
        self
    }

    /// Set support/resistance merge threshold
    pub fn level_threshold(mut self, threshold: f64) -> Self {
        self.level_threshold = Some(threshold);
        self
    }

    /// Enable or disable concurrent stage execution
    pub fn parallel_stages(mut self, parallel: bool) -> Self {
        self.parallel_stages = Some(parallel);
        self
    }

    /// Replace the crypto symbol set
    pub fn crypto_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crypto_symbols = Some(
            symbols
                .into_iter()
                .map(|s| s.into().to_uppercase())
                .collect(),
        );
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<WorkflowConfig> {
        let defaults = WorkflowConfig::default();

        let config = WorkflowConfig {
            benchmark_symbol: self.benchmark_symbol.unwrap_or(defaults.benchmark_symbol),
            risk_free_rate: self.risk_free_rate.unwrap_or(defaults.risk_free_rate),
            periods_per_year: self.periods_per_year.unwrap_or(defaults.periods_per_year),
            var_confidence: self.var_confidence.unwrap_or(defaults.var_confidence),
            var_horizon: self.var_horizon.unwrap_or(defaults.var_horizon),
            level_window: self.level_window.unwrap_or(defaults.level_window),
            level_threshold: self.level_threshold.unwrap_or(defaults.level_threshold),
            parallel_stages: self.parallel_stages.unwrap_or(defaults.parallel_stages),
            crypto_symbols: self.crypto_symbols.unwrap_or(defaults.crypto_symbols),
        };

        config.validate()?;
        Ok(config)
    }
}
