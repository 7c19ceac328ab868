//! Quantitative analytics for the advisor workspace
//!
//! Pure functions over ordered price sequences:
//!
//! - [`series`]: moving averages, RSI, MACD, Bollinger bands, ATR, returns
//! - [`risk`]: volatility, VaR/CVaR, drawdown, Sharpe/Sortino, beta, correlation
//! - [`levels`]: support/resistance detection
//! - [`signals`]: indicator sub-signals and their aggregation
//!
//! Short input never panics or errors; each function documents the empty or
//! default value it returns instead.

pub mod levels;
pub mod risk;
pub mod series;
pub mod signals;

pub use levels::{Level, LevelKind, LevelParams, detect_levels, nearest_levels};
pub use risk::{
    CorrelationMatrix, Diversification, Drawdown, RiskLevel, RiskParams, RiskProfile, VarEstimate,
};
pub use series::{BollingerBands, Macd, RsiZone, TrendStrength};
pub use signals::{
    Confidence, SignalDirection, SignalSummary, TechnicalSignal, aggregate, aggregate_signals,
    technical_signals,
};
