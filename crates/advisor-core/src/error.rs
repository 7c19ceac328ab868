//! Error types shared across the advisor workspace

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for data handling, stage execution and workflow bookkeeping
///
/// Indicator and risk functions never return this type: insufficient or
/// degenerate input is answered with documented empty/default values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A price series violated its construction invariants
    #[error("Invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    /// Symbol is empty or otherwise unusable
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// The data source as a whole cannot serve requests
    ///
    /// Unlike [`Error::DataUnavailable`], this is not scoped to one symbol and
    /// aborts data collection.
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// A phase record was asked to move backwards or skip a state
    #[error("Invalid phase transition for {phase}: {from} -> {to}")]
    InvalidTransition {
        phase: String,
        from: String,
        to: String,
    },

    /// An analysis stage could not produce a result
    #[error("Stage {phase} failed: {reason}")]
    Stage { phase: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Shorthand for [`Error::DataUnavailable`]
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error should escape per-symbol isolation
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }
}
