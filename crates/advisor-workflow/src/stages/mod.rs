//! The five analysis stages
//!
//! Each stage reads the shared [`DataSnapshot`], builds a typed report and
//! hands it back as JSON for the session's result map.

pub mod fundamental;
pub mod macroeconomic;
pub mod risk;
pub mod sentiment;
pub mod technical;

use crate::config::WorkflowConfig;
use crate::session::AnalysisPhase;
use crate::snapshot::DataSnapshot;
use advisor_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Analysis stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Macro,
    Technical,
    Fundamental,
    Risk,
    Sentiment,
}

impl StageKind {
    /// Canonical execution order
    pub const ALL: [StageKind; 5] = [
        Self::Macro,
        Self::Technical,
        Self::Fundamental,
        Self::Risk,
        Self::Sentiment,
    ];

    pub fn phase(self) -> AnalysisPhase {
        match self {
            Self::Macro => AnalysisPhase::Macro,
            Self::Technical => AnalysisPhase::Technical,
            Self::Fundamental => AnalysisPhase::Fundamental,
            Self::Risk => AnalysisPhase::Risk,
            Self::Sentiment => AnalysisPhase::Sentiment,
        }
    }

    pub fn name(self) -> &'static str {
        self.phase().as_str()
    }

    /// Run this stage over `snapshot`
    pub fn run(self, snapshot: &DataSnapshot, config: &WorkflowConfig) -> Result<Value> {
        let value = match self {
            Self::Macro => serde_json::to_value(macroeconomic::analyze(snapshot))?,
            Self::Technical => serde_json::to_value(technical::analyze(snapshot, config)?)?,
            Self::Fundamental => serde_json::to_value(fundamental::analyze(snapshot, config))?,
            Self::Risk => serde_json::to_value(risk::analyze(snapshot, config)?)?,
            Self::Sentiment => serde_json::to_value(sentiment::analyze(snapshot))?,
        };
        Ok(value)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fail with `DataUnavailable` when none of the requested symbols has prices
pub(crate) fn require_prices(snapshot: &DataSnapshot) -> Result<Vec<&str>> {
    let symbols = snapshot.symbols_with_prices();
    if symbols.is_empty() {
        return Err(Error::data_unavailable(
            snapshot.symbols.join(","),
            "no price history collected",
        ));
    }
    Ok(symbols)
}

/// Round to two decimals for presentation fields
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::TimeHorizon;

    #[test]
    fn test_stage_order_and_names() {
        let names: Vec<&str> = StageKind::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "macro_analysis",
                "technical_analysis",
                "fundamental_analysis",
                "risk_analysis",
                "sentiment_analysis"
            ]
        );
    }

    #[test]
    fn test_price_stages_fail_without_prices() {
        let snapshot = DataSnapshot::new(vec!["AAPL".into()], TimeHorizon::Medium);
        let config = WorkflowConfig::default();

        for stage in [StageKind::Technical, StageKind::Risk] {
            let err = stage.run(&snapshot, &config).unwrap_err();
            assert!(matches!(err, Error::DataUnavailable { .. }), "{stage}");
        }
        for stage in [StageKind::Macro, StageKind::Fundamental, StageKind::Sentiment] {
            assert!(stage.run(&snapshot, &config).is_ok(), "{stage}");
        }
    }
}
