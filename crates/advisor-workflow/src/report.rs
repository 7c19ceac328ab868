//! Final report synthesis

use crate::session::AnalysisSession;
use crate::snapshot::{DataSnapshot, PriceSummary};
use crate::stages::StageKind;
use advisor_analytics::{Confidence, RiskLevel, SignalDirection, aggregate};
use advisor_core::{Result, TimeHorizon};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fundamental score beyond which the stage counts as a directional vote
const FUNDAMENTAL_SIGNAL_THRESHOLD: f64 = 0.3;

/// Everything the synthesizer may use
///
/// Stage slots are `None` when the stage failed.
#[derive(Debug, Clone, Serialize)]
pub struct ReportInput {
    pub session_id: String,
    pub request: String,
    pub symbols: Vec<String>,
    pub time_horizon: TimeHorizon,
    pub macro_analysis: Option<Value>,
    pub technical_analysis: Option<Value>,
    pub fundamental_analysis: Option<Value>,
    pub risk_analysis: Option<Value>,
    pub sentiment_analysis: Option<Value>,
    pub price_summary: BTreeMap<String, PriceSummary>,
}

impl ReportInput {
    pub(crate) fn from_session(session: &AnalysisSession, snapshot: &DataSnapshot) -> Self {
        let slot = |stage: StageKind| session.result(stage.phase()).cloned();
        Self {
            session_id: session.session_id().to_string(),
            request: session.request().to_string(),
            symbols: session.symbols().to_vec(),
            time_horizon: session.time_horizon(),
            macro_analysis: slot(StageKind::Macro),
            technical_analysis: slot(StageKind::Technical),
            fundamental_analysis: slot(StageKind::Fundamental),
            risk_analysis: slot(StageKind::Risk),
            sentiment_analysis: slot(StageKind::Sentiment),
            price_summary: snapshot.price_summaries(),
        }
    }

    pub fn stage(&self, stage: StageKind) -> Option<&Value> {
        match stage {
            StageKind::Macro => self.macro_analysis.as_ref(),
            StageKind::Technical => self.technical_analysis.as_ref(),
            StageKind::Fundamental => self.fundamental_analysis.as_ref(),
            StageKind::Risk => self.risk_analysis.as_ref(),
            StageKind::Sentiment => self.sentiment_analysis.as_ref(),
        }
    }

    /// Names of stages with no result, in canonical order
    pub fn unavailable_stages(&self) -> Vec<&'static str> {
        StageKind::ALL
            .into_iter()
            .filter(|s| self.stage(*s).is_none())
            .map(StageKind::name)
            .collect()
    }

    fn symbol_entry(&self, stage: StageKind, symbol: &str) -> Option<&Value> {
        self.stage(stage)?.get("symbols")?.get(symbol)
    }
}

/// Turns stage results into the session's final report
#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    async fn synthesize(&self, input: &ReportInput) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl From<SignalDirection> for Action {
    fn from(direction: SignalDirection) -> Self {
        match direction {
            SignalDirection::Bullish => Self::Buy,
            SignalDirection::Bearish => Self::Sell,
            SignalDirection::Neutral => Self::Hold,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub action: Action,
    pub confidence: Confidence,
    pub score: f64,
    /// Stage name to the direction it contributed
    pub signals: BTreeMap<&'static str, SignalDirection>,
    pub latest_price: Option<f64>,
}

/// Report produced by [`DigestSynthesizer`]
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub time_horizon: TimeHorizon,
    pub market_outlook: Option<String>,
    pub recommendations: Vec<Recommendation>,
    pub unavailable_stages: Vec<&'static str>,
    pub summary: String,
}

/// Rule-based synthesizer voting each stage's per-symbol call
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSynthesizer;

impl DigestSynthesizer {
    pub fn new() -> Self {
        Self
    }

    fn stage_signals(input: &ReportInput, symbol: &str) -> BTreeMap<&'static str, SignalDirection> {
        let mut signals = BTreeMap::new();

        if let Some(direction) = input
            .symbol_entry(StageKind::Technical, symbol)
            .and_then(|e| e.pointer("/overall/direction"))
            .and_then(direction_from)
        {
            signals.insert(StageKind::Technical.name(), direction);
        }

        if let Some(score) = input
            .symbol_entry(StageKind::Fundamental, symbol)
            .and_then(|e| e.get("overall_score"))
            .and_then(Value::as_f64)
        {
            let direction = if score > FUNDAMENTAL_SIGNAL_THRESHOLD {
                SignalDirection::Bullish
            } else if score < -FUNDAMENTAL_SIGNAL_THRESHOLD {
                SignalDirection::Bearish
            } else {
                SignalDirection::Neutral
            };
            signals.insert(StageKind::Fundamental.name(), direction);
        }

        if let Some(level) = input
            .symbol_entry(StageKind::Risk, symbol)
            .and_then(|e| e.get("risk_level"))
            .and_then(|v| serde_json::from_value::<RiskLevel>(v.clone()).ok())
        {
            let direction = match level {
                RiskLevel::Low => SignalDirection::Bullish,
                RiskLevel::Moderate => SignalDirection::Neutral,
                RiskLevel::High => SignalDirection::Bearish,
            };
            signals.insert(StageKind::Risk.name(), direction);
        }

        // Symbols without headlines carry no sentiment vote
        if let Some(direction) = input
            .symbol_entry(StageKind::Sentiment, symbol)
            .filter(|e| e.get("article_count").and_then(Value::as_u64).unwrap_or(0) > 0)
            .and_then(|e| e.pointer("/summary/direction"))
            .and_then(direction_from)
        {
            signals.insert(StageKind::Sentiment.name(), direction);
        }

        signals
    }
}

fn direction_from(value: &Value) -> Option<SignalDirection> {
    serde_json::from_value(value.clone()).ok()
}

#[async_trait]
impl ReportSynthesizer for DigestSynthesizer {
    async fn synthesize(&self, input: &ReportInput) -> Result<Value> {
        let recommendations: Vec<Recommendation> = input
            .symbols
            .iter()
            .map(|symbol| {
                let signals = Self::stage_signals(input, symbol);
                let directions: Vec<SignalDirection> = signals.values().copied().collect();
                let summary = aggregate(&directions);
                Recommendation {
                    symbol: symbol.clone(),
                    action: summary.direction.into(),
                    confidence: summary.confidence,
                    score: summary.score,
                    signals,
                    latest_price: input.price_summary.get(symbol).map(|p| p.latest_price),
                }
            })
            .collect();

        let market_outlook = input
            .macro_analysis
            .as_ref()
            .and_then(|m| m.pointer("/asset_implications/stocks/outlook"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let unavailable_stages = input.unavailable_stages();
        let calls: Vec<String> = recommendations
            .iter()
            .map(|r| format!("{} {}", r.symbol, r.action.as_str()))
            .collect();
        let mut summary = format!("Recommendations: {}.", calls.join(", "));
        if !unavailable_stages.is_empty() {
            summary.push_str(&format!(
                " Based on partial analysis; unavailable: {}.",
                unavailable_stages.join(", ")
            ));
        }

        let digest = Digest {
            session_id: input.session_id.clone(),
            generated_at: Utc::now(),
            time_horizon: input.time_horizon,
            market_outlook,
            recommendations,
            unavailable_stages,
            summary,
        };
        Ok(serde_json::to_value(digest)?)
    }
}
