//! Directional signal extraction and aggregation

use crate::series::{self, BOLLINGER_K, BOLLINGER_PERIOD, RSI_PERIOD};
use serde::{Deserialize, Serialize};

/// Minimum number of prices before [`technical_signals`] produces anything
pub const MIN_SIGNAL_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// High above 0.5, medium above 0.25, low otherwise
    pub fn from_score(score: f64) -> Self {
        let magnitude = score.abs();
        if magnitude > 0.5 {
            Self::High
        } else if magnitude > 0.25 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One indicator's reading mapped to a direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub indicator: String,
    pub value: f64,
    pub direction: SignalDirection,
    /// 0-1
    pub strength: f64,
}

impl TechnicalSignal {
    fn new(indicator: &str, value: f64, direction: SignalDirection, strength: f64) -> Self {
        Self {
            indicator: indicator.to_string(),
            value,
            direction,
            strength: strength.clamp(0.0, 1.0),
        }
    }
}

/// Aggregated call over a set of sub-signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub direction: SignalDirection,
    /// `(bullish - bearish) / total`, in [-1, 1]
    pub score: f64,
    pub confidence: Confidence,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    /// Threshold the score was compared against
    pub threshold: f64,
}

/// Label threshold for a set of `count` signals
///
/// Four or more signals use the coarser 0.3; smaller sets use 0.25.
pub fn threshold_for(count: usize) -> f64 {
    if count >= 4 { 0.3 } else { 0.25 }
}

/// Combine categorical sub-signals into one directional call
pub fn aggregate(directions: &[SignalDirection]) -> SignalSummary {
    let total = directions.len();
    let bullish = directions
        .iter()
        .filter(|d| **d == SignalDirection::Bullish)
        .count();
    let bearish = directions
        .iter()
        .filter(|d| **d == SignalDirection::Bearish)
        .count();
    let threshold = threshold_for(total);

    let score = if total == 0 {
        0.0
    } else {
        (bullish as f64 - bearish as f64) / total as f64
    };

    let direction = if score > threshold {
        SignalDirection::Bullish
    } else if score < -threshold {
        SignalDirection::Bearish
    } else {
        SignalDirection::Neutral
    };

    SignalSummary {
        direction,
        score,
        confidence: Confidence::from_score(score),
        bullish_count: bullish,
        bearish_count: bearish,
        neutral_count: total - bullish - bearish,
        threshold,
    }
}

/// Aggregate full technical signals by direction
pub fn aggregate_signals(signals: &[TechnicalSignal]) -> SignalSummary {
    let directions: Vec<SignalDirection> = signals.iter().map(|s| s.direction).collect();
    aggregate(&directions)
}

/// RSI, MACD, 50/200 moving-average cross and Bollinger sub-signals
///
/// Each signal is emitted only when its indicator has enough data; nothing is
/// produced below [`MIN_SIGNAL_HISTORY`] prices.
pub fn technical_signals(prices: &[f64]) -> Vec<TechnicalSignal> {
    if prices.len() < MIN_SIGNAL_HISTORY {
        return Vec::new();
    }
    let current = prices[prices.len() - 1];
    let mut signals = Vec::with_capacity(4);

    if let Some(&value) = series::rsi(prices, RSI_PERIOD).last() {
        let (direction, strength) = if value < 30.0 {
            (SignalDirection::Bullish, (30.0 - value) / 30.0)
        } else if value > 70.0 {
            (SignalDirection::Bearish, (value - 70.0) / 30.0)
        } else {
            (SignalDirection::Neutral, 0.5)
        };
        signals.push(TechnicalSignal::new("RSI", value, direction, strength));
    }

    let macd = series::macd(prices, 12, 26, 9);
    if let Some(&hist) = macd.histogram.last() {
        let prev = if macd.histogram.len() > 1 {
            macd.histogram[macd.histogram.len() - 2]
        } else {
            0.0
        };
        let (direction, strength) = if hist > 0.0 && hist > prev {
            (SignalDirection::Bullish, 0.7)
        } else if hist < 0.0 && hist < prev {
            (SignalDirection::Bearish, 0.7)
        } else {
            (SignalDirection::Neutral, 0.3)
        };
        signals.push(TechnicalSignal::new("MACD", hist, direction, strength));
    }

    let sma_50 = series::sma(prices, 50);
    let sma_200 = series::sma(prices, 200);
    if let (Some(&fast), Some(&slow)) = (sma_50.last(), sma_200.last()) {
        let spread = if slow == 0.0 { 0.0 } else { (fast - slow) / slow };
        let direction = if fast > slow {
            SignalDirection::Bullish
        } else {
            SignalDirection::Bearish
        };
        signals.push(TechnicalSignal::new(
            "MA_Cross",
            fast,
            direction,
            (spread.abs() * 10.0).min(1.0),
        ));
    }

    let bands = series::bollinger_bands(prices, BOLLINGER_PERIOD, BOLLINGER_K);
    if let Some(position) = bands.position(current) {
        let (direction, strength) = if position < 0.2 {
            (SignalDirection::Bullish, 1.0 - position * 5.0)
        } else if position > 0.8 {
            (SignalDirection::Bearish, (position - 0.8) * 5.0)
        } else {
            (SignalDirection::Neutral, 0.5)
        };
        signals.push(TechnicalSignal::new("Bollinger", position, direction, strength));
    }

    signals
}
