//! Technical indicator analysis per symbol

use super::{require_prices, round2};
use crate::config::WorkflowConfig;
use crate::snapshot::DataSnapshot;
use advisor_analytics::series::{
    self, ATR_PERIOD, BOLLINGER_K, BOLLINGER_PERIOD, RSI_PERIOD, TREND_PERIOD,
};
use advisor_analytics::{
    Level, LevelKind, RsiZone, SignalDirection, SignalSummary, TechnicalSignal, aggregate_signals,
    detect_levels, nearest_levels, technical_signals,
};
use advisor_core::{PriceSeries, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Levels reported per side
const TOP_LEVELS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MovingAverages {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_20: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    /// Percent distance of the current price from the 20/50/200 SMA
    pub price_vs_sma_20_pct: Option<f64>,
    pub price_vs_sma_50_pct: Option<f64>,
    pub price_vs_sma_200_pct: Option<f64>,
    /// SMA-50 above SMA-200
    pub golden_cross: Option<bool>,
    /// (SMA-50 - SMA-200) / SMA-200 in percent
    pub ma_spread_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    BullishCrossover,
    BearishCrossover,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct Momentum {
    pub rsi: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub rsi_recent: Vec<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub macd_trend: Option<SignalDirection>,
    pub macd_crossover: Crossover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandSignal {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, Serialize)]
pub struct Volatility {
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_position: Option<f64>,
    pub bb_signal: Option<BandSignal>,
    pub band_width_pct: Option<f64>,
    pub atr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportResistance {
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    pub support_distance_pct: Option<f64>,
    pub resistance_distance_pct: Option<f64>,
    pub support_levels: Vec<Level>,
    pub resistance_levels: Vec<Level>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Undetermined,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendView {
    pub direction: TrendDirection,
    pub strength: f64,
    pub period_return_pct: f64,
}

/// Technical picture for one symbol
#[derive(Debug, Clone, Serialize)]
pub struct SymbolTechnicals {
    pub current_price: f64,
    pub data_points: usize,
    pub moving_averages: MovingAverages,
    pub momentum: Momentum,
    pub volatility: Volatility,
    pub support_resistance: SupportResistance,
    pub trend: TrendView,
    pub signals: Vec<TechnicalSignal>,
    pub overall: SignalSummary,
}

/// Output of the technical stage
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalReport {
    pub symbols: BTreeMap<String, SymbolTechnicals>,
    /// Requested symbols without price data
    pub missing: Vec<String>,
    pub summary: String,
}

/// Run every indicator for each requested symbol with price data
pub fn analyze(snapshot: &DataSnapshot, config: &WorkflowConfig) -> Result<TechnicalReport> {
    let available = require_prices(snapshot)?;

    let mut symbols = BTreeMap::new();
    let mut calls = Vec::with_capacity(available.len());
    for symbol in &available {
        let Some(series) = snapshot.prices.get(*symbol) else {
            continue;
        };
        let technicals = analyze_series(series, config);
        calls.push(format!("{symbol} {}", direction_label(technicals.overall.direction)));
        symbols.insert((*symbol).to_string(), technicals);
    }

    let missing = snapshot
        .symbols
        .iter()
        .filter(|s| !symbols.contains_key(s.as_str()))
        .cloned()
        .collect();

    Ok(TechnicalReport {
        summary: format!(
            "Technical analysis complete for {} symbols: {}",
            symbols.len(),
            calls.join(", ")
        ),
        symbols,
        missing,
    })
}

fn direction_label(direction: SignalDirection) -> &'static str {
    match direction {
        SignalDirection::Bullish => "bullish",
        SignalDirection::Bearish => "bearish",
        SignalDirection::Neutral => "neutral",
    }
}

fn pct_from(price: f64, reference: Option<f64>) -> Option<f64> {
    reference
        .filter(|r| *r != 0.0)
        .map(|r| round2((price - r) / r * 100.0))
}

fn last(values: &[f64]) -> Option<f64> {
    values.last().copied()
}

pub fn analyze_series(history: &PriceSeries, config: &WorkflowConfig) -> SymbolTechnicals {
    let closes = history.closes();
    let current = history.latest().close;

    let sma_20 = last(&series::sma(&closes, 20));
    let sma_50 = last(&series::sma(&closes, 50));
    let sma_200 = last(&series::sma(&closes, 200));
    let golden_cross = sma_50.zip(sma_200).map(|(fast, slow)| fast > slow);
    let ma_spread_pct = sma_50
        .zip(sma_200)
        .filter(|(_, slow)| *slow != 0.0)
        .map(|(fast, slow)| round2((fast - slow) / slow * 100.0));

    let moving_averages = MovingAverages {
        sma_20,
        sma_50,
        sma_200,
        ema_20: last(&series::ema(&closes, 20)),
        ema_50: last(&series::ema(&closes, 50)),
        ema_200: last(&series::ema(&closes, 200)),
        price_vs_sma_20_pct: pct_from(current, sma_20),
        price_vs_sma_50_pct: pct_from(current, sma_50),
        price_vs_sma_200_pct: pct_from(current, sma_200),
        golden_cross,
        ma_spread_pct,
    };

    let rsi = series::rsi(&closes, RSI_PERIOD);
    let macd = series::macd(&closes, 12, 26, 9);
    let histogram = &macd.histogram;
    let macd_crossover = match histogram.as_slice() {
        [.., prev, latest] if *prev < 0.0 && *latest > 0.0 => Crossover::BullishCrossover,
        [.., prev, latest] if *prev > 0.0 && *latest < 0.0 => Crossover::BearishCrossover,
        _ => Crossover::None,
    };
    let momentum = Momentum {
        rsi: last(&rsi),
        rsi_zone: last(&rsi).map(RsiZone::from_value),
        rsi_recent: rsi[rsi.len().saturating_sub(5)..].to_vec(),
        macd: last(&macd.macd),
        macd_signal: last(&macd.signal),
        macd_histogram: last(histogram),
        macd_trend: last(histogram).map(|h| {
            if h > 0.0 {
                SignalDirection::Bullish
            } else {
                SignalDirection::Bearish
            }
        }),
        macd_crossover,
    };

    let bands = series::bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_K);
    let bb_position = bands.position(current);
    let volatility = Volatility {
        bb_upper: last(&bands.upper),
        bb_middle: last(&bands.middle),
        bb_lower: last(&bands.lower),
        bb_position,
        bb_signal: bb_position.map(|p| {
            if p < 0.2 {
                BandSignal::Oversold
            } else if p > 0.8 {
                BandSignal::Overbought
            } else {
                BandSignal::Neutral
            }
        }),
        band_width_pct: bands.width_pct().map(round2),
        atr: last(&series::atr(
            &history.highs(),
            &history.lows(),
            &closes,
            ATR_PERIOD,
        )),
    };

    let support_resistance = levels_around(&closes, current, config);

    let trend = series::trend_strength(&closes, TREND_PERIOD);
    let trend = TrendView {
        direction: match trend.direction {
            1 => TrendDirection::Uptrend,
            -1 => TrendDirection::Downtrend,
            _ => TrendDirection::Undetermined,
        },
        strength: trend.strength,
        period_return_pct: round2(trend.total_return * 100.0),
    };

    let signals = technical_signals(&closes);
    let overall = aggregate_signals(&signals);

    SymbolTechnicals {
        current_price: current,
        data_points: closes.len(),
        moving_averages,
        momentum,
        volatility,
        support_resistance,
        trend,
        signals,
        overall,
    }
}

fn levels_around(closes: &[f64], current: f64, config: &WorkflowConfig) -> SupportResistance {
    let levels = detect_levels(closes, &config.level_params());
    let (support, resistance) = nearest_levels(&levels, current);

    let top = |kind: LevelKind| -> Vec<Level> {
        levels
            .iter()
            .filter(|l| l.kind == kind)
            .take(TOP_LEVELS)
            .copied()
            .collect()
    };

    SupportResistance {
        nearest_support: support.map(|l| l.price),
        nearest_resistance: resistance.map(|l| l.price),
        support_distance_pct: support
            .filter(|_| current != 0.0)
            .map(|l| round2((current - l.price) / current * 100.0)),
        resistance_distance_pct: resistance
            .filter(|_| current != 0.0)
            .map(|l| round2((l.price - current) / current * 100.0)),
        support_levels: top(LevelKind::Support),
        resistance_levels: top(LevelKind::Resistance),
    }
}
