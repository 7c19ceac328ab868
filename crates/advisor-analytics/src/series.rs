//! Technical indicators over ordered price sequences
//!
//! Every function is pure and tolerant of short input: when there is not
//! enough data for the requested window the result is empty (or zeroed for
//! struct results). Callers check `is_empty()` before reading the latest value.
//!
//! Indicator outputs are aligned to the tail of the input, so the last element
//! of any non-empty result corresponds to the last input price.

use serde::{Deserialize, Serialize};
use ta::{
    Next,
    indicators::{ExponentialMovingAverage, SimpleMovingAverage},
};

/// Default RSI look-back
pub const RSI_PERIOD: usize = 14;
/// Default Bollinger look-back
pub const BOLLINGER_PERIOD: usize = 20;
/// Default Bollinger band width in standard deviations
pub const BOLLINGER_K: f64 = 2.0;
/// Default ATR look-back
pub const ATR_PERIOD: usize = 14;
/// Default trend-strength look-back
pub const TREND_PERIOD: usize = 20;

/// Simple moving average, length `n - period + 1`
pub fn sma(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    let Ok(mut indicator) = SimpleMovingAverage::new(period) else {
        return Vec::new();
    };

    // ta averages over the values seen so far during warm-up; drop those
    prices
        .iter()
        .map(|&price| indicator.next(price))
        .skip(period - 1)
        .collect()
}

/// Exponential moving average seeded with the first price, length `n`
///
/// Defined for inputs shorter than `period` as well; they are simply less smoothed.
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.is_empty() {
        return Vec::new();
    }
    let Ok(mut indicator) = ExponentialMovingAverage::new(period) else {
        return Vec::new();
    };

    prices.iter().map(|&price| indicator.next(price)).collect()
}

/// Simple returns `P_t / P_{t-1} - 1`
pub fn returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Logarithmic returns `ln(P_t / P_{t-1})`
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Relative Strength Index with simple rolling means of gains and losses
///
/// Length `n - period`. A window with losses of zero reads 100 when it has
/// gains and 50 when the window is completely flat.
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    gains
        .windows(period)
        .zip(losses.windows(period))
        .map(|(g, l)| {
            let avg_gain = mean(g);
            let avg_loss = mean(l);
            if avg_loss == 0.0 {
                if avg_gain > 0.0 { 100.0 } else { 50.0 }
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            }
        })
        .collect()
}

/// RSI reading zone using the conventional 70/30 cut-offs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn from_value(rsi: f64) -> Self {
        if rsi > 70.0 {
            Self::Overbought
        } else if rsi < 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }
}

/// MACD with EMA seeding; all three lines have length `n`
///
/// Empty unless `n >= slow + signal`.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if fast == 0 || slow == 0 || signal == 0 || prices.len() < slow + signal {
        return Macd::default();
    }

    let fast_line = ema(prices, fast);
    let slow_line = ema(prices, slow);
    let macd_line: Vec<f64> = fast_line
        .iter()
        .zip(&slow_line)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger band lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }

    /// Where `price` sits inside the latest band, 0 at the lower and 1 at the upper band
    ///
    /// Collapsed bands report 0.5.
    pub fn position(&self, price: f64) -> Option<f64> {
        let upper = *self.upper.last()?;
        let lower = *self.lower.last()?;
        if upper == lower {
            return Some(0.5);
        }
        Some((price - lower) / (upper - lower))
    }

    /// Latest band width as a percentage of the middle band
    pub fn width_pct(&self) -> Option<f64> {
        let upper = *self.upper.last()?;
        let lower = *self.lower.last()?;
        let middle = *self.middle.last()?;
        if middle == 0.0 {
            return None;
        }
        Some((upper - lower) / middle * 100.0)
    }
}

/// Bollinger bands around an SMA using the sample standard deviation of each window
pub fn bollinger_bands(prices: &[f64], period: usize, k: f64) -> BollingerBands {
    if period < 2 || prices.len() < period {
        return BollingerBands::default();
    }

    let middle = sma(prices, period);
    let deviations: Vec<f64> = prices.windows(period).map(sample_std).collect();

    let upper = middle
        .iter()
        .zip(&deviations)
        .map(|(m, sd)| m + k * sd)
        .collect();
    let lower = middle
        .iter()
        .zip(&deviations)
        .map(|(m, sd)| m - k * sd)
        .collect();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Average True Range, length `n - period + 1`
///
/// The first bar uses its own close as the previous close.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if highs.len() != n || lows.len() != n || period == 0 || n < period + 1 {
        return Vec::new();
    }

    let true_range: Vec<f64> = (0..n)
        .map(|i| {
            let prev_close = if i == 0 { closes[0] } else { closes[i - 1] };
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - prev_close).abs();
            let lc = (lows[i] - prev_close).abs();
            hl.max(hc).max(lc)
        })
        .collect();

    sma(&true_range, period)
}

/// Consistency of recent price direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStrength {
    /// 0 when up and down moves are balanced, 1 when every move agrees
    pub strength: f64,
    /// +1 for an uptrend, -1 for a downtrend, 0 when undetermined
    pub direction: i8,
    /// Return over the look-back window
    pub total_return: f64,
}

/// Trend strength over the last `period` bars; zeroed when `n < 2 * period`
pub fn trend_strength(prices: &[f64], period: usize) -> TrendStrength {
    let n = prices.len();
    if period < 2 || n < period * 2 {
        return TrendStrength::default();
    }

    let window = &prices[n - period..];
    let moves = returns(window);
    let ups = moves.iter().filter(|r| **r > 0.0).count();
    let strength = (ups as f64 / moves.len() as f64 - 0.5).abs() * 2.0;

    let total_return = window[period - 1] / window[0] - 1.0;
    let direction = if total_return > 0.0 { 1 } else { -1 };

    TrendStrength {
        strength,
        direction,
        total_return,
    }
}

/// Arithmetic mean; 0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor `n`)
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (divisor `n - 1`)
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// `q`-th percentile (0..=100) with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_sma_basic() {
        let prices: Vec<f64> = (10..=20).map(f64::from).collect();
        let out = sma(&prices, 5);

        assert_eq!(out.len(), 7);
        assert_close(out[0], 12.0);
        assert_close(out[6], 18.0);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(sma(&[10.0, 11.0, 12.0], 5).is_empty());
        assert!(sma(&[10.0, 11.0, 12.0], 0).is_empty());
    }

    #[test]
    fn test_ema_seed_and_recurrence() {
        let prices: Vec<f64> = (10..=20).map(f64::from).collect();
        let out = ema(&prices, 5);

        assert_eq!(out.len(), prices.len());
        assert_close(out[0], 10.0);
        let alpha = 2.0 / 6.0;
        assert_close(out[1], alpha * 11.0 + (1.0 - alpha) * 10.0);
        assert!(out[10] < 20.0 && out[10] > out[9]);
    }

    #[test]
    fn test_ema_shorter_than_period() {
        let out = ema(&[5.0, 6.0], 10);
        assert_eq!(out.len(), 2);
        assert_close(out[0], 5.0);
        assert!(ema(&[], 10).is_empty());
    }

    #[test]
    fn test_returns() {
        let simple = returns(&[100.0, 110.0, 99.0]);
        assert_eq!(simple.len(), 2);
        assert_close(simple[0], 0.1);
        assert_close(simple[1], -0.1);

        let log = log_returns(&[100.0, 110.0]);
        assert_close(log[0], (1.1_f64).ln());

        assert!(returns(&[100.0]).is_empty());
        assert!(log_returns(&[]).is_empty());
    }

    #[test]
    fn test_rsi_edge_cases() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        let out = rsi(&rising, 14);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|v| *v == 100.0));

        let flat = vec![50.0; 20];
        assert!(rsi(&flat, 14).iter().all(|v| *v == 50.0));

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - f64::from(i)).collect();
        assert!(rsi(&falling, 14).iter().all(|v| *v == 0.0));

        assert!(rsi(&rising[..14], 14).is_empty());
    }

    #[test]
    fn test_rsi_zone() {
        assert_eq!(RsiZone::from_value(75.0), RsiZone::Overbought);
        assert_eq!(RsiZone::from_value(25.0), RsiZone::Oversold);
        assert_eq!(RsiZone::from_value(50.0), RsiZone::Neutral);
    }

    #[test]
    fn test_macd_lengths() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + f64::from(i).sin()).collect();
        let out = macd(&prices, 12, 26, 9);
        assert_eq!(out.macd.len(), 40);
        assert_eq!(out.signal.len(), 40);
        assert_eq!(out.histogram.len(), 40);
        assert_close(out.histogram[39], out.macd[39] - out.signal[39]);

        assert!(macd(&prices[..34], 12, 26, 9).is_empty());
    }

    #[test]
    fn test_bollinger_known_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        let bands = bollinger_bands(&prices, 5, 2.0);

        assert_eq!(bands.middle.len(), 1);
        assert_close(bands.middle[0], 3.0);
        let sd = (2.5_f64).sqrt();
        assert_close(bands.upper[0], 3.0 + 2.0 * sd);
        assert_close(bands.lower[0], 3.0 - 2.0 * sd);
        assert_close(bands.position(3.0).unwrap_or_default(), 0.5);

        assert!(bollinger_bands(&prices, 6, 2.0).is_empty());
        assert!(bollinger_bands(&prices, 1, 2.0).is_empty());
    }

    #[test]
    fn test_bollinger_flat_prices() {
        let bands = bollinger_bands(&[10.0; 25], 20, 2.0);
        assert_eq!(bands.position(10.0), Some(0.5));
        assert_eq!(bands.width_pct(), Some(0.0));
    }

    #[test]
    fn test_atr() {
        let highs = [11.0, 12.0, 13.0, 14.0];
        let lows = [9.0, 10.0, 11.0, 12.0];
        let closes = [10.0, 11.0, 12.0, 13.0];

        let out = atr(&highs, &lows, &closes, 3);
        assert_eq!(out.len(), 2);
        assert_close(out[0], 2.0);

        assert!(atr(&highs, &lows[..3], &closes, 3).is_empty());
        assert!(atr(&highs, &lows, &closes, 4).is_empty());
    }

    #[test]
    fn test_trend_strength() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + f64::from(i)).collect();
        let trend = trend_strength(&rising, 20);
        assert_close(trend.strength, 1.0);
        assert_eq!(trend.direction, 1);
        assert_close(trend.total_return, 139.0 / 120.0 - 1.0);

        assert_eq!(trend_strength(&rising[..39], 20), TrendStrength::default());
    }

    #[test]
    fn test_statistics_helpers() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_close(mean(&values), 5.0);
        assert_close(population_std(&values), 2.0);
        assert_close(sample_std(&[1.0, 2.0, 3.0, 4.0]), (5.0_f64 / 3.0).sqrt());
        assert_eq!(sample_std(&[1.0]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_close(percentile(&values, 5.0).unwrap_or_default(), 1.2);
        assert_eq!(percentile(&[], 5.0), None);
    }

    proptest! {
        #[test]
        fn sma_length_matches_window(
            prices in prop::collection::vec(1.0..500.0_f64, 0..120),
            period in 1usize..60,
        ) {
            let out = sma(&prices, period);
            if prices.len() >= period {
                prop_assert_eq!(out.len(), prices.len() - period + 1);
            } else {
                prop_assert!(out.is_empty());
            }
        }

        #[test]
        fn bollinger_bands_are_ordered(prices in prop::collection::vec(1.0..500.0_f64, 20..150)) {
            let bands = bollinger_bands(&prices, 20, 2.0);
            prop_assert_eq!(bands.middle.len(), prices.len() - 19);
            for i in 0..bands.middle.len() {
                prop_assert!(bands.upper[i] >= bands.middle[i]);
                prop_assert!(bands.middle[i] >= bands.lower[i]);
            }
        }

        #[test]
        fn rsi_high_for_rising_low_for_falling(
            start in 10.0..500.0_f64,
            steps in prop::collection::vec(0.01..5.0_f64, 50..150),
        ) {
            let mut up = vec![start];
            let mut down = vec![start + steps.iter().sum::<f64>()];
            for step in &steps {
                up.push(up[up.len() - 1] + step);
                down.push(down[down.len() - 1] - step);
            }

            let up_rsi = rsi(&up, RSI_PERIOD);
            let down_rsi = rsi(&down, RSI_PERIOD);
            prop_assert!(up_rsi.last().is_some_and(|v| *v > 70.0));
            prop_assert!(down_rsi.last().is_some_and(|v| *v < 30.0));
        }

        #[test]
        fn rsi_stays_bounded(prices in prop::collection::vec(1.0..500.0_f64, 15..100)) {
            for value in rsi(&prices, RSI_PERIOD) {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
