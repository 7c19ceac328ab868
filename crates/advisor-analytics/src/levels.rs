//! Support and resistance detection
//!
//! Local extrema are found with a symmetric look-around window and then
//! clustered per kind. Only clusters touched at least twice are reported.

use serde::{Deserialize, Serialize};

/// Maximum number of levels returned
pub const MAX_LEVELS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A price level where reversals cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub kind: LevelKind,
    /// Number of touches merged into this level
    pub strength: usize,
    /// Index of the most recent touch
    pub last_touch: usize,
}

/// Detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// Bars compared on each side of a candidate
    pub window: usize,
    /// Relative distance under which candidates merge, e.g. 0.02 for 2%
    pub threshold: f64,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            window: 10,
            threshold: 0.02,
        }
    }
}

struct Cluster {
    price: f64,
    kind: LevelKind,
    touches: Vec<usize>,
}

/// Detect support and resistance levels, strongest first
///
/// Returns nothing when `prices.len() < 2 * window`. Ties in strength keep
/// the order in which clusters were first seen.
pub fn detect_levels(prices: &[f64], params: &LevelParams) -> Vec<Level> {
    let w = params.window;
    let n = prices.len();
    if w == 0 || n < 2 * w {
        return Vec::new();
    }

    let mut candidates: Vec<(f64, LevelKind, usize)> = Vec::new();
    for i in w..n - w {
        let before = &prices[i - w..i];
        let after = &prices[i + 1..=i + w];
        let price = prices[i];

        let min_around = before.iter().chain(after).copied().fold(f64::INFINITY, f64::min);
        let max_around = before
            .iter()
            .chain(after)
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        if price <= min_around {
            candidates.push((price, LevelKind::Support, i));
        }
        if price >= max_around {
            candidates.push((price, LevelKind::Resistance, i));
        }
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    for (price, kind, index) in candidates {
        let existing = clusters.iter_mut().find(|c| {
            c.kind == kind && c.price != 0.0 && ((price - c.price) / c.price).abs() < params.threshold
        });
        match existing {
            Some(cluster) => {
                cluster.touches.push(index);
                cluster.price = (cluster.price + price) / 2.0;
            }
            None => clusters.push(Cluster {
                price,
                kind,
                touches: vec![index],
            }),
        }
    }

    let mut levels: Vec<Level> = clusters
        .into_iter()
        .filter(|c| c.touches.len() >= 2)
        .map(|c| Level {
            price: c.price,
            kind: c.kind,
            strength: c.touches.len(),
            last_touch: c.touches.iter().copied().max().unwrap_or_default(),
        })
        .collect();

    // sort_by is stable
    levels.sort_by(|a, b| b.strength.cmp(&a.strength));
    levels.truncate(MAX_LEVELS);
    levels
}

/// Closest support strictly below and closest resistance strictly above `price`
pub fn nearest_levels(levels: &[Level], price: f64) -> (Option<Level>, Option<Level>) {
    let support = levels
        .iter()
        .filter(|l| l.kind == LevelKind::Support && l.price < price)
        .copied()
        .max_by(|a, b| a.price.total_cmp(&b.price));
    let resistance = levels
        .iter()
        .filter(|l| l.kind == LevelKind::Resistance && l.price > price)
        .copied()
        .min_by(|a, b| a.price.total_cmp(&b.price));
    (support, resistance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bouncing(cycles: usize) -> Vec<f64> {
        let pattern = [100.0, 102.0, 104.0, 105.0, 104.0, 102.0, 100.0, 98.0, 96.0, 95.0, 96.0, 98.0];
        pattern.iter().copied().cycle().take(pattern.len() * cycles).collect()
    }

    #[test]
    fn test_detects_bounce_levels() {
        let levels = detect_levels(&bouncing(5), &LevelParams::default());

        let support = levels
            .iter()
            .find(|l| l.kind == LevelKind::Support)
            .expect("support level");
        let resistance = levels
            .iter()
            .find(|l| l.kind == LevelKind::Resistance)
            .expect("resistance level");

        assert!((95.0..=96.0).contains(&support.price));
        assert!((104.0..=105.0).contains(&resistance.price));
        assert!(support.strength >= 2);
        assert!(resistance.strength >= 2);
        assert_eq!(support.last_touch, 45);
    }

    #[test]
    fn test_requires_two_windows_of_data() {
        let prices = bouncing(5);
        assert!(detect_levels(&prices[..19], &LevelParams::default()).is_empty());
        assert!(detect_levels(&prices, &LevelParams { window: 0, threshold: 0.02 }).is_empty());
    }

    #[test]
    fn test_single_touches_are_noise() {
        // One V-shaped dip: a single support touch and no resistance
        let mut prices: Vec<f64> = (0..15).map(|i| 120.0 - f64::from(i)).collect();
        prices.extend((1..16).map(|i| 106.0 + f64::from(i)));
        assert!(detect_levels(&prices, &LevelParams::default()).is_empty());
    }

    #[test]
    fn test_sorted_by_strength_and_capped() {
        let levels = detect_levels(&bouncing(20), &LevelParams::default());
        assert!(levels.len() <= MAX_LEVELS);
        assert!(levels.windows(2).all(|w| w[0].strength >= w[1].strength));
    }

    #[test]
    fn test_kinds_do_not_merge() {
        let levels = detect_levels(&bouncing(5), &LevelParams { window: 3, threshold: 0.5 });
        assert!(levels.iter().any(|l| l.kind == LevelKind::Support));
        assert!(levels.iter().any(|l| l.kind == LevelKind::Resistance));
    }

    #[test]
    fn test_nearest_levels() {
        let levels = vec![
            Level { price: 90.0, kind: LevelKind::Support, strength: 3, last_touch: 10 },
            Level { price: 95.0, kind: LevelKind::Support, strength: 2, last_touch: 20 },
            Level { price: 105.0, kind: LevelKind::Resistance, strength: 2, last_touch: 30 },
            Level { price: 110.0, kind: LevelKind::Resistance, strength: 4, last_touch: 40 },
        ];

        let (support, resistance) = nearest_levels(&levels, 100.0);
        assert_eq!(support.map(|l| l.price), Some(95.0));
        assert_eq!(resistance.map(|l| l.price), Some(105.0));

        let (support, resistance) = nearest_levels(&levels, 120.0);
        assert_eq!(support.map(|l| l.price), Some(95.0));
        assert!(resistance.is_none());
    }
}
