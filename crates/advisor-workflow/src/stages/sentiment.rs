//! Keyword-based news sentiment

use crate::snapshot::DataSnapshot;
use advisor_analytics::{SignalDirection, SignalSummary, aggregate};
use advisor_core::NewsItem;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

const POSITIVE_WORDS: [&str; 18] = [
    "surge", "soar", "rally", "gain", "rise", "jump", "bull", "growth", "profit", "beat", "exceed",
    "strong", "upgrade", "buy", "outperform", "positive", "optimistic", "boom",
];

const NEGATIVE_WORDS: [&str; 17] = [
    "crash", "plunge", "fall", "drop", "decline", "loss", "bear", "miss", "weak", "downgrade",
    "sell", "underperform", "negative", "pessimistic", "recession", "fear", "crisis",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    fn direction(self) -> SignalDirection {
        match self {
            Self::Positive => SignalDirection::Bullish,
            Self::Negative => SignalDirection::Bearish,
            Self::Neutral => SignalDirection::Neutral,
        }
    }
}

/// Keyword score for a single piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSentiment {
    pub label: SentimentLabel,
    /// Signed, in (-1, 1)
    pub score: f64,
    pub positive_signals: usize,
    pub negative_signals: usize,
}

/// Count sentiment keywords in `text`
///
/// Each keyword counts at most once; matching is by substring so "gains"
/// counts as "gain".
pub fn score_text(text: &str) -> TextSentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let denominator = (positive + negative + 1) as f64;

    let (label, score) = if positive > negative {
        (SentimentLabel::Positive, positive as f64 / denominator)
    } else if negative > positive {
        (SentimentLabel::Negative, -(negative as f64 / denominator))
    } else {
        (SentimentLabel::Neutral, 0.0)
    };

    TextSentiment {
        label,
        score,
        positive_signals: positive,
        negative_signals: negative,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredHeadline {
    pub title: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub sentiment: TextSentiment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl Distribution {
    fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolSentiment {
    pub article_count: usize,
    pub distribution: Distribution,
    /// Headline labels aggregated into a directional call
    pub summary: SignalSummary,
    /// Newest first
    pub headlines: Vec<ScoredHeadline>,
}

/// Output of the sentiment stage
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub symbols: BTreeMap<String, SymbolSentiment>,
    pub total_articles: usize,
    pub distribution: Distribution,
    pub overall: SignalSummary,
    pub summary: String,
}

/// Score headlines for every requested symbol
///
/// Symbols without news get an empty, neutral entry; the stage never fails.
pub fn analyze(snapshot: &DataSnapshot) -> SentimentReport {
    let mut symbols = BTreeMap::new();
    let mut all_directions = Vec::new();
    let mut distribution = Distribution::default();

    for symbol in &snapshot.symbols {
        let items = snapshot.news.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let entry = analyze_items(items);

        distribution.positive += entry.distribution.positive;
        distribution.negative += entry.distribution.negative;
        distribution.neutral += entry.distribution.neutral;
        all_directions.extend(entry.headlines.iter().map(|h| h.sentiment.label.direction()));
        symbols.insert(symbol.clone(), entry);
    }

    let overall = aggregate(&all_directions);
    let summary = if all_directions.is_empty() {
        "No news available for sentiment analysis.".to_string()
    } else {
        format!(
            "Scored {} headlines: {} positive, {} negative, {} neutral.",
            all_directions.len(),
            distribution.positive,
            distribution.negative,
            distribution.neutral
        )
    };

    SentimentReport {
        symbols,
        total_articles: all_directions.len(),
        distribution,
        overall,
        summary,
    }
}

fn analyze_items(items: &[NewsItem]) -> SymbolSentiment {
    let mut headlines: Vec<ScoredHeadline> = items
        .iter()
        .map(|item| ScoredHeadline {
            title: item.title.clone(),
            source: item.source.clone(),
            published_at: item.published_at,
            sentiment: score_text(&item.title),
        })
        .collect();
    // None sorts first, so reversing puts undated items last
    headlines.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let mut distribution = Distribution::default();
    for headline in &headlines {
        distribution.add(headline.sentiment.label);
    }
    let directions: Vec<SignalDirection> = headlines
        .iter()
        .map(|h| h.sentiment.label.direction())
        .collect();

    SymbolSentiment {
        article_count: headlines.len(),
        distribution,
        summary: aggregate(&directions),
        headlines,
    }
}
