//! Market data source abstraction

use advisor_core::{
    CompanyProfile, Error, MacroSnapshot, NewsItem, PricePoint, PriceSeries, Result, TimeHorizon,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Supplier of everything the data collection phase needs
///
/// Per-symbol problems are reported as [`Error::DataUnavailable`] and are
/// isolated by the orchestrator. [`Error::SourceUnavailable`] means the source
/// as a whole is down and fails the session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Price history for `symbol` covering roughly `horizon`
    async fn price_history(&self, symbol: &str, horizon: TimeHorizon) -> Result<PriceSeries>;

    /// Company fundamentals; `None` when the source has nothing for `symbol`
    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>>;

    /// Latest macroeconomic indicators
    async fn macro_indicators(&self) -> Result<MacroSnapshot>;

    /// Recent headlines for `symbol`
    async fn news(&self, symbol: &str) -> Result<Vec<NewsItem>>;
}

/// A [`MarketDataSource`] backed by in-memory maps
///
/// Returns the full stored history regardless of the requested horizon.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    prices: BTreeMap<String, Vec<PricePoint>>,
    companies: BTreeMap<String, CompanyProfile>,
    macro_indicators: MacroSnapshot,
    news: BTreeMap<String, Vec<NewsItem>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the four raw maps
    pub fn from_maps(
        prices: BTreeMap<String, Vec<PricePoint>>,
        companies: BTreeMap<String, CompanyProfile>,
        macro_indicators: MacroSnapshot,
        news: BTreeMap<String, Vec<NewsItem>>,
    ) -> Self {
        Self {
            prices: upper_keys(prices),
            companies: upper_keys(companies),
            macro_indicators,
            news: upper_keys(news),
        }
    }

    pub fn with_prices(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.prices.insert(symbol.to_uppercase(), points);
        self
    }

    pub fn with_company(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.companies.insert(symbol.to_uppercase(), profile);
        self
    }

    pub fn with_macro(mut self, indicator: &str, value: f64) -> Self {
        self.macro_indicators.insert(indicator.to_string(), value);
        self
    }

    pub fn with_news(mut self, symbol: &str, items: Vec<NewsItem>) -> Self {
        self.news.insert(symbol.to_uppercase(), items);
        self
    }
}

fn upper_keys<V>(map: BTreeMap<String, V>) -> BTreeMap<String, V> {
    map.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect()
}

#[async_trait]
impl MarketDataSource for InMemorySource {
    async fn price_history(&self, symbol: &str, _horizon: TimeHorizon) -> Result<PriceSeries> {
        let points = self
            .prices
            .get(&symbol.to_uppercase())
            .ok_or_else(|| Error::data_unavailable(symbol, "no price history"))?;
        PriceSeries::new(symbol, points.clone())
    }

    async fn company_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        Ok(self.companies.get(&symbol.to_uppercase()).cloned())
    }

    async fn macro_indicators(&self) -> Result<MacroSnapshot> {
        Ok(self.macro_indicators.clone())
    }

    async fn news(&self, symbol: &str) -> Result<Vec<NewsItem>> {
        Ok(self
            .news
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn points(n: usize) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                PricePoint::new(start + Duration::days(i as i64), close, close, close, close, 1e6)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_in_memory_prices() {
        let source = InMemorySource::new().with_prices("aapl", points(5));

        let series = source.price_history("AAPL", TimeHorizon::Short).await.unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.latest().close, 104.0);

        let err = source
            .price_history("MSFT", TimeHorizon::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
        assert!(!err.is_source_failure());
    }

    #[tokio::test]
    async fn test_invalid_stored_series_is_rejected() {
        let mut bad = points(3);
        bad.swap(0, 2);
        let source = InMemorySource::new().with_prices("AAPL", bad);

        let err = source
            .price_history("AAPL", TimeHorizon::Medium)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSeries { .. }));
    }

    #[tokio::test]
    async fn test_missing_optional_data_is_empty() {
        let source = InMemorySource::from_maps(
            BTreeMap::new(),
            BTreeMap::from([("msft".to_string(), CompanyProfile::default())]),
            MacroSnapshot::from([("vix".to_string(), 14.0)]),
            BTreeMap::new(),
        );

        assert!(source.company_profile("AAPL").await.unwrap().is_none());
        assert!(source.company_profile("MSFT").await.unwrap().is_some());
        assert!(source.news("AAPL").await.unwrap().is_empty());
        assert_eq!(source.macro_indicators().await.unwrap()["vix"], 14.0);
    }
}
