//! End-to-end analysis over synthetic market data
//!
//! Builds an in-memory data source, runs the full workflow and prints the
//! resulting session as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_analysis -p advisor-workflow
//!
//! # Custom symbols and horizon, stages on blocking threads
//! cargo run --example basic_analysis -p advisor-workflow -- AAPL,BTC long --parallel
//!
//! # Structured logs
//! ADVISOR_LOG_FORMAT=json cargo run --example basic_analysis -p advisor-workflow
//! ```

use advisor_core::{CompanyProfile, NewsItem, PricePoint, TimeHorizon};
use advisor_utils::{Config, init_tracing_with};
use advisor_workflow::{AnalysisRequest, InMemorySource, WorkflowConfig, WorkflowOrchestrator};
use chrono::{Duration, TimeZone, Utc};
use std::env;
use std::sync::Arc;

fn synthetic_bars(days: usize, base: f64, swing: f64, drift: f64) -> anyhow::Result<Vec<PricePoint>> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;

    Ok((0..days)
        .map(|i| {
            let t = i as f64;
            let close = base + swing * (t / 9.0).sin() + drift * t;
            PricePoint::new(
                start + Duration::days(i as i64),
                close - swing * 0.05,
                close * 1.012,
                close * 0.988,
                close,
                2_500_000.0 + 400_000.0 * (t / 5.0).cos(),
            )
        })
        .collect())
}

fn demo_source() -> anyhow::Result<InMemorySource> {
    let source = InMemorySource::new()
        .with_prices("AAPL", synthetic_bars(300, 170.0, 8.0, 0.12)?)
        .with_prices("MSFT", synthetic_bars(300, 380.0, 12.0, 0.2)?)
        .with_prices("TSLA", synthetic_bars(300, 240.0, 35.0, -0.15)?)
        .with_prices("BTC", synthetic_bars(300, 52_000.0, 4_500.0, 40.0)?)
        .with_prices("SPY", synthetic_bars(300, 470.0, 9.0, 0.1)?)
        .with_company(
            "AAPL",
            CompanyProfile {
                name: Some("Apple Inc.".to_string()),
                sector: Some("Technology".to_string()),
                pe_ratio: Some(29.5),
                forward_pe: Some(27.0),
                profit_margin: Some(0.26),
                roe: Some(1.5),
                revenue_growth: Some(0.06),
                debt_to_equity: Some(1.8),
                current_ratio: Some(0.95),
                analyst_grades: vec!["Buy".into(), "Buy".into(), "Hold".into()],
                ..Default::default()
            },
        )
        .with_company(
            "MSFT",
            CompanyProfile {
                name: Some("Microsoft Corporation".to_string()),
                sector: Some("Technology".to_string()),
                pe_ratio: Some(34.0),
                profit_margin: Some(0.36),
                revenue_growth: Some(0.15),
                earnings_growth: Some(0.2),
                analyst_grades: vec!["Strong Buy".into(), "Buy".into()],
                ..Default::default()
            },
        )
        .with_company(
            "TSLA",
            CompanyProfile {
                name: Some("Tesla, Inc.".to_string()),
                sector: Some("Consumer Cyclical".to_string()),
                pe_ratio: Some(65.0),
                profit_margin: Some(0.08),
                revenue_growth: Some(-0.02),
                analyst_grades: vec!["Sell".into(), "Hold".into(), "Underperform".into()],
                ..Default::default()
            },
        )
        .with_macro("gdp_growth", 2.1)
        .with_macro("unemployment", 4.0)
        .with_macro("inflation", 2.9)
        .with_macro("fed_funds_rate", 4.75)
        .with_macro("vix", 18.5)
        .with_news(
            "AAPL",
            vec![
                NewsItem::new("Apple beats estimates as services growth stays strong", "Newswire"),
                NewsItem::new("Analysts upgrade Apple ahead of product launch", "Markets Daily"),
            ],
        )
        .with_news(
            "TSLA",
            vec![NewsItem::new("Tesla shares drop after delivery miss", "Newswire")],
        );
    Ok(source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing_with(&config);

    let args: Vec<String> = env::args().skip(1).collect();
    let parallel = args.iter().any(|a| a == "--parallel");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let symbols: Vec<String> = positional
        .first()
        .map_or_else(|| "AAPL,MSFT,TSLA,BTC".to_string(), |s| (*s).clone())
        .split(',')
        .map(str::to_string)
        .collect();
    let horizon: TimeHorizon = positional
        .get(1)
        .map_or(Ok(TimeHorizon::Medium), |h| h.parse())?;

    let orchestrator = WorkflowOrchestrator::builder()
        .source(Arc::new(demo_source()?))
        .config(WorkflowConfig::builder().parallel_stages(parallel).build()?)
        .build()?;

    let request = AnalysisRequest::new("Portfolio review", &symbols).with_time_horizon(horizon);
    let session = orchestrator.run(request).await;

    println!("{}", serde_json::to_string_pretty(&session)?);
    eprintln!(
        "\nSession {} finished as {:?}: {}",
        session.session_id(),
        session.status(),
        session.progress_summary()
    );
    for error in session.errors() {
        eprintln!("  - {error}");
    }

    Ok(())
}
