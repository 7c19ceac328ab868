//! Workflow orchestration: collection, stages, synthesis

use crate::config::WorkflowConfig;
use crate::report::{DigestSynthesizer, ReportInput, ReportSynthesizer};
use crate::runner::{AnalysisStageRunner, StageOutcome, StageRunner, capture_stage};
use crate::session::{AnalysisPhase, AnalysisRequest, AnalysisSession, PhaseStatus};
use crate::snapshot::DataSnapshot;
use crate::source::MarketDataSource;
use crate::stages::StageKind;
use advisor_core::{Error, Result};
use futures::future::join_all;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives an [`AnalysisSession`] through every phase
///
/// Stage failures are isolated and recorded; only failures in data
/// collection, phase bookkeeping or report synthesis fail the session.
pub struct WorkflowOrchestrator {
    source: Arc<dyn MarketDataSource>,
    runner: Arc<dyn StageRunner>,
    synthesizer: Arc<dyn ReportSynthesizer>,
    config: Arc<WorkflowConfig>,
}

impl WorkflowOrchestrator {
    pub fn builder() -> WorkflowOrchestratorBuilder {
        WorkflowOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run a full analysis
    ///
    /// Always returns a session; check [`AnalysisSession::status`] for the
    /// outcome and [`AnalysisSession::errors`] for what went wrong.
    pub async fn run(&self, request: AnalysisRequest) -> AnalysisSession {
        let mut session = AnalysisSession::new(&request);
        info!(
            session_id = %session.session_id(),
            symbols = ?session.symbols(),
            horizon = %session.time_horizon(),
            parallel = self.config.parallel_stages,
            "Starting analysis session"
        );

        match self.execute(&request, &mut session).await {
            Ok(()) => {
                info!(
                    session_id = %session.session_id(),
                    progress = %session.progress_summary(),
                    degraded = session.is_degraded(),
                    "Analysis session completed"
                );
            }
            Err(e) => {
                let phase = session.current_phase();
                let recorded = session
                    .phase_record(phase)
                    .is_some_and(|r| r.status == PhaseStatus::Failed);
                if !recorded {
                    session.record_error(phase, &e.to_string());
                }
                error!(
                    session_id = %session.session_id(),
                    phase = %phase,
                    error = %e,
                    "Analysis session failed"
                );
                session.mark_failed();
            }
        }

        session
    }

    /// Stages available through [`WorkflowOrchestrator::run_single`]
    pub const SINGLE_STAGES: [StageKind; 3] =
        [StageKind::Technical, StageKind::Fundamental, StageKind::Risk];

    /// Quick analysis of one symbol with a single stage
    ///
    /// Collects data for `symbol` and runs only `stage`, returning its result
    /// without creating a session. Only the stages in
    /// [`Self::SINGLE_STAGES`] are supported.
    pub async fn run_single(&self, symbol: &str, stage: StageKind) -> Result<Value> {
        if !Self::SINGLE_STAGES.contains(&stage) {
            return Err(Error::Stage {
                phase: stage.name().to_string(),
                reason: "not available as a single-symbol analysis".to_string(),
            });
        }

        let request = AnalysisRequest::new(format!("{stage} for {symbol}"), [symbol]);
        let mut scratch = AnalysisSession::new(&request);
        info!(symbol = %symbol, stage = %stage, "Starting single-symbol analysis");

        let snapshot = self.collect(&request, &mut scratch).await?;
        for warning in scratch.errors() {
            warn!(symbol = %symbol, "{warning}");
        }

        match capture_stage(self.runner.as_ref(), stage, &snapshot) {
            StageOutcome::Completed(value) => Ok(value),
            StageOutcome::Failed(reason) => Err(Error::Stage {
                phase: stage.name().to_string(),
                reason,
            }),
        }
    }

    async fn execute(&self, request: &AnalysisRequest, session: &mut AnalysisSession) -> Result<()> {
        session.start_phase(AnalysisPhase::DataCollection)?;
        info!(phase = %AnalysisPhase::DataCollection, "Phase started");
        let snapshot = match self.collect(request, session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                session.fail_phase(AnalysisPhase::DataCollection, &e.to_string())?;
                return Err(e);
            }
        };
        session.complete_phase(
            AnalysisPhase::DataCollection,
            Some(json!({
                "symbols_with_prices": snapshot.symbols_with_prices(),
                "price_summary": snapshot.price_summaries(),
                "company_profiles": snapshot.companies.len(),
                "macro_indicators": snapshot.macro_indicators.len(),
                "news_items": snapshot.news.values().map(Vec::len).sum::<usize>(),
            })),
        )?;

        let snapshot = Arc::new(snapshot);
        if self.config.parallel_stages {
            self.run_stages_parallel(session, &snapshot).await?;
        } else {
            self.run_stages_sequential(session, &snapshot)?;
        }

        session.start_phase(AnalysisPhase::Report)?;
        info!(phase = %AnalysisPhase::Report, "Phase started");
        let input = ReportInput::from_session(session, &snapshot);
        match self.synthesizer.synthesize(&input).await {
            Ok(report) => {
                session.complete_phase(AnalysisPhase::Report, None)?;
                session.set_report(report);
            }
            Err(e) => {
                session.fail_phase(AnalysisPhase::Report, &e.to_string())?;
                return Err(e);
            }
        }

        session.finish();
        Ok(())
    }

    /// Gather prices, profiles, news and macro data
    ///
    /// Per-symbol failures are appended to the session's errors; only a
    /// source-wide failure or an empty request aborts collection.
    async fn collect(
        &self,
        request: &AnalysisRequest,
        session: &mut AnalysisSession,
    ) -> Result<DataSnapshot> {
        request.validate()?;

        let horizon = request.time_horizon;
        let mut snapshot = DataSnapshot::new(request.symbols.clone(), horizon);

        for symbol in &request.symbols {
            match self.source.price_history(symbol, horizon).await {
                Ok(series) => {
                    debug!(symbol = %symbol, bars = series.len(), "Collected price history");
                    snapshot.prices.insert(symbol.clone(), series);
                }
                Err(e) if e.is_source_failure() => return Err(e),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Price history unavailable");
                    session.push_error(format!("Failed to fetch price history for {symbol}: {e}"));
                }
            }

            if self.config.is_crypto(symbol) {
                debug!(symbol = %symbol, "Skipping company profile for crypto asset");
            } else {
                match self.source.company_profile(symbol).await {
                    Ok(Some(profile)) => {
                        snapshot.companies.insert(symbol.clone(), profile);
                    }
                    Ok(None) => debug!(symbol = %symbol, "No company profile"),
                    Err(e) if e.is_source_failure() => return Err(e),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Company profile unavailable");
                        session.push_error(format!("Failed to fetch company info for {symbol}: {e}"));
                    }
                }
            }

            match self.source.news(symbol).await {
                Ok(items) if items.is_empty() => debug!(symbol = %symbol, "No news"),
                Ok(items) => {
                    snapshot.news.insert(symbol.clone(), items);
                }
                Err(e) if e.is_source_failure() => return Err(e),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "News unavailable");
                    session.push_error(format!("Failed to fetch news for {symbol}: {e}"));
                }
            }
        }

        match self.source.macro_indicators().await {
            Ok(indicators) => snapshot.macro_indicators = indicators,
            Err(e) if e.is_source_failure() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Macro indicators unavailable");
                session.push_error(format!("Failed to fetch macro indicators: {e}"));
            }
        }

        let benchmark = &self.config.benchmark_symbol;
        if !snapshot.prices.contains_key(benchmark) && !request.symbols.contains(benchmark) {
            match self.source.price_history(benchmark, horizon).await {
                Ok(series) => {
                    snapshot.prices.insert(benchmark.clone(), series);
                }
                Err(e) => debug!(symbol = %benchmark, error = %e, "Benchmark unavailable"),
            }
        }

        info!(
            requested = request.symbols.len(),
            with_prices = snapshot.symbols_with_prices().len(),
            "Data collection finished"
        );
        Ok(snapshot)
    }

    fn run_stages_sequential(
        &self,
        session: &mut AnalysisSession,
        snapshot: &DataSnapshot,
    ) -> Result<()> {
        for stage in StageKind::ALL {
            session.start_phase(stage.phase())?;
            info!(phase = %stage, "Phase started");
            let outcome = capture_stage(self.runner.as_ref(), stage, snapshot);
            Self::record_outcome(session, stage, outcome)?;
        }
        Ok(())
    }

    async fn run_stages_parallel(
        &self,
        session: &mut AnalysisSession,
        snapshot: &Arc<DataSnapshot>,
    ) -> Result<()> {
        for stage in StageKind::ALL {
            session.start_phase(stage.phase())?;
            info!(phase = %stage, "Phase started");
        }

        let handles = StageKind::ALL.map(|stage| {
            let runner = Arc::clone(&self.runner);
            let snapshot = Arc::clone(snapshot);
            tokio::task::spawn_blocking(move || capture_stage(runner.as_ref(), stage, &snapshot))
        });
        let joined = join_all(handles).await;

        for (stage, result) in StageKind::ALL.into_iter().zip(joined) {
            let outcome = result
                .unwrap_or_else(|e| StageOutcome::Failed(format!("stage task failed: {e}")));
            Self::record_outcome(session, stage, outcome)?;
        }
        Ok(())
    }

    fn record_outcome(
        session: &mut AnalysisSession,
        stage: StageKind,
        outcome: StageOutcome,
    ) -> Result<()> {
        match outcome {
            StageOutcome::Completed(value) => {
                session.complete_phase(stage.phase(), Some(value))?;
                info!(phase = %stage, "Phase completed");
            }
            StageOutcome::Failed(message) => {
                warn!(phase = %stage, error = %message, "Phase failed, continuing");
                session.fail_phase(stage.phase(), &message)?;
            }
        }
        Ok(())
    }
}

/// Builder for WorkflowOrchestrator
pub struct WorkflowOrchestratorBuilder {
    source: Option<Arc<dyn MarketDataSource>>,
    runner: Option<Arc<dyn StageRunner>>,
    synthesizer: Option<Arc<dyn ReportSynthesizer>>,
    config: WorkflowConfig,
}

impl WorkflowOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            runner: None,
            synthesizer: None,
            config: WorkflowConfig::default(),
        }
    }

    /// Set the market data source (required)
    pub fn source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the stage runner; defaults to [`AnalysisStageRunner`]
    pub fn runner(mut self, runner: Arc<dyn StageRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Replace the report synthesizer; defaults to [`DigestSynthesizer`]
    pub fn synthesizer(mut self, synthesizer: Arc<dyn ReportSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn parallel_stages(mut self, parallel: bool) -> Self {
        self.config.parallel_stages = parallel;
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<WorkflowOrchestrator> {
        let source = self
            .source
            .ok_or_else(|| Error::Config("Market data source not set".to_string()))?;
        self.config.validate()?;

        let config = Arc::new(self.config);
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(AnalysisStageRunner::new(Arc::clone(&config))));
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| Arc::new(DigestSynthesizer::new()));

        Ok(WorkflowOrchestrator {
            source,
            runner,
            synthesizer,
            config,
        })
    }
}

impl Default for WorkflowOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use crate::source::{InMemorySource, MockMarketDataSource};
    use advisor_core::{CompanyProfile, MacroSnapshot, NewsItem, PricePoint, PriceSeries, TimeHorizon};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(n: usize, base: f64, amplitude: f64, drift: f64) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let t = i as f64;
                let close = base + amplitude * (t * 0.15).sin() + drift * t;
                PricePoint::new(
                    start + Duration::days(i as i64),
                    close,
                    close * 1.01,
                    close * 0.99,
                    close,
                    1_000_000.0,
                )
            })
            .collect()
    }

    fn market() -> InMemorySource {
        InMemorySource::new()
            .with_prices("AAPL", bars(260, 150.0, 6.0, 0.2))
            .with_prices("MSFT", bars(260, 300.0, 10.0, 0.1))
            .with_prices("BTC", bars(260, 40_000.0, 3_000.0, 20.0))
            .with_prices("SPY", bars(260, 400.0, 8.0, 0.15))
            .with_company(
                "AAPL",
                CompanyProfile {
                    sector: Some("Technology".to_string()),
                    pe_ratio: Some(28.0),
                    profit_margin: Some(0.25),
                    analyst_grades: vec!["Buy".to_string()],
                    ..Default::default()
                },
            )
            .with_company("MSFT", CompanyProfile::default())
            .with_macro("gdp_growth", 2.4)
            .with_macro("unemployment", 3.9)
            .with_macro("inflation", 3.1)
            .with_macro("fed_funds_rate", 5.25)
            .with_macro("vix", 16.0)
            .with_news(
                "AAPL",
                vec![NewsItem::new("Apple beats estimates on strong services growth", "Wire")],
            )
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("Review my portfolio", ["aapl", "MSFT", "btc"])
            .with_time_horizon(TimeHorizon::Long)
    }

    fn orchestrator(source: InMemorySource) -> WorkflowOrchestrator {
        WorkflowOrchestrator::builder()
            .source(Arc::new(source))
            .build()
            .unwrap()
    }

    /// Delegates to the real stages except for one that errors or panics
    struct SabotagedRunner {
        inner: AnalysisStageRunner,
        target: StageKind,
        panic: bool,
    }

    impl SabotagedRunner {
        fn new(target: StageKind, panic: bool) -> Self {
            Self {
                inner: AnalysisStageRunner::new(Arc::new(WorkflowConfig::default())),
                target,
                panic,
            }
        }
    }

    impl StageRunner for SabotagedRunner {
        fn run(&self, stage: StageKind, snapshot: &DataSnapshot) -> Result<Value> {
            if stage == self.target {
                if self.panic {
                    panic!("{stage} blew up");
                }
                return Err(Error::Stage {
                    phase: stage.name().to_string(),
                    reason: "forced failure".to_string(),
                });
            }
            self.inner.run(stage, snapshot)
        }
    }

    struct FailingSynthesizer;

    #[async_trait]
    impl ReportSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _input: &ReportInput) -> Result<Value> {
            Err(Error::Generic("template missing".to_string()))
        }
    }

    fn statuses(session: &AnalysisSession) -> Vec<(AnalysisPhase, PhaseStatus)> {
        session.phases().iter().map(|r| (r.phase, r.status)).collect()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let session = orchestrator(market()).run(request()).await;

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.current_phase(), AnalysisPhase::Completed);
        assert!(session.errors().is_empty(), "{:?}", session.errors());
        assert!(!session.is_degraded());
        assert_eq!(session.phases().len(), 7);
        assert!(session.phases().iter().all(|r| r.status == PhaseStatus::Completed));
        assert_eq!(session.results().len(), 6);
        assert_eq!(session.symbols(), ["AAPL", "MSFT", "BTC"]);

        let collection = session.result(AnalysisPhase::DataCollection).unwrap();
        assert_eq!(collection["price_summary"]["AAPL"]["data_points"], 260);
        assert!(collection["price_summary"].get("SPY").is_some());

        let fundamentals = session.result(AnalysisPhase::Fundamental).unwrap();
        assert_eq!(fundamentals["skipped_crypto"][0], "BTC");

        let risk = session.result(AnalysisPhase::Risk).unwrap();
        assert!(risk["symbols"]["AAPL"]["beta"].is_number());

        let report = session.report().unwrap();
        assert_eq!(report["recommendations"].as_array().unwrap().len(), 3);
        assert_eq!(report["unavailable_stages"], serde_json::json!([]));

        // every stage that produced output for a symbol casts a vote
        let aapl = &report["recommendations"][0];
        assert_eq!(aapl["symbol"], "AAPL");
        for stage in [
            "technical_analysis",
            "fundamental_analysis",
            "risk_analysis",
            "sentiment_analysis",
        ] {
            assert!(aapl["signals"].get(stage).is_some(), "AAPL missing {stage} vote");
        }

        let btc = &report["recommendations"][2];
        assert_eq!(btc["symbol"], "BTC");
        assert!(btc["signals"].get("technical_analysis").is_some());
        assert!(btc["signals"].get("risk_analysis").is_some());
        assert!(btc["signals"].get("fundamental_analysis").is_none());
        assert!(btc["signals"].get("sentiment_analysis").is_none());
    }

    fn mock_source_for(symbols: &'static [&'static str]) -> MockMarketDataSource {
        let mut source = MockMarketDataSource::new();
        source.expect_price_history().returning(move |symbol, _| {
            if symbols.iter().any(|s| *s == symbol) {
                PriceSeries::new(symbol, bars(260, 150.0, 6.0, 0.2))
            } else {
                Err(Error::data_unavailable(symbol, "unknown symbol"))
            }
        });
        source
            .expect_company_profile()
            .returning(|_| Ok(Some(CompanyProfile::default())));
        source.expect_news().returning(|_| Ok(Vec::new()));
        source
            .expect_macro_indicators()
            .returning(|| Ok(MacroSnapshot::new()));
        source
    }

    #[tokio::test]
    async fn test_run_single_stage() {
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(mock_source_for(&["AAPL", "SPY"])))
            .build()
            .unwrap();

        let risk = orchestrator.run_single("aapl", StageKind::Risk).await.unwrap();
        assert_eq!(risk["benchmark"], "SPY");
        assert!(risk["symbols"]["AAPL"]["beta"].is_number());
        assert!(risk["symbols"].get("SPY").is_none());

        let technical = orchestrator
            .run_single("AAPL", StageKind::Technical)
            .await
            .unwrap();
        assert!(technical["symbols"]["AAPL"]["overall"]["direction"].is_string());

        let fundamental = orchestrator
            .run_single("AAPL", StageKind::Fundamental)
            .await
            .unwrap();
        assert!(fundamental["symbols"]["AAPL"]["overall_score"].is_number());
    }

    #[tokio::test]
    async fn test_run_single_failures() {
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(mock_source_for(&[])))
            .build()
            .unwrap();

        let err = orchestrator
            .run_single("ZZZZ", StageKind::Technical)
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Stage { phase, .. } if phase == "technical_analysis"));
        assert!(err.to_string().contains("ZZZZ"));

        // unsupported stages are rejected before touching the source
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(MockMarketDataSource::new()))
            .build()
            .unwrap();
        for stage in [StageKind::Macro, StageKind::Sentiment] {
            let err = orchestrator.run_single("AAPL", stage).await.unwrap_err();
            assert!(matches!(err, Error::Stage { .. }), "{stage}");
        }
    }

    #[tokio::test]
    async fn test_run_single_source_outage() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_price_history()
            .returning(|_, _| Err(Error::SourceUnavailable("down".to_string())));
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(source))
            .build()
            .unwrap();

        let err = orchestrator.run_single("AAPL", StageKind::Risk).await.unwrap_err();
        assert!(err.is_source_failure());
    }

    #[tokio::test]
    async fn test_stage_error_is_isolated() {
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(market()))
            .runner(Arc::new(SabotagedRunner::new(StageKind::Technical, false)))
            .build()
            .unwrap();

        let session = orchestrator.run(request()).await;

        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.is_degraded());
        assert_eq!(session.errors().len(), 1);
        assert!(session.errors()[0].starts_with("technical_analysis"));
        assert!(session.result(AnalysisPhase::Technical).is_none());
        for phase in [
            AnalysisPhase::Macro,
            AnalysisPhase::Fundamental,
            AnalysisPhase::Risk,
            AnalysisPhase::Sentiment,
        ] {
            assert!(session.result(phase).is_some(), "{phase}");
        }

        let report = session.report().unwrap();
        assert_eq!(report["unavailable_stages"][0], "technical_analysis");
    }

    #[tokio::test]
    async fn test_stage_panic_is_isolated() {
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(market()))
            .runner(Arc::new(SabotagedRunner::new(StageKind::Risk, true)))
            .build()
            .unwrap();

        let session = orchestrator.run(request()).await;

        assert_eq!(session.status(), SessionStatus::Completed);
        let record = session.phase_record(AnalysisPhase::Risk).unwrap();
        assert_eq!(record.status, PhaseStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("risk_analysis blew up"));
        assert_eq!(
            session.phase_record(AnalysisPhase::Sentiment).unwrap().status,
            PhaseStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_source_outage_fails_session() {
        let mut source = MockMarketDataSource::new();
        source
            .expect_price_history()
            .times(1)
            .returning(|_, _| Err(Error::SourceUnavailable("maintenance window".to_string())));
        source.expect_company_profile().never();
        source.expect_macro_indicators().never();

        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(source))
            .build()
            .unwrap();
        let session = orchestrator.run(request()).await;

        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.current_phase(), AnalysisPhase::Failed);
        assert_eq!(
            statuses(&session),
            vec![(AnalysisPhase::DataCollection, PhaseStatus::Failed)]
        );
        assert_eq!(
            session.errors(),
            ["data_collection: Data source unavailable: maintenance window"]
        );
        assert!(session.report().is_none());
        assert!(session.results().is_empty());
    }

    #[tokio::test]
    async fn test_per_symbol_failures_are_isolated() {
        let session = orchestrator(market())
            .run(AnalysisRequest::new("check", ["AAPL", "ZZZZ"]))
            .await;

        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(!session.is_degraded());
        assert_eq!(session.errors().len(), 1);
        assert!(
            session.errors()[0].starts_with("Failed to fetch price history for ZZZZ: Data not available")
        );

        let technical = session.result(AnalysisPhase::Technical).unwrap();
        assert_eq!(technical["missing"][0], "ZZZZ");
    }

    #[tokio::test]
    async fn test_no_prices_fails_price_stages_only() {
        let source = InMemorySource::new().with_macro("vix", 25.0);
        let session = orchestrator(source)
            .run(AnalysisRequest::new("check", ["AAPL"]))
            .await;

        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.is_degraded());
        let failed: Vec<AnalysisPhase> = session
            .phases()
            .iter()
            .filter(|r| r.status == PhaseStatus::Failed)
            .map(|r| r.phase)
            .collect();
        assert_eq!(failed, vec![AnalysisPhase::Technical, AnalysisPhase::Risk]);
        assert!(session.report().is_some());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let run = |parallel: bool, sabotage: Option<StageKind>| {
            let mut builder = WorkflowOrchestrator::builder()
                .source(Arc::new(market()))
                .parallel_stages(parallel);
            if let Some(stage) = sabotage {
                builder = builder.runner(Arc::new(SabotagedRunner::new(stage, true)));
            }
            async move { builder.build().unwrap().run(request()).await }
        };

        let sequential = run(false, None).await;
        let parallel = run(true, None).await;
        assert_eq!(parallel.status(), SessionStatus::Completed);
        assert_eq!(statuses(&parallel), statuses(&sequential));
        assert_eq!(
            parallel.result(AnalysisPhase::Risk),
            sequential.result(AnalysisPhase::Risk)
        );

        let sequential = run(false, Some(StageKind::Fundamental)).await;
        let parallel = run(true, Some(StageKind::Fundamental)).await;
        assert_eq!(statuses(&parallel), statuses(&sequential));
        assert_eq!(parallel.errors(), sequential.errors());
        assert!(parallel.is_degraded());
        assert!(parallel.result(AnalysisPhase::Fundamental).is_none());
    }

    #[tokio::test]
    async fn test_synthesizer_failure_fails_session() {
        let orchestrator = WorkflowOrchestrator::builder()
            .source(Arc::new(market()))
            .synthesizer(Arc::new(FailingSynthesizer))
            .build()
            .unwrap();

        let session = orchestrator.run(request()).await;

        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(session.report().is_none());
        assert_eq!(
            session.phase_record(AnalysisPhase::Report).unwrap().status,
            PhaseStatus::Failed
        );
        assert_eq!(session.errors(), ["report: template missing"]);
        // stage results survive the failed synthesis
        assert_eq!(session.results().len(), 6);
    }

    #[tokio::test]
    async fn test_empty_request_fails_collection() {
        let session = orchestrator(market())
            .run(AnalysisRequest::new("nothing", Vec::<String>::new()))
            .await;

        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.errors(), ["data_collection: Invalid symbol: no symbols requested"]);
    }

    #[test]
    fn test_builder_requires_source() {
        let err = WorkflowOrchestrator::builder().build().err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        let bad_config = WorkflowConfig {
            var_horizon: 0,
            ..Default::default()
        };
        let err = WorkflowOrchestrator::builder()
            .source(Arc::new(InMemorySource::new()))
            .config(bad_config)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
