//! Multi-phase investment analysis workflow
//!
//! A [`WorkflowOrchestrator`] takes an [`AnalysisRequest`], collects market
//! data through a [`MarketDataSource`], runs the five analysis stages
//! (macro, technical, fundamental, risk, sentiment) and hands their results to
//! a [`ReportSynthesizer`]. Progress, per-phase results and errors are kept in
//! the returned [`AnalysisSession`].
//!
//! A failing stage does not stop the run: the session completes in a degraded
//! state and the report lists the stages that were unavailable.

pub mod config;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod stages;

// Re-export for convenience
pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use orchestrator::{WorkflowOrchestrator, WorkflowOrchestratorBuilder};
pub use report::{Action, DigestSynthesizer, ReportInput, ReportSynthesizer};
pub use runner::{AnalysisStageRunner, StageOutcome, StageRunner, capture_stage};
pub use session::{
    AnalysisPhase, AnalysisRequest, AnalysisSession, PhaseRecord, PhaseStatus, SessionStatus,
};
pub use snapshot::{DataSnapshot, PriceSummary};
pub use source::{InMemorySource, MarketDataSource};
pub use stages::StageKind;
