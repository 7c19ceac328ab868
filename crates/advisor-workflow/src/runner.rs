//! Stage execution and failure capture

use crate::config::WorkflowConfig;
use crate::snapshot::DataSnapshot;
use crate::stages::StageKind;
use advisor_core::Result;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Executes a single analysis stage
///
/// Stages are CPU-bound and synchronous; the orchestrator moves them onto
/// blocking tasks when running them concurrently.
pub trait StageRunner: Send + Sync {
    fn run(&self, stage: StageKind, snapshot: &DataSnapshot) -> Result<Value>;
}

/// Production runner dispatching to the built-in stages
#[derive(Debug, Clone)]
pub struct AnalysisStageRunner {
    config: Arc<WorkflowConfig>,
}

impl AnalysisStageRunner {
    pub fn new(config: Arc<WorkflowConfig>) -> Self {
        Self { config }
    }
}

impl StageRunner for AnalysisStageRunner {
    fn run(&self, stage: StageKind, snapshot: &DataSnapshot) -> Result<Value> {
        stage.run(snapshot, &self.config)
    }
}

/// Result of one stage after failure capture
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed(Value),
    Failed(String),
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Run `stage`, turning both errors and panics into [`StageOutcome::Failed`]
pub fn capture_stage(
    runner: &dyn StageRunner,
    stage: StageKind,
    snapshot: &DataSnapshot,
) -> StageOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| runner.run(stage, snapshot))) {
        Ok(Ok(value)) => StageOutcome::Completed(value),
        Ok(Err(e)) => StageOutcome::Failed(e.to_string()),
        Err(payload) => StageOutcome::Failed(format!("panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{Error, TimeHorizon};
    use serde_json::json;

    struct ScriptedRunner;

    impl StageRunner for ScriptedRunner {
        fn run(&self, stage: StageKind, _snapshot: &DataSnapshot) -> Result<Value> {
            match stage {
                StageKind::Macro => Ok(json!({"stage": "macro"})),
                StageKind::Technical => Err(Error::Stage {
                    phase: stage.name().to_string(),
                    reason: "indicator overflow".to_string(),
                }),
                StageKind::Risk => panic!("risk model exploded"),
                StageKind::Fundamental => std::panic::panic_any(42_u8),
                StageKind::Sentiment => panic!("{} went {}", "sentiment", "sideways"),
            }
        }
    }

    fn snapshot() -> DataSnapshot {
        DataSnapshot::new(vec!["AAPL".into()], TimeHorizon::Medium)
    }

    #[test]
    fn test_capture_success_and_error() {
        let snapshot = snapshot();
        assert_eq!(
            capture_stage(&ScriptedRunner, StageKind::Macro, &snapshot),
            StageOutcome::Completed(json!({"stage": "macro"}))
        );
        assert_eq!(
            capture_stage(&ScriptedRunner, StageKind::Technical, &snapshot),
            StageOutcome::Failed("Stage technical_analysis failed: indicator overflow".to_string())
        );
    }

    #[test]
    fn test_capture_panics() {
        let snapshot = snapshot();
        assert_eq!(
            capture_stage(&ScriptedRunner, StageKind::Risk, &snapshot),
            StageOutcome::Failed("panicked: risk model exploded".to_string())
        );
        assert_eq!(
            capture_stage(&ScriptedRunner, StageKind::Sentiment, &snapshot),
            StageOutcome::Failed("panicked: sentiment went sideways".to_string())
        );
        assert_eq!(
            capture_stage(&ScriptedRunner, StageKind::Fundamental, &snapshot),
            StageOutcome::Failed("panicked: unknown panic".to_string())
        );
    }

    #[test]
    fn test_analysis_runner_dispatches() {
        let runner = AnalysisStageRunner::new(Arc::new(WorkflowConfig::default()));
        let outcome = capture_stage(&runner, StageKind::Macro, &snapshot());
        assert!(outcome.is_completed());

        let outcome = capture_stage(&runner, StageKind::Technical, &snapshot());
        assert!(matches!(outcome, StageOutcome::Failed(msg) if msg.contains("AAPL")));
    }
}
