//! Analysis session state and phase bookkeeping

use advisor_core::{Error, Result, TimeHorizon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Phases of an analysis session, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisPhase {
    #[serde(rename = "initialized")]
    Initialized,
    #[serde(rename = "data_collection")]
    DataCollection,
    #[serde(rename = "macro_analysis")]
    Macro,
    #[serde(rename = "technical_analysis")]
    Technical,
    #[serde(rename = "fundamental_analysis")]
    Fundamental,
    #[serde(rename = "risk_analysis")]
    Risk,
    #[serde(rename = "sentiment_analysis")]
    Sentiment,
    #[serde(rename = "report")]
    Report,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl AnalysisPhase {
    /// Name used for result keys and error prefixes
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::DataCollection => "data_collection",
            Self::Macro => "macro_analysis",
            Self::Technical => "technical_analysis",
            Self::Fundamental => "fundamental_analysis",
            Self::Risk => "risk_analysis",
            Self::Sentiment => "sentiment_analysis",
            Self::Report => "report",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Lifecycle of one phase within a session
///
/// Transitions only move forward: pending -> in_progress -> completed | failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: AnalysisPhase,
    pub status: PhaseStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl PhaseRecord {
    pub fn new(phase: AnalysisPhase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(PhaseStatus::Pending, PhaseStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(PhaseStatus::InProgress, PhaseStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(PhaseStatus::InProgress, PhaseStatus::Failed)?;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, expected: PhaseStatus, next: PhaseStatus) -> Result<()> {
        if self.status != expected {
            return Err(Error::InvalidTransition {
                phase: self.phase.to_string(),
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Terminal status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Failed,
}

/// What the caller asked to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub request: String,
    pub symbols: Vec<String>,
    pub time_horizon: TimeHorizon,
}

impl AnalysisRequest {
    /// Symbols are trimmed, upper-cased and de-duplicated in first-seen order;
    /// blank entries are dropped
    pub fn new<I, S>(request: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_uppercase();
            if !symbol.is_empty() && !normalized.contains(&symbol) {
                normalized.push(symbol);
            }
        }

        Self {
            request: request.into(),
            symbols: normalized,
            time_horizon: TimeHorizon::default(),
        }
    }

    pub fn with_time_horizon(mut self, horizon: TimeHorizon) -> Self {
        self.time_horizon = horizon;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::InvalidSymbol("no symbols requested".to_string()));
        }
        Ok(())
    }
}

/// One end-to-end analysis run
///
/// Only the orchestrator mutates a session; callers get it back read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    session_id: String,
    request: String,
    symbols: Vec<String>,
    time_horizon: TimeHorizon,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    current_phase: AnalysisPhase,
    status: SessionStatus,
    results: BTreeMap<String, Value>,
    phases: Vec<PhaseRecord>,
    errors: Vec<String>,
    report: Option<Value>,
}

impl AnalysisSession {
    pub(crate) fn new(request: &AnalysisRequest) -> Self {
        let mut session_id = Uuid::new_v4().simple().to_string();
        session_id.truncate(8);

        Self {
            session_id,
            request: request.request.clone(),
            symbols: request.symbols.clone(),
            time_horizon: request.time_horizon,
            created_at: Utc::now(),
            completed_at: None,
            current_phase: AnalysisPhase::Initialized,
            status: SessionStatus::InProgress,
            results: BTreeMap::new(),
            phases: Vec::new(),
            errors: Vec::new(),
            report: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn time_horizon(&self) -> TimeHorizon {
        self.time_horizon
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn current_phase(&self) -> AnalysisPhase {
        self.current_phase
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Phase name to result payload
    pub fn results(&self) -> &BTreeMap<String, Value> {
        &self.results
    }

    pub fn result(&self, phase: AnalysisPhase) -> Option<&Value> {
        self.results.get(phase.as_str())
    }

    pub fn phases(&self) -> &[PhaseRecord] {
        &self.phases
    }

    pub fn phase_record(&self, phase: AnalysisPhase) -> Option<&PhaseRecord> {
        self.phases.iter().find(|r| r.phase == phase)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn report(&self) -> Option<&Value> {
        self.report.as_ref()
    }

    /// Completed, but with at least one failed phase
    pub fn is_degraded(&self) -> bool {
        self.status == SessionStatus::Completed
            && self.phases.iter().any(|r| r.status == PhaseStatus::Failed)
    }

    /// One-line progress description, e.g. `"5/7 phases completed, 1 failed"`
    pub fn progress_summary(&self) -> String {
        let completed = self
            .phases
            .iter()
            .filter(|r| r.status == PhaseStatus::Completed)
            .count();
        let failed = self
            .phases
            .iter()
            .filter(|r| r.status == PhaseStatus::Failed)
            .count();
        format!(
            "{completed}/{} phases completed, {failed} failed",
            self.phases.len()
        )
    }

    pub(crate) fn start_phase(&mut self, phase: AnalysisPhase) -> Result<()> {
        if let Some(existing) = self.phase_record(phase) {
            return Err(Error::InvalidTransition {
                phase: phase.to_string(),
                from: existing.status.as_str().to_string(),
                to: PhaseStatus::InProgress.as_str().to_string(),
            });
        }

        let mut record = PhaseRecord::new(phase);
        record.start()?;
        self.phases.push(record);
        self.current_phase = phase;
        Ok(())
    }

    pub(crate) fn complete_phase(&mut self, phase: AnalysisPhase, result: Option<Value>) -> Result<()> {
        self.record_mut(phase)?.complete()?;
        if let Some(result) = result {
            self.results.insert(phase.as_str().to_string(), result);
        }
        Ok(())
    }

    pub(crate) fn fail_phase(&mut self, phase: AnalysisPhase, error: &str) -> Result<()> {
        self.record_mut(phase)?.fail(error)?;
        self.record_error(phase, error);
        Ok(())
    }

    /// Append a `"<phase>: <message>"` error
    pub(crate) fn record_error(&mut self, phase: AnalysisPhase, message: &str) {
        self.errors.push(format!("{phase}: {message}"));
    }

    /// Append an untagged warning such as a per-symbol fetch failure
    pub(crate) fn push_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub(crate) fn set_report(&mut self, report: Value) {
        self.report = Some(report);
    }

    pub(crate) fn finish(&mut self) {
        self.status = SessionStatus::Completed;
        self.current_phase = AnalysisPhase::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self) {
        self.status = SessionStatus::Failed;
        self.current_phase = AnalysisPhase::Failed;
        self.completed_at = Some(Utc::now());
    }

    fn record_mut(&mut self, phase: AnalysisPhase) -> Result<&mut PhaseRecord> {
        self.phases
            .iter_mut()
            .find(|r| r.phase == phase)
            .ok_or_else(|| Error::InvalidTransition {
                phase: phase.to_string(),
                from: PhaseStatus::Pending.as_str().to_string(),
                to: "terminal".to_string(),
            })
    }
}
