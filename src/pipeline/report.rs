use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Import,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    Loading,
    Exporting,
    Injecting,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    SuccessWithWarnings,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub operation: Operation,
    pub status: OutcomeStatus,
    /// Source container for imports, destination container for exports.
    pub target: PathBuf,
    /// Artifact written by extraction, or merged by injection.
    pub artifact: Option<PathBuf>,
    pub injected: bool,
    pub warnings: Vec<String>,
    pub cancel_reason: Option<String>,
    pub states: Vec<PipelineState>,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == OutcomeStatus::Cancelled
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Bookkeeping for one pipeline call; turns into a `PipelineReport`.
#[derive(Debug)]
pub(crate) struct PipelineRun {
    operation: Operation,
    target: PathBuf,
    artifact: Option<PathBuf>,
    injected: bool,
    warnings: Vec<String>,
    states: Vec<PipelineState>,
    start: Instant,
}

impl PipelineRun {
    pub fn new(operation: Operation, target: &Path) -> Self {
        Self {
            operation,
            target: target.to_path_buf(),
            artifact: None,
            injected: false,
            warnings: Vec::new(),
            states: vec![PipelineState::Idle],
            start: Instant::now(),
        }
    }

    pub fn enter(&mut self, state: PipelineState) {
        tracing::debug!(operation = ?self.operation, ?state, "Pipeline state");
        self.states.push(state);
    }

    pub fn warn<S: Into<String>>(&mut self, warning: S) {
        let warning = warning.into();
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn set_artifact(&mut self, artifact: &Path) {
        self.artifact = Some(artifact.to_path_buf());
    }

    pub fn mark_injected(&mut self, artifact: &Path) {
        self.set_artifact(artifact);
        self.injected = true;
    }

    pub fn finish(mut self) -> PipelineReport {
        self.enter(PipelineState::Done);
        let status = if self.warnings.is_empty() {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::SuccessWithWarnings
        };
        self.into_report(status, None)
    }

    pub fn cancel<S: Into<String>>(mut self, reason: S) -> PipelineReport {
        self.enter(PipelineState::Failed);
        self.into_report(OutcomeStatus::Cancelled, Some(reason.into()))
    }

    fn into_report(self, status: OutcomeStatus, cancel_reason: Option<String>) -> PipelineReport {
        PipelineReport {
            operation: self.operation,
            status,
            target: self.target,
            artifact: self.artifact,
            injected: self.injected,
            warnings: self.warnings,
            cancel_reason,
            states: self.states,
            duration: self.start.elapsed(),
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_is_success() {
        let mut run = PipelineRun::new(Operation::Export, Path::new("out.fbx"));
        run.enter(PipelineState::Exporting);
        run.enter(PipelineState::Finalizing);

        let report = run.finish();
        assert_eq!(report.status, OutcomeStatus::Success);
        assert_eq!(
            report.states,
            vec![
                PipelineState::Idle,
                PipelineState::Exporting,
                PipelineState::Finalizing,
                PipelineState::Done
            ]
        );
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_warnings_downgrade_status() {
        let mut run = PipelineRun::new(Operation::Import, Path::new("model.fbx"));
        run.warn("extractor exited with code 1");

        let report = run.finish();
        assert_eq!(report.status, OutcomeStatus::SuccessWithWarnings);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_cancel() {
        let run = PipelineRun::new(Operation::Import, Path::new("model.fbx"));
        let report = run.cancel("Extractor not found");

        assert!(report.is_cancelled());
        assert_eq!(report.cancel_reason.as_deref(), Some("Extractor not found"));
        assert_eq!(report.states.last(), Some(&PipelineState::Failed));
    }

    #[test]
    fn test_report_serializes() {
        let mut run = PipelineRun::new(Operation::Export, Path::new("out.fbx"));
        run.mark_injected(Path::new("/c/model.dat"));
        let json = serde_json::to_value(run.finish()).unwrap();

        assert_eq!(json["operation"], "export");
        assert_eq!(json["status"], "success");
        assert_eq!(json["injected"], true);
    }
}
