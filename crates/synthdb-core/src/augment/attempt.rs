//! Per-attempt records and loop states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::QualityReport;

/// How one generate-execute-validate attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Ran, printed the success token and passed the quality gate.
    Ok,
    /// The oracle returned no usable code; nothing was executed.
    EmptyCode,
    /// Non-zero exit or output other than the success token.
    RuntimeError,
    Timeout,
    /// Ran successfully but the populated database failed validation.
    QualityFailed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Ok => "ok",
            AttemptOutcome::EmptyCode => "empty_code",
            AttemptOutcome::RuntimeError => "runtime_error",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::QualityFailed => "quality_failed",
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the augmentation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Init,
    Execute,
    Validate,
    RepairExec,
    RepairQuality,
    Success,
    Failed,
}

/// One iteration of the loop, as written to the attempt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    pub iteration: u32,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    pub stderr: String,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<QualityReport>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}
