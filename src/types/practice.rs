//! Practice gate state

use serde::{Deserialize, Serialize};

use crate::types::ReasonCode;

/// Counters owned by the practice gate for the gating phase only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeState {
    /// Completed passes that were not perfect
    pub attempts_failed: u32,
    pub passed: bool,
}

/// Where the gate currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatePhase {
    /// Running the practice set
    Practicing,
    /// Scoring the pass just completed
    Evaluating,
    /// Imperfect pass, going again
    Retry,
    /// Main task unlocked
    Passed,
    /// Attempt budget exhausted
    Failed,
}

impl GatePhase {
    /// Passed and Failed end the gate
    pub fn is_terminal(&self) -> bool {
        matches!(self, GatePhase::Passed | GatePhase::Failed)
    }
}

impl std::fmt::Display for GatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GatePhase::Practicing => "PRACTICING",
            GatePhase::Evaluating => "EVALUATING",
            GatePhase::Retry => "RETRY",
            GatePhase::Passed => "PASSED",
            GatePhase::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Result of evaluating one full pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassEvaluation {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    /// One of Retry, Passed, Failed
    pub next: GatePhase,
    pub reason: ReasonCode,
}
