//! Reason codes for non-error outcomes
//!
//! Sampling shortfalls, sequencing fallbacks and practice verdicts are
//! expected protocol outcomes. They are labelled here for logs and JSON
//! output instead of being raised as errors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // C: Sampling
    // =========================================================================
    /// Every derived counterpart was found in the pool
    C001_SAMPLE_COMPLETE,
    /// A derived counterpart was absent from the pool and dropped
    C002_COUNTERPART_DROPPED,
    /// A party's union fell short of its target size
    C003_TARGET_SHORTFALL,

    // =========================================================================
    // S: Sequencing
    // =========================================================================
    /// A pure shuffle satisfied every constraint
    S001_SEQUENCE_SHUFFLED,
    /// Greedy repair produced a valid order
    S002_SEQUENCE_REPAIRED,
    /// A shuffle of the repaired set produced a valid order
    S003_SEQUENCE_RESHUFFLED,
    /// No valid order found, best effort returned
    S004_SEQUENCE_BEST_EFFORT,

    // =========================================================================
    // P: Practice gate
    // =========================================================================
    /// Perfect pass, main task unlocked
    P001_PRACTICE_PASSED,
    /// Imperfect pass, attempts remain
    P002_PRACTICE_RETRY,
    /// Attempt budget exhausted
    P003_PRACTICE_FAILED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::C001_SAMPLE_COMPLETE => "C001_SAMPLE_COMPLETE",
            Self::C002_COUNTERPART_DROPPED => "C002_COUNTERPART_DROPPED",
            Self::C003_TARGET_SHORTFALL => "C003_TARGET_SHORTFALL",
            Self::S001_SEQUENCE_SHUFFLED => "S001_SEQUENCE_SHUFFLED",
            Self::S002_SEQUENCE_REPAIRED => "S002_SEQUENCE_REPAIRED",
            Self::S003_SEQUENCE_RESHUFFLED => "S003_SEQUENCE_RESHUFFLED",
            Self::S004_SEQUENCE_BEST_EFFORT => "S004_SEQUENCE_BEST_EFFORT",
            Self::P001_PRACTICE_PASSED => "P001_PRACTICE_PASSED",
            Self::P002_PRACTICE_RETRY => "P002_PRACTICE_RETRY",
            Self::P003_PRACTICE_FAILED => "P003_PRACTICE_FAILED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::C001_SAMPLE_COMPLETE => "All counterparts present",
            Self::C002_COUNTERPART_DROPPED => "Counterpart missing from pool",
            Self::C003_TARGET_SHORTFALL => "Party set below target size",
            Self::S001_SEQUENCE_SHUFFLED => "Shuffle satisfied constraints",
            Self::S002_SEQUENCE_REPAIRED => "Greedy repair satisfied constraints",
            Self::S003_SEQUENCE_RESHUFFLED => "Reshuffled repaired set",
            Self::S004_SEQUENCE_BEST_EFFORT => "Constraints not fully satisfied",
            Self::P001_PRACTICE_PASSED => "Practice passed",
            Self::P002_PRACTICE_RETRY => "Practice repeated",
            Self::P003_PRACTICE_FAILED => "Practice attempts exhausted",
        }
    }

    /// True for outcomes worth a warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::C002_COUNTERPART_DROPPED | Self::C003_TARGET_SHORTFALL | Self::S004_SEQUENCE_BEST_EFFORT
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
