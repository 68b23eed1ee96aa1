//! Practice Gate
//!
//! Practicing -> Evaluating -> { Retry, Passed, Failed }
//!
//! Each pass runs the whole practice set in a fresh order. Evaluation looks
//! at exactly the last N records (N = practice-set size); a pass scoring
//! below the configured accuracy (all correct by default) costs one
//! attempt. Failed is terminal and locks the main task.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::runner::{Screen, TrialRunner};
use crate::types::{
    Block, GatePhase, OutcomeRecord, PassEvaluation, PracticeConfig, PracticeItem, PracticeState,
    PracticeTrial, ReasonCode,
};

pub const RETRY_NOTICE: &str =
    "Not every answer was correct. Please read each statement carefully and try the practice again.";

/// Score the last `set_len` records and advance the gate state
pub fn transition(
    state: PracticeState,
    pass_records: &[OutcomeRecord],
    set_len: usize,
    budget: u32,
    pass_accuracy: f64,
) -> (PracticeState, PassEvaluation) {
    let start = pass_records.len().saturating_sub(set_len);
    let correct = pass_records[start..].iter().filter(|r| r.is_correct()).count();
    let accuracy = if set_len == 0 {
        0.0
    } else {
        correct as f64 / set_len as f64
    };

    let mut next_state = state;
    let (next, reason) = if set_len > 0 && accuracy >= pass_accuracy {
        next_state.passed = true;
        (GatePhase::Passed, ReasonCode::P001_PRACTICE_PASSED)
    } else {
        next_state.attempts_failed += 1;
        if next_state.attempts_failed >= budget {
            (GatePhase::Failed, ReasonCode::P003_PRACTICE_FAILED)
        } else {
            (GatePhase::Retry, ReasonCode::P002_PRACTICE_RETRY)
        }
    };

    let evaluation = PassEvaluation {
        correct,
        total: set_len,
        accuracy,
        next,
        reason,
    };
    (next_state, evaluation)
}

/// Final gate state plus one evaluation per pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeOutcome {
    pub state: PracticeState,
    pub passes: Vec<PassEvaluation>,
}

impl PracticeOutcome {
    pub fn passed(&self) -> bool {
        self.state.passed
    }

    /// Phase the gate ended in (Passed or Failed)
    pub fn phase(&self) -> GatePhase {
        self.passes
            .last()
            .map(|p| p.next)
            .unwrap_or(GatePhase::Practicing)
    }
}

/// Loops the practice set until it is passed or the budget runs out
#[derive(Debug, Clone)]
pub struct PracticeGate {
    items: Vec<PracticeItem>,
    budget: u32,
    pass_accuracy: f64,
}

impl PracticeGate {
    pub fn new(config: &PracticeConfig) -> Self {
        Self {
            items: config.items.clone(),
            budget: config.attempt_budget,
            pass_accuracy: config.pass_accuracy,
        }
    }

    /// Drive passes on `runner` until a terminal phase
    pub async fn run<S, R>(&self, runner: &mut TrialRunner<S>, rng: &mut R) -> PracticeOutcome
    where
        S: Screen,
        R: Rng + ?Sized,
    {
        let mut state = PracticeState::default();
        let mut passes = Vec::new();
        let mut trials = PracticeTrial::from_items(&self.items);

        loop {
            trials.shuffle(rng);
            debug!(pass = passes.len() + 1, phase = %GatePhase::Practicing, "practice pass");
            let records = runner.run_all(&trials, Block::Practice).await;

            debug!(phase = %GatePhase::Evaluating, "scoring practice pass");
            let (next_state, evaluation) =
                transition(state, records, trials.len(), self.budget, self.pass_accuracy);
            state = next_state;
            passes.push(evaluation);

            if evaluation.next.is_terminal() {
                match evaluation.next {
                    GatePhase::Passed => info!(
                        pass = passes.len(),
                        reason = evaluation.reason.code(),
                        "practice passed"
                    ),
                    _ => warn!(
                        attempts = state.attempts_failed,
                        reason = evaluation.reason.code(),
                        "practice attempts exhausted"
                    ),
                }
                break;
            }

            info!(
                correct = evaluation.correct,
                total = evaluation.total,
                attempts_failed = state.attempts_failed,
                "practice retry"
            );
            runner.screen_mut().show_notice(RETRY_NOTICE);
        }

        PracticeOutcome { state, passes }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(answers: &[bool]) -> Vec<OutcomeRecord> {
        answers
            .iter()
            .enumerate()
            .map(|(index, &correct)| {
                let trial = PracticeTrial {
                    index,
                    item: PracticeItem::new(format!("Item {}", index), true),
                };
                OutcomeRecord::responded(&trial, Block::Practice, 'j', correct, 500)
            })
            .collect()
    }

    #[test]
    fn test_perfect_pass() {
        let records = pass(&[true; 6]);
        let (state, eval) = transition(PracticeState::default(), &records, 6, 2, 1.0);
        assert!(state.passed);
        assert_eq!(state.attempts_failed, 0);
        assert_eq!(eval.next, GatePhase::Passed);
        assert_eq!(eval.accuracy, 1.0);
    }

    #[test]
    fn test_imperfect_then_exhausted() {
        let first = pass(&[true, true, false, true, true, true]);
        let (state, eval) = transition(PracticeState::default(), &first, 6, 2, 1.0);
        assert_eq!(eval.next, GatePhase::Retry);
        assert_eq!(state.attempts_failed, 1);

        let mut all = first.clone();
        all.extend(pass(&[true, true, true, true, false, true]));
        let (state, eval) = transition(state, &all, 6, 2, 1.0);
        assert_eq!(eval.next, GatePhase::Failed);
        assert_eq!(eval.reason, ReasonCode::P003_PRACTICE_FAILED);
        assert_eq!(state.attempts_failed, 2);
        assert!(!state.passed);
    }

    #[test]
    fn test_only_last_pass_counts() {
        let mut all = pass(&[false; 6]);
        all.extend(pass(&[true; 6]));
        let state = PracticeState {
            attempts_failed: 1,
            passed: false,
        };
        let (state, eval) = transition(state, &all, 6, 2, 1.0);
        assert_eq!(eval.next, GatePhase::Passed);
        assert_eq!(eval.correct, 6);
        assert!(state.passed);
    }

    #[test]
    fn test_lower_threshold_accepts_one_miss() {
        let records = pass(&[true, true, true, false, true, true]);
        let (state, eval) = transition(PracticeState::default(), &records, 6, 2, 0.8);
        assert_eq!(eval.next, GatePhase::Passed);
        assert_eq!(eval.reason, ReasonCode::P001_PRACTICE_PASSED);
        assert!(state.passed);

        let records = pass(&[true, true, false, false, true, true]);
        let (_, eval) = transition(PracticeState::default(), &records, 6, 2, 0.8);
        assert_eq!(eval.next, GatePhase::Retry);
    }

    #[test]
    fn test_short_pass_is_not_perfect() {
        let records = pass(&[true; 4]);
        let (_, eval) = transition(PracticeState::default(), &records, 6, 2, 1.0);
        assert_eq!(eval.correct, 4);
        assert_eq!(eval.next, GatePhase::Retry);
    }
}
