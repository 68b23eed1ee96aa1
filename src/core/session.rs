//! Session orchestration
//!
//! Plan (sample + order) once, up front. Then practice; the main timeline
//! only runs if the gate passes. Practice data is exported either way.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::export::ExportPayload;
use crate::core::practice::{PracticeGate, PracticeOutcome};
use crate::core::runner::{Keyboard, Screen, TrialRunner};
use crate::core::sampler::{Sampler, SamplingReport};
use crate::core::sequence::{SequenceBuilder, SequenceStrategy, Violation};
use crate::core::StatementPool;
use crate::types::{Block, KeyConfig, OutcomeRecord, ReasonCode, SampleError, StudyConfig, TrialSpec};

pub const PRACTICE_FAILED_NOTICE: &str =
    "Thank you for your time. The practice round was not completed, so the main task will not start.";

pub const COMPLETED_NOTICE: &str = "Thank you. The task is complete.";

/// Opening instructions for the configured keys
pub fn instructions(keys: &KeyConfig) -> String {
    format!(
        "You will see short statements. Press {} for False and {} for True. \
         Answer as quickly and accurately as you can.",
        keys.false_key.to_ascii_uppercase(),
        keys.true_key.to_ascii_uppercase()
    )
}

/// Timestamp plus a random suffix
pub fn generate_session_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{:06x}",
        Utc::now().format("%Y%m%dT%H%M%S"),
        rng.gen_range(0..0x100_0000u32)
    )
}

// =============================================================================
// PLAN
// =============================================================================

/// Ordered main-task trials for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionPlan {
    pub session_id: String,
    pub trials: Vec<TrialSpec>,
    pub sampling: SamplingReport,
    pub strategy: SequenceStrategy,
    pub violation: Option<Violation>,
}

impl SessionPlan {
    /// Assemble and order the trial set. Runs once, before any trial.
    pub fn build<R: Rng + ?Sized>(
        session_id: impl Into<String>,
        pool: &StatementPool,
        config: &StudyConfig,
        rng: &mut R,
    ) -> Result<Self, SampleError> {
        let set = Sampler::new(pool, &config.sampling).assemble(rng)?;
        let sampling = set.report.clone();
        let outcome = SequenceBuilder::new(config.sequence).build(set.into_trials(), rng);

        let plan = Self {
            session_id: session_id.into(),
            trials: outcome.trials,
            sampling,
            strategy: outcome.strategy,
            violation: outcome.violation,
        };
        info!(
            session = %plan.session_id,
            trials = plan.trials.len(),
            sampling = plan.sampling.reason().code(),
            sequence = plan.strategy.reason().code(),
            "session planned"
        );
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Sampling and sequencing reason codes
    pub fn reasons(&self) -> [ReasonCode; 2] {
        [self.sampling.reason(), self.strategy.reason()]
    }
}

// =============================================================================
// RUN
// =============================================================================

/// How the session ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed {
        practice: PracticeOutcome,
        main_trials: usize,
    },
    PracticeFailed {
        practice: PracticeOutcome,
    },
}

impl SessionOutcome {
    pub fn practice(&self) -> &PracticeOutcome {
        match self {
            SessionOutcome::Completed { practice, .. } => practice,
            SessionOutcome::PracticeFailed { practice } => practice,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }

    pub fn reason(&self) -> ReasonCode {
        match self {
            SessionOutcome::Completed { .. } => ReasonCode::P001_PRACTICE_PASSED,
            SessionOutcome::PracticeFailed { .. } => ReasonCode::P003_PRACTICE_FAILED,
        }
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub records: Vec<OutcomeRecord>,
    pub payload: ExportPayload,
}

/// One participant run over a fixed plan
pub struct Session<'a> {
    config: &'a StudyConfig,
    plan: &'a SessionPlan,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a StudyConfig, plan: &'a SessionPlan) -> Self {
        Self { config, plan }
    }

    /// Practice, then the main timeline if practice passed. Returns the
    /// screen back along with the report.
    pub async fn run<S, R>(&self, screen: S, keyboard: Keyboard, rng: &mut R) -> (S, SessionReport)
    where
        S: Screen,
        R: Rng + ?Sized,
    {
        let mut runner = TrialRunner::new(screen, keyboard, self.config);
        runner
            .screen_mut()
            .show_notice(&instructions(&self.config.keys));

        let gate = PracticeGate::new(&self.config.practice);
        let practice = gate.run(&mut runner, rng).await;

        let outcome = if practice.passed() {
            let main_trials = runner.run_all(&self.plan.trials, Block::Main).await.len();
            runner.screen_mut().show_notice(COMPLETED_NOTICE);
            SessionOutcome::Completed {
                practice,
                main_trials,
            }
        } else {
            warn!(session = %self.plan.session_id, "main task locked after practice");
            runner.screen_mut().show_notice(PRACTICE_FAILED_NOTICE);
            SessionOutcome::PracticeFailed { practice }
        };

        let (screen, records) = runner.into_parts();
        let payload = ExportPayload::build(&self.plan.session_id, &records);
        info!(
            session = %self.plan.session_id,
            records = records.len(),
            reason = outcome.reason().code(),
            "session finished"
        );

        (
            screen,
            SessionReport {
                outcome,
                records,
                payload,
            },
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::is_valid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_plan_shape() {
        let pool = StatementPool::with_default_catalog().unwrap();
        let config = StudyConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let plan = SessionPlan::build("s-1", &pool, &config, &mut rng).unwrap();

        assert_eq!(plan.len(), 98);
        assert!(plan.violation.is_none());
        assert!(is_valid(&plan.trials, &config.sequence));

        let mut indices: Vec<usize> = plan.trials.iter().map(|t| t.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..98).collect::<Vec<_>>());
    }

    #[test]
    fn test_session_id_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = generate_session_id(&mut rng);
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert_eq!(stamp.len(), 15);
        assert_eq!(suffix.len(), 6);
    }

    #[test]
    fn test_instructions_name_keys() {
        let text = instructions(&KeyConfig::default());
        assert!(text.contains("Press F for False and J for True"));
    }
}
