//! stereoprobe: party-statement judgment instrument
//!
//! Pool → Sampler → SequenceBuilder → TrialRunner (practice, gated) →
//! TrialRunner (main) → Exporter

pub mod core;
pub mod types;

// =============================================================================
// SUBJECT NOUNS [C] - Canonical party subjects in the curated catalog
// =============================================================================

/// Canonical subject noun for party A
pub const SUBJECT_NOUN_A: &str = "Republicans";

/// Canonical subject noun for party B
pub const SUBJECT_NOUN_B: &str = "Democrats";

// =============================================================================
// SAMPLING [C] - Per-session set sizes
// =============================================================================

/// Typical (stereotype-congruent) coalitional statements drawn per party
pub const TYPICAL_PER_PARTY: usize = 9;

/// Coalitional statements kept per party after the typical + counterpart union
pub const COALITIONAL_TARGET_PER_PARTY: usize = 16;

/// Trait statements per session
pub const TRAIT_COUNT: usize = 32;

/// Issue statements per session
pub const ISSUE_COUNT: usize = 32;

// =============================================================================
// SEQUENCING [C] - Run-length constraints
// =============================================================================

/// Max consecutive trials of one category
pub const MAX_RUN_TYPE: usize = 2;

/// Max consecutive trials of one party
pub const MAX_RUN_PARTY: usize = 2;

/// No exploratory trial in the first N positions
pub const BAN_EXPLORATORY_AT_START: usize = 2;

/// Max consecutive exploratory trials
pub const MAX_EXPLORATORY_RUN: usize = 2;

/// Pure shuffle attempts before greedy repair
pub const MAX_SHUFFLE_ATTEMPTS: usize = 500;

/// Shuffles of the repaired set before settling for best effort
pub const REPAIR_SHUFFLES: usize = 200;

// =============================================================================
// PRACTICE [C]
// =============================================================================

/// Total practice passes allowed before the session ends
pub const PRACTICE_ATTEMPT_BUDGET: u32 = 2;

/// Default share of a practice pass that must be correct
pub const PRACTICE_PASS_ACCURACY: f64 = 1.0;

// =============================================================================
// TIMING [C] - Milliseconds
// =============================================================================

/// Trial timeout (None in config disables it)
pub const TRIAL_TIMEOUT_MS: u64 = 10_000;

/// Blank inter-trial interval
pub const ITI_MS: u64 = 150;

/// Feedback display after a practice trial
pub const FEEDBACK_MS: u64 = 800;

// =============================================================================
// RESPONSE KEYS [C]
// =============================================================================

/// Key meaning "False"
pub const FALSE_KEY: char = 'f';

/// Key meaning "True"
pub const TRUE_KEY: char = 'j';

// =============================================================================
// EXPORT [C]
// =============================================================================

/// Max characters in a single form field (survey embedded-data limit)
pub const MAX_FIELD_LEN: usize = 20_000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
