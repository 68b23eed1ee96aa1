//! Study configuration
//!
//! Every field has a default taken from the crate-level constants, so a
//! config file only needs the values it overrides.

use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, Party, PracticeItem, SubjectNouns};
use crate::{
    BAN_EXPLORATORY_AT_START, COALITIONAL_TARGET_PER_PARTY, FALSE_KEY, FEEDBACK_MS, ISSUE_COUNT,
    ITI_MS, MAX_EXPLORATORY_RUN, MAX_FIELD_LEN, MAX_RUN_PARTY, MAX_RUN_TYPE, MAX_SHUFFLE_ATTEMPTS,
    PRACTICE_ATTEMPT_BUDGET, PRACTICE_PASS_ACCURACY, REPAIR_SHUFFLES, TRAIT_COUNT, TRIAL_TIMEOUT_MS, TRUE_KEY,
    TYPICAL_PER_PARTY,
};

/// A value per party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerParty<T> {
    pub a: T,
    pub b: T,
}

impl<T: Copy> PerParty<T> {
    pub fn both(value: T) -> Self {
        Self { a: value, b: value }
    }

    pub fn get(&self, party: Party) -> T {
        match party {
            Party::A => self.a,
            Party::B => self.b,
        }
    }
}

/// Complete study configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub nouns: SubjectNouns,
    pub sampling: SamplingConfig,
    pub sequence: SequenceConfig,
    pub practice: PracticeConfig,
    pub keys: KeyConfig,
    pub timing: TimingConfig,
    pub export: ExportConfig,
}

/// Per-session set sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Typical statements drawn from each party's sub-pool
    pub typical_per_party: PerParty<usize>,
    /// Union trimmed to this size per party
    pub target_per_party: usize,
    pub trait_count: usize,
    pub issue_count: usize,
    /// Include one exploratory pair
    pub exploratory: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            typical_per_party: PerParty::both(TYPICAL_PER_PARTY),
            target_per_party: COALITIONAL_TARGET_PER_PARTY,
            trait_count: TRAIT_COUNT,
            issue_count: ISSUE_COUNT,
            exploratory: true,
        }
    }
}

/// Run-length constraints and search budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub max_run_type: usize,
    pub max_run_party: usize,
    pub ban_exploratory_at_start: usize,
    pub max_exploratory_run: usize,
    /// Pure shuffles before greedy repair
    pub max_attempts: usize,
    /// Shuffles of the repaired set before settling
    pub repair_shuffles: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_run_type: MAX_RUN_TYPE,
            max_run_party: MAX_RUN_PARTY,
            ban_exploratory_at_start: BAN_EXPLORATORY_AT_START,
            max_exploratory_run: MAX_EXPLORATORY_RUN,
            max_attempts: MAX_SHUFFLE_ATTEMPTS,
            repair_shuffles: REPAIR_SHUFFLES,
        }
    }
}

/// Practice gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Total passes allowed
    pub attempt_budget: u32,
    /// Share of a pass that must be correct, in (0, 1]
    pub pass_accuracy: f64,
    pub items: Vec<PracticeItem>,
    /// Show Correct/Incorrect after each practice trial
    pub feedback: bool,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            attempt_budget: PRACTICE_ATTEMPT_BUDGET,
            pass_accuracy: PRACTICE_PASS_ACCURACY,
            items: vec![
                PracticeItem::new("Dogs are Animals", true),
                PracticeItem::new("Fish are Mammals", false),
                PracticeItem::new("Birds have Feathers", true),
                PracticeItem::new("Rocks are Alive", false),
                PracticeItem::new("Apples are Fruit", true),
                PracticeItem::new("Cars have Wings", false),
            ],
            feedback: true,
        }
    }
}

/// Two response keys mapped to False/True
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub false_key: char,
    pub true_key: char,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            false_key: FALSE_KEY,
            true_key: TRUE_KEY,
        }
    }
}

impl KeyConfig {
    /// Judgment a key stands for, None for unmapped keys
    pub fn meaning(&self, key: char) -> Option<bool> {
        if key.eq_ignore_ascii_case(&self.true_key) {
            Some(true)
        } else if key.eq_ignore_ascii_case(&self.false_key) {
            Some(false)
        } else {
            None
        }
    }

    /// Key that answers with `meaning`
    pub fn key_for(&self, meaning: bool) -> char {
        if meaning {
            self.true_key
        } else {
            self.false_key
        }
    }
}

/// Display durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// None waits until the key source closes
    pub trial_timeout_ms: Option<u64>,
    pub iti_ms: u64,
    /// Uniform jitter added to the ITI
    pub iti_jitter_ms: u64,
    pub feedback_ms: u64,
    /// Fixed pause after a response before advancing
    pub post_response_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            trial_timeout_ms: Some(TRIAL_TIMEOUT_MS),
            iti_ms: ITI_MS,
            iti_jitter_ms: 0,
            feedback_ms: FEEDBACK_MS,
            post_response_delay_ms: 0,
        }
    }
}

/// Export delivery settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Max characters per form field
    pub max_field_len: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_field_len: MAX_FIELD_LEN,
        }
    }
}

impl StudyConfig {
    /// Load from a JSON file and validate
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: StudyConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no session could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        for noun in [&self.nouns.a, &self.nouns.b] {
            if noun.is_empty() || noun.contains(char::is_whitespace) {
                return invalid("subject nouns must be single non-empty words");
            }
        }
        if self.nouns.a == self.nouns.b {
            return invalid("subject nouns must differ");
        }

        if self.keys.false_key.eq_ignore_ascii_case(&self.keys.true_key) {
            return invalid("response keys must differ");
        }
        if self.keys.false_key.is_whitespace() || self.keys.true_key.is_whitespace() {
            return invalid("response keys must be visible characters");
        }

        let seq = &self.sequence;
        if seq.max_run_type == 0 || seq.max_run_party == 0 || seq.max_exploratory_run == 0 {
            return invalid("run-length limits must be at least 1");
        }

        if self.practice.attempt_budget == 0 {
            return invalid("practice attempt budget must be at least 1");
        }
        // NaN fails both comparisons
        let accuracy = self.practice.pass_accuracy;
        if !(accuracy > 0.0 && accuracy <= 1.0) {
            return invalid("practice pass accuracy must be in (0, 1]");
        }
        if self.practice.items.is_empty() {
            return invalid("practice set is empty");
        }

        if self.export.max_field_len == 0 {
            return invalid("max_field_len must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(StudyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StudyConfig =
            serde_json::from_str(r#"{"sequence": {"max_run_type": 3}}"#).unwrap();
        assert_eq!(config.sequence.max_run_type, 3);
        assert_eq!(config.sequence.max_run_party, MAX_RUN_PARTY);
        assert_eq!(config.practice.attempt_budget, PRACTICE_ATTEMPT_BUDGET);
    }

    #[test]
    fn test_equal_keys_rejected() {
        let mut config = StudyConfig::default();
        config.keys.true_key = 'F';
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut config = StudyConfig::default();
        config.practice.attempt_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pass_accuracy_bounds() {
        let mut config = StudyConfig::default();
        for bad in [0.0, -0.5, 1.5, f64::NAN] {
            config.practice.pass_accuracy = bad;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{}", bad);
        }
        config.practice.pass_accuracy = 0.8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pass_accuracy_from_json() {
        let config: StudyConfig =
            serde_json::from_str(r#"{"practice": {"pass_accuracy": 0.75}}"#).unwrap();
        assert_eq!(config.practice.pass_accuracy, 0.75);
        assert_eq!(config.practice.items.len(), 6);
    }

    #[test]
    fn test_key_meaning() {
        let keys = KeyConfig::default();
        assert_eq!(keys.meaning('j'), Some(true));
        assert_eq!(keys.meaning('F'), Some(false));
        assert_eq!(keys.meaning('x'), None);
        assert_eq!(keys.key_for(true), 'j');
    }
}
