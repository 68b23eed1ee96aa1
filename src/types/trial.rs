//! Trial specifications and outcome records

use serde::{Deserialize, Serialize};

use crate::types::Statement;

/// Which timeline a trial belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Practice,
    Main,
}

impl Block {
    pub fn as_str(&self) -> &'static str {
        match self {
            Block::Practice => "practice",
            Block::Main => "main",
        }
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Block {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practice" => Ok(Block::Practice),
            "main" => Ok(Block::Main),
            other => Err(format!("unknown block '{}'", other)),
        }
    }
}

/// Anything the trial runner can present
pub trait Stimulus {
    /// Stable identity of the trial
    fn index(&self) -> usize;
    /// Text shown to the participant
    fn text(&self) -> &str;
    /// Ground-truth label, if the item has one
    fn truth(&self) -> Option<bool> {
        None
    }
}

/// A main-task statement with its stable index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrialSpec {
    /// Assigned at assembly, survives reordering
    pub index: usize,
    pub statement: Statement,
}

impl TrialSpec {
    pub fn new(index: usize, statement: Statement) -> Self {
        Self { index, statement }
    }
}

impl Stimulus for TrialSpec {
    fn index(&self) -> usize {
        self.index
    }

    fn text(&self) -> &str {
        self.statement.text()
    }
}

/// Known-answer practice statement as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeItem {
    pub text: String,
    pub truth: bool,
}

impl PracticeItem {
    pub fn new(text: impl Into<String>, truth: bool) -> Self {
        Self {
            text: text.into(),
            truth,
        }
    }
}

/// Practice item with its position in the configured set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeTrial {
    pub index: usize,
    pub item: PracticeItem,
}

impl PracticeTrial {
    /// Index every configured item by position
    pub fn from_items(items: &[PracticeItem]) -> Vec<PracticeTrial> {
        items
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, item)| PracticeTrial { index, item })
            .collect()
    }
}

impl Stimulus for PracticeTrial {
    fn index(&self) -> usize {
        self.index
    }

    fn text(&self) -> &str {
        &self.item.text
    }

    fn truth(&self) -> Option<bool> {
        Some(self.item.truth)
    }
}

/// One concluded trial. Built only by `responded` / `timed_out`, read
/// through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    trial_index: usize,
    presented_text: String,
    /// Ground-truth label of practice items
    truth: Option<bool>,
    /// Accepted key, None on timeout
    response_key: Option<char>,
    /// True/False judgment the key maps to
    response_meaning: Option<bool>,
    reaction_time_ms: Option<u64>,
    /// Practice only; timeouts score as incorrect
    correct: Option<bool>,
    block: Block,
}

impl OutcomeRecord {
    /// Record a trial that ended with an accepted key
    pub fn responded(
        stimulus: &dyn Stimulus,
        block: Block,
        key: char,
        meaning: bool,
        reaction_time_ms: u64,
    ) -> Self {
        let truth = stimulus.truth();
        Self {
            trial_index: stimulus.index(),
            presented_text: stimulus.text().to_string(),
            truth,
            response_key: Some(key),
            response_meaning: Some(meaning),
            reaction_time_ms: Some(reaction_time_ms),
            correct: truth.map(|truth| truth == meaning),
            block,
        }
    }

    /// Record a trial that ended without a response
    pub fn timed_out(stimulus: &dyn Stimulus, block: Block) -> Self {
        let truth = stimulus.truth();
        Self {
            trial_index: stimulus.index(),
            presented_text: stimulus.text().to_string(),
            truth,
            response_key: None,
            response_meaning: None,
            reaction_time_ms: None,
            correct: truth.map(|_| false),
            block,
        }
    }

    pub fn trial_index(&self) -> usize {
        self.trial_index
    }

    pub fn presented_text(&self) -> &str {
        &self.presented_text
    }

    pub fn truth(&self) -> Option<bool> {
        self.truth
    }

    pub fn response_key(&self) -> Option<char> {
        self.response_key
    }

    pub fn response_meaning(&self) -> Option<bool> {
        self.response_meaning
    }

    pub fn reaction_time_ms(&self) -> Option<u64> {
        self.reaction_time_ms
    }

    pub fn correct(&self) -> Option<bool> {
        self.correct
    }

    pub fn block(&self) -> Block {
        self.block
    }

    pub fn is_correct(&self) -> bool {
        self.correct == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogEntry, Category, SubjectNouns};

    #[test]
    fn test_practice_record_scores_against_truth() {
        let trial = PracticeTrial {
            index: 0,
            item: PracticeItem::new("Dogs are Animals", true),
        };
        let hit = OutcomeRecord::responded(&trial, Block::Practice, 'j', true, 640);
        let miss = OutcomeRecord::responded(&trial, Block::Practice, 'f', false, 700);
        assert_eq!(hit.correct(), Some(true));
        assert_eq!(miss.correct(), Some(false));
        assert_eq!(hit.truth(), Some(true));
    }

    #[test]
    fn test_timeout_is_incorrect_in_practice() {
        let trial = PracticeTrial {
            index: 3,
            item: PracticeItem::new("Fish are Mammals", false),
        };
        let record = OutcomeRecord::timed_out(&trial, Block::Practice);
        assert_eq!(record.trial_index(), 3);
        assert_eq!(record.response_key(), None);
        assert_eq!(record.truth(), Some(false));
        assert_eq!(record.correct(), Some(false));
    }

    #[test]
    fn test_main_record_has_no_truth() {
        let entry = CatalogEntry::new("Democrats are Kind", Category::Trait);
        let statement = Statement::from_entry(&entry, &SubjectNouns::default()).unwrap();
        let record = OutcomeRecord::responded(&TrialSpec::new(7, statement), Block::Main, 'f', false, 420);
        assert_eq!(record.truth(), None);
        assert_eq!(record.correct(), None);
        assert_eq!(record.response_meaning(), Some(false));
    }

    #[test]
    fn test_block_parse() {
        assert_eq!("main".parse::<Block>(), Ok(Block::Main));
        assert!("warmup".parse::<Block>().is_err());
    }
}
