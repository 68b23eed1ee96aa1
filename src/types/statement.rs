//! Statement model: party, category, subject nouns
//!
//! Party is never stored by the curator. It is derived from the canonical
//! subject noun that opens the text, and a text opening with neither noun
//! is rejected at load time.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::PoolError;
use crate::{SUBJECT_NOUN_A, SUBJECT_NOUN_B};

lazy_static! {
    /// Connector between subject and predicate ("Democrats are Kind")
    static ref RE_CONNECTOR: Regex = Regex::new(r"(?i)\s+(are|have)\s+").unwrap();
}

/// The two parties a statement can be about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Party {
    A,
    B,
}

impl Party {
    pub const ALL: [Party; 2] = [Party::A, Party::B];

    /// The opposite party
    pub fn other(self) -> Party {
        match self {
            Party::A => Party::B,
            Party::B => Party::A,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Party::A => "A",
            Party::B => "B",
        };
        write!(f, "{}", name)
    }
}

/// Semantic category of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Group identity attributed to a party
    Coalitional,
    /// Personality/character trait attributed to a party
    Trait,
    /// Policy position attributed to a party
    Issue,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Coalitional, Category::Trait, Category::Issue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coalitional => "coalitional",
            Category::Trait => "trait",
            Category::Issue => "issue",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical subject nouns, one per party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectNouns {
    pub a: String,
    pub b: String,
}

impl Default for SubjectNouns {
    fn default() -> Self {
        Self {
            a: SUBJECT_NOUN_A.to_string(),
            b: SUBJECT_NOUN_B.to_string(),
        }
    }
}

impl SubjectNouns {
    /// Noun for a party
    pub fn noun(&self, party: Party) -> &str {
        match party {
            Party::A => &self.a,
            Party::B => &self.b,
        }
    }

    /// Party whose noun opens `text` as a whole word (case-sensitive)
    pub fn party_of(&self, text: &str) -> Option<Party> {
        Party::ALL
            .into_iter()
            .find(|&party| strip_subject(text, self.noun(party)).is_some())
    }

    /// Text after the subject noun, trimmed
    pub fn predicate<'a>(&self, text: &'a str) -> Option<&'a str> {
        let party = self.party_of(text)?;
        strip_subject(text, self.noun(party)).map(str::trim)
    }

    /// Swap a leading `from` noun for the `to` noun
    pub fn swap_subject(&self, text: &str, from: Party, to: Party) -> Option<String> {
        strip_subject(text, self.noun(from)).map(|rest| format!("{}{}", self.noun(to), rest))
    }
}

/// Remainder of `text` after `noun`, if `noun` opens it as a whole word
fn strip_subject<'a>(text: &'a str, noun: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(noun)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Catalog entry as curated (party is derived, not stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub text: String,
    pub category: Category,
    /// Sampled once per session as part of an exploratory pair
    #[serde(default)]
    pub exploratory: bool,
    /// Member of the party's stereotype-congruent sub-pool
    #[serde(default)]
    pub typical: bool,
}

impl CatalogEntry {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
            exploratory: false,
            typical: false,
        }
    }

    pub fn typical(mut self) -> Self {
        self.typical = true;
        self
    }

    pub fn exploratory(mut self) -> Self {
        self.exploratory = true;
        self
    }
}

/// A candidate statement. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Statement {
    text: String,
    party: Party,
    category: Category,
    exploratory: bool,
    typical: bool,
}

impl Statement {
    /// Build from a catalog entry, deriving the party from the subject noun
    pub fn from_entry(entry: &CatalogEntry, nouns: &SubjectNouns) -> Result<Self, PoolError> {
        let party = nouns
            .party_of(&entry.text)
            .ok_or_else(|| PoolError::UnknownSubject {
                text: entry.text.clone(),
            })?;

        Ok(Self {
            text: entry.text.clone(),
            party,
            category: entry.category,
            exploratory: entry.exploratory,
            typical: entry.typical,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn party(&self) -> Party {
        self.party
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn exploratory(&self) -> bool {
        self.exploratory
    }

    pub fn typical(&self) -> bool {
        self.typical
    }
}

/// A sentence split around its "are"/"have" connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceParts<'a> {
    pub subject: &'a str,
    pub connector: Option<&'a str>,
    pub rest: Option<&'a str>,
}

impl<'a> SentenceParts<'a> {
    /// Split on the connector. Falls back to the whole text as subject when
    /// there is no connector or it occurs more than once.
    pub fn split(text: &'a str) -> Self {
        let whole = Self {
            subject: text,
            connector: None,
            rest: None,
        };

        let Some(caps) = RE_CONNECTOR.captures(text) else {
            return whole;
        };
        let (Some(full), Some(word)) = (caps.get(0), caps.get(1)) else {
            return whole;
        };

        let repeats = RE_CONNECTOR
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .filter(|m| m.as_str().eq_ignore_ascii_case(word.as_str()))
            .count();
        if repeats != 1 {
            return whole;
        }

        Self {
            subject: &text[..full.start()],
            connector: Some(word.as_str()),
            rest: Some(&text[full.end()..]),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
