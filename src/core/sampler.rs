//! Sampler: balanced, deduplicated subsets and cross-party counterparts
//!
//! Pure functions of the pool, the sampling config and a caller-supplied
//! random source. Nothing here holds session state.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::StatementPool;
use crate::types::{
    Category, Party, PerParty, ReasonCode, SampleError, SamplingConfig, Statement, SubjectNouns,
    TrialSpec,
};

/// Fisher–Yates shuffle of a copy of `pool`, truncated to `n`
pub fn sample_without_replacement<T: Clone, R: Rng + ?Sized>(
    pool: &[T],
    n: usize,
    rng: &mut R,
) -> Result<Vec<T>, SampleError> {
    draw(pool, n, "items", rng)
}

fn draw<T: Clone, R: Rng + ?Sized>(
    pool: &[T],
    n: usize,
    what: &str,
    rng: &mut R,
) -> Result<Vec<T>, SampleError> {
    if n > pool.len() {
        return Err(SampleError::Insufficient {
            what: what.to_string(),
            requested: n,
            available: pool.len(),
        });
    }
    let mut copy = pool.to_vec();
    copy.shuffle(rng);
    copy.truncate(n);
    Ok(copy)
}

/// Text of `statement` with `from`'s subject noun replaced by `to`'s
///
/// The result is only a candidate: callers resolve it against the pool and
/// drop it when absent.
pub fn derive_counterpart(
    statement: &Statement,
    from: Party,
    to: Party,
    nouns: &SubjectNouns,
) -> Result<String, SampleError> {
    nouns
        .swap_subject(statement.text(), from, to)
        .ok_or_else(|| SampleError::SubjectMismatch {
            text: statement.text().to_string(),
            noun: nouns.noun(from).to_string(),
        })
}

/// Recoverable findings from one assembly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamplingReport {
    /// Derived counterpart texts absent from the pool
    pub dropped_counterparts: Vec<String>,
    /// (party, found, target) for unions smaller than their target
    pub shortfalls: Vec<(Party, usize, usize)>,
}

impl SamplingReport {
    pub fn reason(&self) -> ReasonCode {
        if !self.dropped_counterparts.is_empty() {
            ReasonCode::C002_COUNTERPART_DROPPED
        } else if !self.shortfalls.is_empty() {
            ReasonCode::C003_TARGET_SHORTFALL
        } else {
            ReasonCode::C001_SAMPLE_COMPLETE
        }
    }
}

/// Unordered trial set for one session
#[derive(Debug, Clone)]
pub struct AssembledSet {
    pub coalitional: PerParty<Vec<Statement>>,
    pub traits: Vec<Statement>,
    pub issues: Vec<Statement>,
    /// Both members of the chosen pair, or empty
    pub exploratory: Vec<Statement>,
    pub report: SamplingReport,
}

impl AssembledSet {
    pub fn len(&self) -> usize {
        self.coalitional.a.len()
            + self.coalitional.b.len()
            + self.traits.len()
            + self.issues.len()
            + self.exploratory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign stable indices in assembly order
    pub fn into_trials(self) -> Vec<TrialSpec> {
        self.coalitional
            .a
            .into_iter()
            .chain(self.coalitional.b)
            .chain(self.traits)
            .chain(self.issues)
            .chain(self.exploratory)
            .enumerate()
            .map(|(index, statement)| TrialSpec::new(index, statement))
            .collect()
    }
}

/// Draws per-session sets from a pool
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'a> {
    pool: &'a StatementPool,
    config: &'a SamplingConfig,
}

impl<'a> Sampler<'a> {
    pub fn new(pool: &'a StatementPool, config: &'a SamplingConfig) -> Self {
        Self { pool, config }
    }

    /// Assemble the full unordered set: coalitional per party, trait,
    /// issue and one exploratory pair
    pub fn assemble<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<AssembledSet, SampleError> {
        let (coalitional, report) = self.balanced_coalitional(rng)?;
        let traits = self.category_set(Category::Trait, self.config.trait_count, rng)?;
        let issues = self.category_set(Category::Issue, self.config.issue_count, rng)?;
        let exploratory = if self.config.exploratory {
            self.exploratory_pair(rng)?.to_vec()
        } else {
            Vec::new()
        };

        let set = AssembledSet {
            coalitional,
            traits,
            issues,
            exploratory,
            report,
        };
        debug!(
            trials = set.len(),
            reason = set.report.reason().code(),
            "trial set assembled"
        );
        Ok(set)
    }

    /// Typical + counterpart union per party, trimmed to the target size
    pub fn balanced_coalitional<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(PerParty<Vec<Statement>>, SamplingReport), SampleError> {
        let nouns = self.pool.nouns();
        let typical = self.config.typical_per_party;

        let mut draw_typical = |party: Party| {
            let what = format!("typical {} statements", party);
            draw(&self.pool.typical(party), typical.get(party), &what, rng)
        };
        let selected = PerParty {
            a: draw_typical(Party::A)?,
            b: draw_typical(Party::B)?,
        };

        let mut report = SamplingReport::default();
        let mut sets = PerParty {
            a: Vec::new(),
            b: Vec::new(),
        };

        for party in Party::ALL {
            let (own, other) = match party {
                Party::A => (&selected.a, &selected.b),
                Party::B => (&selected.b, &selected.a),
            };

            let mut seen: HashSet<&str> = HashSet::new();
            let mut union: Vec<Statement> = Vec::with_capacity(own.len() + other.len());
            for s in own {
                if seen.insert(s.text()) {
                    union.push(s.clone());
                }
            }

            for s in other {
                let text = derive_counterpart(s, party.other(), party, nouns)?;
                match self.pool.get(&text) {
                    Some(counterpart)
                        if counterpart.category() == s.category() && !counterpart.exploratory() =>
                    {
                        if seen.insert(counterpart.text()) {
                            union.push(counterpart.clone());
                        }
                    }
                    Some(counterpart) => {
                        warn!(
                            counterpart = %text,
                            category = %counterpart.category(),
                            exploratory = counterpart.exploratory(),
                            "counterpart belongs to another sub-pool, dropped"
                        );
                        report.dropped_counterparts.push(text);
                    }
                    None => {
                        warn!(counterpart = %text, "counterpart missing from pool, dropped");
                        report.dropped_counterparts.push(text);
                    }
                }
            }

            let target = self.config.target_per_party;
            let trimmed = if union.len() > target {
                draw(&union, target, "coalitional statements", rng)?
            } else {
                if union.len() < target {
                    warn!(%party, found = union.len(), target, "coalitional set below target");
                    report.shortfalls.push((party, union.len(), target));
                }
                union
            };

            match party {
                Party::A => sets.a = trimmed,
                Party::B => sets.b = trimmed,
            }
        }

        Ok((sets, report))
    }

    /// Non-exploratory sample of one category
    pub fn category_set<R: Rng + ?Sized>(
        &self,
        category: Category,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Statement>, SampleError> {
        let what = format!("{} statements", category);
        draw(&self.pool.confirmatory(category), count, &what, rng)
    }

    /// Exactly one exploratory pair, chosen uniformly
    pub fn exploratory_pair<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<[Statement; 2], SampleError> {
        self.pool
            .exploratory_pairs()
            .choose(rng)
            .cloned()
            .ok_or(SampleError::NoExploratoryPairs)
    }
}

// =============================================================================
// TESTS
// =============================================================================
