//! Sequence Builder: run-length constrained ordering
//!
//! 1. Randomized search: shuffle the whole set, keep the first valid order.
//! 2. Greedy repair: per-category pools, largest pool first, first
//!    admissible item; a forced pick when nothing is admissible.
//! 3. Rebuild from `prefix ++ remaining` if repair lost track of items.
//! 4. Shuffle the repaired set a bounded number of times, then settle for
//!    a best-effort order with a warning.
//!
//! Validation, search and repair all use `RunTracker::admits`.

use std::cmp::Reverse;
use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{Category, Party, ReasonCode, SequenceConfig, TrialSpec};

/// Shuffle budget for a rebuild after a repair length mismatch
const REBUILD_ATTEMPTS: usize = 200;

/// Max nested rebuilds
const MAX_REBUILD_DEPTH: usize = 3;

/// First constraint broken by a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// Too many consecutive items of one category
    TypeRun { position: usize, category: Category },
    /// Too many consecutive items of one party
    PartyRun { position: usize, party: Party },
    /// Exploratory item inside the banned opening positions
    ExploratoryAtStart { position: usize },
    /// Too many consecutive exploratory items
    ExploratoryRun { position: usize },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::TypeRun { position, category } => {
                write!(f, "{} run too long at position {}", category, position)
            }
            Violation::PartyRun { position, party } => {
                write!(f, "party {} run too long at position {}", party, position)
            }
            Violation::ExploratoryAtStart { position } => {
                write!(f, "exploratory item at opening position {}", position)
            }
            Violation::ExploratoryRun { position } => {
                write!(f, "exploratory run too long at position {}", position)
            }
        }
    }
}

// =============================================================================
// PREDICATE
// =============================================================================

/// Run lengths at the end of a partial sequence
#[derive(Debug, Clone, Copy)]
pub struct RunTracker {
    config: SequenceConfig,
    len: usize,
    last_category: Option<Category>,
    category_run: usize,
    last_party: Option<Party>,
    party_run: usize,
    exploratory_run: usize,
}

impl RunTracker {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            len: 0,
            last_category: None,
            category_run: 0,
            last_party: None,
            party_run: 0,
            exploratory_run: 0,
        }
    }

    /// Would appending `trial` keep every constraint?
    pub fn admits(&self, trial: &TrialSpec) -> Result<(), Violation> {
        let position = self.len;
        let category = trial.statement.category();
        let party = trial.statement.party();
        let exploratory = trial.statement.exploratory();

        let category_run = if self.last_category == Some(category) {
            self.category_run + 1
        } else {
            1
        };
        if category_run > self.config.max_run_type {
            return Err(Violation::TypeRun { position, category });
        }

        let party_run = if self.last_party == Some(party) {
            self.party_run + 1
        } else {
            1
        };
        if party_run > self.config.max_run_party {
            return Err(Violation::PartyRun { position, party });
        }

        if exploratory {
            if position < self.config.ban_exploratory_at_start {
                return Err(Violation::ExploratoryAtStart { position });
            }
            if self.exploratory_run + 1 > self.config.max_exploratory_run {
                return Err(Violation::ExploratoryRun { position });
            }
        }

        Ok(())
    }

    /// Append `trial`, admissible or not
    pub fn push(&mut self, trial: &TrialSpec) {
        let category = trial.statement.category();
        let party = trial.statement.party();

        if self.last_category == Some(category) {
            self.category_run += 1;
        } else {
            self.last_category = Some(category);
            self.category_run = 1;
        }

        if self.last_party == Some(party) {
            self.party_run += 1;
        } else {
            self.last_party = Some(party);
            self.party_run = 1;
        }

        self.exploratory_run = if trial.statement.exploratory() {
            self.exploratory_run + 1
        } else {
            0
        };
        self.len += 1;
    }
}

/// First violation in `trials`, read start to end
pub fn validate(trials: &[TrialSpec], config: &SequenceConfig) -> Result<(), Violation> {
    let mut tracker = RunTracker::new(*config);
    for trial in trials {
        tracker.admits(trial)?;
        tracker.push(trial);
    }
    Ok(())
}

pub fn is_valid(trials: &[TrialSpec], config: &SequenceConfig) -> bool {
    validate(trials, config).is_ok()
}

// =============================================================================
// SEARCH + REPAIR
// =============================================================================

/// Shuffle up to `tries` times; returns the first order satisfying
/// `predicate` and the attempt it was found on
pub fn try_satisfy<T, R, P>(items: &[T], tries: usize, rng: &mut R, predicate: P) -> Option<(Vec<T>, usize)>
where
    T: Clone,
    R: Rng + ?Sized,
    P: Fn(&[T]) -> bool,
{
    let mut candidate = items.to_vec();
    for attempt in 1..=tries {
        candidate.shuffle(rng);
        if predicate(&candidate) {
            return Some((candidate, attempt));
        }
    }
    None
}

/// Greedy placement from per-category pools
///
/// Pools are visited largest first (ties in the order given). Within a pool
/// the first admissible item wins, preferring the party with more items
/// still unplaced. With nothing admissible the head of the largest pool is
/// placed anyway, so every item is placed exactly once.
pub fn repair(mut pools: Vec<Vec<TrialSpec>>, config: &SequenceConfig) -> Vec<TrialSpec> {
    let total: usize = pools.iter().map(Vec::len).sum();
    let mut order = Vec::with_capacity(total);
    let mut tracker = RunTracker::new(*config);

    loop {
        let mut keys: Vec<usize> = (0..pools.len()).filter(|&k| !pools[k].is_empty()).collect();
        if keys.is_empty() {
            break;
        }
        keys.sort_by_key(|&k| Reverse(pools[k].len()));

        let preferred = majority_party(&pools);
        let pick = keys
            .iter()
            .find_map(|&k| pick_admissible(&pools[k], &tracker, preferred).map(|i| (k, i)))
            .unwrap_or((keys[0], 0));

        let trial = pools[pick.0].remove(pick.1);
        tracker.push(&trial);
        order.push(trial);
    }

    order
}

/// Party with strictly more unplaced items, if any
fn majority_party(pools: &[Vec<TrialSpec>]) -> Option<Party> {
    let (a, b) = pools
        .iter()
        .flatten()
        .fold((0usize, 0usize), |(a, b), t| match t.statement.party() {
            Party::A => (a + 1, b),
            Party::B => (a, b + 1),
        });
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => Some(Party::A),
        std::cmp::Ordering::Less => Some(Party::B),
        std::cmp::Ordering::Equal => None,
    }
}

fn pick_admissible(pool: &[TrialSpec], tracker: &RunTracker, preferred: Option<Party>) -> Option<usize> {
    let mut first = None;
    for (i, trial) in pool.iter().enumerate() {
        if tracker.admits(trial).is_err() {
            continue;
        }
        if preferred.map_or(true, |p| trial.statement.party() == p) {
            return Some(i);
        }
        first.get_or_insert(i);
    }
    first
}

/// Split into shuffled per-category pools, in category order
fn partition<R: Rng + ?Sized>(trials: &[TrialSpec], rng: &mut R) -> Vec<Vec<TrialSpec>> {
    Category::ALL
        .iter()
        .map(|&category| {
            let mut pool: Vec<TrialSpec> = trials
                .iter()
                .filter(|t| t.statement.category() == category)
                .cloned()
                .collect();
            pool.shuffle(rng);
            pool
        })
        .collect()
}

// =============================================================================
// BUILDER
// =============================================================================

/// How the final order was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceStrategy {
    Shuffled { attempts: usize },
    Repaired,
    ReshuffledAfterRepair { attempts: usize },
    BestEffort,
}

impl SequenceStrategy {
    pub fn reason(&self) -> ReasonCode {
        match self {
            SequenceStrategy::Shuffled { .. } => ReasonCode::S001_SEQUENCE_SHUFFLED,
            SequenceStrategy::Repaired => ReasonCode::S002_SEQUENCE_REPAIRED,
            SequenceStrategy::ReshuffledAfterRepair { .. } => ReasonCode::S003_SEQUENCE_RESHUFFLED,
            SequenceStrategy::BestEffort => ReasonCode::S004_SEQUENCE_BEST_EFFORT,
        }
    }
}

/// Ordered trials plus how they were ordered
#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    pub trials: Vec<TrialSpec>,
    pub strategy: SequenceStrategy,
    /// Set only for best-effort orders
    pub violation: Option<Violation>,
}

impl SequenceOutcome {
    pub fn is_best_effort(&self) -> bool {
        self.strategy == SequenceStrategy::BestEffort
    }
}

/// Orders an assembled trial set under the run-length constraints
#[derive(Debug, Clone, Copy)]
pub struct SequenceBuilder {
    config: SequenceConfig,
}

impl SequenceBuilder {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Order `trials`. Never fails: an unsatisfiable set comes back as a
    /// best-effort permutation.
    pub fn build<R: Rng + ?Sized>(&self, trials: Vec<TrialSpec>, rng: &mut R) -> SequenceOutcome {
        let outcome = self.build_with(trials, self.config.max_attempts, rng, 0);
        debug!(
            trials = outcome.trials.len(),
            reason = outcome.strategy.reason().code(),
            "sequence built"
        );
        outcome
    }

    fn build_with<R: Rng + ?Sized>(
        &self,
        trials: Vec<TrialSpec>,
        attempts: usize,
        rng: &mut R,
        depth: usize,
    ) -> SequenceOutcome {
        let config = self.config;
        let valid = |s: &[TrialSpec]| is_valid(s, &config);

        if let Some((order, attempts)) = try_satisfy(&trials, attempts, rng, valid) {
            return SequenceOutcome {
                trials: order,
                strategy: SequenceStrategy::Shuffled { attempts },
                violation: None,
            };
        }

        let mut order = repair(partition(&trials, rng), &config);

        if order.len() != trials.len() {
            let placed: HashSet<usize> = order.iter().map(|t| t.index).collect();
            order.extend(trials.iter().filter(|t| !placed.contains(&t.index)).cloned());
            warn!(
                placed = placed.len(),
                expected = trials.len(),
                "repair length mismatch, rebuilding"
            );
            if depth < MAX_REBUILD_DEPTH {
                return self.build_with(order, REBUILD_ATTEMPTS, rng, depth + 1);
            }
        }

        if is_valid(&order, &config) {
            return SequenceOutcome {
                trials: order,
                strategy: SequenceStrategy::Repaired,
                violation: None,
            };
        }

        if let Some((reshuffled, attempts)) =
            try_satisfy(&order, config.repair_shuffles, rng, valid)
        {
            return SequenceOutcome {
                trials: reshuffled,
                strategy: SequenceStrategy::ReshuffledAfterRepair { attempts },
                violation: None,
            };
        }

        let violation = validate(&order, &config).err();
        if let Some(v) = violation {
            warn!(violation = %v, "constraints not satisfied, using best-effort order");
        }
        SequenceOutcome {
            trials: order,
            strategy: SequenceStrategy::BestEffort,
            violation,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
