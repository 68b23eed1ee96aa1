//! Statement Pool: immutable catalog of candidate statements
//!
//! Built once, before any trial. Every problem with the catalog (unknown
//! subject, duplicate text, unpaired exploratory item) fails the build.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{
    CatalogEntry, Category, ConfigError, Party, PoolError, Statement, SubjectNouns,
};

// =============================================================================
// DEFAULT CATALOG [C]
// =============================================================================

/// Party A stereotype-congruent coalitional statements
const TYPICAL_A: [&str; 10] = [
    "Republicans are Working Class",
    "Republicans are White",
    "Republicans are Straight",
    "Republicans are Southern",
    "Republicans are Rural",
    "Republicans are Religious",
    "Republicans are Old",
    "Republicans are Christian",
    "Republicans are Uneducated",
    "Republicans are Men",
];

/// Party B stereotype-congruent coalitional statements
const TYPICAL_B: [&str; 11] = [
    "Democrats are Young",
    "Democrats are Women",
    "Democrats are Urban",
    "Democrats are Trans",
    "Democrats are Queer",
    "Democrats are People of Color",
    "Democrats are Northeastern",
    "Democrats are Lesbian/Gay/Bisexual",
    "Democrats are Educated",
    "Democrats are Black",
    "Democrats are Atheists",
];

/// Exploratory coalitional predicates, one pair each
const EXPLORATORY_PREDICATES: [&str; 3] = ["Asian", "Jewish", "Muslim"];

const TRAITS: [&str; 36] = [
    "Democrats are Kind",
    "Democrats are Open-minded",
    "Democrats are Accepting",
    "Democrats have Colored Hair",
    "Democrats are Passionate",
    "Democrats are Empathetic",
    "Democrats are Outspoken",
    "Democrats are Hopeful",
    "Democrats are Caring",
    "Republicans are Open-Minded",
    "Republicans are Accepting",
    "Republicans have Colored Hair",
    "Republicans are Passionate",
    "Republicans are Empathetic",
    "Republicans are Outspoken",
    "Republicans are Hopeful",
    "Republicans are Caring",
    "Republicans are Kind",
    "Republicans are Traditional",
    "Republicans are Hardworking",
    "Republicans are Family-Oriented",
    "Republicans are Individualistic",
    "Republicans are Patriotic",
    "Republicans are Logical",
    "Republicans are Rational",
    "Republicans are Strong",
    "Republicans are Responsible",
    "Democrats are Traditional",
    "Democrats are Hardworking",
    "Democrats are Family-Oriented",
    "Democrats are Individualistic",
    "Democrats are Patriotic",
    "Democrats are Logical",
    "Democrats are Rational",
    "Democrats are Strong",
    "Democrats are Responsible",
];

const ISSUES: [&str; 36] = [
    "Democrats are Pro-Choice",
    "Democrats are Pro-Change",
    "Democrats are Pro-Government",
    "Democrats are Pro-Immigration",
    "Democrats are Pro-Environment",
    "Democrats are Pro-Equality",
    "Democrats are Pro-Social Justice",
    "Democrats are Pro-Healthcare",
    "Democrats are Pro-Advocacy",
    "Republicans are Pro-Choice",
    "Republicans are Pro-Change",
    "Republicans are Pro-Government",
    "Republicans are Pro-Immigration",
    "Republicans are Pro-Environment",
    "Republicans are Pro-Equality",
    "Republicans are Pro-Social Justice",
    "Republicans are Pro-Healthcare",
    "Republicans are Pro-Advocacy",
    "Republicans are Pro-Life",
    "Republicans are Pro-Economy",
    "Republicans are Pro-Business",
    "Republicans are Pro-Gun",
    "Republicans are Pro-Capitalism",
    "Republicans are Pro-Tariffs",
    "Republicans are Pro-Security",
    "Republicans are Pro-Deportation",
    "Republicans are Pro-Control",
    "Democrats are Pro-Life",
    "Democrats are Pro-Economy",
    "Democrats are Pro-Business",
    "Democrats are Pro-Gun",
    "Democrats are Pro-Capitalism",
    "Democrats are Pro-Tariffs",
    "Democrats are Pro-Security",
    "Democrats are Pro-Deportation",
    "Democrats are Pro-Control",
];

/// The curated catalog (120 statements)
pub fn default_catalog() -> Vec<CatalogEntry> {
    let nouns = SubjectNouns::default();
    let mut entries = Vec::with_capacity(120);

    for text in TYPICAL_A.iter().chain(TYPICAL_B.iter()) {
        entries.push(CatalogEntry::new(*text, Category::Coalitional).typical());
    }

    // Cross-party counterparts of every typical statement
    for (texts, from) in [(&TYPICAL_A[..], Party::A), (&TYPICAL_B[..], Party::B)] {
        for text in texts {
            if let Some(mirror) = nouns.swap_subject(text, from, from.other()) {
                entries.push(CatalogEntry::new(mirror, Category::Coalitional));
            }
        }
    }

    for predicate in EXPLORATORY_PREDICATES {
        for party in [Party::B, Party::A] {
            let text = format!("{} are {}", nouns.noun(party), predicate);
            entries.push(CatalogEntry::new(text, Category::Coalitional).exploratory());
        }
    }

    entries.extend(TRAITS.iter().map(|t| CatalogEntry::new(*t, Category::Trait)));
    entries.extend(ISSUES.iter().map(|t| CatalogEntry::new(*t, Category::Issue)));
    entries
}

/// Read a JSON catalog (array of entries)
pub fn load_catalog(path: &str) -> Result<Vec<CatalogEntry>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

// =============================================================================
// POOL
// =============================================================================

/// Read-only ordered catalog of statements
#[derive(Debug, Clone)]
pub struct StatementPool {
    statements: Vec<Statement>,
    by_text: HashMap<String, usize>,
    /// Exploratory pairs as (party A, party B) positions
    pairs: Vec<(usize, usize)>,
    nouns: SubjectNouns,
}

impl StatementPool {
    /// Build the pool, failing fast on any malformed entry
    pub fn new(entries: &[CatalogEntry], nouns: SubjectNouns) -> Result<Self, PoolError> {
        if entries.is_empty() {
            return Err(PoolError::Empty);
        }

        let mut statements = Vec::with_capacity(entries.len());
        let mut by_text = HashMap::with_capacity(entries.len());

        for entry in entries {
            let statement = Statement::from_entry(entry, &nouns)?;
            if by_text.insert(entry.text.clone(), statements.len()).is_some() {
                return Err(PoolError::Duplicate {
                    text: entry.text.clone(),
                });
            }
            statements.push(statement);
        }

        let pairs = pair_exploratory(&statements, &by_text, &nouns)?;

        debug!(
            statements = statements.len(),
            exploratory_pairs = pairs.len(),
            "statement pool built"
        );

        Ok(Self {
            statements,
            by_text,
            pairs,
            nouns,
        })
    }

    /// Pool over the curated catalog
    pub fn with_default_catalog() -> Result<Self, PoolError> {
        Self::new(&default_catalog(), SubjectNouns::default())
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn nouns(&self) -> &SubjectNouns {
        &self.nouns
    }

    /// Membership test by exact text
    pub fn contains(&self, text: &str) -> bool {
        self.by_text.contains_key(text)
    }

    pub fn get(&self, text: &str) -> Option<&Statement> {
        self.by_text.get(text).map(|&i| &self.statements[i])
    }

    /// A party's stereotype-congruent sub-pool, in catalog order
    pub fn typical(&self, party: Party) -> Vec<Statement> {
        self.statements
            .iter()
            .filter(|s| s.typical() && !s.exploratory() && s.party() == party)
            .cloned()
            .collect()
    }

    /// Non-exploratory statements of a category, in catalog order
    pub fn confirmatory(&self, category: Category) -> Vec<Statement> {
        self.statements
            .iter()
            .filter(|s| s.category() == category && !s.exploratory())
            .cloned()
            .collect()
    }

    /// Mutually exclusive exploratory pairs, party A member first
    pub fn exploratory_pairs(&self) -> Vec<[Statement; 2]> {
        self.pairs
            .iter()
            .map(|&(a, b)| [self.statements[a].clone(), self.statements[b].clone()])
            .collect()
    }
}

/// Match every exploratory statement with its opposite-party mirror
fn pair_exploratory(
    statements: &[Statement],
    by_text: &HashMap<String, usize>,
    nouns: &SubjectNouns,
) -> Result<Vec<(usize, usize)>, PoolError> {
    let mut pairs = Vec::new();

    for (i, statement) in statements.iter().enumerate() {
        if !statement.exploratory() {
            continue;
        }
        let party = statement.party();
        let mirror = nouns
            .swap_subject(statement.text(), party, party.other())
            .and_then(|text| by_text.get(&text).copied())
            .filter(|&j| statements[j].exploratory());

        let Some(j) = mirror else {
            return Err(PoolError::UnpairedExploratory {
                text: statement.text().to_string(),
            });
        };

        let pair = match party {
            Party::A => (i, j),
            Party::B => (j, i),
        };
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }

    Ok(pairs)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_shape() {
        let pool = StatementPool::with_default_catalog().unwrap();
        assert_eq!(pool.len(), 120);
        assert_eq!(pool.typical(Party::A).len(), 10);
        assert_eq!(pool.typical(Party::B).len(), 11);
        assert_eq!(pool.confirmatory(Category::Coalitional).len(), 42);
        assert_eq!(pool.confirmatory(Category::Trait).len(), 36);
        assert_eq!(pool.confirmatory(Category::Issue).len(), 36);
        assert_eq!(pool.exploratory_pairs().len(), 3);
    }

    #[test]
    fn test_counterparts_present_for_every_typical() {
        let pool = StatementPool::with_default_catalog().unwrap();
        for party in Party::ALL {
            for s in pool.typical(party) {
                let mirror = pool
                    .nouns()
                    .swap_subject(s.text(), party, party.other())
                    .unwrap();
                assert!(pool.contains(&mirror), "missing counterpart {}", mirror);
            }
        }
    }

    #[test]
    fn test_exploratory_pairs_are_mirrored() {
        let pool = StatementPool::with_default_catalog().unwrap();
        for [a, b] in pool.exploratory_pairs() {
            assert_eq!(a.party(), Party::A);
            assert_eq!(b.party(), Party::B);
            assert_eq!(
                pool.nouns().predicate(a.text()),
                pool.nouns().predicate(b.text())
            );
        }
    }

    #[test]
    fn test_unknown_subject_fails_fast() {
        let entries = vec![
            CatalogEntry::new("Republicans are Rural", Category::Coalitional),
            CatalogEntry::new("Voters are Rural", Category::Coalitional),
        ];
        let err = StatementPool::new(&entries, SubjectNouns::default()).unwrap_err();
        assert_eq!(
            err,
            PoolError::UnknownSubject {
                text: "Voters are Rural".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_fails() {
        let entries = vec![
            CatalogEntry::new("Democrats are Kind", Category::Trait),
            CatalogEntry::new("Democrats are Kind", Category::Trait),
        ];
        assert!(matches!(
            StatementPool::new(&entries, SubjectNouns::default()),
            Err(PoolError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_unpaired_exploratory_fails() {
        let entries =
            vec![CatalogEntry::new("Democrats are Asian", Category::Coalitional).exploratory()];
        assert!(matches!(
            StatementPool::new(&entries, SubjectNouns::default()),
            Err(PoolError::UnpairedExploratory { .. })
        ));
    }

    #[test]
    fn test_empty_fails() {
        assert_eq!(
            StatementPool::new(&[], SubjectNouns::default()).unwrap_err(),
            PoolError::Empty
        );
    }
}
