//! Ruleset — the data-driven configuration artifact every tailoring stage reads.
//!
//! Stoplists, section markers, the requirement taxonomy, the synonym table, the
//! never-claim list and all thresholds live here and are passed explicitly into the pipeline.
//! The synonym table is the single source of truth for "same meaning": the
//! matcher uses it for synonym-level evidence, the rewriter for REWORD, and the
//! integrity checker for the vocabulary a source entry is allowed to grow into.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tailoring::keyword_extractor::RequirementCategory;
use crate::tailoring::text::{find_sequence, terms};

/// The ruleset shipped with the service, used when `RULESET_PATH` is unset.
const EMBEDDED_RULESET: &str = include_str!("../../rules/default_ruleset.json");

#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("failed to read ruleset at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ruleset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid ruleset: {0}")]
    Invalid(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Serialized form
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub connectives: Vec<String>,
    pub section_markers: SectionMarkers,
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub synonyms: Vec<SynonymEntry>,
    #[serde(default)]
    pub emphasis_connectors: Vec<String>,
    /// Phrases that may only be claimed with exact evidence in the inventory.
    #[serde(default)]
    pub forbidden: Vec<String>,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionMarkers {
    pub boosted: Vec<String>,
    #[serde(default)]
    pub plain: Vec<String>,
    /// Multiplier applied to occurrences inside a boosted section.
    pub boost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub certification: Vec<String>,
    #[serde(default)]
    pub soft_skill: Vec<String>,
    #[serde(default)]
    pub domain: Vec<String>,
    #[serde(default)]
    pub skill: Vec<String>,
}

/// One allow-listed rewording: `term` may be restated as any of `alternatives`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymEntry {
    pub term: String,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Extracted phrases weighing less than this are dropped.
    pub min_keyword_weight: f64,
    /// Minimum evidence score for an entry to count as supporting.
    pub support_threshold: f64,
    /// Minimum strategy score for two terms to count as synonym-level.
    pub synonym_similarity: f64,
    pub exact: f64,
    pub synonym: f64,
    pub domain: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Compiled form
// ────────────────────────────────────────────────────────────────────────────

/// A synonym row with its term and alternatives pre-tokenized.
#[derive(Debug, Clone)]
pub struct SynonymRule {
    pub term: Vec<String>,
    /// Alternatives exactly as written in the table; used verbatim by REWORD.
    pub alternatives: Vec<String>,
    pub alternative_terms: Vec<Vec<String>>,
}

/// Which kind of section a posting line opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Boosted,
    Plain,
}

/// Validated, lookup-ready ruleset. Immutable once built; share via `Arc`.
#[derive(Debug, Clone)]
pub struct Ruleset {
    stopwords: HashSet<String>,
    connectives: HashSet<String>,
    boosted_markers: Vec<Vec<String>>,
    plain_markers: Vec<Vec<String>>,
    boost: f64,
    taxonomy: Vec<(RequirementCategory, Vec<Vec<String>>)>,
    synonyms: Vec<SynonymRule>,
    emphasis_connectors: HashSet<String>,
    forbidden: Vec<Vec<String>>,
    thresholds: Thresholds,
}

impl Ruleset {
    /// Loads the ruleset from `path`, or the embedded default when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesetError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| RulesetError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw)
            }
            None => Self::embedded(),
        }
    }

    pub fn embedded() -> Result<Self, RulesetError> {
        Self::from_json(EMBEDDED_RULESET)
    }

    pub fn from_json(raw: &str) -> Result<Self, RulesetError> {
        let config: RulesetConfig = serde_json::from_str(raw)?;
        Self::from_config(config)
    }

    /// Validates and compiles a ruleset. Any structural problem is fatal.
    pub fn from_config(config: RulesetConfig) -> Result<Self, RulesetError> {
        validate_thresholds(&config.thresholds)?;

        if !config.section_markers.boost.is_finite() || config.section_markers.boost < 1.0 {
            return Err(RulesetError::Invalid(format!(
                "section boost must be a finite number >= 1.0, got {}",
                config.section_markers.boost
            )));
        }

        let stopwords = normalized_set(&config.stopwords);
        if stopwords.is_empty() {
            return Err(RulesetError::Invalid("stopword list is empty".to_string()));
        }

        let taxonomy = vec![
            (RequirementCategory::Certification, phrase_list(&config.taxonomy.certification)),
            (RequirementCategory::SoftSkill, phrase_list(&config.taxonomy.soft_skill)),
            (RequirementCategory::Domain, phrase_list(&config.taxonomy.domain)),
            (RequirementCategory::Skill, phrase_list(&config.taxonomy.skill)),
        ];
        if taxonomy.iter().all(|(_, phrases)| phrases.is_empty()) {
            return Err(RulesetError::Invalid("taxonomy is missing or empty".to_string()));
        }

        let synonyms = compile_synonyms(&config.synonyms)?;

        if let Some(blank) = config.forbidden.iter().find(|p| terms(p).is_empty()) {
            return Err(RulesetError::Invalid(format!(
                "forbidden phrase '{blank}' has no terms"
            )));
        }

        Ok(Self {
            stopwords,
            connectives: normalized_set(&config.connectives),
            boosted_markers: phrase_list(&config.section_markers.boosted),
            plain_markers: phrase_list(&config.section_markers.plain),
            boost: config.section_markers.boost,
            taxonomy,
            synonyms,
            emphasis_connectors: normalized_set(&config.emphasis_connectors),
            forbidden: phrase_list(&config.forbidden),
            thresholds: config.thresholds,
        })
    }

    /// Returns a copy with a different support threshold.
    pub fn with_support_threshold(&self, support_threshold: f64) -> Self {
        let mut ruleset = self.clone();
        ruleset.thresholds.support_threshold = support_threshold;
        ruleset
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn boost(&self) -> f64 {
        self.boost
    }

    /// Stopword for extraction purposes: generic posting vocabulary plus connectives.
    pub fn is_stopword(&self, term: &str) -> bool {
        self.stopwords.contains(term) || self.connectives.contains(term)
    }

    /// Pure function words, ignored by the integrity check.
    pub fn is_connective(&self, term: &str) -> bool {
        self.connectives.contains(term)
    }

    pub fn is_emphasis_connector(&self, term: &str) -> bool {
        self.emphasis_connectors.contains(term)
    }

    /// Classifies a line that opens a section ("Requirements:", "About us").
    pub fn section_kind(&self, line_terms: &[String]) -> Option<SectionKind> {
        let starts_with = |markers: &[Vec<String>]| {
            markers
                .iter()
                .any(|marker| line_terms.starts_with(marker.as_slice()))
        };
        if starts_with(&self.boosted_markers) {
            Some(SectionKind::Boosted)
        } else if starts_with(&self.plain_markers) {
            Some(SectionKind::Plain)
        } else {
            None
        }
    }

    /// True when a boosted marker appears anywhere in the line ("... experience required").
    pub fn mentions_boosted_marker(&self, line_terms: &[String]) -> bool {
        self.boosted_markers
            .iter()
            .any(|marker| find_sequence(line_terms, marker).is_some())
    }

    /// Taxonomy category for a phrase; certification wins over soft skill,
    /// soft skill over domain, and anything unlisted is a skill.
    pub fn categorize(&self, phrase_terms: &[String]) -> RequirementCategory {
        self.taxonomy
            .iter()
            .find(|(_, entries)| {
                entries
                    .iter()
                    .any(|entry| find_sequence(phrase_terms, entry).is_some())
            })
            .map(|(category, _)| *category)
            .unwrap_or(RequirementCategory::Skill)
    }

    /// The first never-claim phrase occurring in a requirement, if any. Matching
    /// is on whole normalized terms, so "programming" does not hit "program".
    pub fn forbidden_phrase(&self, phrase_terms: &[String]) -> Option<String> {
        self.forbidden
            .iter()
            .find(|forbidden| find_sequence(phrase_terms, forbidden).is_some())
            .map(|forbidden| forbidden.join(" "))
    }

    pub fn synonyms(&self) -> &[SynonymRule] {
        &self.synonyms
    }

    /// True when the synonym table relates two normalized phrases in either
    /// direction, or lists both as alternatives of the same term.
    pub fn are_synonyms(&self, a: &[String], b: &[String]) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        self.synonyms.iter().any(|rule| {
            let has_alt = |phrase: &[String]| rule.alternative_terms.iter().any(|alt| alt == phrase);
            (rule.term == a && has_alt(b))
                || (rule.term == b && has_alt(a))
                || (has_alt(a) && has_alt(b))
        })
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<(), RulesetError> {
    let values = [
        ("min_keyword_weight", t.min_keyword_weight),
        ("support_threshold", t.support_threshold),
        ("synonym_similarity", t.synonym_similarity),
        ("exact", t.exact),
        ("synonym", t.synonym),
        ("domain", t.domain),
    ];
    for (name, value) in values {
        if !value.is_finite() || value < 0.0 {
            return Err(RulesetError::Invalid(format!(
                "threshold '{name}' must be a finite non-negative number, got {value}"
            )));
        }
    }
    if !(t.exact >= t.synonym && t.synonym >= t.domain && t.domain > 0.0) {
        return Err(RulesetError::Invalid(format!(
            "evidence scores must satisfy exact >= synonym >= domain > 0 (got {} / {} / {})",
            t.exact, t.synonym, t.domain
        )));
    }
    Ok(())
}

fn normalized_set(words: &[String]) -> HashSet<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn phrase_list(phrases: &[String]) -> Vec<Vec<String>> {
    phrases
        .iter()
        .map(|p| terms(p))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokenizes the synonym table. Rows sharing a term are merged in table order
/// so appending a row never changes what earlier rows allowed.
fn compile_synonyms(entries: &[SynonymEntry]) -> Result<Vec<SynonymRule>, RulesetError> {
    let mut rules: Vec<SynonymRule> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for entry in entries {
        let term = terms(&entry.term);
        if term.is_empty() {
            return Err(RulesetError::Invalid(
                "synonym entry has an empty term".to_string(),
            ));
        }
        if entry.alternatives.is_empty() {
            return Err(RulesetError::Invalid(format!(
                "synonym entry '{}' has no alternatives",
                entry.term
            )));
        }

        let slot = *index.entry(term.clone()).or_insert_with(|| {
            rules.push(SynonymRule {
                term: term.clone(),
                alternatives: Vec::new(),
                alternative_terms: Vec::new(),
            });
            rules.len() - 1
        });

        for alternative in &entry.alternatives {
            let alt_terms = terms(alternative);
            if alt_terms.is_empty() {
                return Err(RulesetError::Invalid(format!(
                    "synonym entry '{}' has an empty alternative",
                    entry.term
                )));
            }
            if alt_terms == term {
                return Err(RulesetError::Invalid(format!(
                    "synonym entry '{}' lists itself as an alternative",
                    entry.term
                )));
            }
            let rule = &mut rules[slot];
            if !rule.alternative_terms.contains(&alt_terms) {
                rule.alternatives.push(alternative.trim().to_string());
                rule.alternative_terms.push(alt_terms);
            }
        }
    }

    Ok(rules)
}
