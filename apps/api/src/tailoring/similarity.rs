//! Synonym-level similarity — pluggable strategy behind a fixed interface.
//!
//! Default: `DictionarySimilarity` (synonym table + light stemming, deterministic).
//! The matcher only sees `(phrase, phrase) -> score`, so an embedding-backed
//! strategy can be swapped in without touching classification or integrity.
//!
//! `Analyzer` holds an `Arc<dyn SimilarityStrategy>` and shares it with the matcher.

use std::sync::Arc;

use crate::tailoring::ruleset::Ruleset;
use crate::tailoring::text::{stem, terms};

pub trait SimilarityStrategy: Send + Sync {
    /// Backend label, surfaced in match rationales for transparency.
    fn name(&self) -> &'static str;

    /// Similarity of two phrases in `[0.0, 1.0]`. Must be deterministic.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Score for phrases whose tokens share stems pairwise ("planned" / "planning").
const STEM_SCORE: f64 = 0.9;
/// Score for phrases related by the synonym table.
const SYNONYM_SCORE: f64 = 0.8;

/// Dictionary-backed strategy driven by the ruleset's synonym table.
pub struct DictionarySimilarity {
    ruleset: Arc<Ruleset>,
    /// Synonym rows with term and alternatives reduced to stems, so "manage"
    /// reaches "oversaw" through the "managed" alternative.
    stemmed_rules: Vec<(Vec<String>, Vec<Vec<String>>)>,
}

impl DictionarySimilarity {
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        let stemmed_rules = ruleset
            .synonyms()
            .iter()
            .map(|rule| {
                (
                    stem_all(&rule.term),
                    rule.alternative_terms.iter().map(|alt| stem_all(alt)).collect(),
                )
            })
            .collect();
        Self {
            ruleset,
            stemmed_rules,
        }
    }

    fn related_by_stem(&self, a: &[String], b: &[String]) -> bool {
        let (a, b) = (stem_all(a), stem_all(b));
        self.stemmed_rules.iter().any(|(term, alternatives)| {
            let has_alt = |phrase: &[String]| alternatives.iter().any(|alt| alt == phrase);
            (*term == a && has_alt(&b)) || (*term == b && has_alt(&a)) || (has_alt(&a) && has_alt(&b))
        })
    }
}

fn stem_all(terms: &[String]) -> Vec<String> {
    terms.iter().map(|t| stem(t)).collect()
}

impl SimilarityStrategy for DictionarySimilarity {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        let a_terms = terms(a);
        let b_terms = terms(b);
        if a_terms.is_empty() || b_terms.is_empty() {
            return 0.0;
        }
        if a_terms == b_terms {
            return 1.0;
        }
        if stem_all(&a_terms) == stem_all(&b_terms) {
            return STEM_SCORE;
        }
        if self.ruleset.are_synonyms(&a_terms, &b_terms)
            || self.related_by_stem(&a_terms, &b_terms)
        {
            return SYNONYM_SCORE;
        }
        0.0
    }
}
