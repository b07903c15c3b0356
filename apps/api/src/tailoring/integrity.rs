//! Integrity Checker — the only gate between a candidate and the resume.
//!
//! Every content token of a candidate must come from its source entry: the
//! entry's text, its skills, or an alternative the synonym table lists under a
//! term the entry already contains. Connectives are ignored. Numbers count as
//! content, so quantities cannot drift. There is no override path.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::inventory::{ExperienceEntry, Inventory};
use crate::tailoring::rewriter::RewriteCandidate;
use crate::tailoring::ruleset::Ruleset;
use crate::tailoring::text::{find_sequence, terms};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityVerdict {
    pub candidate: RewriteCandidate,
    pub accepted: bool,
    pub violation_reason: Option<String>,
}

pub struct IntegrityChecker {
    ruleset: Arc<Ruleset>,
}

impl IntegrityChecker {
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        Self { ruleset }
    }

    pub fn check_all(
        &self,
        candidates: Vec<RewriteCandidate>,
        inventory: &Inventory,
    ) -> Vec<IntegrityVerdict> {
        candidates
            .into_iter()
            .map(|candidate| self.check(candidate, inventory))
            .collect()
    }

    pub fn check(&self, candidate: RewriteCandidate, inventory: &Inventory) -> IntegrityVerdict {
        match self.violation(&candidate, inventory) {
            None => IntegrityVerdict {
                candidate,
                accepted: true,
                violation_reason: None,
            },
            Some(reason) => {
                warn!(
                    entry_id = %candidate.source_entry_id,
                    requirement = %candidate.requirement,
                    text = %candidate.transformed_text,
                    reason = %reason,
                    "Rejected rewrite candidate"
                );
                IntegrityVerdict {
                    candidate,
                    accepted: false,
                    violation_reason: Some(reason),
                }
            }
        }
    }

    fn violation(&self, candidate: &RewriteCandidate, inventory: &Inventory) -> Option<String> {
        let Some(entry) = inventory.get(&candidate.source_entry_id) else {
            return Some(format!(
                "source entry '{}' does not exist in the inventory",
                candidate.source_entry_id
            ));
        };

        let content: Vec<String> = terms(&candidate.transformed_text)
            .into_iter()
            .filter(|t| !self.ruleset.is_connective(t))
            .collect();
        if content.is_empty() {
            return Some("transformed text has no content".to_string());
        }

        let allowed = self.allowed_vocabulary(entry);
        let mut offending: Vec<String> = Vec::new();
        for term in content {
            if !allowed.contains(&term) && !offending.contains(&term) {
                offending.push(term);
            }
        }
        if offending.is_empty() {
            return None;
        }

        let quoted = offending
            .iter()
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "{} {quoted} not found in entry '{}' or its allow-listed synonyms",
            if offending.len() == 1 { "term" } else { "terms" },
            entry.id
        ))
    }

    /// Tokens of the entry's text and skills, plus every alternative keyed by
    /// a term the entry already contains.
    fn allowed_vocabulary(&self, entry: &ExperienceEntry) -> HashSet<String> {
        let sources: Vec<Vec<String>> = std::iter::once(terms(&entry.raw_text))
            .chain(entry.skills.iter().map(|s| terms(s)))
            .collect();

        let mut allowed: HashSet<String> = sources.iter().flatten().cloned().collect();
        for rule in self.ruleset.synonyms() {
            if sources
                .iter()
                .any(|source| find_sequence(source, &rule.term).is_some())
            {
                allowed.extend(rule.alternative_terms.iter().flatten().cloned());
            }
        }
        allowed
    }
}
