//! Experience Matcher — classifies every requirement against the inventory.
//!
//! Evidence tiers per (requirement, entry):
//! - exact:   every requirement term appears in the entry's text or skills
//! - synonym: every term is present or reachable through the similarity
//!            strategy (stem or synonym table), or the whole phrase is
//! - domain:  only the entry's domain tags overlap the requirement
//!
//! Class: MATCHED if any supporting entry has exact/synonym evidence, PARTIAL
//! if only domain evidence clears the threshold, UNMATCHED otherwise. A
//! requirement naming a never-claim phrase from the ruleset only accepts exact
//! evidence, so stems and synonyms cannot stand in for it. Lowering
//! `support_threshold` can only add supporting entries, never remove them, so
//! classification is monotonic in evidence strength.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::inventory::{ExperienceEntry, Inventory};
use crate::tailoring::keyword_extractor::RequirementPhrase;
use crate::tailoring::ruleset::Ruleset;
use crate::tailoring::similarity::SimilarityStrategy;
use crate::tailoring::text::{normalize_phrase, terms};

const MAX_ENTRY_NGRAM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchClass {
    Matched,
    Partial,
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Domain,
    Synonym,
    Exact,
}

impl EvidenceKind {
    fn label(self) -> &'static str {
        match self {
            EvidenceKind::Exact => "exact term match",
            EvidenceKind::Synonym => "synonym-level match",
            EvidenceKind::Domain => "domain overlap only",
        }
    }
}

/// Why one entry supports one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportingEvidence {
    pub entry_id: String,
    pub kind: EvidenceKind,
    pub score: f64,
}

/// The matcher's verdict on one requirement. Same inputs, same verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub requirement: RequirementPhrase,
    /// Supporting entry ids, strongest first.
    pub supporting_entries: Vec<String>,
    /// Evidence for each id in `supporting_entries`, same order.
    pub evidence: Vec<SupportingEvidence>,
    pub class: MatchClass,
    pub rationale: String,
}

/// Pre-tokenized view of one entry, built once per run.
struct EntryProfile<'a> {
    entry: &'a ExperienceEntry,
    position: usize,
    terms: HashSet<String>,
    phrases: Vec<String>,
    domain_terms: HashSet<String>,
    domains: Vec<String>,
}

impl<'a> EntryProfile<'a> {
    fn build(entry: &'a ExperienceEntry, position: usize) -> Self {
        let text_terms = terms(&entry.raw_text);
        let mut all_terms: HashSet<String> = text_terms.iter().cloned().collect();
        let mut phrases = Vec::new();

        for n in 1..=MAX_ENTRY_NGRAM.min(text_terms.len()) {
            for window in text_terms.windows(n) {
                phrases.push(window.join(" "));
            }
        }
        for skill in &entry.skills {
            let skill_terms = terms(skill);
            all_terms.extend(skill_terms.iter().cloned());
            phrases.push(skill_terms.join(" "));
        }

        let domains: Vec<String> = entry.domains.iter().map(|d| normalize_phrase(d)).collect();
        let domain_terms = domains
            .iter()
            .flat_map(|d| d.split(' ').map(str::to_string))
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            entry,
            position,
            terms: all_terms,
            phrases,
            domain_terms,
            domains,
        }
    }
}

pub struct ExperienceMatcher {
    ruleset: Arc<Ruleset>,
    similarity: Arc<dyn SimilarityStrategy>,
}

impl ExperienceMatcher {
    pub fn new(ruleset: Arc<Ruleset>, similarity: Arc<dyn SimilarityStrategy>) -> Self {
        Self {
            ruleset,
            similarity,
        }
    }

    /// One result per requirement, in input order.
    pub fn match_requirements(
        &self,
        requirements: &[RequirementPhrase],
        inventory: &Inventory,
    ) -> Vec<MatchResult> {
        let profiles: Vec<EntryProfile> = inventory
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| EntryProfile::build(entry, position))
            .collect();

        requirements
            .iter()
            .map(|requirement| self.match_one(requirement, &profiles, inventory.is_empty()))
            .collect()
    }

    fn match_one(
        &self,
        requirement: &RequirementPhrase,
        profiles: &[EntryProfile],
        inventory_empty: bool,
    ) -> MatchResult {
        let threshold = self.ruleset.thresholds().support_threshold;

        let mut supporting: Vec<(&EntryProfile, EvidenceKind, f64)> = profiles
            .iter()
            .filter_map(|profile| {
                self.evidence(requirement, profile)
                    .map(|(kind, score)| (profile, kind, score))
            })
            .filter(|(_, _, score)| *score > 0.0 && *score >= threshold)
            .collect();

        let forbidden = self.ruleset.forbidden_phrase(&requirement.normalized_terms);
        if forbidden.is_some() {
            supporting.retain(|(_, kind, _)| *kind == EvidenceKind::Exact);
        }

        supporting.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.entry.recency_key().cmp(&a.0.entry.recency_key()))
                .then(a.0.position.cmp(&b.0.position))
        });

        let class = if supporting
            .iter()
            .any(|(_, kind, _)| matches!(kind, EvidenceKind::Exact | EvidenceKind::Synonym))
        {
            MatchClass::Matched
        } else if !supporting.is_empty() {
            MatchClass::Partial
        } else {
            MatchClass::Unmatched
        };

        let rationale = self.rationale(
            requirement,
            class,
            &supporting,
            forbidden.as_deref(),
            inventory_empty,
        );
        debug!(
            requirement = %requirement.text,
            class = ?class,
            supporting = supporting.len(),
            "Classified requirement"
        );

        MatchResult {
            requirement: requirement.clone(),
            supporting_entries: supporting
                .iter()
                .map(|(p, _, _)| p.entry.id.clone())
                .collect(),
            evidence: supporting
                .iter()
                .map(|(p, kind, score)| SupportingEvidence {
                    entry_id: p.entry.id.clone(),
                    kind: *kind,
                    score: *score,
                })
                .collect(),
            class,
            rationale,
        }
    }

    /// Strongest evidence tier this entry offers for the requirement.
    fn evidence(
        &self,
        requirement: &RequirementPhrase,
        profile: &EntryProfile,
    ) -> Option<(EvidenceKind, f64)> {
        let thresholds = self.ruleset.thresholds();
        let req_terms: Vec<&String> = requirement
            .normalized_terms
            .iter()
            .filter(|t| !self.ruleset.is_connective(t))
            .collect();
        if req_terms.is_empty() {
            return None;
        }

        if req_terms.iter().all(|t| profile.terms.contains(*t)) {
            return Some((EvidenceKind::Exact, thresholds.exact));
        }

        let phrase = requirement.normalized_terms.join(" ");
        let whole_phrase_related = profile
            .phrases
            .iter()
            .any(|p| self.is_related(&phrase, p));
        let every_term_related = req_terms.iter().all(|t| {
            profile.terms.contains(*t) || profile.phrases.iter().any(|p| self.is_related(t, p))
        });
        if whole_phrase_related || every_term_related {
            return Some((EvidenceKind::Synonym, thresholds.synonym));
        }

        let domain_overlap = req_terms.iter().any(|t| {
            profile.domain_terms.contains(*t)
                || profile.domains.iter().any(|d| self.is_related(t, d))
        });
        if domain_overlap {
            return Some((EvidenceKind::Domain, thresholds.domain));
        }

        None
    }

    fn is_related(&self, a: &str, b: &str) -> bool {
        self.similarity.similarity(a, b) >= self.ruleset.thresholds().synonym_similarity
    }

    fn rationale(
        &self,
        requirement: &RequirementPhrase,
        class: MatchClass,
        supporting: &[(&EntryProfile, EvidenceKind, f64)],
        forbidden: Option<&str>,
        inventory_empty: bool,
    ) -> String {
        let text = &requirement.text;
        match (class, supporting.first()) {
            (MatchClass::Matched, Some((best, kind, _))) => format!(
                "'{text}' is supported by {} entr{} (strongest: '{}', {} via {} similarity)",
                supporting.len(),
                if supporting.len() == 1 { "y" } else { "ies" },
                best.entry.id,
                kind.label(),
                self.similarity.name()
            ),
            (MatchClass::Partial, Some((best, _, _))) => format!(
                "'{text}' is only indirectly supported: entry '{}' shares a domain but not the skill itself; \
                 emphasize the related work without implying direct experience",
                best.entry.id
            ),
            _ if inventory_empty => format!(
                "No experience entries were supplied, so '{text}' cannot be supported"
            ),
            _ => match forbidden {
                Some(phrase) => format!(
                    "'{text}' names '{phrase}', which cannot be claimed without an entry stating it directly"
                ),
                None => format!(
                    "No experience entry supports '{text}'; it cannot be added without fabricating experience"
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::DateRange;
    use crate::tailoring::keyword_extractor::RequirementCategory;
    use crate::tailoring::similarity::DictionarySimilarity;
    use chrono::NaiveDate;

    fn make_entry(id: &str, raw_text: &str, skills: &[&str], domains: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            id: id.to_string(),
            raw_text: raw_text.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            domains: domains.iter().map(|s| s.to_string()).collect(),
            role: String::new(),
            employer: String::new(),
            date_range: None,
        }
    }

    fn make_requirement(text: &str) -> RequirementPhrase {
        RequirementPhrase {
            text: text.to_string(),
            normalized_terms: terms(text),
            weight: 1.0,
            category: RequirementCategory::Skill,
        }
    }

    fn matcher_with(ruleset: Ruleset) -> ExperienceMatcher {
        let ruleset = Arc::new(ruleset);
        let similarity = Arc::new(DictionarySimilarity::new(ruleset.clone()));
        ExperienceMatcher::new(ruleset, similarity)
    }

    fn matcher() -> ExperienceMatcher {
        matcher_with(Ruleset::embedded().unwrap())
    }

    #[test]
    fn test_exact_terms_across_text_and_skills_match() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Strategic planning at Accenture with healthcare clients",
            &["strategic planning"],
            &["healthcare"],
        )])
        .unwrap();
        let results = matcher().match_requirements(
            &[make_requirement("healthcare strategic planning")],
            &inventory,
        );
        assert_eq!(results[0].class, MatchClass::Matched);
        assert_eq!(results[0].supporting_entries, vec!["acc"]);
        assert_eq!(results[0].evidence[0].kind, EvidenceKind::Exact);
    }

    #[test]
    fn test_synonym_term_matches() {
        let inventory = Inventory::new(vec![make_entry(
            "tbwa",
            "Oversee P&L across projects",
            &[],
            &[],
        )])
        .unwrap();
        let results = matcher().match_requirements(&[make_requirement("manage P&L")], &inventory);
        assert_eq!(results[0].class, MatchClass::Matched);
        assert_eq!(results[0].evidence[0].kind, EvidenceKind::Synonym);
    }

    #[test]
    fn test_stem_variant_matches() {
        let inventory =
            Inventory::new(vec![make_entry("a", "Planned vendor budgets", &[], &[])]).unwrap();
        let results = matcher().match_requirements(&[make_requirement("vendor budget")], &inventory);
        assert_eq!(results[0].class, MatchClass::Matched);
    }

    #[test]
    fn test_domain_only_overlap_is_partial() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Brand delivery for insurance accounts",
            &[],
            &["healthcare"],
        )])
        .unwrap();
        let results = matcher().match_requirements(
            &[make_requirement("healthcare regulatory reporting")],
            &inventory,
        );
        assert_eq!(results[0].class, MatchClass::Partial);
        assert!(results[0].rationale.contains("indirectly"));
    }

    #[test]
    fn test_forbidden_phrase_not_claimed_through_stems() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Led delivery with program management",
            &["Program Management"],
            &[],
        )])
        .unwrap();
        let results = matcher().match_requirements(&[make_requirement("Programming")], &inventory);
        assert_eq!(results[0].class, MatchClass::Unmatched);
        assert!(results[0].supporting_entries.is_empty());
        assert!(results[0].rationale.contains("cannot be claimed"));
    }

    #[test]
    fn test_forbidden_phrase_claimed_with_exact_evidence() {
        let inventory = Inventory::new(vec![
            make_entry("pm", "Program management for retail", &[], &["retail"]),
            make_entry("dev", "Built internal tools", &["Python programming"], &[]),
        ])
        .unwrap();
        let results =
            matcher().match_requirements(&[make_requirement("retail programming")], &inventory);
        assert_eq!(results[0].class, MatchClass::Unmatched);

        let results = matcher().match_requirements(&[make_requirement("programming")], &inventory);
        assert_eq!(results[0].class, MatchClass::Matched);
        assert_eq!(results[0].supporting_entries, vec!["dev"]);
    }

    #[test]
    fn test_no_overlap_is_unmatched() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Strategic planning at Accenture with healthcare clients",
            &["strategic planning"],
            &["healthcare"],
        )])
        .unwrap();
        let results =
            matcher().match_requirements(&[make_requirement("HIPAA compliance")], &inventory);
        assert_eq!(results[0].class, MatchClass::Unmatched);
        assert!(results[0].supporting_entries.is_empty());
        assert!(results[0].rationale.contains("fabricating"));
    }

    #[test]
    fn test_empty_inventory_makes_everything_unmatched() {
        let inventory = Inventory::new(vec![]).unwrap();
        let results = matcher().match_requirements(
            &[make_requirement("agile"), make_requirement("jira")],
            &inventory,
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.class == MatchClass::Unmatched));
        assert!(results[0].rationale.contains("No experience entries were supplied"));
    }

    #[test]
    fn test_results_keep_input_order() {
        let inventory = Inventory::new(vec![make_entry("a", "Agile delivery", &[], &[])]).unwrap();
        let requirements = vec![make_requirement("jira"), make_requirement("agile")];
        let results = matcher().match_requirements(&requirements, &inventory);
        assert_eq!(results[0].requirement.text, "jira");
        assert_eq!(results[1].requirement.text, "agile");
    }

    #[test]
    fn test_ties_broken_by_recency_then_inventory_order() {
        let date = |y| NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
        let mut old = make_entry("old", "Agile coaching", &[], &[]);
        old.date_range = Some(DateRange {
            start: date(2015),
            end: Some(date(2018)),
        });
        let mut current = make_entry("current", "Agile delivery", &[], &[]);
        current.date_range = Some(DateRange {
            start: date(2021),
            end: None,
        });
        let first_undated = make_entry("undated-1", "Agile rituals", &[], &[]);
        let second_undated = make_entry("undated-2", "Agile ceremonies", &[], &[]);
        let inventory =
            Inventory::new(vec![first_undated, old, second_undated, current]).unwrap();

        let results = matcher().match_requirements(&[make_requirement("agile")], &inventory);
        assert_eq!(
            results[0].supporting_entries,
            vec!["current", "old", "undated-1", "undated-2"]
        );
    }

    #[test]
    fn test_exact_outranks_synonym_evidence() {
        let inventory = Inventory::new(vec![
            make_entry("syn", "Oversee budgets", &[], &[]),
            make_entry("exact", "Manage budgets", &[], &[]),
        ])
        .unwrap();
        let results = matcher().match_requirements(&[make_requirement("manage budgets")], &inventory);
        assert_eq!(results[0].supporting_entries, vec!["exact", "syn"]);
    }

    #[test]
    fn test_lowering_threshold_never_removes_support() {
        let inventory = Inventory::new(vec![
            make_entry("a", "Brand delivery", &[], &["healthcare"]),
            make_entry("b", "Healthcare planning", &[], &[]),
        ])
        .unwrap();
        let requirements = vec![
            make_requirement("healthcare planning"),
            make_requirement("healthcare analytics"),
            make_requirement("hipaa"),
        ];
        let base = Ruleset::embedded().unwrap();

        let mut previous: Option<Vec<MatchResult>> = None;
        for threshold in [0.9, 0.6, 0.3, 0.05] {
            let results = matcher_with(base.with_support_threshold(threshold))
                .match_requirements(&requirements, &inventory);
            if let Some(prev) = &previous {
                for (before, after) in prev.iter().zip(&results) {
                    if before.class != MatchClass::Unmatched {
                        assert_ne!(after.class, MatchClass::Unmatched);
                    }
                    if before.class == MatchClass::Matched {
                        assert_eq!(after.class, MatchClass::Matched);
                    }
                    for id in &before.supporting_entries {
                        assert!(after.supporting_entries.contains(id));
                    }
                }
            }
            previous = Some(results);
        }
    }

    #[test]
    fn test_high_threshold_demotes_domain_evidence() {
        let inventory =
            Inventory::new(vec![make_entry("a", "Brand delivery", &[], &["healthcare"])]).unwrap();
        let strict = matcher_with(Ruleset::embedded().unwrap().with_support_threshold(0.5));
        let results = strict.match_requirements(&[make_requirement("healthcare analytics")], &inventory);
        assert_eq!(results[0].class, MatchClass::Unmatched);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let inventory = Inventory::new(vec![
            make_entry("a", "Led change management", &["Change Management"], &["agency"]),
            make_entry("b", "Oversaw 30 active projects", &[], &["healthcare"]),
        ])
        .unwrap();
        let requirements = vec![
            make_requirement("change management"),
            make_requirement("healthcare"),
            make_requirement("project oversight"),
        ];
        let m = matcher();
        let first = m.match_requirements(&requirements, &inventory);
        assert_eq!(m.match_requirements(&requirements, &inventory), first);
    }
}
