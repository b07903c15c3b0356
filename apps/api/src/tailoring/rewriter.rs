//! Constrained Rewriter — proposes resume lines for supported requirements.
//!
//! Only three moves exist:
//! - REWORD: swap a term of the entry's text for an alternative listed under
//!   that term in the synonym table. Only alternatives that restate the
//!   requirement are proposed; nothing else in the line changes.
//! - REORDER: move the entry's line ahead of its siblings, text untouched.
//! - EMPHASIZE: bring a clause of the line that covers the requirement to the
//!   front, or surface a matching skill in the skills section.
//!
//! The rewriter may be generous; the integrity checker is the final gate.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::inventory::{ExperienceEntry, Inventory};
use crate::tailoring::matcher::{EvidenceKind, MatchClass, MatchResult};
use crate::tailoring::ruleset::{Ruleset, SynonymRule};
use crate::tailoring::text::{
    capitalize_first, find_sequence, lowercase_first, stem, terms, tokenize, Token,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationKind {
    Reword,
    Reorder,
    Emphasize,
}

/// Where an accepted line lands in the assembled resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSection {
    Skills,
    Experience,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteCandidate {
    pub source_entry_id: String,
    /// Requirement text this candidate was proposed for.
    pub requirement: String,
    pub transformed_text: String,
    pub transformation_kind: TransformationKind,
    pub section: ResumeSection,
}

pub struct ConstrainedRewriter {
    ruleset: Arc<Ruleset>,
}

impl ConstrainedRewriter {
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        Self { ruleset }
    }

    /// Candidates for one match result, in supporting-entry order.
    /// UNMATCHED results never produce anything.
    pub fn propose(&self, result: &MatchResult, inventory: &Inventory) -> Vec<RewriteCandidate> {
        if result.class == MatchClass::Unmatched {
            return Vec::new();
        }

        let focus: HashSet<String> = result
            .requirement
            .normalized_terms
            .iter()
            .filter(|t| !self.ruleset.is_connective(t))
            .map(|t| stem(t))
            .collect();

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        for evidence in &result.evidence {
            let Some(entry) = inventory.get(&evidence.entry_id) else {
                warn!(entry_id = %evidence.entry_id, "Supporting entry missing from inventory");
                continue;
            };
            // PARTIAL support may only be emphasized, never reworded into a direct claim.
            let direct =
                result.class == MatchClass::Matched && evidence.kind != EvidenceKind::Domain;

            let mut proposals: Vec<(String, TransformationKind, ResumeSection)> = Vec::new();
            if direct {
                for text in self.rewordings(&entry.raw_text, &focus) {
                    proposals.push((text, TransformationKind::Reword, ResumeSection::Experience));
                }
            }
            if let Some(text) = self.emphasize_in_line(entry, &focus) {
                proposals.push((text, TransformationKind::Emphasize, ResumeSection::Experience));
            }
            if direct {
                for skill in entry.skills.iter().filter(|s| overlaps(s, &focus)) {
                    proposals.push((
                        skill.clone(),
                        TransformationKind::Emphasize,
                        ResumeSection::Skills,
                    ));
                }
            }
            if !entry.raw_text.trim().is_empty() {
                proposals.push((
                    entry.raw_text.clone(),
                    TransformationKind::Reorder,
                    ResumeSection::Experience,
                ));
            }

            for (text, kind, section) in proposals {
                if seen.insert((entry.id.clone(), text.clone(), kind, section)) {
                    candidates.push(RewriteCandidate {
                        source_entry_id: entry.id.clone(),
                        requirement: result.requirement.text.clone(),
                        transformed_text: text,
                        transformation_kind: kind,
                        section,
                    });
                }
            }
        }

        candidates
    }

    /// One rewording per synonym rule whose term occurs in the text and which
    /// lists an alternative restating the requirement.
    fn rewordings(&self, raw_text: &str, focus: &HashSet<String>) -> Vec<String> {
        let tokens = tokenize(raw_text);
        let norms: Vec<String> = tokens.iter().map(|t| t.norm.clone()).collect();

        self.ruleset
            .synonyms()
            .iter()
            .filter_map(|rule| {
                let position = find_sequence(&norms, &rule.term)?;
                let alternative = restating_alternative(rule, focus)?;
                let span = tokens[position].start..tokens[position + rule.term.len() - 1].end;
                let replacement = if starts_uppercase(&tokens[position].surface) {
                    capitalize_first(alternative)
                } else {
                    alternative.to_string()
                };
                Some(splice(raw_text, span, &replacement))
            })
            .filter(|text| !text.eq_ignore_ascii_case(raw_text))
            .collect()
    }

    /// Moves the clause that best covers the requirement to the front. Clauses
    /// start at emphasis connectors ("with", "for", "at", ...); the first
    /// clause is already in front and is never a candidate.
    fn emphasize_in_line(&self, entry: &ExperienceEntry, focus: &HashSet<String>) -> Option<String> {
        let raw = entry.raw_text.as_str();
        let tokens = tokenize(raw);
        let clauses = self.clauses(&tokens);
        if clauses.len() < 2 {
            return None;
        }

        let coverage = |clause: &Range<usize>| {
            tokens[clause.clone()]
                .iter()
                .filter(|t| focus.contains(&stem(&t.norm)))
                .count()
        };

        let mut best: Option<(usize, usize)> = None;
        for (i, clause) in clauses.iter().enumerate().skip(1) {
            let score = coverage(clause);
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((i, score));
            }
        }
        let (chosen, _) = best?;

        let moved = capitalize_first(clause_text(raw, &tokens, &clauses[chosen]));
        let rest = clauses
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != chosen)
            .map(|(_, clause)| clause_text(raw, &tokens, clause))
            .collect::<Vec<_>>()
            .join(" ");

        let employer_terms = terms(&entry.employer);
        let rest = if is_plain_capitalized(&tokens[0]) && !employer_terms.contains(&tokens[0].norm) {
            lowercase_first(&rest)
        } else {
            rest
        };

        Some(format!("{moved}, {rest}"))
    }

    fn clauses(&self, tokens: &[Token]) -> Vec<Range<usize>> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let mut starts: Vec<usize> = vec![0];
        starts.extend(
            tokens
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, t)| self.ruleset.is_emphasis_connector(&t.norm))
                .map(|(i, _)| i),
        );

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| start..starts.get(i + 1).copied().unwrap_or(tokens.len()))
            .filter(|range| !range.is_empty())
            .collect()
    }
}

fn restating_alternative<'a>(rule: &'a SynonymRule, focus: &HashSet<String>) -> Option<&'a str> {
    rule.alternatives
        .iter()
        .zip(&rule.alternative_terms)
        .find(|(_, alt_terms)| alt_terms.iter().any(|t| focus.contains(&stem(t))))
        .map(|(alt, _)| alt.as_str())
}

fn overlaps(text: &str, focus: &HashSet<String>) -> bool {
    terms(text).iter().any(|t| focus.contains(&stem(t)))
}

fn clause_text<'a>(raw: &'a str, tokens: &[Token], clause: &Range<usize>) -> &'a str {
    &raw[tokens[clause.start].start..tokens[clause.end - 1].end]
}

fn splice(text: &str, span: Range<usize>, replacement: &str) -> String {
    format!("{}{}{}", &text[..span.start], replacement, &text[span.end..])
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// "Strategic" yes; "HIPAA", "P&L" and "iOS" no.
fn is_plain_capitalized(token: &Token) -> bool {
    let mut chars = token.surface.chars();
    chars.next().is_some_and(char::is_uppercase) && !chars.any(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tailoring::keyword_extractor::{RequirementCategory, RequirementPhrase};
    use crate::tailoring::matcher::SupportingEvidence;

    fn make_entry(id: &str, raw_text: &str, skills: &[&str], domains: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            id: id.to_string(),
            raw_text: raw_text.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            domains: domains.iter().map(|s| s.to_string()).collect(),
            role: String::new(),
            employer: "Accenture".to_string(),
            date_range: None,
        }
    }

    fn make_result(requirement: &str, class: MatchClass, evidence: &[(&str, EvidenceKind)]) -> MatchResult {
        MatchResult {
            requirement: RequirementPhrase {
                text: requirement.to_string(),
                normalized_terms: terms(requirement),
                weight: 1.0,
                category: RequirementCategory::Skill,
            },
            supporting_entries: evidence.iter().map(|(id, _)| id.to_string()).collect(),
            evidence: evidence
                .iter()
                .map(|(id, kind)| SupportingEvidence {
                    entry_id: id.to_string(),
                    kind: *kind,
                    score: 1.0,
                })
                .collect(),
            class,
            rationale: String::new(),
        }
    }

    fn rewriter() -> ConstrainedRewriter {
        ConstrainedRewriter::new(Arc::new(Ruleset::embedded().unwrap()))
    }

    fn texts(candidates: &[RewriteCandidate], kind: TransformationKind) -> Vec<&str> {
        candidates
            .iter()
            .filter(|c| c.transformation_kind == kind)
            .map(|c| c.transformed_text.as_str())
            .collect()
    }

    #[test]
    fn test_unmatched_produces_nothing() {
        let inventory = Inventory::new(vec![make_entry("a", "Agile delivery", &[], &[])]).unwrap();
        let result = make_result("HIPAA compliance", MatchClass::Unmatched, &[]);
        assert!(rewriter().propose(&result, &inventory).is_empty());
    }

    #[test]
    fn test_emphasize_moves_requirement_clause_to_front() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Strategic planning at Accenture with healthcare clients",
            &["strategic planning"],
            &["healthcare"],
        )])
        .unwrap();
        let result = make_result(
            "Healthcare strategic planning",
            MatchClass::Matched,
            &[("acc", EvidenceKind::Exact)],
        );
        let candidates = rewriter().propose(&result, &inventory);

        assert_eq!(
            texts(&candidates, TransformationKind::Emphasize),
            vec![
                "With healthcare clients, strategic planning at Accenture",
                "strategic planning"
            ]
        );
        assert_eq!(
            texts(&candidates, TransformationKind::Reorder),
            vec!["Strategic planning at Accenture with healthcare clients"]
        );
        assert!(candidates.iter().all(|c| c.source_entry_id == "acc"));
    }

    #[test]
    fn test_reword_uses_alternative_that_restates_requirement() {
        let inventory =
            Inventory::new(vec![make_entry("tbwa", "Oversaw budgets for 30 projects", &[], &[])])
                .unwrap();
        let result = make_result(
            "manage budgets",
            MatchClass::Matched,
            &[("tbwa", EvidenceKind::Synonym)],
        );
        let candidates = rewriter().propose(&result, &inventory);
        assert_eq!(
            texts(&candidates, TransformationKind::Reword),
            vec!["Managed budgets for 30 projects"]
        );
    }

    #[test]
    fn test_reword_skipped_when_no_alternative_restates_requirement() {
        let inventory =
            Inventory::new(vec![make_entry("a", "Managed vendor budgets", &[], &[])]).unwrap();
        let result = make_result("vendor budgets", MatchClass::Matched, &[("a", EvidenceKind::Exact)]);
        let candidates = rewriter().propose(&result, &inventory);
        assert!(texts(&candidates, TransformationKind::Reword).is_empty());
    }

    #[test]
    fn test_partial_is_never_reworded() {
        let inventory = Inventory::new(vec![make_entry(
            "acc",
            "Oversaw brand delivery for healthcare accounts",
            &["brand delivery"],
            &["healthcare"],
        )])
        .unwrap();
        let result = make_result(
            "healthcare management",
            MatchClass::Partial,
            &[("acc", EvidenceKind::Domain)],
        );
        let candidates = rewriter().propose(&result, &inventory);

        assert!(texts(&candidates, TransformationKind::Reword).is_empty());
        assert!(candidates.iter().all(|c| c.section == ResumeSection::Experience));
        assert_eq!(
            texts(&candidates, TransformationKind::Emphasize),
            vec!["For healthcare accounts, oversaw brand delivery"]
        );
    }

    #[test]
    fn test_emphasis_keeps_acronyms_and_employer_capitalized() {
        let mut entry = make_entry("a", "HIPAA audits with clinical teams", &[], &[]);
        entry.employer = String::new();
        let inventory = Inventory::new(vec![entry]).unwrap();
        let result = make_result("clinical", MatchClass::Matched, &[("a", EvidenceKind::Exact)]);
        let candidates = rewriter().propose(&result, &inventory);
        assert_eq!(
            texts(&candidates, TransformationKind::Emphasize),
            vec!["With clinical teams, HIPAA audits"]
        );
    }

    #[test]
    fn test_single_clause_line_is_only_reordered() {
        let inventory = Inventory::new(vec![make_entry("a", "Agile delivery", &[], &[])]).unwrap();
        let result = make_result("agile", MatchClass::Matched, &[("a", EvidenceKind::Exact)]);
        let candidates = rewriter().propose(&result, &inventory);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].transformation_kind, TransformationKind::Reorder);
        assert_eq!(candidates[0].transformed_text, "Agile delivery");
    }

    #[test]
    fn test_missing_entry_is_skipped() {
        let inventory = Inventory::new(vec![]).unwrap();
        let result = make_result("agile", MatchClass::Matched, &[("ghost", EvidenceKind::Exact)]);
        assert!(rewriter().propose(&result, &inventory).is_empty());
    }

    #[test]
    fn test_candidates_follow_supporting_entry_order() {
        let inventory = Inventory::new(vec![
            make_entry("first", "Agile coaching", &[], &[]),
            make_entry("second", "Agile delivery", &[], &[]),
        ])
        .unwrap();
        let result = make_result(
            "agile",
            MatchClass::Matched,
            &[("second", EvidenceKind::Exact), ("first", EvidenceKind::Exact)],
        );
        let ids: Vec<String> = rewriter()
            .propose(&result, &inventory)
            .into_iter()
            .map(|c| c.source_entry_id)
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }
}
