//! Report Builder — aggregates one run into an `AnalysisReport`.
//!
//! Every extracted requirement lands in exactly one of `matched`, `partial`
//! or `unmatched`, and in `outcomes` in extraction order. The report holds no
//! timestamps or ids, so identical inputs serialize to identical bytes.

use serde::{Deserialize, Serialize};

use crate::models::inventory::Inventory;
use crate::tailoring::integrity::IntegrityVerdict;
use crate::tailoring::keyword_extractor::RequirementCategory;
use crate::tailoring::matcher::{MatchClass, MatchResult};
use crate::tailoring::rewriter::{ResumeSection, TransformationKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementOutcome {
    pub requirement: String,
    pub category: RequirementCategory,
    pub weight: f64,
    pub class: MatchClass,
    pub supporting_entries: Vec<String>,
    pub rationale: String,
}

/// An UNMATCHED requirement, verbatim, with the reason it cannot be added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub requirement: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRewrite {
    pub requirement: String,
    pub transformed_text: String,
    pub transformation_kind: TransformationKind,
    pub section: ResumeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRewrites {
    pub source_entry_id: String,
    pub rewrites: Vec<AcceptedRewrite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRewrite {
    pub source_entry_id: String,
    pub requirement: String,
    pub transformed_text: String,
    pub transformation_kind: TransformationKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub requirement_count: usize,
    pub matched: Vec<RequirementOutcome>,
    pub partial: Vec<RequirementOutcome>,
    pub unmatched: Vec<Gap>,
    /// Accepted rewrites grouped by source entry, in inventory order.
    pub rewrites: Vec<EntryRewrites>,
    pub rejected: Vec<RejectedRewrite>,
    /// (matched + partial) / total; 0.0 when nothing was extracted.
    pub match_rate: f64,
    pub outcomes: Vec<RequirementOutcome>,
}

impl AnalysisReport {
    pub fn build(
        results: &[MatchResult],
        verdicts: &[IntegrityVerdict],
        inventory: &Inventory,
    ) -> Self {
        let outcomes: Vec<RequirementOutcome> = results
            .iter()
            .map(|r| RequirementOutcome {
                requirement: r.requirement.text.clone(),
                category: r.requirement.category,
                weight: r.requirement.weight,
                class: r.class,
                supporting_entries: r.supporting_entries.clone(),
                rationale: r.rationale.clone(),
            })
            .collect();

        let of_class = |class: MatchClass| -> Vec<RequirementOutcome> {
            outcomes.iter().filter(|o| o.class == class).cloned().collect()
        };
        let matched = of_class(MatchClass::Matched);
        let partial = of_class(MatchClass::Partial);
        let unmatched: Vec<Gap> = outcomes
            .iter()
            .filter(|o| o.class == MatchClass::Unmatched)
            .map(|o| Gap {
                requirement: o.requirement.clone(),
                reason: o.rationale.clone(),
            })
            .collect();

        let match_rate = if outcomes.is_empty() {
            0.0
        } else {
            (matched.len() + partial.len()) as f64 / outcomes.len() as f64
        };

        Self {
            requirement_count: outcomes.len(),
            matched,
            partial,
            unmatched,
            rewrites: group_accepted(verdicts, inventory),
            rejected: verdicts
                .iter()
                .filter(|v| !v.accepted)
                .map(|v| RejectedRewrite {
                    source_entry_id: v.candidate.source_entry_id.clone(),
                    requirement: v.candidate.requirement.clone(),
                    transformed_text: v.candidate.transformed_text.clone(),
                    transformation_kind: v.candidate.transformation_kind,
                    reason: v
                        .violation_reason
                        .clone()
                        .unwrap_or_else(|| "rejected".to_string()),
                })
                .collect(),
            match_rate,
            outcomes,
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.rewrites.iter().map(|group| group.rewrites.len()).sum()
    }
}

fn group_accepted(verdicts: &[IntegrityVerdict], inventory: &Inventory) -> Vec<EntryRewrites> {
    let mut groups: Vec<EntryRewrites> = Vec::new();

    for verdict in verdicts.iter().filter(|v| v.accepted) {
        let candidate = &verdict.candidate;
        let rewrite = AcceptedRewrite {
            requirement: candidate.requirement.clone(),
            transformed_text: candidate.transformed_text.clone(),
            transformation_kind: candidate.transformation_kind,
            section: candidate.section,
        };
        match groups
            .iter_mut()
            .find(|g| g.source_entry_id == candidate.source_entry_id)
        {
            Some(group) => group.rewrites.push(rewrite),
            None => groups.push(EntryRewrites {
                source_entry_id: candidate.source_entry_id.clone(),
                rewrites: vec![rewrite],
            }),
        }
    }

    // Stable: rewrites inside a group keep verdict order.
    groups.sort_by_key(|g| inventory.position(&g.source_entry_id).unwrap_or(usize::MAX));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::ExperienceEntry;
    use crate::tailoring::keyword_extractor::RequirementPhrase;
    use crate::tailoring::rewriter::RewriteCandidate;
    use crate::tailoring::text::terms;

    fn make_entry(id: &str) -> ExperienceEntry {
        ExperienceEntry {
            id: id.to_string(),
            raw_text: format!("Work for {id}"),
            skills: vec![],
            domains: vec![],
            role: String::new(),
            employer: String::new(),
            date_range: None,
        }
    }

    fn make_result(text: &str, class: MatchClass) -> MatchResult {
        MatchResult {
            requirement: RequirementPhrase {
                text: text.to_string(),
                normalized_terms: terms(text),
                weight: 2.0,
                category: RequirementCategory::Skill,
            },
            supporting_entries: vec![],
            evidence: vec![],
            class,
            rationale: format!("because {text}"),
        }
    }

    fn make_verdict(entry_id: &str, text: &str, accepted: bool) -> IntegrityVerdict {
        IntegrityVerdict {
            candidate: RewriteCandidate {
                source_entry_id: entry_id.to_string(),
                requirement: "agile".to_string(),
                transformed_text: text.to_string(),
                transformation_kind: TransformationKind::Emphasize,
                section: ResumeSection::Experience,
            },
            accepted,
            violation_reason: (!accepted).then(|| format!("term '{text}' not found")),
        }
    }

    #[test]
    fn test_every_requirement_is_disclosed() {
        let inventory = Inventory::new(vec![make_entry("a")]).unwrap();
        let results = vec![
            make_result("agile", MatchClass::Matched),
            make_result("healthcare", MatchClass::Partial),
            make_result("HIPAA compliance", MatchClass::Unmatched),
            make_result("jira", MatchClass::Matched),
        ];
        let report = AnalysisReport::build(&results, &[], &inventory);

        assert_eq!(report.requirement_count, 4);
        assert_eq!(
            report.matched.len() + report.partial.len() + report.unmatched.len(),
            report.requirement_count
        );
        assert_eq!(report.unmatched[0].requirement, "HIPAA compliance");
        assert_eq!(report.unmatched[0].reason, "because HIPAA compliance");
        assert_eq!(report.match_rate, 0.75);
        let order: Vec<&str> = report.outcomes.iter().map(|o| o.requirement.as_str()).collect();
        assert_eq!(order, vec!["agile", "healthcare", "HIPAA compliance", "jira"]);
    }

    #[test]
    fn test_zero_requirements_has_zero_match_rate() {
        let report = AnalysisReport::build(&[], &[], &Inventory::default());
        assert_eq!(report.requirement_count, 0);
        assert_eq!(report.match_rate, 0.0);
        assert!(report.match_rate.is_finite());
    }

    #[test]
    fn test_rewrites_grouped_by_entry_in_inventory_order() {
        let inventory = Inventory::new(vec![make_entry("a"), make_entry("b")]).unwrap();
        let verdicts = vec![
            make_verdict("b", "first for b", true),
            make_verdict("a", "only for a", true),
            make_verdict("b", "second for b", true),
        ];
        let report = AnalysisReport::build(&[], &verdicts, &inventory);

        let ids: Vec<&str> = report.rewrites.iter().map(|g| g.source_entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let b_texts: Vec<&str> = report.rewrites[1]
            .rewrites
            .iter()
            .map(|r| r.transformed_text.as_str())
            .collect();
        assert_eq!(b_texts, vec!["first for b", "second for b"]);
        assert_eq!(report.accepted_count(), 3);
    }

    #[test]
    fn test_rejected_candidates_listed_with_reason() {
        let inventory = Inventory::new(vec![make_entry("a")]).unwrap();
        let verdicts = vec![
            make_verdict("a", "Certified", false),
            make_verdict("a", "Work for a", true),
        ];
        let report = AnalysisReport::build(&[], &verdicts, &inventory);

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].transformed_text, "Certified");
        assert!(report.rejected[0].reason.contains("Certified"));
        assert_eq!(report.accepted_count(), 1);
    }

    #[test]
    fn test_serialized_layout_has_top_level_fields() {
        let report = AnalysisReport::build(&[], &[], &Inventory::default());
        let value = serde_json::to_value(&report).unwrap();
        for field in ["matched", "partial", "unmatched", "rewrites", "rejected", "match_rate"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
