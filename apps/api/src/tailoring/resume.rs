//! Resume assembly from accepted verdicts. Rejected candidates are never read.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::inventory::{ExperienceEntry, Inventory};
use crate::tailoring::integrity::IntegrityVerdict;
use crate::tailoring::matcher::{MatchClass, MatchResult};
use crate::tailoring::rewriter::{ResumeSection, RewriteCandidate, TransformationKind};
use crate::tailoring::text::{stem, terms};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeLine {
    pub section: ResumeSection,
    pub text: String,
    pub source_entry_id: Option<String>,
    /// `None` for content carried over unmodified.
    pub transformation: Option<TransformationKind>,
}

/// Accepted candidates indexed by requirement rank, so "first in requirement
/// order" is a plain min over ranks.
struct Accepted<'a> {
    candidates: Vec<(usize, &'a RewriteCandidate)>,
}

impl<'a> Accepted<'a> {
    fn new(results: &[MatchResult], verdicts: &'a [IntegrityVerdict]) -> Self {
        let mut rank: HashMap<&str, usize> = HashMap::new();
        for (i, result) in results.iter().enumerate() {
            rank.entry(result.requirement.text.as_str()).or_insert(i);
        }

        let mut candidates: Vec<(usize, &RewriteCandidate)> = verdicts
            .iter()
            .filter(|v| v.accepted)
            .map(|v| {
                let r = rank
                    .get(v.candidate.requirement.as_str())
                    .copied()
                    .unwrap_or(usize::MAX);
                (r, &v.candidate)
            })
            .collect();
        candidates.sort_by_key(|(r, _)| *r);

        Self { candidates }
    }

    fn iter(&self) -> impl Iterator<Item = &(usize, &'a RewriteCandidate)> {
        self.candidates.iter()
    }

    fn best_rank(&self, entry_id: &str, kind: TransformationKind) -> Option<usize> {
        self.iter()
            .find(|(_, c)| c.source_entry_id == entry_id && c.transformation_kind == kind)
            .map(|(r, _)| *r)
    }

    fn line_rewrite(&self, entry_id: &str) -> Option<&'a RewriteCandidate> {
        self.iter()
            .map(|(_, c)| *c)
            .find(|c| {
                c.source_entry_id == entry_id
                    && c.section == ResumeSection::Experience
                    && matches!(
                        c.transformation_kind,
                        TransformationKind::Reword | TransformationKind::Emphasize
                    )
            })
    }
}

/// Skills first, then experience grouped by employer.
pub fn assemble(
    inventory: &Inventory,
    results: &[MatchResult],
    verdicts: &[IntegrityVerdict],
) -> Vec<ResumeLine> {
    let accepted = Accepted::new(results, verdicts);
    let mut lines = skills_section(inventory, results, &accepted);
    lines.extend(experience_section(inventory, &accepted));
    lines
}

fn skills_section(
    inventory: &Inventory,
    results: &[MatchResult],
    accepted: &Accepted,
) -> Vec<ResumeLine> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for (_, candidate) in accepted.iter() {
        if candidate.section != ResumeSection::Skills {
            continue;
        }
        if seen.insert(candidate.transformed_text.to_lowercase()) {
            lines.push(ResumeLine {
                section: ResumeSection::Skills,
                text: candidate.transformed_text.clone(),
                source_entry_id: Some(candidate.source_entry_id.clone()),
                transformation: Some(candidate.transformation_kind),
            });
        }
    }

    // Skills backing a supported requirement, in requirement order.
    for result in results {
        if result.class == MatchClass::Unmatched {
            continue;
        }
        let focus: HashSet<String> = result
            .requirement
            .normalized_terms
            .iter()
            .map(|t| stem(t))
            .collect();
        for entry in result
            .supporting_entries
            .iter()
            .filter_map(|id| inventory.get(id))
        {
            for skill in &entry.skills {
                let relevant = terms(skill).iter().any(|t| focus.contains(&stem(t)));
                if relevant && seen.insert(skill.to_lowercase()) {
                    lines.push(ResumeLine {
                        section: ResumeSection::Skills,
                        text: skill.clone(),
                        source_entry_id: Some(entry.id.clone()),
                        transformation: None,
                    });
                }
            }
        }
    }

    for entry in inventory.entries() {
        for skill in &entry.skills {
            if seen.insert(skill.to_lowercase()) {
                lines.push(ResumeLine {
                    section: ResumeSection::Skills,
                    text: skill.clone(),
                    source_entry_id: Some(entry.id.clone()),
                    transformation: None,
                });
            }
        }
    }

    lines
}

fn experience_section(inventory: &Inventory, accepted: &Accepted) -> Vec<ResumeLine> {
    let mut employers: Vec<&str> = Vec::new();
    for entry in inventory.entries() {
        if !employers.contains(&entry.employer.as_str()) {
            employers.push(&entry.employer);
        }
    }

    let mut lines = Vec::new();
    for employer in employers {
        let mut group: Vec<(usize, &ExperienceEntry)> = inventory
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.employer == employer && !e.raw_text.trim().is_empty())
            .collect();
        // Reordered entries first by the best requirement they support; stable otherwise.
        group.sort_by_key(|(position, e)| {
            let rank = accepted
                .best_rank(&e.id, TransformationKind::Reorder)
                .unwrap_or(usize::MAX);
            (rank, *position)
        });

        for (_, entry) in group {
            lines.push(experience_line(entry, accepted));
        }
    }
    lines
}

fn experience_line(entry: &ExperienceEntry, accepted: &Accepted) -> ResumeLine {
    if let Some(candidate) = accepted.line_rewrite(&entry.id) {
        return ResumeLine {
            section: ResumeSection::Experience,
            text: candidate.transformed_text.clone(),
            source_entry_id: Some(entry.id.clone()),
            transformation: Some(candidate.transformation_kind),
        };
    }

    let reordered = accepted
        .best_rank(&entry.id, TransformationKind::Reorder)
        .is_some();
    ResumeLine {
        section: ResumeSection::Experience,
        text: entry.raw_text.clone(),
        source_entry_id: Some(entry.id.clone()),
        transformation: reordered.then_some(TransformationKind::Reorder),
    }
}

/// Plain-text rendering with one heading per section.
pub fn render(lines: &[ResumeLine]) -> String {
    let mut out = String::new();
    for (heading, section) in [
        ("SKILLS", ResumeSection::Skills),
        ("EXPERIENCE", ResumeSection::Experience),
    ] {
        let section_lines: Vec<&ResumeLine> =
            lines.iter().filter(|l| l.section == section).collect();
        if section_lines.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(heading);
        out.push('\n');
        for line in section_lines {
            out.push_str("- ");
            out.push_str(&line.text);
            out.push('\n');
        }
    }
    out
}
