//! Keyword Extractor — turns raw posting text into ranked requirement phrases.
//!
//! Algorithm:
//! 1. Walk the posting line by line, tracking whether the current section is a
//!    boosted one ("Requirements", "Qualifications", ...). A line that merely
//!    mentions a boosted marker ("... experience required") is boosted too.
//! 2. Split each line into clauses at punctuation, then into runs of tokens
//!    between stopwords. Phrases never span a clause or a stopword.
//! 3. Every 1–3 token n-gram of a run is a candidate. Weight is the sum over
//!    occurrences of the section factor (boost or 1.0).
//! 4. Shorter n-grams that never occur outside a longer kept n-gram are folded
//!    into it, then phrases under `min_keyword_weight` are dropped.
//! 5. Sort by weight desc, then first occurrence, then text. Same input, same output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tailoring::ruleset::{Ruleset, SectionKind};
use crate::tailoring::text::{terms, tokenize, Token};

const MAX_NGRAM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCategory {
    Skill,
    Domain,
    Certification,
    SoftSkill,
}

/// A salient phrase from a job posting. Read-only once extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementPhrase {
    /// Surface form of the first occurrence, e.g. "HIPAA compliance".
    pub text: String,
    pub normalized_terms: Vec<String>,
    pub weight: f64,
    pub category: RequirementCategory,
}

#[derive(Debug)]
struct Candidate {
    surface: String,
    terms: Vec<String>,
    frequency: u32,
    weight: f64,
    first_seen: usize,
}

/// Extracts requirement phrases from posting text.
///
/// Empty or whitespace-only text yields an empty list, not an error.
pub fn extract_requirements(posting_text: &str, ruleset: &Ruleset) -> Vec<RequirementPhrase> {
    if posting_text.trim().is_empty() {
        return Vec::new();
    }

    let mut candidates: HashMap<Vec<String>, Candidate> = HashMap::new();
    let mut in_boosted_section = false;

    for line in posting_text.lines() {
        let line_terms = terms(line);
        if line_terms.is_empty() {
            continue;
        }

        match ruleset.section_kind(&line_terms) {
            Some(SectionKind::Boosted) => in_boosted_section = true,
            Some(SectionKind::Plain) => in_boosted_section = false,
            None => {}
        }
        let boosted = in_boosted_section || ruleset.mentions_boosted_marker(&line_terms);
        let factor = if boosted { ruleset.boost() } else { 1.0 };

        for clause in split_clauses(line) {
            let tokens = tokenize(clause);
            for run in content_runs(&tokens, ruleset) {
                record_ngrams(run, factor, &mut candidates);
            }
        }
    }

    let mut kept: Vec<Candidate> = fold_subsumed(candidates.into_values().collect())
        .into_iter()
        .filter(|c| c.weight >= ruleset.thresholds().min_keyword_weight)
        .collect();

    kept.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.first_seen.cmp(&b.first_seen))
            .then_with(|| a.terms.cmp(&b.terms))
    });

    kept.into_iter()
        .map(|c| RequirementPhrase {
            category: ruleset.categorize(&c.terms),
            text: c.surface,
            normalized_terms: c.terms,
            weight: c.weight,
        })
        .collect()
}

/// Splits a line at clause punctuation. A period only ends a clause when it
/// is followed by whitespace or the end of the line, so `monday.com` survives.
fn split_clauses(line: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let breaks = match c {
            ',' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '•' | '|' | '·'
            | '*' | '"' => true,
            '.' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if breaks {
            clauses.push(&line[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    clauses.push(&line[start..]);

    clauses.into_iter().filter(|c| !c.trim().is_empty()).collect()
}

/// Maximal runs of content tokens; stopwords and tokens without letters break runs.
fn content_runs<'a>(tokens: &'a [Token], ruleset: &Ruleset) -> Vec<&'a [Token]> {
    tokens
        .split(|t| ruleset.is_stopword(&t.norm) || !t.norm.chars().any(char::is_alphabetic))
        .filter(|run| !run.is_empty())
        .collect()
}

fn record_ngrams(run: &[Token], factor: f64, candidates: &mut HashMap<Vec<String>, Candidate>) {
    for n in 1..=MAX_NGRAM.min(run.len()) {
        for window in run.windows(n) {
            let key: Vec<String> = window.iter().map(|t| t.norm.clone()).collect();
            let next_seen = candidates.len();
            let candidate = candidates.entry(key.clone()).or_insert_with(|| Candidate {
                surface: window
                    .iter()
                    .map(|t| t.surface.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                terms: key,
                frequency: 0,
                weight: 0.0,
                first_seen: next_seen,
            });
            candidate.frequency += 1;
            candidate.weight += factor;
        }
    }
}

/// Drops n-grams that only ever occur inside a longer candidate.
///
/// Each candidate is at most `MAX_NGRAM` terms long, so indexing every proper
/// sub-n-gram by the highest frequency of anything containing it keeps this
/// linear in the number of candidates.
fn fold_subsumed(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut container_frequency: HashMap<&[String], u32> = HashMap::new();
    for long in &candidates {
        for n in 1..long.terms.len() {
            for sub in long.terms.windows(n) {
                let best = container_frequency.entry(sub).or_insert(0);
                *best = (*best).max(long.frequency);
            }
        }
    }

    let subsumed: Vec<bool> = candidates
        .iter()
        .map(|short| {
            container_frequency
                .get(short.terms.as_slice())
                .is_some_and(|&frequency| frequency >= short.frequency)
        })
        .collect();

    candidates
        .into_iter()
        .zip(subsumed)
        .filter_map(|(candidate, drop)| (!drop).then_some(candidate))
        .collect()
}
