//! Text normalization and company/position detection for acquired postings.
//!
//! Detection is heuristic and optional: a miss yields `None`, never an error.

use serde::{Deserialize, Serialize};

use crate::posting::IntakeError;

const COMPANY_LABELS: [&str; 3] = ["company", "employer", "organization"];
const POSITION_LABELS: [&str; 4] = ["job title", "position", "title", "role"];
const CORPORATE_SUFFIXES: [&str; 5] = ["Inc", "LLC", "Ltd", "Corp", "Corporation"];
const HIRING_PHRASES: [&str; 3] = [" is seeking", " is hiring", " is looking"];
/// "About us" and friends describe the employer without naming it.
const ABOUT_NON_NAMES: [&str; 6] = ["us", "the", "you", "this", "our", "this role"];
const MAX_NAME_WORDS: usize = 6;
const MAX_TITLE_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingText {
    pub text: String,
    pub company: Option<String>,
    pub position: Option<String>,
}

impl PostingText {
    pub fn from_raw(raw: &str) -> Result<Self, IntakeError> {
        let text = normalize(raw);
        if text.is_empty() {
            return Err(IntakeError::Empty);
        }
        Ok(Self {
            company: detect_company(&text),
            position: detect_position(&text),
            text,
        })
    }
}

/// Collapses whitespace inside lines and drops blank lines. Line structure is
/// kept because section detection works line by line.
pub fn normalize(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn detect_company(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    let labelled = lines
        .iter()
        .find_map(|line| labelled_value(line, &COMPANY_LABELS));
    let about = || {
        lines.iter().find_map(|line| {
            let rest = strip_prefix_ignore_case(line, "about ")?;
            let lowered = rest.trim_end_matches(':').to_lowercase();
            if ABOUT_NON_NAMES
                .iter()
                .any(|word| lowered == *word || lowered.starts_with(&format!("{word} ")))
            {
                return None;
            }
            Some(rest.to_string())
        })
    };
    let hiring = || {
        lines.iter().find_map(|line| {
            HIRING_PHRASES
                .iter()
                .find_map(|phrase| line.find(phrase).map(|idx| line[..idx].to_string()))
        })
    };
    let at_employer = || {
        lines.iter().take(3).find_map(|line| {
            let idx = line.find(" at ")?;
            Some(leading_capitalized_words(&line[idx + 4..]))
        })
    };

    labelled
        .or_else(about)
        .or_else(hiring)
        .or_else(at_employer)
        .and_then(|raw| clean_company(&raw))
}

pub fn detect_position(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    let labelled = lines
        .iter()
        .find_map(|line| labelled_value(line, &POSITION_LABELS));
    let before_at = || {
        lines.iter().take(3).find_map(|line| {
            let idx = line.find(" position at ").or_else(|| line.find(" role at "))?;
            Some(line[..idx].to_string())
        })
    };
    let first_line = || {
        lines.first().and_then(|line| {
            let plausible = starts_uppercase(line)
                && !line.ends_with('.')
                && line.split_whitespace().count() <= MAX_TITLE_WORDS;
            plausible.then(|| line.to_string())
        })
    };

    labelled
        .or_else(before_at)
        .or_else(first_line)
        .map(|p| p.trim().trim_end_matches([':', '.', ',']).trim().to_string())
        .filter(|p| (2..=100).contains(&p.chars().count()))
}

/// "Company: Acme" -> "Acme" for any of the given labels, case-insensitive.
fn labelled_value(line: &str, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        let rest = strip_prefix_ignore_case(line, label)?;
        let value = rest.trim_start().strip_prefix(':')?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

fn leading_capitalized_words(text: &str) -> String {
    text.split_whitespace()
        .take_while(|word| starts_uppercase(word) || *word == "&")
        .take(MAX_NAME_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_company(raw: &str) -> Option<String> {
    let mut name = raw.trim().trim_end_matches([':', '.', ',', ';']).trim().to_string();
    for suffix in CORPORATE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            if stripped.ends_with(' ') || stripped.ends_with(',') {
                name = stripped.trim_end_matches([' ', ',']).to_string();
                break;
            }
        }
    }
    let plausible = starts_uppercase(&name) && name.split_whitespace().count() <= MAX_NAME_WORDS;
    plausible.then_some(name)
}

fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}
