use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("experience entry at position {0} has an empty id")]
    EmptyId(usize),

    #[error("duplicate experience entry id '{0}'")]
    DuplicateId(String),

    #[error("experience entry '{id}' has a date range starting after it ends ({start} > {end})")]
    InvertedDateRange {
        id: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Inclusive date range of an entry; `end = None` means ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

/// One real, attributable unit of the candidate's background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub id: String,
    pub raw_text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub employer: String,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl ExperienceEntry {
    /// Sort key where greater means more recent: ongoing entries beat ended
    /// ones, later end dates beat earlier ones, then later starts.
    /// Entries without dates are the least recent.
    pub fn recency_key(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_range
            .as_ref()
            .map(|range| (range.end.unwrap_or(NaiveDate::MAX), range.start))
    }
}

/// The candidate's experience inventory: the sole definition of "truth".
///
/// Loaded once per run and read-only afterwards; every downstream stage
/// refers to entries by id and never copies or mutates them.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: Vec<ExperienceEntry>,
    index: HashMap<String, usize>,
}

impl Inventory {
    /// Validates entries and freezes them. Skills and domains are de-duplicated
    /// case-insensitively, keeping the first spelling.
    pub fn new(entries: Vec<ExperienceEntry>) -> Result<Self, InventoryError> {
        let mut index = HashMap::with_capacity(entries.len());
        let mut frozen = Vec::with_capacity(entries.len());

        for (position, mut entry) in entries.into_iter().enumerate() {
            entry.id = entry.id.trim().to_string();
            if entry.id.is_empty() {
                return Err(InventoryError::EmptyId(position));
            }
            if index.contains_key(&entry.id) {
                return Err(InventoryError::DuplicateId(entry.id));
            }
            if let Some(range) = &entry.date_range {
                if let Some(end) = range.end {
                    if range.start > end {
                        return Err(InventoryError::InvertedDateRange {
                            id: entry.id,
                            start: range.start,
                            end,
                        });
                    }
                }
            }

            entry.skills = dedup_case_insensitive(entry.skills);
            entry.domains = dedup_case_insensitive(entry.domains);
            index.insert(entry.id.clone(), position);
            frozen.push(entry);
        }

        Ok(Self {
            entries: frozen,
            index,
        })
    }

    pub fn entries(&self) -> &[ExperienceEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ExperienceEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Original inventory position of an entry; the final tie-breaker everywhere.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn dedup_case_insensitive(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.to_lowercase()))
        .collect()
}
