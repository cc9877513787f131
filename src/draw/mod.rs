use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod regions;
pub mod rules;

pub use regions::RegionSet;
pub use rules::ExtractionRules;

/// One region's drawn numbers, in the order they appeared on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub region: String,
    pub numbers: Vec<u8>,
}

impl Entry {
    pub fn new(region: impl Into<String>, numbers: Vec<u8>) -> Self {
        Entry { region: region.into(), numbers }
    }
}

/// Normalized record extracted from one results page.
///
/// `entries` keeps discovery order. Re-discovering a region replaces its
/// numbers but keeps the slot it was first seen in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResult {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub draw_date: Option<String>,
    pub draw_number: Option<String>,
    pub entries: Vec<Entry>,
}

impl DrawResult {
    pub fn new(source: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        DrawResult {
            source: source.into(),
            fetched_at,
            draw_date: None,
            draw_number: None,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, entry: Entry) {
        match self.entries.iter_mut().find(|e| e.region == entry.region) {
            Some(slot) => slot.numbers = entry.numbers,
            None => self.entries.push(entry),
        }
    }

    #[cfg(test)]
    pub fn get(&self, region: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.region == region)
            .map(|e| e.numbers.as_slice())
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[cfg(test)]
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.region.as_str())
    }
}
