use std::fmt;

use tracing::warn;

use crate::draw::{DrawResult, ExtractionRules, RegionSet};

/// First structural problem found in a `DrawResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoEntries,
    UnknownRegion(String),
    EmptyNumbers(String),
    OutOfRange { region: String, value: u8 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NoEntries => write!(f, "no region entries"),
            Violation::UnknownRegion(r) => write!(f, "unrecognized region {r}"),
            Violation::EmptyNumbers(r) => write!(f, "region {r} has no numbers"),
            Violation::OutOfRange { region, value } => {
                write!(f, "region {region} has out-of-range number {value}")
            }
        }
    }
}

/// Classifies extracted draws; never repairs them.
#[derive(Debug, Clone)]
pub struct Validator {
    regions: RegionSet,
    rules: ExtractionRules,
}

impl Validator {
    pub fn new(regions: RegionSet, rules: ExtractionRules) -> Self {
        Validator { regions, rules }
    }

    pub fn check(&self, r: &DrawResult) -> Option<Violation> {
        if r.entries.is_empty() { return Some(Violation::NoEntries); }
        for e in &r.entries {
            if !self.regions.contains(&e.region) {
                return Some(Violation::UnknownRegion(e.region.clone()));
            }
            if e.numbers.is_empty() {
                return Some(Violation::EmptyNumbers(e.region.clone()));
            }
            if let Some(&value) = e.numbers.iter().find(|n| !self.rules.in_range(**n)) {
                return Some(Violation::OutOfRange { region: e.region.clone(), value });
            }
        }
        None
    }

    pub fn validate(&self, r: &DrawResult) -> bool {
        match self.check(r) {
            None => true,
            Some(v) => {
                warn!(source = %r.source, violation = %v, "draw failed validation");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::Entry;
    use chrono::Utc;

    fn validator() -> Validator {
        Validator::new(RegionSet::default(), ExtractionRules::default())
    }

    #[test]
    fn empty_entries_are_invalid() {
        let r = DrawResult::new("t", Utc::now());
        assert_eq!(validator().check(&r), Some(Violation::NoEntries));
        assert!(!validator().validate(&r));
    }

    #[test]
    fn reports_first_violation_only() {
        let mut r = DrawResult::new("t", Utc::now());
        r.insert(Entry::new("ROMA", vec![1, 2, 3]));
        r.insert(Entry::new("BARI", vec![1, 95, 3]));
        r.insert(Entry::new("ATLANTIS", vec![1, 2, 3]));
        assert_eq!(
            validator().check(&r),
            Some(Violation::OutOfRange { region: "BARI".into(), value: 95 })
        );
    }

    #[test]
    fn length_is_not_rechecked() {
        let mut r = DrawResult::new("t", Utc::now());
        r.insert(Entry::new("NAZIONALE", vec![42]));
        assert!(validator().validate(&r));
    }
}
