use crate::draw::{Entry, ExtractionRules, RegionSet};

use super::number_tokens;

/// Line-oriented scan: a line naming a region contributes the numbers on that
/// same line, subject to the count policy in `rules`.
pub fn extract(text: &str, regions: &RegionSet, rules: &ExtractionRules) -> Option<Vec<Entry>> {
    let out = extract_lines(text, regions, rules);
    if out.is_empty() { None } else { Some(out) }
}

pub fn extract_lines(text: &str, regions: &RegionSet, rules: &ExtractionRules) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::new();
    for line in text.lines() {
        let line = line.trim().to_uppercase();
        if line.is_empty() { continue; }
        let Some(region) = regions.find_in(&line) else { continue };
        let Some(numbers) = rules.accept(number_tokens(&line, rules)) else { continue };
        match out.iter_mut().find(|e| e.region == region) {
            Some(slot) => slot.numbers = numbers,
            None => out.push(Entry::new(region, numbers)),
        }
    }
    out
}
