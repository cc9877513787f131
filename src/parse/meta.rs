use std::ops::RangeInclusive;
use std::sync::OnceLock;

use regex::Regex;

const MONTHS: &str = "gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre\
|january|february|march|april|may|june|july|august|september|october|november|december";

fn numeric_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((\d{1,2})[/.\-](\d{1,2})[/.\-]\d{2,4})\b").expect("numeric date"))
}

fn long_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(\d{{1,2}}\s+(?:{MONTHS})\s+\d{{4}})\b")).expect("long date")
    })
}

fn number_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\b(?:estrazione|concorso|extraction|contest)\s+(?:n\s*[°º.]?\s*)?(\d+)\b").expect("keyword number"),
            Regex::new(r"(?i)\bn\s*[°º.]\s*(\d+)\b").expect("bare number"),
            Regex::new(r"(?i)\b(\d+)\s*[°º]\s*(?:concorso|estrazione)").expect("ordinal number"),
        ]
    })
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn within(digits: &str, range: RangeInclusive<u32>) -> bool {
    digits.parse::<u32>().is_ok_and(|n| range.contains(&n))
}

/// Numeric form first, skipping digit runs that cannot be a day/month pair
/// (e.g. a row of drawn numbers joined by dashes); then the month-name form.
pub fn extract_draw_date(text: &str) -> Option<String> {
    numeric_date()
        .captures_iter(text)
        .find(|c| within(&c[2], 1..=31) && within(&c[3], 1..=12))
        .map(|c| c[1].to_string())
        .or_else(|| long_date().captures(text).map(|c| c[1].to_string()))
}

pub fn extract_draw_number(text: &str) -> Option<String> {
    first_capture(number_patterns(), text)
}
