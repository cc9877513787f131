use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::draw::{DrawResult, Entry, ExtractionRules, RegionSet};

pub mod meta;
pub mod scope;
pub mod table;
pub mod text;

/// Extraction heuristics, tried in order against the working scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Heuristic { Tabular, FreeText }

impl Heuristic {
    pub const CASCADE: [Heuristic; 2] = [Heuristic::Tabular, Heuristic::FreeText];

    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::Tabular => "tabular",
            Heuristic::FreeText => "free_text",
        }
    }

    /// `None` means the scope does not have the shape this heuristic reads,
    /// or it found nothing; the next heuristic gets a turn.
    pub fn apply(&self, working: ElementRef<'_>, regions: &RegionSet, rules: &ExtractionRules) -> Option<Vec<Entry>> {
        match self {
            Heuristic::Tabular => table::extract(working, regions, rules),
            Heuristic::FreeText => text::extract(&scope::block_text(working), regions, rules),
        }
    }
}

/// Turns a results page into a `DrawResult`. Never fails: a page with no
/// recognizable rows yields an empty `entries` list for the validator to reject.
pub struct DocumentParser {
    source: String,
    cascade: Vec<(String, Selector)>,
    regions: RegionSet,
    rules: ExtractionRules,
}

impl DocumentParser {
    pub fn new(source: impl Into<String>, selectors: &[String], regions: RegionSet, rules: ExtractionRules) -> Self {
        let mut cascade = Vec::with_capacity(selectors.len());
        for s in selectors {
            match Selector::parse(s) {
                Ok(sel) => cascade.push((s.clone(), sel)),
                Err(e) => warn!(selector = %s, "skipping unparseable selector: {:?}", e),
            }
        }
        DocumentParser { source: source.into(), cascade, regions, rules }
    }

    pub fn parse(&self, document: &str, fetched_at: DateTime<Utc>) -> DrawResult {
        let doc = Html::parse_document(document);
        let (label, working) = scope::select_scope(&doc, &self.cascade);
        debug!(scope = %label, "working scope selected");

        let mut result = DrawResult::new(self.source.clone(), fetched_at);

        for h in Heuristic::CASCADE {
            if let Some(entries) = h.apply(working, &self.regions, &self.rules) {
                info!(heuristic = h.name(), regions = entries.len(), "entries extracted");
                for e in entries { result.insert(e); }
                break;
            }
        }
        if result.is_empty() {
            warn!(scope = %label, "no region rows found");
        }

        let scope_text = scope::block_text(working);
        result.draw_date = meta::extract_draw_date(&scope_text);
        result.draw_number = meta::extract_draw_number(&scope_text);
        result
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,2}\b").expect("number pattern"))
}

/// One- and two-digit tokens in `text` that fall inside the rules' range.
pub(crate) fn number_tokens(text: &str, rules: &ExtractionRules) -> Vec<u8> {
    number_re()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<u8>().ok())
        .filter(|n| rules.in_range(*n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(selectors: &[&str]) -> DocumentParser {
        let selectors: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        DocumentParser::new("test", &selectors, RegionSet::default(), ExtractionRules::default())
    }

    #[test]
    fn tokens_skip_long_numbers_and_out_of_range() {
        let rules = ExtractionRules::default();
        assert_eq!(number_tokens("ROMA 12 0 91 2025 7", &rules), vec![12, 7]);
    }

    #[test]
    fn table_layout_recovers_rows_in_page_order() {
        let html = r#"
        <html><body>
          <nav>ROMA 1 2 3 4 5</nav>
          <div class="estrazione">
            <p>Estrazione n. 125 del 12/01/2025</p>
            <table>
              <tr><th>Ruota</th><th>Numeri</th></tr>
              <tr><td>Napoli</td><td>3</td><td>14</td><td>27</td><td>45</td><td>88</td></tr>
              <tr><td>Bari</td><td>12</td><td>34</td><td>56</td><td>78</td><td>90</td><td>11</td></tr>
              <tr><td>Roma</td><td>99</td><td>5</td></tr>
            </table>
          </div>
        </body></html>
        "#;
        let r = parser(&[".estrazione", "table"]).parse(html, Utc::now());
        assert_eq!(r.regions().collect::<Vec<_>>(), vec!["NAPOLI", "BARI"]);
        assert_eq!(r.get("BARI"), Some(&[12u8, 34, 56, 78, 90][..]));
        assert_eq!(r.draw_date.as_deref(), Some("12/01/2025"));
        assert_eq!(r.draw_number.as_deref(), Some("125"));
    }

    #[test]
    fn free_text_layout_used_without_tables() {
        let html = r#"
        <html><body><pre>
        ESTRAZIONE DEL LOTTO N. 3
        12/01/2025
        ROMA     12 34 56 78 90 extra
        BARI      5  9
        MILANO   21 22 23
        </pre></body></html>
        "#;
        let r = parser(&["pre"]).parse(html, Utc::now());
        assert_eq!(r.get("ROMA"), Some(&[12u8, 34, 56, 78, 90][..]));
        assert_eq!(r.get("BARI"), None);
        assert_eq!(r.get("MILANO"), Some(&[21u8, 22, 23][..]));
        assert_eq!(r.draw_number.as_deref(), Some("3"));
    }

    #[test]
    fn tables_without_region_rows_fall_through_to_text() {
        let html = r#"
        <html><body><main>
          <table><tr><td>Jackpot</td><td>100</td></tr></table>
          <p>TORINO 7 8 9 10</p>
        </main></body></html>
        "#;
        let r = parser(&["main"]).parse(html, Utc::now());
        assert_eq!(r.get("TORINO"), Some(&[7u8, 8, 9, 10][..]));
    }

    #[test]
    fn page_without_results_yields_empty_entries() {
        let html = "<html><body><p>Service temporarily unavailable</p></body></html>";
        let r = parser(&["main"]).parse(html, Utc::now());
        assert!(r.is_empty());
        assert!(r.draw_date.is_none());
        assert!(r.draw_number.is_none());
    }

    #[test]
    fn bad_selectors_are_skipped() {
        let p = parser(&["[[[", "pre"]);
        let r = p.parse("<html><body><pre>GENOVA 1 2 3 4 5</pre></body></html>", Utc::now());
        assert_eq!(r.get("GENOVA"), Some(&[1u8, 2, 3, 4, 5][..]));
    }
}
