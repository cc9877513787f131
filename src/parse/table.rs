use std::sync::OnceLock;

use scraper::{ElementRef, Selector};

use crate::draw::{Entry, ExtractionRules, RegionSet};

use super::number_tokens;

fn row_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("row selector"))
}

fn cell_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td, th").expect("cell selector"))
}

/// Rows whose first cell names a region; numbers come from the remaining cells.
pub fn extract(scope: ElementRef<'_>, regions: &RegionSet, rules: &ExtractionRules) -> Option<Vec<Entry>> {
    let mut out = Vec::new();
    let mut saw_rows = false;

    for row in scope.select(row_sel()) {
        saw_rows = true;
        let cells: Vec<ElementRef<'_>> = row.select(cell_sel()).collect();
        if cells.len() < 2 { continue; }

        let head = cell_text(cells[0]).to_uppercase();
        let Some(region) = regions.find_in(&head) else { continue };

        let numbers: Vec<u8> = cells[1..]
            .iter()
            .flat_map(|c| number_tokens(&cell_text(*c), rules))
            .collect();
        if let Some(numbers) = rules.accept(numbers) {
            out.push(Entry::new(region, numbers));
        }
    }

    if !saw_rows || out.is_empty() { None } else { Some(out) }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn run(html: &str) -> Option<Vec<Entry>> {
        let doc = Html::parse_document(html);
        extract(doc.root_element(), &RegionSet::default(), &ExtractionRules::default())
    }

    #[test]
    fn numbers_after_region_are_filtered_and_truncated() {
        let got = run(r#"<table>
            <tr><td><strong>Firenze</strong></td><td>1 2</td><td>95</td><td>3</td><td>4</td><td>5</td><td>6</td></tr>
        </table>"#).unwrap();
        assert_eq!(got, vec![Entry::new("FIRENZE", vec![1, 2, 3, 4, 5])]);
    }

    #[test]
    fn short_rows_are_discarded() {
        assert!(run("<table><tr><td>Genova</td><td>8</td><td>9</td></tr></table>").is_none());
    }

    #[test]
    fn no_rows_means_not_tabular() {
        assert!(run("<div>PALERMO 1 2 3 4 5</div>").is_none());
    }
}
