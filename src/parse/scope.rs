use scraper::{ElementRef, Html, Node, Selector};

const BLOCK_TAGS: [&str; 20] = [
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "li", "main", "p", "section", "tr",
];

/// First cascade entry whose element carries any text, else `<body>`, else the root.
pub fn select_scope<'a>(doc: &'a Html, cascade: &[(String, Selector)]) -> (String, ElementRef<'a>) {
    for (label, sel) in cascade {
        if let Some(el) = doc.select(sel).next() {
            if el.text().any(|t| !t.trim().is_empty()) {
                return (label.clone(), el);
            }
        }
    }
    if let Ok(body) = Selector::parse("body") {
        if let Some(el) = doc.select(&body).next() {
            return ("body".to_string(), el);
        }
    }
    ("root".to_string(), doc.root_element())
}

/// Text of `el` with a line break around every block-level element, so rows
/// laid out as separate `<p>`/`<div>`/`<tr>` end up on separate lines.
pub fn block_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect(el, &mut out);
    out
}

fn collect(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else { continue };
                let name = child_el.value().name();
                if matches!(name, "script" | "style" | "noscript") { continue; }
                let block = BLOCK_TAGS.contains(&name);
                if block { out.push('\n'); }
                if matches!(name, "td" | "th") { out.push(' '); }
                collect(child_el, out);
                if block { out.push('\n'); }
            }
            _ => {}
        }
    }
}
