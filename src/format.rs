use crate::draw::DrawResult;

pub const NEW_DRAW_HEADER: &str = "NEW LOTTO DRAW";

/// Destination-ready text for a draw. Same input, same output.
pub fn format_draw(r: &DrawResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("LOTTO - {}", r.draw_date.as_deref().unwrap_or("latest draw")));
    if let Some(n) = &r.draw_number {
        lines.push(format!("Draw N: {n}"));
    }
    lines.push(String::new());

    for e in &r.entries {
        let numbers = e.numbers.iter().map(|n| format!("{n:>2}")).collect::<Vec<_>>().join(" ");
        lines.push(format!("{:<10}: {}", e.region, numbers));
    }

    lines.push(String::new());
    lines.push(format!("Source: {}", r.source));
    lines.push(format!("Fetched: {}", r.fetched_at.format("%d/%m/%Y %H:%M:%S UTC")));
    lines.join("\n")
}

/// Message body for a scheduled delivery.
pub fn announce(r: &DrawResult) -> String {
    format!("{NEW_DRAW_HEADER}\n\n{}", format_draw(r))
}
