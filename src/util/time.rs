use anyhow::{bail, Context, Result};
use chrono::{DateTime, Days, NaiveTime, TimeZone};

// Parse "20:15" or "20:15:30" into a wall-clock time.
pub fn parse_trigger(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("invalid trigger time {s:?} (expected HH:MM)"))
}

// Comma-separated list of trigger times, sorted and deduplicated.
pub fn parse_trigger_list(csv: &str) -> Result<Vec<NaiveTime>> {
    let mut out = csv
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_trigger)
        .collect::<Result<Vec<_>>>()?;
    if out.is_empty() { bail!("at least one trigger time is required"); }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Earliest trigger strictly after `now`, looking at today then tomorrow.
/// Times that do not exist on a given day (DST gaps) are skipped.
pub fn next_trigger<Tz: TimeZone>(now: &DateTime<Tz>, triggers: &[NaiveTime]) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    for day in [Some(today), today.checked_add_days(Days::new(1)), today.checked_add_days(Days::new(2))] {
        let Some(day) = day else { continue };
        let next = triggers
            .iter()
            .filter_map(|t| tz.from_local_datetime(&day.and_time(*t)).earliest())
            .filter(|at| at > now)
            .min();
        if next.is_some() { return next; }
    }
    None
}
