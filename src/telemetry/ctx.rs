use std::marker::PhantomData;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, info, warn, Span};

use super::emit;
use super::ops;
use crate::output::types::Meta;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

/// Per-command logging handle. In JSON log mode every line carries `op`.
pub struct LogCtx<O: OpMarker> {
    json: bool,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub(crate) fn new(json: bool) -> Self { LogCtx { json, _marker: PhantomData } }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span {
        debug!(op = %self.op_name(), phase = ph.name(), "phase");
        ph.span()
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }
    pub fn error(&self, msg: impl AsRef<str>) { if self.json { error!(op = %self.op_name(), "{}", msg.as_ref()); } else { error!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { info!("{}", msg); }
        else { info!("{} ({})", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { warn!("{}", msg); }
        else { warn!("{} ({})", msg, details); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> { emit::print_plan(self.op_name(), plan, None) }
    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> { emit::print_result(self.op_name(), result, None) }
    pub fn result_with<T: Serialize>(&self, result: &T, source: &str, duration_ms: u128) -> Result<()> {
        let meta = Meta { duration_ms: Some(duration_ms), source: Some(source.to_string()) };
        emit::print_result(self.op_name(), result, Some(meta))
    }
}

impl LogCtx<ops::check::Check> {
    pub fn attempt(&self, attempt: usize, of: usize, outcome: &str) {
        if self.json { info!(op = %self.op_name(), attempt, of, outcome, "attempt"); }
        else { info!("🎯 Attempt {}/{}: {}", attempt, of, outcome); }
    }

    pub fn cycle_done(&self, attempts: usize, delivered: bool, key: Option<&str>) {
        if self.json { info!(op = %self.op_name(), attempts, delivered, key = key.unwrap_or(""), "cycle_done"); }
        else if delivered { info!("✅ Cycle done after {} attempt(s): delivered key={}", attempts, key.unwrap_or("-")); }
        else { info!("💤 Cycle done after {} attempt(s): no new draw", attempts); }
    }
}

impl LogCtx<ops::run::Run> {
    pub fn next_trigger(&self, at: &str, in_secs: i64) {
        if self.json { info!(op = %self.op_name(), at, in_secs, "next_trigger"); }
        else { info!("⏰ Next check at {} (in {}s)", at, in_secs); }
    }
}

impl LogCtx<ops::scrape::Scrape> {
    pub fn extracted(&self, regions: usize, date: Option<&str>, number: Option<&str>) {
        if self.json { info!(op = %self.op_name(), regions, date = date.unwrap_or(""), number = number.unwrap_or(""), "extracted"); }
        else { info!("🔎 Extracted {} region(s) date={} number={}", regions, date.unwrap_or("-"), number.unwrap_or("-")); }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
