pub mod store;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::config::AppConfig;
use crate::telemetry::{self};
use crate::telemetry::ops::state::Phase as StatePhase;

pub use store::{FileStateStore, StateStore};
#[cfg(test)]
pub use store::MemoryStateStore;

#[derive(Args, Debug)]
pub struct StateCmd {
    /// Remove the persisted key so the next cycle treats any draw as new
    #[arg(long, default_value_t = false)] pub clear: bool,
    #[arg(long, default_value_t = false)] pub apply: bool,
}

#[derive(Serialize)]
struct StateOut {
    location: String,
    last_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleared: Option<bool>,
}

pub async fn run(cfg: &AppConfig, args: StateCmd) -> Result<()> {
    let store = FileStateStore::new(&cfg.state_file);
    let log = telemetry::state();
    let _g = log.root_span_kv([
        ("location", store.location()),
        ("clear", args.clear.to_string()),
        ("apply", args.apply.to_string()),
    ]).entered();

    let last_key = { let _s = log.span(&StatePhase::Read).entered(); store.load()? };
    log.info(format!("📄 Last delivered key: {}", last_key.as_deref().unwrap_or("(none)")));

    if !args.clear {
        return log.result(&StateOut { location: store.location(), last_key, cleared: None });
    }
    if !args.apply {
        log.info("   Use --apply to clear it.");
        return log.plan(&StateOut { location: store.location(), last_key, cleared: Some(false) });
    }
    { let _s = log.span(&StatePhase::Clear).entered(); store.clear()?; }
    log.info("🧹 State cleared");
    log.result(&StateOut { location: store.location(), last_key, cleared: Some(true) })
}
