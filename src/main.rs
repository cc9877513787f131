use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod check;
mod config;
mod daemon;
mod detect;
mod draw;
mod fetch;
mod format;
mod notify;
mod output;
mod parse;
mod schedule;
mod scrape;
mod state;
mod telemetry;
mod util;
mod validate;

use config::{AppConfig, NotifierKind, SourceProfile};

#[derive(Parser)]
#[command(name = "lotto-watch", about = "Lotto draw watcher: fetch, extract, detect and announce new draws")]
struct Cli {
    /// Results provider (overrides LOTTO_SOURCE)
    #[arg(global = true, long, value_enum)]
    source: Option<SourceProfile>,
    /// Results page URL (overrides the provider default and LOTTO_SOURCE_URL)
    #[arg(global = true, long)]
    url: Option<String>,
    #[arg(global = true, long)]
    state_file: Option<PathBuf>,
    #[arg(global = true, long, value_enum)]
    notifier: Option<NotifierKind>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one check cycle now
    Check(check::CheckCmd),
    /// Long-lived scheduler
    Run(daemon::RunCmd),
    /// Fetch (or read) a page and print what gets extracted
    Scrape(scrape::ScrapeCmd),
    /// Show or reset the last delivered draw key
    State(state::StateCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr; RUST_LOG and LOTTO_LOG_FORMAT apply
    telemetry::config::init_tracing();

    let mut cfg = AppConfig::from_env()?;
    if let Some(source) = cli.source { cfg.use_source(source); }
    if let Some(url) = cli.url { cfg.fetch.url = url; }
    if let Some(path) = cli.state_file { cfg.state_file = path; }
    if let Some(kind) = cli.notifier { cfg.notify.kind = kind; }
    cfg.check()?;

    match cli.command {
        Commands::Check(args) => check::run(cfg, args).await?,
        Commands::Run(args) => daemon::run(cfg, args).await?,
        Commands::Scrape(args) => scrape::run(cfg, args).await?,
        Commands::State(args) => state::run(&cfg, args).await?,
    }

    Ok(())
}
