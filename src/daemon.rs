use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::schedule::{self, Checker};
use crate::telemetry::{self};
use crate::util::time::parse_trigger_list;

#[derive(Args, Debug)]
pub struct RunCmd {
    /// Comma-separated HH:MM local trigger times (overrides LOTTO_TRIGGER_TIMES)
    #[arg(long)] pub at: Option<String>,
    /// Run one cycle immediately before waiting for the first trigger
    #[arg(long, default_value_t = false)] pub now: bool,
}

pub async fn run(mut cfg: AppConfig, args: RunCmd) -> Result<()> {
    if let Some(csv) = &args.at { cfg.schedule.triggers = parse_trigger_list(csv)?; }
    let triggers = cfg.schedule.triggers.clone();

    let log = telemetry::run();
    let root = log.root_span_kv([
        ("source", cfg.source.label().to_string()),
        ("triggers", triggers.iter().map(|t| t.format("%H:%M").to_string()).collect::<Vec<_>>().join(",")),
        ("attempts", cfg.schedule.attempts.to_string()),
        ("notifier", format!("{:?}", cfg.notify.kind)),
        ("state_file", cfg.state_file.display().to_string()),
    ]);

    let mut checker = {
        let _e = root.enter();
        Checker::from_config(&cfg)?
    };
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    async {
        if args.now {
            let report = checker.run_cycle(true, &cancel).await;
            if report.cancelled { return Ok(()); }
        }
        schedule::run_forever(&mut checker, &triggers, &cancel).await.map(|_| ())
    }
    .instrument(root)
    .await
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => { let _ = tokio::signal::ctrl_c().await; }
        }
    }
    #[cfg(not(unix))]
    { let _ = tokio::signal::ctrl_c().await; }
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
