use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{AppConfig, DrawQuery};
use crate::schedule::{AttemptOutcome, Checker};
use crate::telemetry::{self};

#[derive(Args, Debug)]
pub struct CheckCmd {
    /// Deliver and persist a new draw; without it the cycle stops at the first valid draw, new or not
    #[arg(long, default_value_t = false)] pub apply: bool,
    #[arg(long)] pub attempts: Option<usize>,
    /// Seconds between attempts within the cycle
    #[arg(long)] pub attempt_delay: Option<u64>,
    #[arg(long, requires = "anno")] pub prog: Option<u32>,
    #[arg(long, requires = "prog")] pub anno: Option<i32>,
}

pub async fn run(mut cfg: AppConfig, args: CheckCmd) -> Result<()> {
    if let (Some(prog), Some(anno)) = (args.prog, args.anno) {
        cfg.fetch.draw_query = Some(DrawQuery { prog, anno });
    }
    if let Some(n) = args.attempts { cfg.schedule.attempts = n.max(1); }
    if let Some(s) = args.attempt_delay { cfg.schedule.attempt_delay = std::time::Duration::from_secs(s); }
    let mode = if args.apply { "apply" } else { "plan" };

    let log = telemetry::check();
    let root = log.root_span_kv([
        ("mode", mode.to_string()),
        ("source", cfg.source.label().to_string()),
        ("url", cfg.fetch.url.clone()),
        ("attempts", cfg.schedule.attempts.to_string()),
        ("notifier", format!("{:?}", cfg.notify.kind)),
    ]);

    let mut checker = {
        let _e = root.enter();
        Checker::from_config(&cfg)?
    };
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() { stop.cancel(); }
    });

    let report = checker.run_cycle(args.apply, &cancel).instrument(root).await;
    match report.last_outcome() {
        Some(AttemptOutcome::Novel { key }) => {
            log.info(format!("🆕 New draw {} would be sent via {}", key, checker.notifier_name()));
            log.info("   Use --apply to deliver it.");
        }
        Some(AttemptOutcome::Delivered { key, persisted: false }) => {
            log.warn(format!("Draw {key} delivered but its key was not saved; it may be sent again"));
        }
        _ => {}
    }

    if args.apply { log.result_with(&report, cfg.source.label(), report.duration_ms) }
    else { log.plan(&report) }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::util::testing::{CannedServer, LogCapture};

    const PAGE: &str = r#"<html><body><div class="estrazione">
        <p>Estrazione n. 3 del 12/01/2025</p>
        <table>
          <tr><td>Bari</td><td>12</td><td>34</td><td>5</td><td>78</td><td>90</td></tr>
          <tr><td>Roma</td><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td></tr>
        </table>
    </div></body></html>"#;

    #[tokio::test]
    async fn setup_and_cycle_log_under_the_check_span() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let server = CannedServer::start(vec![(200, PAGE.to_string())]).await;
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = AppConfig::default();
        cfg.fetch.url = server.url("/lotto");
        cfg.fetch.min_interval = Duration::ZERO;
        cfg.render.enabled = false;
        cfg.state_file = dir.path().join("last_extraction.txt");
        let args = CheckCmd { apply: false, attempts: Some(1), attempt_delay: None, prog: None, anno: None };
        run(cfg, args).await.unwrap();

        let ready = logs.line_with("checker ready").unwrap();
        assert!(ready.contains("check: "), "{ready}");
        let fetch = logs.line_with("fetching results page").unwrap();
        assert!(fetch.contains("check:fetch:"), "{fetch}");
        assert!(!dir.path().join("last_extraction.txt").exists());
    }
}
