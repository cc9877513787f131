pub mod cycle;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::fetch::http::HttpFetcher;
use crate::fetch::markers::MarkerCheck;
use crate::fetch::{source_url, DocumentSource, FetchPipeline};
use crate::parse::DocumentParser;
use crate::state::FileStateStore;
use crate::telemetry;
use crate::telemetry::ops::run::Phase as RunPhase;
use crate::util::time::next_trigger;
use crate::validate::Validator;

pub use cycle::{AttemptOutcome, Checker, CycleState};

/// Plain HTTP source, plus the browser fallback when `render` is on and compiled in.
pub fn build_pipeline(cfg: &AppConfig, render: bool) -> Result<FetchPipeline> {
    let url = source_url(&cfg.fetch.url, cfg.fetch.draw_query)?;
    let check = MarkerCheck::new(&cfg.regions, cfg.fetch.min_markers);
    let http = HttpFetcher::new(&cfg.fetch, url.clone(), check.clone()).context("build http client")?;
    let fallback = render_fallback(cfg, render, url, check);
    Ok(FetchPipeline::new(Box::new(http), fallback))
}

#[cfg(feature = "render")]
fn render_fallback(cfg: &AppConfig, render: bool, url: url::Url, check: MarkerCheck) -> Option<Box<dyn DocumentSource>> {
    use crate::fetch::render::RenderFetcher;
    if !render { return None; }
    Some(Box::new(RenderFetcher::new(cfg.render.clone(), url, cfg.fetch.user_agent.clone(), check)))
}

#[cfg(not(feature = "render"))]
fn render_fallback(_cfg: &AppConfig, render: bool, _url: url::Url, _check: MarkerCheck) -> Option<Box<dyn DocumentSource>> {
    if render { tracing::warn!("render fallback requested but this build has no `render` feature"); }
    None
}

pub fn build_parser(cfg: &AppConfig) -> DocumentParser {
    DocumentParser::new(cfg.source.label(), &cfg.selectors, cfg.regions.clone(), cfg.rules)
}

impl Checker {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let notifier = crate::notify::from_config(&cfg.notify)?;
        let pipeline = build_pipeline(cfg, cfg.render.enabled)?;
        tracing::info!(
            source = cfg.source.label(),
            notifier = notifier.name(),
            render_fallback = pipeline.has_fallback(),
            "checker ready"
        );
        Ok(Checker::new(
            pipeline,
            build_parser(cfg),
            Validator::new(cfg.regions.clone(), cfg.rules),
            notifier,
            cfg.notify.destination.clone(),
            Arc::new(FileStateStore::new(&cfg.state_file)),
            cfg.schedule.attempts,
            cfg.schedule.attempt_delay,
        ))
    }
}

/// Sleep until the nearest trigger, run one cycle, repeat until cancelled.
/// Cycles run inline, so a trigger that comes due mid-cycle is skipped.
pub async fn run_forever(checker: &mut Checker, triggers: &[NaiveTime], cancel: &CancellationToken) -> Result<usize> {
    let log = telemetry::run();
    let mut cycles = 0usize;
    loop {
        let now = Local::now();
        let Some(at) = next_trigger(&now, triggers) else {
            anyhow::bail!("no upcoming trigger time could be computed");
        };
        let wait = (at - now).to_std().unwrap_or_default();
        log.next_trigger(&at.format("%Y-%m-%d %H:%M:%S").to_string(), wait.as_secs() as i64);

        let cancelled = async {
            tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(wait) => false,
            }
        }
        .instrument(log.span(&RunPhase::Wait))
        .await;
        if cancelled { break; }

        let report = checker.run_cycle(true, cancel).instrument(log.span(&RunPhase::Cycle)).await;
        debug_assert_eq!(checker.state(), CycleState::Idle);
        cycles += 1;
        if report.cancelled { break; }
    }
    log.info(format!("🛑 Scheduler stopped after {} cycle(s)", cycles));
    Ok(cycles)
}
