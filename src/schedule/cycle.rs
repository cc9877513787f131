use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::detect::is_novel;
use crate::draw::DrawResult;
use crate::fetch::FetchPipeline;
use crate::format::announce;
use crate::notify::Notifier;
use crate::parse::DocumentParser;
use crate::state::StateStore;
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::check::{Check, Phase};
use crate::validate::Validator;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Checking,
    Delivering,
}

/// What one "fetch → parse → validate → detect (→ deliver)" attempt ended in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    FetchFailed,
    Invalid { reason: String },
    Stale { key: String },
    /// Plan mode only: novel and valid, but nothing was delivered.
    Novel { key: String },
    Delivered { key: String, persisted: bool },
    DeliveryFailed { key: String, error: String, retryable: bool },
    Cancelled,
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::FetchFailed => "fetch failed",
            AttemptOutcome::Invalid { .. } => "invalid",
            AttemptOutcome::Stale { .. } => "already delivered",
            AttemptOutcome::Novel { .. } => "new draw (plan only)",
            AttemptOutcome::Delivered { .. } => "delivered",
            AttemptOutcome::DeliveryFailed { .. } => "delivery failed",
            AttemptOutcome::Cancelled => "cancelled",
        }
    }

    /// Whether the sub-loop stops after this outcome. A plan-only cycle
    /// stops on the first valid draw, stale or not.
    fn ends_cycle(&self, apply: bool) -> bool {
        match self {
            AttemptOutcome::Novel { .. } | AttemptOutcome::Delivered { .. } | AttemptOutcome::Cancelled => true,
            AttemptOutcome::Stale { .. } => !apply,
            AttemptOutcome::DeliveryFailed { retryable, .. } => !retryable,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub apply: bool,
    pub last_key: Option<String>,
    pub attempts: Vec<AttemptOutcome>,
    pub delivered_key: Option<String>,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<DrawResult>,
    pub duration_ms: u128,
}

impl CycleReport {
    pub fn last_outcome(&self) -> Option<&AttemptOutcome> { self.attempts.last() }
}

/// Owns every collaborator of a check cycle. Cycles take `&mut self`, so two
/// can never overlap on the same checker.
pub struct Checker {
    pipeline: FetchPipeline,
    parser: DocumentParser,
    validator: Validator,
    notifier: Arc<dyn Notifier>,
    destination: String,
    store: Arc<dyn StateStore>,
    attempts: usize,
    attempt_delay: Duration,
    state: CycleState,
    log: LogCtx<Check>,
}

impl Checker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pipeline: FetchPipeline,
        parser: DocumentParser,
        validator: Validator,
        notifier: Arc<dyn Notifier>,
        destination: String,
        store: Arc<dyn StateStore>,
        attempts: usize,
        attempt_delay: Duration,
    ) -> Self {
        Checker {
            pipeline,
            parser,
            validator,
            notifier,
            destination,
            store,
            attempts: attempts.max(1),
            attempt_delay,
            state: CycleState::Idle,
            log: crate::telemetry::check(),
        }
    }

    pub fn state(&self) -> CycleState { self.state }

    pub fn notifier_name(&self) -> &'static str { self.notifier.name() }

    /// One scheduled check. Without `apply` the cycle stops at detection and
    /// neither delivers nor writes state. The key is read once, up front, and
    /// written only after the notifier acknowledges.
    pub async fn run_cycle(&mut self, apply: bool, cancel: &CancellationToken) -> CycleReport {
        let started = Instant::now();
        self.state = CycleState::Checking;

        let last_key = match self.store.load() {
            Ok(k) => k,
            Err(e) => {
                self.log.warn_kv("state unreadable; treating as no previous draw", [("error", format!("{e:#}"))]);
                None
            }
        };
        self.log.info_kv("cycle start", [
            ("apply", apply.to_string()),
            ("attempts", self.attempts.to_string()),
            ("last_key", last_key.clone().unwrap_or_else(|| "-".into())),
        ]);

        let mut report = CycleReport {
            apply,
            last_key: last_key.clone(),
            attempts: Vec::new(),
            delivered_key: None,
            cancelled: false,
            draw: None,
            duration_ms: 0,
        };

        for attempt in 1..=self.attempts {
            let (outcome, draw) = self.attempt(last_key.as_deref(), apply, cancel).await;
            self.log.attempt(attempt, self.attempts, outcome.label());
            if draw.is_some() { report.draw = draw; }
            if let AttemptOutcome::Delivered { key, .. } = &outcome {
                report.delivered_key = Some(key.clone());
            }
            let done = outcome.ends_cycle(apply);
            report.attempts.push(outcome);
            if done || attempt == self.attempts { break; }

            let wait = self.log.span(&Phase::Wait);
            let cancelled = async {
                tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(self.attempt_delay) => false,
                }
            }
            .instrument(wait)
            .await;
            if cancelled {
                report.attempts.push(AttemptOutcome::Cancelled);
                break;
            }
        }

        report.cancelled = report.attempts.last() == Some(&AttemptOutcome::Cancelled);
        report.duration_ms = started.elapsed().as_millis();
        self.log.cycle_done(report.attempts.len(), report.delivered_key.is_some(), report.delivered_key.as_deref());
        self.state = CycleState::Idle;
        report
    }

    async fn attempt(
        &mut self,
        last_key: Option<&str>,
        apply: bool,
        cancel: &CancellationToken,
    ) -> (AttemptOutcome, Option<DrawResult>) {
        if cancel.is_cancelled() { return (AttemptOutcome::Cancelled, None); }

        let fetch = self.log.span(&Phase::Fetch);
        let document = tokio::select! {
            _ = cancel.cancelled() => return (AttemptOutcome::Cancelled, None),
            doc = self.pipeline.obtain().instrument(fetch) => doc,
        };
        let Some(document) = document else { return (AttemptOutcome::FetchFailed, None) };

        let draw = {
            let _s = self.log.span(&Phase::Parse).entered();
            self.parser.parse(&document, Utc::now())
        };

        let violation = {
            let _s = self.log.span(&Phase::Validate).entered();
            if self.validator.validate(&draw) { None } else { self.validator.check(&draw) }
        };
        if let Some(v) = violation {
            return (AttemptOutcome::Invalid { reason: v.to_string() }, Some(draw));
        }

        let (novel, key) = {
            let _s = self.log.span(&Phase::Detect).entered();
            is_novel(last_key, &draw)
        };
        if !novel { return (AttemptOutcome::Stale { key }, Some(draw)); }
        if !apply { return (AttemptOutcome::Novel { key }, Some(draw)); }

        self.state = CycleState::Delivering;
        let text = announce(&draw);
        let delivered = self
            .notifier
            .deliver(&self.destination, &text)
            .instrument(self.log.span(&Phase::Deliver))
            .await;
        self.state = CycleState::Checking;
        if let Err(e) = delivered {
            self.log.warn_kv("delivery failed; state left unchanged", [
                ("notifier", self.notifier.name().to_string()),
                ("error", e.to_string()),
            ]);
            let retryable = e.is_retryable();
            return (AttemptOutcome::DeliveryFailed { key, error: e.to_string(), retryable }, Some(draw));
        }

        let persisted = {
            let _s = self.log.span(&Phase::Persist).entered();
            match self.store.save(&key) {
                Ok(()) => true,
                Err(e) => {
                    self.log.error(format!("delivered but failed to persist key {key}: {e:#}"));
                    false
                }
            }
        };
        (AttemptOutcome::Delivered { key, persisted }, Some(draw))
    }
}
