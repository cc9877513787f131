use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, warn};
use url::Url;

use crate::config::DrawQuery;

pub mod http;
pub mod limiter;
pub mod markers;
#[cfg(feature = "render")]
pub mod render;

/// Result of one fetch contract call. Transport failures never escape as
/// errors; they end up as `Failed` with a reason after being logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `sufficient` is false when the body lacks enough expected markers.
    Document { body: String, sufficient: bool },
    Failed(String),
}

impl FetchOutcome {
    #[cfg(test)]
    pub fn is_ok(&self) -> bool { matches!(self, FetchOutcome::Document { .. }) }
}

/// Anything that can produce the results document: plain HTTP, or a rendered browser session.
#[async_trait]
pub trait DocumentSource: Send {
    fn name(&self) -> &'static str;
    async fn fetch(&mut self) -> FetchOutcome;
}

#[derive(Debug)]
pub enum FetchError {
    Timeout,
    Http(reqwest::Error),
    Status(StatusCode),
    Body(reqwest::Error),
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Http(err) }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::Http(err) => write!(f, "http error: {err}"),
            FetchError::Status(status) => write!(f, "unexpected status {status}"),
            FetchError::Body(err) => write!(f, "failed to read body: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) | FetchError::Body(err) => Some(err),
            _ => None,
        }
    }
}

/// Source URL with the optional `prog`/`anno` draw selection appended.
pub fn source_url(base: &str, query: Option<DrawQuery>) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).map_err(|e| anyhow::anyhow!("invalid source url {base:?}: {e}"))?;
    if let Some(q) = query {
        url.query_pairs_mut()
            .append_pair("prog", &q.prog.to_string())
            .append_pair("anno", &q.anno.to_string());
    }
    Ok(url)
}

/// Plain source first; the fallback runs only when the plain document is
/// inconclusive or the plain fetch failed outright.
pub struct FetchPipeline {
    primary: Box<dyn DocumentSource>,
    fallback: Option<Box<dyn DocumentSource>>,
}

impl FetchPipeline {
    pub fn new(primary: Box<dyn DocumentSource>, fallback: Option<Box<dyn DocumentSource>>) -> Self {
        FetchPipeline { primary, fallback }
    }

    pub fn has_fallback(&self) -> bool { self.fallback.is_some() }

    /// `None` when no document could be obtained at all.
    pub async fn obtain(&mut self) -> Option<String> {
        let plain = self.primary.fetch().await;
        let (inconclusive, reason) = match plain {
            FetchOutcome::Document { body, sufficient: true } => return Some(body),
            FetchOutcome::Document { body, sufficient: false } => (Some(body), "insufficient content".to_string()),
            FetchOutcome::Failed(reason) => (None, reason),
        };

        let Some(fallback) = self.fallback.as_mut() else {
            if inconclusive.is_some() {
                warn!(source = self.primary.name(), "document looks incomplete and no fallback is configured; parsing it anyway");
            }
            return inconclusive;
        };

        info!(from = self.primary.name(), to = fallback.name(), reason = %reason, "switching to fallback source");
        match fallback.fetch().await {
            FetchOutcome::Document { body, .. } => Some(body),
            FetchOutcome::Failed(why) => {
                warn!(source = fallback.name(), reason = %why, "fallback failed");
                inconclusive
            }
        }
    }
}

#[cfg(test)]
pub use scripted::ScriptedSource;

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{DocumentSource, FetchOutcome};

    /// Replays queued outcomes; `Failed` once the queue is empty.
    #[derive(Clone, Default)]
    pub struct ScriptedSource {
        outcomes: Arc<Mutex<VecDeque<FetchOutcome>>>,
        calls: Arc<Mutex<usize>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self { Self::default() }

        pub fn push(&self, outcome: FetchOutcome) -> &Self {
            self.outcomes.lock().unwrap().push_back(outcome);
            self
        }

        pub fn push_document(&self, body: &str) -> &Self {
            self.push(FetchOutcome::Document { body: body.to_string(), sufficient: true })
        }

        pub fn calls(&self) -> usize { *self.calls.lock().unwrap() }
    }

    #[async_trait]
    impl DocumentSource for ScriptedSource {
        fn name(&self) -> &'static str { "scripted" }

        async fn fetch(&mut self) -> FetchOutcome {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| FetchOutcome::Failed("script exhausted".into()))
        }
    }
}
