use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use url::Url;

use crate::config::RenderConfig;

use super::markers::MarkerCheck;
use super::{DocumentSource, FetchOutcome};

const POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum RenderError {
    Session(WebDriverError),
    Capabilities(WebDriverError),
    Source(WebDriverError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Session(err) => write!(f, "could not start browser session: {err}"),
            RenderError::Capabilities(err) => write!(f, "invalid browser capabilities: {err}"),
            RenderError::Source(err) => write!(f, "could not read rendered markup: {err}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Headless browser fallback driven over WebDriver.
pub struct RenderFetcher {
    cfg: RenderConfig,
    url: Url,
    user_agent: String,
    check: MarkerCheck,
}

impl RenderFetcher {
    pub fn new(cfg: RenderConfig, url: Url, user_agent: String, check: MarkerCheck) -> Self {
        RenderFetcher { cfg, url, user_agent, check }
    }

    async fn connect(&self) -> Result<WebDriver, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        let (w, h) = self.cfg.window;
        for arg in [
            "--headless=new".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
            "--incognito".to_string(),
            format!("--window-size={w},{h}"),
            format!("--user-agent={}", self.user_agent),
        ] {
            caps.add_arg(&arg).map_err(RenderError::Capabilities)?;
        }
        WebDriver::new(&self.cfg.webdriver_url, caps).await.map_err(RenderError::Session)
    }

    /// Navigate, wait for load + settle, then wait (bounded) for content.
    /// Timeouts here are not fatal; whatever markup exists is returned.
    async fn capture(&self, driver: &WebDriver) -> Result<String, RenderError> {
        if let Err(e) = driver.goto(self.url.as_str()).await {
            warn!(error = %e, "navigation reported an error; reading whatever loaded");
        }

        let deadline = Instant::now() + self.cfg.page_load_timeout;
        loop {
            let ready = driver
                .execute("return document.readyState;", Vec::new())
                .await
                .ok()
                .and_then(|r| r.json().as_str().map(|s| s == "complete"))
                .unwrap_or(false);
            if ready { break; }
            if Instant::now() >= deadline {
                warn!("page never reported load complete");
                break;
            }
            sleep(POLL).await;
        }

        sleep(self.cfg.settle).await;

        let deadline = Instant::now() + self.cfg.content_wait;
        loop {
            let html = driver.source().await.map_err(RenderError::Source)?;
            if self.check.has_any(&html) { return Ok(html); }
            if Instant::now() >= deadline {
                warn!(wait_s = self.cfg.content_wait.as_secs(), "no results markup appeared; returning page as is");
                return Ok(html);
            }
            sleep(POLL).await;
        }
    }
}

/// Quits the browser session however the fetch ends, including when the
/// surrounding future is dropped mid-render.
struct Session {
    driver: WebDriver,
    closed: bool,
}

impl Session {
    /// Marked closed only once quit has resolved; a close dropped mid-quit
    /// leaves the retry to `Drop`.
    async fn close(mut self) {
        if let Err(e) = self.driver.clone().quit().await {
            warn!(error = %e, "failed to quit browser session");
        }
        self.closed = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed { return; }
        let driver = self.driver.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = driver.quit().await;
            });
        }
    }
}

#[async_trait]
impl DocumentSource for RenderFetcher {
    fn name(&self) -> &'static str { "render" }

    async fn fetch(&mut self) -> FetchOutcome {
        info!(url = %self.url, webdriver = %self.cfg.webdriver_url, "rendering page in headless browser");
        let driver = match self.connect().await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "render fallback unavailable");
                return FetchOutcome::Failed(e.to_string());
            }
        };
        let session = Session { driver, closed: false };
        let captured = self.capture(&session.driver).await;
        session.close().await;

        match captured {
            Ok(body) => {
                let sufficient = self.check.is_sufficient(&body);
                info!(bytes = body.len(), sufficient, "rendered page captured");
                FetchOutcome::Document { body, sufficient }
            }
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::RegionSet;
    use crate::util::testing::{CannedServer, Route};

    const NEW_SESSION: &str = r#"{"value":{"sessionId":"s1","capabilities":{"browserName":"chrome"}}}"#;
    const NULL: &str = r#"{"value":null}"#;
    const BLANK_PAGE: &str = r#"{"value":"<html><body><p>Servizio momentaneamente non disponibile</p></body></html>"}"#;

    fn cfg(webdriver_url: &str) -> RenderConfig {
        RenderConfig {
            enabled: true,
            webdriver_url: webdriver_url.to_string(),
            page_load_timeout: Duration::from_millis(200),
            settle: Duration::ZERO,
            content_wait: Duration::from_millis(300),
            window: (800, 600),
        }
    }

    fn fetcher(webdriver_url: &str) -> RenderFetcher {
        let check = MarkerCheck::new(&RegionSet::default(), 3);
        let url = Url::parse("http://results.invalid/lotto").unwrap();
        RenderFetcher::new(cfg(webdriver_url), url, "lotto-watch-test".into(), check)
    }

    fn session_routes(source: Route) -> Vec<Route> {
        vec![
            Route::new("POST /session", 200, NEW_SESSION),
            Route::new("POST /session/s1/timeouts", 200, NULL),
            Route::new("POST /session/s1/url", 200, NULL),
            Route::new("POST /session/s1/execute/sync", 200, r#"{"value":"complete"}"#),
            source,
            Route::new("DELETE /session/s1", 200, NULL),
        ]
    }

    #[tokio::test]
    async fn unreachable_webdriver_is_a_failed_fetch() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let out = fetcher(&format!("http://{addr}")).fetch().await;
        match out {
            FetchOutcome::Failed(reason) => assert!(reason.starts_with("could not start browser session"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn markerless_page_is_returned_after_content_wait() {
        let server = CannedServer::routed(session_routes(Route::new("GET /session/s1/source", 200, BLANK_PAGE))).await;

        let out = fetcher(&server.base).fetch().await;
        match out {
            FetchOutcome::Document { body, sufficient } => {
                assert!(body.contains("non disponibile"));
                assert!(!sufficient);
            }
            other => panic!("expected a document, got {other:?}"),
        }
        assert!(server.count("GET /session/s1/source") >= 2);
        assert!(server.count("DELETE /session/s1") >= 1);
    }

    #[tokio::test]
    async fn source_error_still_quits_the_session() {
        let err = r#"{"value":{"error":"unknown error","message":"tab crashed","stacktrace":""}}"#;
        let server = CannedServer::routed(session_routes(Route::new("GET /session/s1/source", 500, err))).await;

        let out = fetcher(&server.base).fetch().await;
        match out {
            FetchOutcome::Failed(reason) => assert!(reason.contains("could not read rendered markup"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(server.count("DELETE /session/s1") >= 1);
    }

    #[tokio::test]
    async fn interrupted_close_is_retried_on_drop() {
        let server = CannedServer::routed(vec![
            Route::new("POST /session", 200, NEW_SESSION),
            Route::new("POST /session/s1/timeouts", 200, NULL),
            Route::new("DELETE /session/s1", 200, NULL).delayed(Duration::from_millis(200)),
        ])
        .await;
        let driver = WebDriver::new(&server.base, DesiredCapabilities::chrome()).await.unwrap();
        let session = Session { driver, closed: false };

        let cut = tokio::time::timeout(Duration::from_millis(50), session.close()).await;
        assert!(cut.is_err());
        sleep(Duration::from_millis(600)).await;
        assert!(server.count("DELETE /session/s1") >= 2);
    }
}
