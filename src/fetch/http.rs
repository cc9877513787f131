use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use tracing::{error, info, warn};
use url::Url;

use crate::config::FetchConfig;

use super::limiter::RateLimiter;
use super::markers::MarkerCheck;
use super::{DocumentSource, FetchError, FetchOutcome};

/// Rate-limited GET with a fixed retry budget.
pub struct HttpFetcher {
    client: Client,
    url: Url,
    limiter: RateLimiter,
    max_retries: u32,
    retry_delay: Duration,
    check: MarkerCheck,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig, url: Url, check: MarkerCheck) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("it-IT,it;q=0.8,en-US;q=0.5,en;q=0.3"));
        let client = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(FetchError::Http)?;
        Ok(HttpFetcher {
            client,
            url,
            limiter: RateLimiter::new(cfg.min_interval),
            max_retries: cfg.max_retries.max(1),
            retry_delay: cfg.retry_delay,
            check,
        })
    }

    async fn get_once(&mut self) -> Result<String, FetchError> {
        self.limiter.wait().await;
        let sent = self.client.get(self.url.clone()).send().await;
        self.limiter.mark();
        let resp = sent.map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        resp.text().await.map_err(FetchError::Body)
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    fn name(&self) -> &'static str { "http" }

    async fn fetch(&mut self) -> FetchOutcome {
        let mut last_err = String::new();
        for attempt in 1..=self.max_retries {
            info!(attempt, max = self.max_retries, url = %self.url, "fetching results page");
            match self.get_once().await {
                Ok(body) => {
                    let markers = self.check.count(&body);
                    let sufficient = self.check.is_sufficient(&body);
                    if sufficient {
                        info!(bytes = body.len(), markers, "fetched results page");
                    } else {
                        warn!(bytes = body.len(), markers, "results page lacks expected markers");
                    }
                    return FetchOutcome::Document { body, sufficient };
                }
                Err(e) => {
                    error!(attempt, error = %e, "request failed");
                    last_err = e.to_string();
                    if attempt < self.max_retries {
                        info!(delay_s = self.retry_delay.as_secs(), "retrying");
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        error!(attempts = self.max_retries, "all request attempts failed");
        FetchOutcome::Failed(format!("{} attempts failed; last error: {}", self.max_retries, last_err))
    }
}
