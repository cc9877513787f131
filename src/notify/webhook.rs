use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{Notifier, NotifyError};

/// POSTs `{"text", "destination"}` as JSON to a fixed URL (Slack-style incoming webhooks).
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(WebhookNotifier { http, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str { "webhook" }

    async fn deliver(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "text": text, "destination": destination }))
            .send()
            .await
            .map_err(NotifyError::from_reqwest)?;
        let status = resp.status();
        if status.is_success() { return Ok(()); }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Status { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::CannedServer;

    #[tokio::test]
    async fn posts_json_payload() {
        let server = CannedServer::start(vec![(200, "ok".into())]).await;
        let n = WebhookNotifier::new(server.url("/hook"), Duration::from_secs(5)).unwrap();
        n.deliver("ops", "BARI 1 2 3").await.unwrap();
        let req = &server.requests()[0];
        assert!(req.starts_with("POST /hook"));
        assert!(req.contains(r#""text":"BARI 1 2 3""#));
    }

    #[tokio::test]
    async fn non_2xx_is_failure() {
        let server = CannedServer::start(vec![(404, "no such hook".into())]).await;
        let n = WebhookNotifier::new(server.url("/hook"), Duration::from_secs(5)).unwrap();
        assert!(matches!(n.deliver("ops", "x").await, Err(NotifyError::Status { .. })));
    }
}
