use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Notifier, NotifyError};

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    http: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(TelegramNotifier { http, endpoint: endpoint(api_base, &token) })
    }
}

fn endpoint(api_base: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str { "telegram" }

    async fn deliver(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&[("chat_id", destination), ("text", text)])
            .send()
            .await
            .map_err(NotifyError::from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(NotifyError::from_reqwest)?;
        if !status.is_success() {
            return Err(NotifyError::Status { status, body });
        }
        match serde_json::from_str::<ApiReply>(&body) {
            Ok(reply) if reply.ok => Ok(()),
            Ok(reply) => Err(NotifyError::Rejected(reply.description.unwrap_or_else(|| "ok=false".into()))),
            Err(e) => Err(NotifyError::Rejected(format!("unreadable reply: {e}"))),
        }
    }
}
