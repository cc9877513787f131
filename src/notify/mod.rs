use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{NotifierKind, NotifyConfig};

pub mod stdout;
pub mod telegram;
pub mod webhook;

/// Delivery transport: hand `text` to `destination`, report ok or fail.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, destination: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug)]
pub enum NotifyError {
    Http(reqwest::Error),
    Timeout,
    Status { status: StatusCode, body: String },
    Rejected(String),
    Io(std::io::Error),
}

impl NotifyError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { NotifyError::Timeout } else { NotifyError::Http(err) }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Timeout | NotifyError::Http(_) => true,
            NotifyError::Status { status, .. } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            NotifyError::Rejected(_) | NotifyError::Io(_) => false,
        }
    }
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Http(err) => write!(f, "http error: {err}"),
            NotifyError::Timeout => write!(f, "delivery timed out"),
            NotifyError::Status { status, body } => write!(f, "delivery failed with {status}: {body}"),
            NotifyError::Rejected(why) => write!(f, "delivery rejected: {why}"),
            NotifyError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NotifyError::Http(err) => Some(err),
            NotifyError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Build the configured transport. Missing credentials are a startup error,
/// not a per-delivery failure.
pub fn from_config(cfg: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match cfg.kind {
        NotifierKind::Stdout => Ok(Arc::new(stdout::StdoutNotifier)),
        NotifierKind::Telegram => {
            let Some(token) = cfg.telegram_token.clone() else {
                bail!("TELEGRAM_BOT_TOKEN is required for the telegram notifier");
            };
            Ok(Arc::new(telegram::TelegramNotifier::new(&cfg.telegram_api, token, cfg.timeout)?))
        }
        NotifierKind::Webhook => {
            let Some(url) = cfg.webhook_url.clone() else {
                bail!("LOTTO_WEBHOOK_URL is required for the webhook notifier");
            };
            Ok(Arc::new(webhook::WebhookNotifier::new(url, cfg.timeout)?))
        }
    }
}

#[cfg(test)]
pub use mock::MockNotifier;


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cfg(kind: NotifierKind) -> NotifyConfig {
        NotifyConfig {
            kind,
            destination: "chan".into(),
            telegram_token: None,
            telegram_api: "https://api.telegram.org".into(),
            webhook_url: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn missing_credentials_fail_at_build_time() {
        assert!(from_config(&cfg(NotifierKind::Telegram)).is_err());
        assert!(from_config(&cfg(NotifierKind::Webhook)).is_err());
        assert_eq!(from_config(&cfg(NotifierKind::Stdout)).unwrap().name(), "stdout");
    }

    #[test]
    fn status_errors_classify_retryability() {
        let busy = NotifyError::Status { status: StatusCode::SERVICE_UNAVAILABLE, body: String::new() };
        let bad = NotifyError::Status { status: StatusCode::BAD_REQUEST, body: "chat not found".into() };
        assert!(busy.is_retryable());
        assert!(!bad.is_retryable());
        assert_eq!(format!("{bad}"), "delivery failed with 400 Bad Request: chat not found");
    }

    #[tokio::test]
    async fn mock_records_and_replays() {
        let mock = MockNotifier::new();
        mock.push_response(Err(NotifyError::Rejected("nope".into())));
        assert!(mock.deliver("a", "one").await.is_err());
        assert!(mock.deliver("a", "two").await.is_ok());
        assert_eq!(mock.calls().len(), 2);
    }
}
