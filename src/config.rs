use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveTime;
use tracing::warn;

use crate::draw::{ExtractionRules, RegionSet};
use crate::util::time::parse_trigger_list;

const ADM_URL: &str = "https://www.adm.gov.it/portale/monopoli/giochi/gioco-del-lotto/lotto_g/lotto_estr";
const TELEVIDEO_URL: &str = "https://www.televideo.rai.it/televideo/pub/pagina.jsp?p=590&s=0&r=Nazionale";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_STATE_FILE: &str = "last_extraction.txt";
const DEFAULT_TRIGGERS: &str = "20:15";

/// Results provider. Decides the default URL, the `source` label and the
/// selector cascade used to bound the parser's search.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceProfile {
    Adm,
    Televideo,
}

impl SourceProfile {
    pub fn label(&self) -> &'static str {
        match self {
            SourceProfile::Adm => "ADM",
            SourceProfile::Televideo => "RAI Televideo",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            SourceProfile::Adm => ADM_URL,
            SourceProfile::Televideo => TELEVIDEO_URL,
        }
    }

    /// General containers first, then class markers; `<body>` is the implicit last resort.
    pub fn selectors(&self) -> Vec<String> {
        let list: &[&str] = match self {
            SourceProfile::Adm => &[
                "main", "article", "#content",
                ".content-lottery", ".lotto-results", ".estrazione", "table", ".table",
            ],
            SourceProfile::Televideo => &["pre", "#content", "main", ".content"],
        };
        list.iter().map(|s| s.to_string()).collect()
    }
}

impl FromStr for SourceProfile {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adm" => Ok(SourceProfile::Adm),
            "televideo" | "rai" => Ok(SourceProfile::Televideo),
            other => bail!("unknown source profile {other:?} (expected adm|televideo)"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum NotifierKind {
    Stdout,
    Telegram,
    Webhook,
}

impl FromStr for NotifierKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(NotifierKind::Stdout),
            "telegram" => Ok(NotifierKind::Telegram),
            "webhook" => Ok(NotifierKind::Webhook),
            other => bail!("unknown notifier {other:?} (expected stdout|telegram|webhook)"),
        }
    }
}

/// Specific draw selection, sent as `prog`/`anno` query parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawQuery {
    pub prog: u32,
    pub anno: i32,
}

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub min_interval: Duration,
    /// Markers needed for a plain fetch to count as conclusive; 0 disables the check.
    pub min_markers: usize,
    pub user_agent: String,
    pub draw_query: Option<DrawQuery>,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub enabled: bool,
    pub webdriver_url: String,
    pub page_load_timeout: Duration,
    pub settle: Duration,
    pub content_wait: Duration,
    pub window: (u32, u32),
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub triggers: Vec<NaiveTime>,
    pub attempts: usize,
    pub attempt_delay: Duration,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub kind: NotifierKind,
    pub destination: String,
    pub telegram_token: Option<String>,
    pub telegram_api: String,
    pub webhook_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub source: SourceProfile,
    pub selectors: Vec<String>,
    pub regions: RegionSet,
    pub rules: ExtractionRules,
    pub fetch: FetchConfig,
    pub render: RenderConfig,
    pub schedule: ScheduleConfig,
    pub notify: NotifyConfig,
    pub state_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_source(SourceProfile::Adm)
    }
}

impl AppConfig {
    pub fn for_source(source: SourceProfile) -> Self {
        AppConfig {
            source,
            selectors: source.selectors(),
            regions: RegionSet::default(),
            rules: ExtractionRules::default(),
            fetch: FetchConfig {
                url: source.default_url().to_string(),
                timeout: Duration::from_secs(30),
                max_retries: 3,
                retry_delay: Duration::from_secs(5),
                min_interval: Duration::from_secs(2),
                min_markers: 3,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                draw_query: None,
            },
            render: RenderConfig {
                enabled: cfg!(feature = "render"),
                webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
                page_load_timeout: Duration::from_secs(30),
                settle: Duration::from_secs(3),
                content_wait: Duration::from_secs(10),
                window: (1920, 1080),
            },
            schedule: ScheduleConfig {
                triggers: parse_trigger_list(DEFAULT_TRIGGERS).unwrap_or_default(),
                attempts: 3,
                attempt_delay: Duration::from_secs(300),
            },
            notify: NotifyConfig {
                kind: NotifierKind::Stdout,
                destination: "estrazionilotto".to_string(),
                telegram_token: None,
                telegram_api: DEFAULT_TELEGRAM_API.to_string(),
                webhook_url: None,
                timeout: Duration::from_secs(30),
            },
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }

    /// Compiled defaults overlaid with `LOTTO_*` variables (plus `TELEGRAM_BOT_TOKEN`).
    /// Unparseable numeric values are ignored with a warning; unknown enum
    /// values and bad trigger times are errors.
    pub fn from_env() -> Result<Self> {
        let source = match env_str("LOTTO_SOURCE") {
            Some(s) => s.parse()?,
            None => SourceProfile::Adm,
        };
        let mut cfg = Self::for_source(source);

        if let Some(url) = env_str("LOTTO_SOURCE_URL") { cfg.fetch.url = url; }
        if let Some(csv) = env_str("LOTTO_SELECTORS") { cfg.selectors = split_csv(&csv); }
        if let Some(csv) = env_str("LOTTO_REGIONS") {
            let set = RegionSet::parse_csv(&csv);
            if set.is_empty() { bail!("LOTTO_REGIONS must name at least one region"); }
            cfg.regions = set;
        }

        if let Some(v) = env_num::<u8>("LOTTO_NUMBER_MIN") { cfg.rules.min_value = v; }
        if let Some(v) = env_num::<u8>("LOTTO_NUMBER_MAX") { cfg.rules.max_value = v; }
        if let Some(v) = env_num::<usize>("LOTTO_MIN_NUMBERS") { cfg.rules.min_numbers = v; }
        if let Some(v) = env_num::<usize>("LOTTO_MAX_NUMBERS") { cfg.rules.max_numbers = v; }

        if let Some(v) = env_num::<u64>("LOTTO_TIMEOUT_SECS") { cfg.fetch.timeout = Duration::from_secs(v); }
        if let Some(v) = env_num::<u32>("LOTTO_MAX_RETRIES") { cfg.fetch.max_retries = v; }
        if let Some(v) = env_num::<u64>("LOTTO_RETRY_DELAY_SECS") { cfg.fetch.retry_delay = Duration::from_secs(v); }
        if let Some(v) = env_num::<u64>("LOTTO_MIN_INTERVAL_MS") { cfg.fetch.min_interval = Duration::from_millis(v); }
        if let Some(v) = env_num::<usize>("LOTTO_MIN_MARKERS") { cfg.fetch.min_markers = v; }
        if let Some(ua) = env_str("LOTTO_USER_AGENT") { cfg.fetch.user_agent = ua; }
        if let (Some(prog), Some(anno)) = (env_num::<u32>("LOTTO_PROG"), env_num::<i32>("LOTTO_ANNO")) {
            cfg.fetch.draw_query = Some(DrawQuery { prog, anno });
        }

        if let Some(v) = env_flag("LOTTO_RENDER") { cfg.render.enabled = v; }
        if let Some(url) = env_str("LOTTO_WEBDRIVER_URL") { cfg.render.webdriver_url = url; }
        if let Some(v) = env_num::<u64>("LOTTO_RENDER_SETTLE_SECS") { cfg.render.settle = Duration::from_secs(v); }
        if let Some(v) = env_num::<u64>("LOTTO_RENDER_WAIT_SECS") { cfg.render.content_wait = Duration::from_secs(v); }

        if let Some(csv) = env_str("LOTTO_TRIGGER_TIMES") { cfg.schedule.triggers = parse_trigger_list(&csv)?; }
        if let Some(v) = env_num::<usize>("LOTTO_ATTEMPTS") { cfg.schedule.attempts = v; }
        if let Some(v) = env_num::<u64>("LOTTO_ATTEMPT_DELAY_SECS") { cfg.schedule.attempt_delay = Duration::from_secs(v); }

        if let Some(kind) = env_str("LOTTO_NOTIFIER") { cfg.notify.kind = kind.parse()?; }
        if let Some(dest) = env_str("LOTTO_DESTINATION") { cfg.notify.destination = dest; }
        cfg.notify.telegram_token = env_str("TELEGRAM_BOT_TOKEN");
        if let Some(api) = env_str("LOTTO_TELEGRAM_API") { cfg.notify.telegram_api = api; }
        cfg.notify.webhook_url = env_str("LOTTO_WEBHOOK_URL");

        if let Some(path) = env_str("LOTTO_STATE_FILE") { cfg.state_file = PathBuf::from(path); }

        cfg.check()?;
        Ok(cfg)
    }

    /// Switch provider, resetting the URL and cascade to that provider's defaults.
    pub fn use_source(&mut self, source: SourceProfile) {
        if self.source == source { return; }
        self.source = source;
        self.fetch.url = source.default_url().to_string();
        self.selectors = source.selectors();
    }

    pub fn check(&self) -> Result<()> {
        let r = &self.rules;
        if r.min_value > r.max_value { bail!("number range is empty ({}..={})", r.min_value, r.max_value); }
        if r.min_numbers == 0 || r.min_numbers > r.max_numbers {
            bail!("number count bounds are inconsistent (min={} max={})", r.min_numbers, r.max_numbers);
        }
        if self.fetch.max_retries == 0 { bail!("max retries must be at least 1"); }
        if self.schedule.attempts == 0 { bail!("attempts must be at least 1"); }
        if self.schedule.triggers.is_empty() { bail!("at least one trigger time is required"); }
        Ok(())
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_num<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_str(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env_str(key)?;
    Some(matches!(raw.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
}

fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_checks() {
        let cfg = AppConfig::default();
        cfg.check().unwrap();
        assert_eq!(cfg.fetch.max_retries, 3);
        assert_eq!(cfg.fetch.retry_delay, Duration::from_secs(5));
        assert_eq!(cfg.fetch.min_interval, Duration::from_secs(2));
        assert_eq!(cfg.schedule.attempts, 3);
        assert_eq!(cfg.schedule.attempt_delay, Duration::from_secs(300));
        assert_eq!(cfg.schedule.triggers, vec![NaiveTime::from_hms_opt(20, 15, 0).unwrap()]);
        assert_eq!(cfg.regions.len(), 11);
    }

    #[test]
    fn use_source_swaps_url_and_cascade() {
        let mut cfg = AppConfig::default();
        cfg.use_source(SourceProfile::Televideo);
        assert_eq!(cfg.fetch.url, TELEVIDEO_URL);
        assert_eq!(cfg.selectors.first().map(String::as_str), Some("pre"));
    }

    #[test]
    fn inconsistent_rules_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.rules.min_numbers = 6;
        assert!(cfg.check().is_err());
    }

    #[test]
    fn profile_and_notifier_parse() {
        assert_eq!("RAI".parse::<SourceProfile>().unwrap(), SourceProfile::Televideo);
        assert_eq!("webhook".parse::<NotifierKind>().unwrap(), NotifierKind::Webhook);
        assert!("sms".parse::<NotifierKind>().is_err());
    }
}
