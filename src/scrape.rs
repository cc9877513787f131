use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tracing::Instrument;

use crate::config::{AppConfig, DrawQuery};
use crate::detect::identity_key;
use crate::draw::DrawResult;
use crate::fetch::FetchPipeline;
use crate::format::format_draw;
use crate::schedule::{build_parser, build_pipeline};
use crate::telemetry::ops::scrape::Phase as ScrapePhase;
use crate::telemetry::{self};
use crate::validate::Validator;

#[derive(Args, Debug)]
pub struct ScrapeCmd {
    /// Parse a saved HTML document instead of fetching
    #[arg(long, conflicts_with = "render")] pub file: Option<PathBuf>,
    /// Go straight to the headless browser, skipping the plain fetch
    #[arg(long, default_value_t = false)] pub render: bool,
    #[arg(long, requires = "anno")] pub prog: Option<u32>,
    #[arg(long, requires = "prog")] pub anno: Option<i32>,
}

#[derive(Serialize)]
struct ScrapeOut {
    key: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    violation: Option<String>,
    regions: usize,
    draw: DrawResult,
}

pub async fn run(mut cfg: AppConfig, args: ScrapeCmd) -> Result<()> {
    if let (Some(prog), Some(anno)) = (args.prog, args.anno) {
        cfg.fetch.draw_query = Some(DrawQuery { prog, anno });
    }

    let log = telemetry::scrape();
    let root = log.root_span_kv([
        ("source", cfg.source.label().to_string()),
        ("input", args.file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| cfg.fetch.url.clone())),
        ("render", args.render.to_string()),
    ]);

    let acquire = async {
        let doc = match &args.file {
            Some(path) => std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
            None => {
                let mut pipeline = if args.render { render_only(&cfg)? } else { build_pipeline(&cfg, cfg.render.enabled)? };
                let fetched = pipeline.obtain().instrument(log.span(&ScrapePhase::Fetch)).await;
                let Some(doc) = fetched else { bail!("could not obtain the results page") };
                doc
            }
        };
        Ok::<_, anyhow::Error>(doc)
    };
    let document = acquire.instrument(root.clone()).await?;
    let _g = root.entered();

    let draw = {
        let _s = log.span(&ScrapePhase::Parse).entered();
        build_parser(&cfg).parse(&document, Utc::now())
    };
    log.extracted(draw.entries.len(), draw.draw_date.as_deref(), draw.draw_number.as_deref());

    let validator = Validator::new(cfg.regions.clone(), cfg.rules);
    let violation = if validator.validate(&draw) { None } else { validator.check(&draw) };

    if !telemetry::config::json_mode() {
        println!("{}\n", format_draw(&draw));
    }
    log.result(&ScrapeOut {
        key: identity_key(&draw),
        valid: violation.is_none(),
        violation: violation.map(|v| v.to_string()),
        regions: draw.entries.len(),
        draw,
    })
}

#[cfg(feature = "render")]
fn render_only(cfg: &AppConfig) -> Result<FetchPipeline> {
    use crate::fetch::markers::MarkerCheck;
    use crate::fetch::render::RenderFetcher;
    use crate::fetch::source_url;

    let url = source_url(&cfg.fetch.url, cfg.fetch.draw_query)?;
    let check = MarkerCheck::new(&cfg.regions, cfg.fetch.min_markers);
    let render = RenderFetcher::new(cfg.render.clone(), url, cfg.fetch.user_agent.clone(), check);
    Ok(FetchPipeline::new(Box::new(render), None))
}

#[cfg(not(feature = "render"))]
fn render_only(_cfg: &AppConfig) -> Result<FetchPipeline> {
    bail!("--render needs a build with the `render` feature")
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
    async fn fetch_and_parse_log_under_the_scrape_span() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let server = CannedServer::start(vec![(200, PAGE.to_string())]).await;

        let mut cfg = AppConfig::default();
        cfg.fetch.url = server.url("/lotto");
        cfg.fetch.min_interval = Duration::ZERO;
        cfg.render.enabled = false;
        run(cfg, ScrapeCmd { file: None, render: false, prog: None, anno: None }).await.unwrap();

        let fetch = logs.line_with("fetching results page").unwrap();
        assert!(fetch.contains("scrape:fetch:"), "{fetch}");
        let parse = logs.line_with("entries extracted").unwrap();
        assert!(parse.contains("scrape:parse:"), "{parse}");
    }
}
