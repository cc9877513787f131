use std::io::{self, Write};

use serde_json::Value;

use super::config::{OutputConfig, OutputFormat};
use super::types::Envelope;

pub trait Presenter: Send + Sync {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()>;
}

pub struct JsonPresenter { pub pretty: bool }
impl Presenter for JsonPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        if self.pretty { serde_json::to_writer_pretty(&mut *w, env).map_err(to_io)? } else { serde_json::to_writer(&mut *w, env).map_err(to_io)? }
        writeln!(w)
    }
}

/// Human summary: one `key: value` line per top-level field; pretty dumps the whole payload.
pub struct TextPresenter { pub pretty: bool }
impl Presenter for TextPresenter {
    fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        let (label, body) = if env.apply { ("Result", env.result.as_ref()) } else { ("Plan", env.plan.as_ref()) };
        writeln!(w, "{}: {}", label, env.op)?;
        let Some(body) = body else { return Ok(()) };
        if self.pretty {
            serde_json::to_writer_pretty(&mut *w, body).map_err(to_io)?;
            return writeln!(w);
        }
        if let Value::Object(map) = body {
            for (k, v) in map {
                match v {
                    Value::Null => {}
                    Value::String(s) => writeln!(w, "  {k}: {s}")?,
                    Value::Array(_) | Value::Object(_) => {}
                    other => writeln!(w, "  {k}: {other}")?,
                }
            }
        }
        Ok(())
    }
}

pub struct Emitter {
    presenter: Box<dyn Presenter>,
}

impl Emitter {
    pub fn from_env(cfg: OutputConfig) -> Self {
        let presenter: Box<dyn Presenter> = match cfg.format {
            OutputFormat::Json => Box::new(JsonPresenter { pretty: cfg.pretty }),
            OutputFormat::Text => Box::new(TextPresenter { pretty: cfg.pretty }),
        };
        Emitter { presenter }
    }

    pub fn emit(&self, env: &Envelope) -> io::Result<()> {
        let mut out = io::stdout();
        self.presenter.emit(env, &mut out)?;
        out.flush()
    }
}

fn to_io(e: serde_json::Error) -> io::Error { io::Error::other(e) }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_presenter_lists_scalar_fields() {
        let env = Envelope::result("check", &json!({"outcome": "stale", "attempts": 3, "entries": [1]}), None).unwrap();
        let mut buf = Vec::new();
        TextPresenter { pretty: false }.emit(&env, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.starts_with("Result: check\n"));
        assert!(s.contains("  outcome: stale\n"));
        assert!(s.contains("  attempts: 3\n"));
        assert!(!s.contains("entries"));
    }

    #[test]
    fn json_presenter_writes_one_line() {
        let env = Envelope::plan("state", &json!({"key": null}), None).unwrap();
        let mut buf = Vec::new();
        JsonPresenter { pretty: false }.emit(&env, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s.lines().count(), 1);
        assert!(s.contains("\"schema_version\":\"lotto.v1\""));
    }
}
