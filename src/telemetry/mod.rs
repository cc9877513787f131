pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn check() -> LogCtx<ops::check::Check> { LogCtx::new(config::logs_are_json()) }
pub fn run() -> LogCtx<ops::run::Run> { LogCtx::new(config::logs_are_json()) }
pub fn scrape() -> LogCtx<ops::scrape::Scrape> { LogCtx::new(config::logs_are_json()) }
pub fn state() -> LogCtx<ops::state::State> { LogCtx::new(config::logs_are_json()) }
