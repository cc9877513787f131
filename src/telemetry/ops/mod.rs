pub mod check;
pub mod run;
pub mod scrape;
pub mod state;
