use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct State;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Read, Clear }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Read => "read",
        Phase::Clear => "clear",
    }}
    fn span(&self) -> Span { match self {
        Phase::Read => info_span!("read"),
        Phase::Clear => info_span!("clear"),
    }}
}

impl OpMarker for State {
    const NAME: &'static str = "state";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("state") }
}
