use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Run;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Wait, Cycle }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Wait => "wait",
        Phase::Cycle => "cycle",
    }}
    fn span(&self) -> Span { match self {
        Phase::Wait => info_span!("wait"),
        Phase::Cycle => info_span!("cycle"),
    }}
}

impl OpMarker for Run {
    const NAME: &'static str = "run";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("run") }
}
