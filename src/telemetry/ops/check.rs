use tracing::{info_span, Span};

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Check;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Fetch, Parse, Validate, Detect, Deliver, Persist, Wait }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Fetch => "fetch",
        Phase::Parse => "parse",
        Phase::Validate => "validate",
        Phase::Detect => "detect",
        Phase::Deliver => "deliver",
        Phase::Persist => "persist",
        Phase::Wait => "wait",
    }}
    fn span(&self) -> Span { match self {
        Phase::Fetch => info_span!("fetch"),
        Phase::Parse => info_span!("parse"),
        Phase::Validate => info_span!("validate"),
        Phase::Detect => info_span!("detect"),
        Phase::Deliver => info_span!("deliver"),
        Phase::Persist => info_span!("persist"),
        Phase::Wait => info_span!("wait"),
    }}
}

impl OpMarker for Check {
    const NAME: &'static str = "check";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("check") }
}
