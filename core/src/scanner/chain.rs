//! # Fallback Chain
//!
//! Per port: `Pending -> Probing(primary) -> Terminal`, or through one
//! fallback probe when the primary result is ambiguous:
//!
//! * SYN with no reply falls back to a TCP connect.
//! * UDP `open|filtered` falls back to an ACK probe. A RST (`unfiltered`)
//!   makes the port `open`; anything else makes it `filtered`.
//!
//! A strategy never runs twice for the same port.

use std::sync::Arc;
use std::time::Instant;

use portr_common::network::target::Target;
use portr_common::scan::{PortState, ScanJob, ScanResult, Strategy};

use crate::probe::{Outcome, ProbeEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done(PortState),
    Escalate(Strategy),
}

/// Decides what follows `outcome` of `current` when the port was first
/// probed with `primary`. `tried` lists the strategies already used.
pub fn next_step(
    primary: Strategy,
    current: Strategy,
    outcome: &Outcome,
    tried: &[Strategy],
    supports: impl Fn(Strategy) -> bool,
) -> Step {
    let step: Step = match (current, outcome) {
        (Strategy::Syn, Outcome::Silent) => Step::Escalate(Strategy::TcpConnect),
        (Strategy::Udp, Outcome::Settled(PortState::OpenOrFiltered)) if supports(Strategy::Ack) => {
            Step::Escalate(Strategy::Ack)
        }
        (Strategy::Ack, Outcome::Settled(state)) if primary == Strategy::Udp => Step::Done(match state {
            PortState::Unfiltered => PortState::Open,
            // The ACK probe could not run; keep what UDP established.
            PortState::Error(_) => PortState::OpenOrFiltered,
            _ => PortState::Filtered,
        }),
        (_, Outcome::Settled(state)) => Step::Done(state.clone()),
        (_, Outcome::Silent) => Step::Done(PortState::Filtered),
    };

    match step {
        Step::Escalate(next) if tried.contains(&next) => Step::Done(PortState::Filtered),
        step => step,
    }
}

/// Runs the chain for one port to a terminal result. Evidence from every
/// probe is kept, in order.
pub async fn resolve_port<E>(engine: &E, target: Arc<Target>, port: u16, primary: Strategy) -> ScanResult
where
    E: ProbeEngine + ?Sized,
{
    let started: Instant = Instant::now();
    let mut tried: Vec<Strategy> = Vec::with_capacity(2);
    let mut evidence: Vec<String> = Vec::with_capacity(2);
    let mut strategy: Strategy = primary;

    loop {
        let job = ScanJob::new(Arc::clone(&target), port, strategy);
        let probe = engine.probe(&job).await;
        tried.push(strategy);
        evidence.push(format!("{strategy}: {}", probe.evidence));

        match next_step(primary, strategy, &probe.outcome, &tried, |s| engine.supports(s)) {
            Step::Done(state) => return ScanResult::new(port, state, evidence.join("; "), started.elapsed()),
            Step::Escalate(next) => {
                tracing::debug!(port, from = %strategy, to = %next, "escalating");
                strategy = next;
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
