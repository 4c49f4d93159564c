//! # Port Scan Model
//!
//! The vocabulary shared by the probes, the orchestrator and the output layer:
//! which technique probes a port ([`Strategy`]), what a probe concluded
//! ([`PortState`]) and the final record for a port ([`ScanResult`]).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::network::target::Target;

/// The probing techniques. The set is closed: the fallback chain matches on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Half-open scan with a crafted SYN frame.
    Syn,
    /// Bare ACK frame, used for firewall detection.
    Ack,
    /// Full handshake through the operating system's TCP stack.
    TcpConnect,
    /// Datagram probe with a protocol-specific payload.
    Udp,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Syn,
        Strategy::Ack,
        Strategy::TcpConnect,
        Strategy::Udp,
    ];

    /// Strategies that hand-craft link-layer frames.
    pub fn requires_raw_socket(self) -> bool {
        matches!(self, Strategy::Syn | Strategy::Ack)
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Syn => "syn",
            Strategy::Ack => "ack",
            Strategy::TcpConnect => "tcp",
            Strategy::Udp => "udp",
        }
    }

    /// Transport protocol label used when printing `port/proto`.
    pub fn transport_label(self) -> &'static str {
        match self {
            Strategy::Udp => "udp",
            _ => "tcp",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "syn" => Ok(Strategy::Syn),
            "ack" => Ok(Strategy::Ack),
            "tcp" | "connect" => Ok(Strategy::TcpConnect),
            "udp" => Ok(Strategy::Udp),
            other => anyhow::bail!("unknown scan type '{other}' (expected syn, ack, tcp or udp)"),
        }
    }
}

/// Reachability classification of a single port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    /// No answer to a UDP probe: either nothing is listening behind a
    /// firewall, or the service ignored the payload.
    OpenOrFiltered,
    /// An unsolicited ACK drew a RST: the port is reachable, openness unknown.
    Unfiltered,
    Error(String),
}

impl PortState {
    /// `OpenOrFiltered` and `Unfiltered` may still be refined by a fallback probe.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PortState::OpenOrFiltered | PortState::Unfiltered)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
            PortState::OpenOrFiltered => "open|filtered",
            PortState::Unfiltered => "unfiltered",
            PortState::Error(_) => "error",
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortState::Error(reason) => write!(f, "error ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// One unit of work: probe `port` on `target` with `strategy`.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub target: Arc<Target>,
    pub port: u16,
    pub strategy: Strategy,
}

impl ScanJob {
    pub fn new(target: Arc<Target>, port: u16, strategy: Strategy) -> Self {
        Self {
            target,
            port,
            strategy,
        }
    }
}

/// The final word on a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub port: u16,
    pub state: PortState,
    /// Human readable account of what was observed.
    pub evidence: String,
    pub elapsed: Duration,
}

impl ScanResult {
    pub fn new(port: u16, state: PortState, evidence: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            port,
            state,
            evidence: evidence.into(),
            elapsed,
        }
    }

    pub fn error(port: u16, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self {
            port,
            state: PortState::Error(reason.clone()),
            evidence: reason,
            elapsed: Duration::ZERO,
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
