//! # Scan Error Taxonomy
//!
//! Every failure a scan can run into falls in one of these buckets. The
//! variant decides the blast radius: per-port failures end up as an
//! `Error` port state, while run-level failures abort before any port is
//! dispatched.

use std::time::Duration;

use thiserror::Error;

use crate::scan::Strategy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A frame could not be assembled from the given fields.
    #[error("frame construction failed: {0}")]
    Construction(String),

    /// Opening, writing to or reading from a capture handle failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Nothing arrived before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The operating system ran out of descriptors (or similar) for us.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// No local route leads to the destination.
    #[error("no route to {0}")]
    Routing(String),

    /// The strategy needs raw sockets and the process cannot open them.
    #[error("{0} scans require raw socket capability (run as root or grant CAP_NET_RAW)")]
    Privilege(Strategy),

    /// The process resource limits could not be determined.
    #[error("could not determine resource limits: {0}")]
    ResourceLimit(String),
}

impl ScanError {
    /// Whether this error aborts the whole run rather than a single port.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            ScanError::Routing(_) | ScanError::Privilege(_) | ScanError::ResourceLimit(_)
        )
    }

    /// Transient errors that are worth one more attempt after a pause.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::ResourceExhaustion(_))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_level_errors_are_fatal() {
        assert!(ScanError::Routing("10.0.0.5".into()).is_fatal_to_run());
        assert!(ScanError::Privilege(Strategy::Syn).is_fatal_to_run());
        assert!(ScanError::ResourceLimit("ulimit failed".into()).is_fatal_to_run());
    }

    #[test]
    fn per_port_errors_are_not_fatal() {
        assert!(!ScanError::Construction("no mac".into()).is_fatal_to_run());
        assert!(!ScanError::Transport("closed".into()).is_fatal_to_run());
        assert!(!ScanError::Timeout(Duration::from_secs(3)).is_fatal_to_run());
        assert!(!ScanError::ResourceExhaustion("EMFILE".into()).is_fatal_to_run());
    }

    #[test]
    fn only_exhaustion_is_transient() {
        assert!(ScanError::ResourceExhaustion("EMFILE".into()).is_transient());
        assert!(!ScanError::Timeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn privilege_message_names_strategy() {
        let msg = ScanError::Privilege(Strategy::Ack).to_string();
        assert!(msg.starts_with("ack scans require raw socket capability"));
    }
}
