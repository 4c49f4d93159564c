//! # Capture Filters
//!
//! A [`FrameFilter`] narrows a capture handle to the frames one probe is
//! waiting for, so concurrent probes on the same interface never see each
//! other's replies. Its `Display` form is the equivalent BPF expression.

use std::fmt;
use std::net::Ipv4Addr;

use crate::frame::{self, Inbound};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// ARP replies sent by `sender`.
    ArpReply { sender: Ipv4Addr },
    /// TCP segments from `src:src_port` to `dst:dst_port`.
    Tcp {
        src: Ipv4Addr,
        src_port: u16,
        dst: Ipv4Addr,
        dst_port: u16,
    },
    /// ICMP destination unreachable quoting a datagram from
    /// `local:local_port` to `remote:remote_port`.
    IcmpUnreachable {
        local: Ipv4Addr,
        local_port: u16,
        remote: Ipv4Addr,
        remote_port: u16,
    },
}

/// A disjunction of clauses. The empty filter accepts every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFilter {
    clauses: Vec<Clause>,
}

impl FrameFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn arp_reply_from(sender: Ipv4Addr) -> Self {
        Self::default().or(Clause::ArpReply { sender })
    }

    /// Replies to a TCP probe sent from `local:local_port` to `remote:remote_port`.
    pub fn tcp_reply(remote: Ipv4Addr, remote_port: u16, local: Ipv4Addr, local_port: u16) -> Self {
        Self::default().or(Clause::Tcp {
            src: remote,
            src_port: remote_port,
            dst: local,
            dst_port: local_port,
        })
    }

    /// Extends a TCP reply filter with ICMP errors about the same probe.
    pub fn or_icmp_unreachable(self, local: Ipv4Addr, local_port: u16, remote: Ipv4Addr, remote_port: u16) -> Self {
        self.or(Clause::IcmpUnreachable {
            local,
            local_port,
            remote,
            remote_port,
        })
    }

    pub fn or(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, frame: &[u8]) -> bool {
        self.clauses.is_empty() || self.accepts(&frame::parse(frame))
    }

    pub fn accepts(&self, inbound: &Inbound) -> bool {
        self.clauses.is_empty() || self.clauses.iter().any(|clause| clause.accepts(inbound))
    }
}

impl Clause {
    fn accepts(&self, inbound: &Inbound) -> bool {
        match (self, inbound) {
            (Clause::ArpReply { sender }, Inbound::ArpReply { sender_ip, .. }) => sender == sender_ip,
            (
                Clause::Tcp {
                    src,
                    src_port,
                    dst,
                    dst_port,
                },
                Inbound::Tcp(seg),
            ) => seg.src == *src && seg.src_port == *src_port && seg.dst == *dst && seg.dst_port == *dst_port,
            (
                Clause::IcmpUnreachable {
                    local,
                    local_port,
                    remote,
                    remote_port,
                },
                Inbound::IcmpUnreachable(icmp),
            ) => icmp.quoted.is_some_and(|q| {
                q.src == *local && q.src_port == *local_port && q.dst == *remote && q.dst_port == *remote_port
            }),
            _ => false,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::ArpReply { sender } => write!(f, "arp and arp[6:2] = 2 and src host {sender}"),
            Clause::Tcp {
                src,
                src_port,
                dst,
                dst_port,
            } => write!(
                f,
                "tcp and src host {src} and src port {src_port} and dst host {dst} and dst port {dst_port}"
            ),
            Clause::IcmpUnreachable {
                local,
                local_port,
                remote,
                remote_port,
            } => write!(
                f,
                "icmp[icmptype] = icmp-unreach and dst host {local} (quoting {local}:{local_port} > {remote}:{remote_port})"
            ),
        }
    }
}

impl fmt::Display for FrameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.clauses.as_slice() {
            [] => f.write_str("(all)"),
            [single] => write!(f, "{single}"),
            many => {
                for (i, clause) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "({clause})")?;
                }
                Ok(())
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
