use std::io;
use std::net::Ipv4Addr;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use portr_common::config::Timings;
use portr_common::error::ScanError;
use portr_common::scan::PortState;
use portr_protocols::dns;
use portr_protocols::payloads::DNS_PORT;

use crate::probe::Probe;
use crate::probe::tcp::is_exhaustion;

const RECV_BUF_LEN: usize = 2048;

/// Sends `payload` and waits for any datagram back, for at most
/// `timings.udp_attempts` send/receive cycles.
///
/// The socket is connected, so an ICMP port unreachable surfaces as a receive
/// error and the port is reported closed.
pub async fn probe(addr: Ipv4Addr, port: u16, payload: &[u8], timings: &Timings) -> Probe {
    let socket: UdpSocket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
        Ok(socket) => socket,
        Err(e) if is_exhaustion(&e) => return Probe::failed(&ScanError::ResourceExhaustion(e.to_string())),
        Err(e) => return Probe::failed(&ScanError::Transport(format!("udp bind failed: {e}"))),
    };
    if let Err(e) = socket.connect((addr, port)).await {
        return Probe::settled(PortState::Closed, format!("udp connect failed ({e})"));
    }

    let attempts: u32 = timings.udp_attempts.max(1);
    let mut buf: Vec<u8> = vec![0u8; RECV_BUF_LEN];
    for attempt in 1..=attempts {
        if let Err(e) = socket.send(payload).await {
            return Probe::settled(PortState::Closed, format!("udp send failed ({e})"));
        }
        match timeout(timings.udp, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => return Probe::settled(PortState::Open, describe_reply(port, &buf[..n])),
            Ok(Err(e)) => return Probe::settled(PortState::Closed, closed_evidence(&e)),
            Err(_elapsed) => debug!(port, attempt, "udp probe timed out"),
        }
    }
    Probe::settled(
        PortState::OpenOrFiltered,
        format!("no reply after {attempts} attempts of {:?}", timings.udp),
    )
}

fn describe_reply(port: u16, reply: &[u8]) -> String {
    if port == DNS_PORT {
        if let Some(summary) = dns::describe_response(reply) {
            return summary;
        }
    }
    format!("{} byte reply", reply.len())
}

fn closed_evidence(e: &io::Error) -> String {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => "icmp port unreachable".to_string(),
        _ => format!("udp receive failed ({e})"),
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
