use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use pnet::util::MacAddr;
use tracing::debug;

use portr_common::error::ScanError;
use portr_protocols::arp;
use portr_protocols::filter::FrameFilter;
use portr_protocols::frame::{self, Inbound};

use crate::network::transport::{Capture, RawTransport};

/// Asks `target_ip` for its hardware address with a single ARP request.
///
/// Frames other than the expected reply are skipped until `timeout` runs out.
pub fn resolve_mac(
    transport: &mut dyn RawTransport,
    source_mac: MacAddr,
    source_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
    timeout: Duration,
) -> Result<MacAddr, ScanError> {
    transport.install_filter(FrameFilter::arp_reply_from(target_ip));
    let request: Vec<u8> = arp::build_arp_request(source_mac, source_ip, target_ip)?;
    transport.inject(&request)?;

    let deadline: Instant = Instant::now() + timeout;
    loop {
        match transport.next_frame(deadline)? {
            Capture::Frame(bytes) => match frame::parse(&bytes) {
                Inbound::ArpReply { sender_mac, sender_ip } if sender_ip == target_ip => {
                    debug!(%target_ip, %sender_mac, "arp reply");
                    return Ok(sender_mac);
                }
                _ => continue,
            },
            Capture::Timeout => return Err(ScanError::Timeout(timeout)),
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
