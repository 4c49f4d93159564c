use std::time::{Duration, Instant};

use portr_common::error::ScanError;
use portr_common::scan::PortState;
use portr_protocols::filter::FrameFilter;
use portr_protocols::frame::{self, Inbound};
use portr_protocols::tcp;

use crate::network::transport::{Capture, RawTransport};
use crate::probe::{Probe, RawSession};

/// Half-open probe: SYN+ACK means open, RST means closed, silence is left
/// for the fallback chain to interpret.
pub fn run(transport: &mut dyn RawTransport, session: &RawSession, timeout: Duration) -> Probe {
    let ctx = &session.ctx;
    transport.install_filter(FrameFilter::tcp_reply(ctx.dst_ip, session.dst_port, ctx.src_ip, session.src_port));

    let syn: Vec<u8> = match tcp::syn_frame(ctx, session.src_port, session.dst_port) {
        Ok(frame) => frame,
        Err(e) => return Probe::failed(&ScanError::from(e)),
    };
    if let Err(e) = transport.inject(&syn) {
        return Probe::failed(&e);
    }

    let deadline: Instant = Instant::now() + timeout;
    loop {
        match transport.next_frame(deadline) {
            Ok(Capture::Frame(bytes)) => match frame::parse(&bytes) {
                Inbound::Tcp(seg) if seg.is_syn_ack() => {
                    return Probe::settled(PortState::Open, format!("syn-ack from port {}", seg.src_port));
                }
                Inbound::Tcp(seg) if seg.is_rst() => {
                    return Probe::settled(PortState::Closed, format!("rst from port {}", seg.src_port));
                }
                _ => continue,
            },
            Ok(Capture::Timeout) => return Probe::silent(format!("no reply to syn within {timeout:?}")),
            Err(e) => return Probe::failed(&e),
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
