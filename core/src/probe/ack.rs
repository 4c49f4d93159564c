use std::time::{Duration, Instant};

use portr_common::error::ScanError;
use portr_common::scan::PortState;
use portr_protocols::filter::FrameFilter;
use portr_protocols::frame::{self, Inbound};
use portr_protocols::tcp;

use crate::network::transport::{Capture, RawTransport};
use crate::probe::{Probe, RawSession};

/// Unsolicited ACK. A RST proves the port is reachable through any stateful
/// filter; an ICMP error or silence means something dropped it.
pub fn run(transport: &mut dyn RawTransport, session: &RawSession, timeout: Duration) -> Probe {
    let ctx = &session.ctx;
    let filter: FrameFilter = FrameFilter::tcp_reply(ctx.dst_ip, session.dst_port, ctx.src_ip, session.src_port)
        .or_icmp_unreachable(ctx.src_ip, session.src_port, ctx.dst_ip, session.dst_port);
    transport.install_filter(filter);

    let ack: Vec<u8> = match tcp::ack_frame(ctx, session.src_port, session.dst_port) {
        Ok(frame) => frame,
        Err(e) => return Probe::failed(&ScanError::from(e)),
    };
    if let Err(e) = transport.inject(&ack) {
        return Probe::failed(&e);
    }

    let deadline: Instant = Instant::now() + timeout;
    loop {
        match transport.next_frame(deadline) {
            Ok(Capture::Frame(bytes)) => match frame::parse(&bytes) {
                Inbound::Tcp(seg) if seg.is_rst() => {
                    return Probe::settled(PortState::Unfiltered, format!("rst from port {}", seg.src_port));
                }
                Inbound::IcmpUnreachable(icmp) => {
                    return Probe::settled(
                        PortState::Filtered,
                        format!("icmp unreachable (code {}) from {}", icmp.code, icmp.from),
                    );
                }
                _ => continue,
            },
            Ok(Capture::Timeout) => {
                return Probe::settled(PortState::Filtered, format!("no reply to ack within {timeout:?}"));
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Outcome;
    use crate::probe::syn::tests::session;
    use crate::testing::{ScriptedTransport, icmp_unreachable, tcp_reply};
    use pnet::packet::Packet;
    use pnet::packet::ethernet::EthernetPacket;
    use pnet::packet::ipv4::Ipv4Packet;
    use pnet::packet::tcp::{TcpFlags, TcpPacket};
    use std::net::Ipv4Addr;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn ports_of(frame: &[u8]) -> (u16, u16) {
        let eth = EthernetPacket::new(frame).unwrap();
        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        let tcp = TcpPacket::new(ip.payload()).unwrap();
        (tcp.get_source(), tcp.get_destination())
    }

    #[test]
    fn rst_is_unfiltered() {
        let mut transport = ScriptedTransport::new(|frame| {
            let (src, dst) = ports_of(frame);
            vec![tcp_reply(dst, src, TcpFlags::RST)]
        });
        let probe = run(&mut transport, &session(443), TIMEOUT);
        assert_eq!(probe.outcome, Outcome::Settled(PortState::Unfiltered));
    }

    #[test]
    fn icmp_unreachable_is_filtered() {
        let router = Ipv4Addr::new(10, 0, 0, 1);
        let mut transport = ScriptedTransport::new(move |frame| {
            let (src, dst) = ports_of(frame);
            vec![icmp_unreachable(router, 13, src, dst)]
        });
        let probe = run(&mut transport, &session(443), TIMEOUT);
        assert_eq!(probe.outcome, Outcome::Settled(PortState::Filtered));
        assert_eq!(probe.evidence, "icmp unreachable (code 13) from 10.0.0.1");
    }

    #[test]
    fn silence_is_filtered() {
        let probe = run(&mut ScriptedTransport::silent(), &session(443), TIMEOUT);
        assert_eq!(probe.outcome, Outcome::Settled(PortState::Filtered));
    }

    #[test]
    fn sends_bare_ack() {
        let mut transport = ScriptedTransport::silent();
        let injected = transport.injected.clone();
        run(&mut transport, &session(443), TIMEOUT);

        let sent = injected.lock().unwrap();
        let eth = EthernetPacket::new(&sent[0]).unwrap();
        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        let tcp = TcpPacket::new(ip.payload()).unwrap();
        assert_eq!(tcp.get_flags(), TcpFlags::ACK);
    }
}
