//! Frame builders and a scripted transport for exercising probes without a
//! network.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::packet::arp::{ArpOperations, MutableArpPacket};
use pnet::packet::icmp::{IcmpCode, IcmpTypes, MutableIcmpPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::util::MacAddr;

use portr_common::error::ScanError;
use portr_common::network::route::Route;
use portr_common::network::target::Target;
use portr_protocols::filter::FrameFilter;
use portr_protocols::tcp::{FrameContext, TcpFrameSpec, build_tcp_frame};
use portr_protocols::{ETH_HDR_LEN, IPV4_HDR_LEN, arp, ipv4};

use crate::network::transport::{Capture, RawTransport, TransportFactory};

pub const TARGET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
pub const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const TARGET_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x05);
pub const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x02);

pub fn lan_interface() -> NetworkInterface {
    NetworkInterface {
        name: "eth0".to_string(),
        description: String::new(),
        index: 2,
        mac: Some(LOCAL_MAC),
        ips: vec![IpNetwork::V4(Ipv4Network::new(LOCAL, 24).unwrap())],
        flags: 1,
    }
}

pub fn lan_target() -> Arc<Target> {
    let route = Route {
        source: LOCAL,
        interface: lan_interface(),
        next_hop: TARGET,
    };
    Arc::new(Target::new(TARGET, route))
}

/// TCP segment from TARGET:src_port to LOCAL:dst_port.
pub fn tcp_reply(src_port: u16, dst_port: u16, flags: u8) -> Vec<u8> {
    let ctx = FrameContext {
        src_mac: TARGET_MAC,
        dst_mac: LOCAL_MAC,
        src_ip: TARGET,
        dst_ip: LOCAL,
    };
    let spec = TcpFrameSpec {
        src_port,
        dst_port,
        sequence: 1,
        acknowledgement: 1,
        flags,
        window: 0,
    };
    build_tcp_frame(&ctx, &spec).unwrap()
}

pub fn arp_reply(sender_ip: Ipv4Addr, sender_mac: MacAddr) -> Vec<u8> {
    let mut frame = arp::build_arp_request(sender_mac, sender_ip, LOCAL).unwrap();
    let mut reply = MutableArpPacket::new(&mut frame[ETH_HDR_LEN..]).unwrap();
    reply.set_operation(ArpOperations::Reply);
    reply.set_target_hw_addr(LOCAL_MAC);
    frame
}

/// ICMP unreachable from `router` quoting LOCAL:src_port -> TARGET:dst_port.
pub fn icmp_unreachable(router: Ipv4Addr, code: u8, src_port: u16, dst_port: u16) -> Vec<u8> {
    let icmp_len: usize = 8 + IPV4_HDR_LEN + 8;
    let mut frame = vec![0u8; ETH_HDR_LEN + IPV4_HDR_LEN + icmp_len];
    portr_protocols::ethernet::make_header(
        &mut frame,
        TARGET_MAC,
        LOCAL_MAC,
        pnet::packet::ethernet::EtherTypes::Ipv4,
    )
    .unwrap();
    ipv4::write_header(&mut frame[ETH_HDR_LEN..], icmp_len, IpNextHeaderProtocols::Icmp, router, LOCAL).unwrap();

    let icmp_start = ETH_HDR_LEN + IPV4_HDR_LEN;
    {
        let mut icmp = MutableIcmpPacket::new(&mut frame[icmp_start..]).unwrap();
        icmp.set_icmp_type(IcmpTypes::DestinationUnreachable);
        icmp.set_icmp_code(IcmpCode(code));
    }
    let quote = icmp_start + 8;
    ipv4::write_header(&mut frame[quote..], 20, IpNextHeaderProtocols::Tcp, LOCAL, TARGET).unwrap();
    let ports = quote + IPV4_HDR_LEN;
    frame[ports..ports + 2].copy_from_slice(&src_port.to_be_bytes());
    frame[ports + 2..ports + 4].copy_from_slice(&dst_port.to_be_bytes());
    frame
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

/// Answers each injected frame with whatever the responder returns. Reads
/// never block: an empty queue is a timeout.
pub struct ScriptedTransport {
    responder: Responder,
    queue: VecDeque<Vec<u8>>,
    filter: FrameFilter,
    inject_error: Option<ScanError>,
    pub injected: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedTransport {
    pub fn new(responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            queue: VecDeque::new(),
            filter: FrameFilter::accept_all(),
            inject_error: None,
            injected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    pub fn failing_inject(err: ScanError) -> Self {
        let mut transport = Self::silent();
        transport.inject_error = Some(err);
        transport
    }
}

impl RawTransport for ScriptedTransport {
    fn inject(&mut self, frame: &[u8]) -> Result<(), ScanError> {
        if let Some(err) = self.inject_error.clone() {
            return Err(err);
        }
        self.injected.lock().unwrap().push(frame.to_vec());
        let replies = (self.responder)(frame);
        self.queue.extend(replies);
        Ok(())
    }

    fn next_frame(&mut self, _deadline: Instant) -> Result<Capture, ScanError> {
        while let Some(frame) = self.queue.pop_front() {
            if self.filter.matches(&frame) {
                return Ok(Capture::Frame(frame));
            }
        }
        Ok(Capture::Timeout)
    }

    fn install_filter(&mut self, filter: FrameFilter) {
        self.filter = filter;
    }
}

/// Hands out a fresh [`ScriptedTransport`] per `open`, counting them.
pub struct ScriptedFactory {
    make: Box<dyn Fn() -> ScriptedTransport + Send + Sync>,
    pub opened: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(make: impl Fn() -> ScriptedTransport + Send + Sync + 'static) -> Self {
        Self {
            make: Box::new(make),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl TransportFactory for ScriptedFactory {
    fn open(&self) -> Result<Box<dyn RawTransport>, ScanError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new((self.make)()))
    }
}
