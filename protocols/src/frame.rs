//! # Inbound Frame Classification
//!
//! Reduces a captured Ethernet frame to the handful of shapes the probes care
//! about. Anything else collapses into [`Inbound::Other`].

use std::net::Ipv4Addr;

use pnet::packet::Packet;
use pnet::packet::arp::{ArpOperations, ArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::{TcpFlags, TcpPacket};
use pnet::util::MacAddr;

/// Bytes between the start of an ICMP message and the quoted datagram.
const ICMP_QUOTE_OFFSET: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    ArpReply { sender_mac: MacAddr, sender_ip: Ipv4Addr },
    Tcp(TcpSummary),
    IcmpUnreachable(IcmpUnreachable),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSummary {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
}

impl TcpSummary {
    pub fn is_syn_ack(&self) -> bool {
        self.flags & (TcpFlags::SYN | TcpFlags::ACK) == TcpFlags::SYN | TcpFlags::ACK
    }

    pub fn is_rst(&self) -> bool {
        self.flags & TcpFlags::RST != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpUnreachable {
    /// The router or host that generated the error.
    pub from: Ipv4Addr,
    pub code: u8,
    /// Addressing of the datagram that triggered the error, when it was TCP
    /// or UDP and enough of it was quoted.
    pub quoted: Option<QuotedDatagram>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedDatagram {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub src_port: u16,
    pub dst_port: u16,
}

pub fn parse(frame: &[u8]) -> Inbound {
    let Some(eth) = EthernetPacket::new(frame) else {
        return Inbound::Other;
    };
    match eth.get_ethertype() {
        EtherTypes::Arp => parse_arp(eth.payload()),
        EtherTypes::Ipv4 => parse_ipv4(eth.payload()),
        _ => Inbound::Other,
    }
}

fn parse_arp(payload: &[u8]) -> Inbound {
    match ArpPacket::new(payload) {
        Some(arp) if arp.get_operation() == ArpOperations::Reply => Inbound::ArpReply {
            sender_mac: arp.get_sender_hw_addr(),
            sender_ip: arp.get_sender_proto_addr(),
        },
        _ => Inbound::Other,
    }
}

fn parse_ipv4(payload: &[u8]) -> Inbound {
    let Some(ip) = Ipv4Packet::new(payload) else {
        return Inbound::Other;
    };
    match ip.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => match TcpPacket::new(ip.payload()) {
            Some(tcp) => Inbound::Tcp(TcpSummary {
                src: ip.get_source(),
                dst: ip.get_destination(),
                src_port: tcp.get_source(),
                dst_port: tcp.get_destination(),
                flags: tcp.get_flags(),
            }),
            None => Inbound::Other,
        },
        IpNextHeaderProtocols::Icmp => match IcmpPacket::new(ip.payload()) {
            Some(icmp) if icmp.get_icmp_type() == IcmpTypes::DestinationUnreachable => {
                Inbound::IcmpUnreachable(IcmpUnreachable {
                    from: ip.get_source(),
                    code: icmp.get_icmp_code().0,
                    quoted: ip.payload().get(ICMP_QUOTE_OFFSET..).and_then(parse_quoted),
                })
            }
            _ => Inbound::Other,
        },
        _ => Inbound::Other,
    }
}

// The quote is usually truncated to header + 8 bytes, so the IPv4 header is
// read by hand rather than trusting its total length field.
fn parse_quoted(quote: &[u8]) -> Option<QuotedDatagram> {
    let first: u8 = *quote.first()?;
    if first >> 4 != 4 {
        return None;
    }
    let ihl: usize = usize::from(first & 0x0f) * 4;
    if ihl < 20 || quote.len() < ihl + 4 {
        return None;
    }
    let protocol: u8 = quote[9];
    if protocol != IpNextHeaderProtocols::Tcp.0 && protocol != IpNextHeaderProtocols::Udp.0 {
        return None;
    }
    let octets = |at: usize| Ipv4Addr::new(quote[at], quote[at + 1], quote[at + 2], quote[at + 3]);
    Some(QuotedDatagram {
        src: octets(12),
        dst: octets(16),
        protocol,
        src_port: u16::from_be_bytes([quote[ihl], quote[ihl + 1]]),
        dst_port: u16::from_be_bytes([quote[ihl + 2], quote[ihl + 3]]),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
