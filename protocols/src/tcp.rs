//! SYN and ACK probe frames: Ethernet + IPv4 + a bare 20 byte TCP header.

use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::{MutableTcpPacket, TcpFlags};
use pnet::util::MacAddr;

use portr_common::network::interface::NetworkInterfaceExtension;

use crate::{ETH_HDR_LEN, IPV4_HDR_LEN, PacketError, TCP_HDR_LEN, checksum, ethernet, ipv4};

pub const DEFAULT_WINDOW: u16 = 14_600;

/// Link and network addressing shared by every frame sent to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

impl FrameContext {
    /// Takes the source hardware address from `interface`. An unnamed
    /// interface or one without a usable hardware address cannot frame anything.
    pub fn from_interface(
        interface: &NetworkInterface,
        src_ip: Ipv4Addr,
        dst_mac: MacAddr,
        dst_ip: Ipv4Addr,
    ) -> Result<Self, PacketError> {
        if interface.name.is_empty() {
            return Err(PacketError::EmptyInterfaceName);
        }
        let src_mac: MacAddr = interface
            .hardware_addr()
            .ok_or_else(|| PacketError::MissingHardwareAddr(interface.name.clone()))?;
        Ok(Self {
            src_mac,
            dst_mac,
            src_ip,
            dst_ip,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFrameSpec {
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    pub flags: u8,
    pub window: u16,
}

pub fn build_tcp_frame(ctx: &FrameContext, spec: &TcpFrameSpec) -> Result<Vec<u8>, PacketError> {
    let mut buffer: Vec<u8> = crate::frame_buffer(ETH_HDR_LEN + IPV4_HDR_LEN + TCP_HDR_LEN);

    ethernet::make_header(&mut buffer[..ETH_HDR_LEN], ctx.src_mac, ctx.dst_mac, EtherTypes::Ipv4)?;
    ipv4::write_header(
        &mut buffer[ETH_HDR_LEN..],
        TCP_HDR_LEN,
        IpNextHeaderProtocols::Tcp,
        ctx.src_ip,
        ctx.dst_ip,
    )?;

    let tcp_start: usize = ETH_HDR_LEN + IPV4_HDR_LEN;
    let segment: &mut [u8] = &mut buffer[tcp_start..tcp_start + TCP_HDR_LEN];
    {
        let mut tcp: MutableTcpPacket = MutableTcpPacket::new(segment).ok_or(PacketError::TcpBuffer)?;
        tcp.set_source(spec.src_port);
        tcp.set_destination(spec.dst_port);
        tcp.set_sequence(spec.sequence);
        tcp.set_acknowledgement(spec.acknowledgement);
        tcp.set_data_offset(5);
        tcp.set_reserved(0);
        tcp.set_flags(spec.flags);
        tcp.set_window(spec.window);
        tcp.set_urgent_ptr(0);
        tcp.set_checksum(0);
    }
    let csum: u16 = checksum::tcp_checksum(ctx.src_ip, ctx.dst_ip, segment);
    segment[16..18].copy_from_slice(&csum.to_be_bytes());

    Ok(buffer)
}

/// Stateless SYN with sequence number 0.
pub fn syn_frame(ctx: &FrameContext, src_port: u16, dst_port: u16) -> Result<Vec<u8>, PacketError> {
    build_tcp_frame(
        ctx,
        &TcpFrameSpec {
            src_port,
            dst_port,
            sequence: 0,
            acknowledgement: 0,
            flags: TcpFlags::SYN,
            window: DEFAULT_WINDOW,
        },
    )
}

/// Unsolicited bare ACK. The acknowledgement number is random; any value
/// draws a RST from a reachable stack.
pub fn ack_frame(ctx: &FrameContext, src_port: u16, dst_port: u16) -> Result<Vec<u8>, PacketError> {
    build_tcp_frame(
        ctx,
        &TcpFrameSpec {
            src_port,
            dst_port,
            sequence: 0,
            acknowledgement: rand::random(),
            flags: TcpFlags::ACK,
            window: DEFAULT_WINDOW,
        },
    )
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
    use crate::MIN_ETH_FRAME_NO_FCS;
    use pnet::ipnetwork::{IpNetwork, Ipv4Network};
    use pnet::packet::Packet;
    use pnet::packet::ethernet::EthernetPacket;
    use pnet::packet::ipv4::{self as pnet_ipv4, Ipv4Packet};
    use pnet::packet::tcp::{self as pnet_tcp, TcpPacket};

    const SRC_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
    const DST_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x02);

    fn ctx() -> FrameContext {
        FrameContext {
            src_mac: SRC_MAC,
            dst_mac: DST_MAC,
            src_ip: Ipv4Addr::new(192, 168, 1, 100),
            dst_ip: Ipv4Addr::new(192, 168, 1, 1),
        }
    }

    fn iface(name: &str, mac: Option<MacAddr>) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index: 2,
            mac,
            ips: vec![IpNetwork::V4(
                Ipv4Network::new(Ipv4Addr::new(192, 168, 1, 100), 24).unwrap(),
            )],
            flags: 1,
        }
    }

    fn decode(frame: &[u8], check: impl Fn(&EthernetPacket, &Ipv4Packet, &TcpPacket)) {
        let eth = EthernetPacket::new(frame).unwrap();
        let ip = Ipv4Packet::new(eth.payload()).unwrap();
        let tcp = TcpPacket::new(ip.payload()).unwrap();
        check(&eth, &ip, &tcp);
    }

    #[test]
    fn syn_frame_layout() {
        let frame = syn_frame(&ctx(), 50_000, 22).unwrap();
        assert_eq!(frame.len(), MIN_ETH_FRAME_NO_FCS);

        decode(&frame, |eth, ip, tcp| {
            assert_eq!(eth.get_source(), SRC_MAC);
            assert_eq!(eth.get_destination(), DST_MAC);
            assert_eq!(eth.get_ethertype(), EtherTypes::Ipv4);

            assert_eq!(ip.get_total_length() as usize, IPV4_HDR_LEN + TCP_HDR_LEN);
            assert_eq!(ip.get_next_level_protocol(), IpNextHeaderProtocols::Tcp);
            assert_eq!(ip.get_checksum(), pnet_ipv4::checksum(ip));

            assert_eq!(tcp.get_source(), 50_000);
            assert_eq!(tcp.get_destination(), 22);
            assert_eq!(tcp.get_sequence(), 0);
            assert_eq!(tcp.get_flags(), TcpFlags::SYN);
            assert_eq!(tcp.get_data_offset(), 5);
            assert_eq!(
                tcp.get_checksum(),
                pnet_tcp::ipv4_checksum(tcp, &ctx().src_ip, &ctx().dst_ip)
            );
        });
    }

    #[test]
    fn ack_frame_sets_only_ack() {
        let frame = ack_frame(&ctx(), 50_001, 443).unwrap();
        decode(&frame, |_, _, tcp| {
            assert_eq!(tcp.get_flags(), TcpFlags::ACK);
            assert_eq!(tcp.get_flags() & (TcpFlags::SYN | TcpFlags::FIN | TcpFlags::RST), 0);
            assert_eq!(tcp.get_destination(), 443);
        });
    }

    #[test]
    fn context_from_interface_uses_interface_mac() {
        let intf = iface("eth0", Some(SRC_MAC));
        let ctx = FrameContext::from_interface(&intf, Ipv4Addr::new(192, 168, 1, 100), DST_MAC, Ipv4Addr::new(192, 168, 1, 1))
            .unwrap();
        assert_eq!(ctx.src_mac, SRC_MAC);
    }

    #[test]
    fn context_rejects_missing_mac_and_unnamed_interface() {
        let no_mac = iface("tun0", None);
        let err = FrameContext::from_interface(&no_mac, Ipv4Addr::LOCALHOST, DST_MAC, Ipv4Addr::LOCALHOST).unwrap_err();
        assert_eq!(err, PacketError::MissingHardwareAddr("tun0".into()));

        let unnamed = iface("", Some(SRC_MAC));
        let err = FrameContext::from_interface(&unnamed, Ipv4Addr::LOCALHOST, DST_MAC, Ipv4Addr::LOCALHOST).unwrap_err();
        assert_eq!(err, PacketError::EmptyInterfaceName);
    }
}
