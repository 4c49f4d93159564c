use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{Ipv4Flags, MutableIpv4Packet};

use crate::checksum;
use crate::{IPV4_HDR_LEN, PacketError};

pub const DEFAULT_TTL: u8 = 64;

/// Writes a 20 byte IPv4 header (no options) at the start of `buf`.
pub fn write_header(
    buf: &mut [u8],
    payload_len: usize,
    protocol: IpNextHeaderProtocol,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
) -> Result<(), PacketError> {
    if buf.len() < IPV4_HDR_LEN {
        return Err(PacketError::Ipv4Buffer);
    }
    let mut ipv4: MutableIpv4Packet =
        MutableIpv4Packet::new(&mut buf[..IPV4_HDR_LEN]).ok_or(PacketError::Ipv4Buffer)?;
    ipv4.set_version(4);
    ipv4.set_header_length(5);
    ipv4.set_dscp(0);
    ipv4.set_ecn(0);
    ipv4.set_total_length((IPV4_HDR_LEN + payload_len) as u16);
    ipv4.set_identification(rand::random());
    ipv4.set_flags(Ipv4Flags::DontFragment);
    ipv4.set_fragment_offset(0);
    ipv4.set_ttl(DEFAULT_TTL);
    ipv4.set_next_level_protocol(protocol);
    ipv4.set_source(src_addr);
    ipv4.set_destination(dst_addr);
    ipv4.set_checksum(0);

    let csum: u16 = checksum::ipv4_header_checksum(&buf[..IPV4_HDR_LEN]);
    buf[10..12].copy_from_slice(&csum.to_be_bytes());
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
