use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, PacketError, ethernet};

/// Broadcast "who has `target_addr`" frame, padded to the Ethernet minimum.
pub fn build_arp_request(src_mac: MacAddr, src_addr: Ipv4Addr, target_addr: Ipv4Addr) -> Result<Vec<u8>, PacketError> {
    let mut buffer: Vec<u8> = crate::frame_buffer(ETH_HDR_LEN + ARP_LEN);
    ethernet::make_header(&mut buffer[..ETH_HDR_LEN], src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    request_payload(&mut buffer, src_mac, src_addr, target_addr)?;
    Ok(buffer)
}

pub fn request_payload(
    buffer: &mut [u8],
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    target_addr: Ipv4Addr,
) -> Result<(), PacketError> {
    if ETH_HDR_LEN + ARP_LEN > buffer.len() {
        return Err(PacketError::ArpBuffer);
    }
    let mut arp: MutableArpPacket =
        MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN]).ok_or(PacketError::ArpBuffer)?;
    arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp.set_protocol_type(EtherTypes::Ipv4);
    arp.set_hw_addr_len(6);
    arp.set_proto_addr_len(4);
    arp.set_operation(ArpOperations::Request);
    arp.set_sender_hw_addr(src_mac);
    arp.set_target_hw_addr(MacAddr::zero());
    arp.set_sender_proto_addr(src_addr);
    arp.set_target_proto_addr(target_addr);
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
