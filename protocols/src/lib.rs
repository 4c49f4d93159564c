//! Wire formats: frame builders, checksums, the inbound frame parser, capture
//! filters and the UDP payload table.

pub mod arp;
pub mod checksum;
pub mod dns;
pub mod error;
pub mod ethernet;
pub mod filter;
pub mod frame;
pub mod ipv4;
pub mod payloads;
pub mod tcp;

pub use error::PacketError;

pub const ETH_HDR_LEN: usize = 14;
pub const IPV4_HDR_LEN: usize = 20;
pub const TCP_HDR_LEN: usize = 20;
pub const ARP_LEN: usize = 28;
/// Shortest Ethernet frame on the wire, excluding the FCS the NIC appends.
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;

/// Allocates a zeroed frame buffer of at least the Ethernet minimum size.
pub(crate) fn frame_buffer(len: usize) -> Vec<u8> {
    vec![0u8; len.max(MIN_ETH_FRAME_NO_FCS)]
}
