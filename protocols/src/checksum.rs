//! # Internet Checksum
//!
//! RFC 1071 one's complement sum, plus the two places it is applied when
//! building probes: the IPv4 header and the TCP segment with its pseudo-header.

use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocols;

/// Offset of the checksum word inside an IPv4 header.
const IPV4_CHECKSUM_OFFSET: usize = 10;
/// Offset of the checksum word inside a TCP header.
const TCP_CHECKSUM_OFFSET: usize = 16;

/// One's complement of the one's complement sum of `data` as big-endian words.
/// An odd trailing byte is padded with a zero low byte.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !fold(sum_words(data, 0))
}

/// Checksum of an IPv4 header. The checksum field itself is treated as zero,
/// so the result can be computed on a header that already carries one.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    !fold(sum_skipping(header, IPV4_CHECKSUM_OFFSET))
}

/// Checksum of a TCP segment (header and payload) over the IPv4 pseudo-header.
/// The segment's checksum field is treated as zero.
pub fn tcp_checksum(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> u16 {
    let mut sum: u64 = pseudo_header_sum(src, dst, IpNextHeaderProtocols::Tcp.0, segment.len());
    sum += sum_skipping(segment, TCP_CHECKSUM_OFFSET);
    !fold(sum)
}

fn pseudo_header_sum(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, len: usize) -> u64 {
    let mut pseudo: [u8; 12] = [0u8; 12];
    pseudo[0..4].copy_from_slice(&src.octets());
    pseudo[4..8].copy_from_slice(&dst.octets());
    pseudo[9] = protocol;
    pseudo[10..12].copy_from_slice(&(len as u16).to_be_bytes());
    sum_words(&pseudo, 0)
}

// `offset` is even, so both halves stay word aligned.
fn sum_skipping(data: &[u8], offset: usize) -> u64 {
    if data.len() < offset + 2 {
        return sum_words(data, 0);
    }
    sum_words(&data[offset + 2..], sum_words(&data[..offset], 0))
}

fn sum_words(data: &[u8], initial: u64) -> u64 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u64 = initial;
    for word in &mut chunks {
        sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u64::from(*last) << 8;
    }
    sum
}

fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    sum as u16
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
