//! Local routing lookups: which source address and interface the kernel would
//! use to reach a destination, and which neighbour the first hop goes to.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use pnet::datalink::{self, NetworkInterface};

use crate::error::ScanError;
use crate::network::interface::NetworkInterfaceExtension;

/// Everything needed to address frames towards a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub source: Ipv4Addr,
    pub interface: NetworkInterface,
    /// The neighbour whose hardware address goes in the Ethernet header:
    /// the destination itself when on-link, otherwise the gateway.
    pub next_hop: Ipv4Addr,
}

/// Resolves the route to `dest` using the host's interfaces and routing table.
pub fn resolve(dest: Ipv4Addr) -> Result<Route, ScanError> {
    let source: Ipv4Addr = route_source_ip(dest)
        .ok_or_else(|| ScanError::Routing(format!("{dest}: kernel selected no source address")))?;

    let interfaces: Vec<NetworkInterface> = datalink::interfaces();
    let interface: NetworkInterface = interface_for_source(&interfaces, source)
        .ok_or_else(|| ScanError::Routing(format!("{dest}: no interface owns {source}")))?;

    let next_hop: Ipv4Addr = if interface.is_loopback() || interface.contains_v4(dest) {
        dest
    } else {
        gateway_for(&interface.name, dest).unwrap_or(dest)
    };

    Ok(Route {
        source,
        interface,
        next_hop,
    })
}

/// Asks the kernel for the source address by "connecting" a UDP socket.
/// No datagram is sent.
fn route_source_ip(dest: Ipv4Addr) -> Option<Ipv4Addr> {
    let socket: UdpSocket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((dest, 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() => Some(v4),
        _ => None,
    }
}

fn interface_for_source(interfaces: &[NetworkInterface], source: Ipv4Addr) -> Option<NetworkInterface> {
    interfaces
        .iter()
        .find(|iface| iface.is_up() && iface.get_ipv4_nets().iter().any(|net| net.ip() == source))
        .cloned()
}

#[cfg(target_os = "linux")]
fn gateway_for(interface: &str, dest: Ipv4Addr) -> Option<Ipv4Addr> {
    let table: String = std::fs::read_to_string("/proc/net/route").ok()?;
    select_gateway(&table, interface, dest)
}

#[cfg(not(target_os = "linux"))]
fn gateway_for(_interface: &str, _dest: Ipv4Addr) -> Option<Ipv4Addr> {
    None
}

const RTF_UP: u16 = 0x0001;
const RTF_GATEWAY: u16 = 0x0002;

/// Picks the gateway of the most specific matching route in a
/// `/proc/net/route` table. `None` means the destination is on-link.
pub fn select_gateway(table: &str, interface: &str, dest: Ipv4Addr) -> Option<Ipv4Addr> {
    let dest_bits: u32 = u32::from(dest);

    table
        .lines()
        .skip(1)
        .filter_map(parse_route_line)
        .filter(|entry| entry.interface == interface && entry.flags & RTF_UP != 0)
        .filter(|entry| dest_bits & entry.mask == entry.destination & entry.mask)
        .max_by_key(|entry| entry.mask.count_ones())
        .filter(|entry| entry.flags & RTF_GATEWAY != 0)
        .map(|entry| Ipv4Addr::from(entry.gateway))
}

struct RouteEntry<'a> {
    interface: &'a str,
    destination: u32,
    gateway: u32,
    flags: u16,
    mask: u32,
}

fn parse_route_line(line: &str) -> Option<RouteEntry<'_>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 8 {
        return None;
    }
    Some(RouteEntry {
        interface: fields[0],
        destination: parse_kernel_addr(fields[1])?,
        gateway: parse_kernel_addr(fields[2])?,
        flags: u16::from_str_radix(fields[3], 16).ok()?,
        mask: parse_kernel_addr(fields[7])?,
    })
}

// The kernel prints the raw network-order word as a host-order integer.
fn parse_kernel_addr(field: &str) -> Option<u32> {
    let raw: u32 = u32::from_str_radix(field, 16).ok()?;
    Some(u32::from_be_bytes(raw.to_ne_bytes()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
