use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::util::MacAddr;

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    /// Whether `addr` lies inside one of the interface's IPv4 subnets.
    fn contains_v4(&self, addr: Ipv4Addr) -> bool;
    /// The interface's hardware address, if it has a usable one.
    fn hardware_addr(&self) -> Option<MacAddr>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn contains_v4(&self, addr: Ipv4Addr) -> bool {
        self.get_ipv4_nets().iter().any(|net| net.contains(addr))
    }

    fn hardware_addr(&self) -> Option<MacAddr> {
        // Loopback legitimately carries the all-zero address.
        match self.mac {
            Some(mac) if mac != MacAddr::zero() || self.is_loopback() => Some(mac),
            _ => None,
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
