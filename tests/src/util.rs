use std::net::Ipv4Addr;

use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use portr_common::error::ScanError;
use portr_common::network::route::Route;
use portr_common::system::SystemRepository;

const IFF_UP: u32 = 1;
const IFF_LOOPBACK: u32 = 1 << 3;

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn loopback() -> NetworkInterface {
    ni("lo", 1, Some(MacAddr::zero()), &[v4(127, 0, 0, 1, 8)], IFF_UP | IFF_LOOPBACK)
}

/// Routes only 127.0.0.0/8 and never grants raw sockets.
pub struct LoopbackSystem {
    pub raw_capable: bool,
    pub ceiling: Result<usize, ScanError>,
}

impl Default for LoopbackSystem {
    fn default() -> Self {
        Self {
            raw_capable: false,
            ceiling: Ok(256),
        }
    }
}

impl SystemRepository for LoopbackSystem {
    fn resolve_route(&self, dest: Ipv4Addr) -> Result<Route, ScanError> {
        if !dest.is_loopback() {
            return Err(ScanError::Routing(format!("{dest}: no route in test system")));
        }
        Ok(Route {
            source: Ipv4Addr::LOCALHOST,
            interface: loopback(),
            next_hop: dest,
        })
    }

    fn max_concurrency(&self) -> Result<usize, ScanError> {
        self.ceiling.clone()
    }

    fn has_raw_socket_capability(&self) -> bool {
        self.raw_capable
    }
}
