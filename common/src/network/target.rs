//! # Scan Target Model
//!
//! A [`TargetSpec`] is what the user typed: an IPv4 literal or a host name.
//! A [`Target`] is the same destination after route resolution, carrying the
//! source address and interface every probe of the run shares.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::str::FromStr;
use std::sync::OnceLock;

use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;

use crate::network::route::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub addr: Ipv4Addr,
    /// The name the user gave, when it was not a literal address.
    pub hostname: Option<String>,
}

impl FromStr for TargetSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty target");
        }

        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Ok(Self { addr, hostname: None }),
            Ok(IpAddr::V6(_)) => anyhow::bail!("IPv6 targets are not supported: {s}"),
            Err(_) => {
                let addr: Ipv4Addr = (s, 0)
                    .to_socket_addrs()
                    .map_err(|e| anyhow::anyhow!("could not resolve '{s}': {e}"))?
                    .find_map(|sa| match sa.ip() {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .ok_or_else(|| anyhow::anyhow!("'{s}' has no IPv4 address"))?;
                Ok(Self {
                    addr,
                    hostname: Some(s.to_string()),
                })
            }
        }
    }
}

/// A destination bound to the local route used to reach it.
///
/// Immutable for the duration of a run, except for the hardware address of
/// the next hop which is filled in once, the first time a raw probe needs it.
#[derive(Debug)]
pub struct Target {
    pub addr: Ipv4Addr,
    pub source: Ipv4Addr,
    pub interface: NetworkInterface,
    pub next_hop: Ipv4Addr,
    hw_addr: OnceLock<MacAddr>,
}

impl Target {
    pub fn new(addr: Ipv4Addr, route: Route) -> Self {
        Self {
            addr,
            source: route.source,
            interface: route.interface,
            next_hop: route.next_hop,
            hw_addr: OnceLock::new(),
        }
    }

    /// The resolved link-layer address of the next hop, if known yet.
    pub fn hw_addr(&self) -> Option<MacAddr> {
        self.hw_addr.get().copied()
    }

    /// Records the resolved link-layer address. The first value wins.
    pub fn remember_hw_addr(&self, mac: MacAddr) -> MacAddr {
        *self.hw_addr.get_or_init(|| mac)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_route() -> Route {
        Route {
            source: Ipv4Addr::LOCALHOST,
            interface: NetworkInterface {
                name: "lo".to_string(),
                description: String::new(),
                index: 1,
                mac: Some(MacAddr::zero()),
                ips: vec![],
                flags: 1 | (1 << 3),
            },
            next_hop: Ipv4Addr::LOCALHOST,
        }
    }

    #[test]
    fn parse_ipv4_literal() {
        let spec: TargetSpec = "10.0.0.5".parse().unwrap();
        assert_eq!(spec.addr, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(spec.hostname, None);
    }

    #[test]
    fn parse_rejects_ipv6() {
        let err = "fe80::1".parse::<TargetSpec>().unwrap_err();
        assert!(err.to_string().contains("IPv6 targets are not supported"));
    }

    #[test]
    fn parse_rejects_empty() {
        assert!("   ".parse::<TargetSpec>().is_err());
    }

    #[test]
    fn parse_resolves_localhost_name() {
        let spec: TargetSpec = "localhost".parse().unwrap();
        assert!(spec.addr.is_loopback());
        assert_eq!(spec.hostname.as_deref(), Some("localhost"));
    }

    #[test]
    fn hw_addr_is_set_once() {
        let target = Target::new(Ipv4Addr::LOCALHOST, loopback_route());
        assert_eq!(target.hw_addr(), None);

        let first = MacAddr::new(1, 2, 3, 4, 5, 6);
        let second = MacAddr::new(6, 5, 4, 3, 2, 1);
        assert_eq!(target.remember_hw_addr(first), first);
        assert_eq!(target.remember_hw_addr(second), first);
        assert_eq!(target.hw_addr(), Some(first));
    }
}
