use std::net::Ipv4Addr;

use crate::error::ScanError;
use crate::network::route::Route;

/// What a scan needs to know about the machine it runs on.
pub trait SystemRepository: Send + Sync {
    /// Source address, interface and next hop towards `dest`.
    fn resolve_route(&self, dest: Ipv4Addr) -> Result<Route, ScanError>;

    /// How many probes may hold operating system resources at once.
    fn max_concurrency(&self) -> Result<usize, ScanError>;

    /// Whether the process may open raw link-layer sockets.
    fn has_raw_socket_capability(&self) -> bool;
}
