use std::net::Ipv4Addr;
use std::process::Command;

use is_root::is_root;

use portr_common::error::ScanError;
use portr_common::network::route::{self, Route};
use portr_common::system::SystemRepository;

/// Descriptors kept back for the runtime, logging and the capture channel.
const FD_RESERVE: usize = 16;
/// Stand-in when the shell reports no descriptor limit.
const UNLIMITED_FDS: usize = 4096;
const CAP_NET_RAW: u32 = 13;

pub struct SystemRepo;

impl SystemRepository for SystemRepo {
    fn resolve_route(&self, dest: Ipv4Addr) -> Result<Route, ScanError> {
        route::resolve(dest)
    }

    fn max_concurrency(&self) -> Result<usize, ScanError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg("ulimit -n")
            .output()
            .map_err(|e| ScanError::ResourceLimit(format!("running ulimit: {e}")))?;

        if !output.status.success() {
            return Err(ScanError::ResourceLimit(format!("ulimit exited with {}", output.status)));
        }
        parse_ulimit(&String::from_utf8_lossy(&output.stdout))
    }

    fn has_raw_socket_capability(&self) -> bool {
        if is_root() {
            return true;
        }
        #[cfg(target_os = "linux")]
        {
            std::fs::read_to_string("/proc/self/status")
                .map(|status| cap_eff_has_net_raw(&status))
                .unwrap_or(false)
        }
        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    }
}

/// Turns `ulimit -n` output into the number of sockets a run may hold open.
pub fn parse_ulimit(raw: &str) -> Result<usize, ScanError> {
    let raw: &str = raw.trim();
    let limit: usize = if raw == "unlimited" {
        UNLIMITED_FDS
    } else {
        raw.parse()
            .map_err(|_| ScanError::ResourceLimit(format!("unreadable descriptor limit '{raw}'")))?
    };

    match limit.checked_sub(FD_RESERVE) {
        Some(usable) if usable > 0 => Ok(usable),
        _ => Err(ScanError::ResourceLimit(format!(
            "descriptor limit {limit} leaves nothing for probes"
        ))),
    }
}

fn cap_eff_has_net_raw(status: &str) -> bool {
    status
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|mask| u64::from_str_radix(mask.trim(), 16).ok())
        .is_some_and(|mask| mask & (1 << CAP_NET_RAW) != 0)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
