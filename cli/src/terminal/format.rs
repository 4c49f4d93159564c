use std::net::Ipv4Addr;

use colored::*;
use pnet::util::MacAddr;
use portr_common::scan::PortState;
use portr_core::aggregator::Summary;

use crate::terminal::colors;

pub fn state(state: &PortState) -> ColoredString {
    let color: Color = match state {
        PortState::Open => colors::OPEN,
        PortState::Closed => colors::CLOSED,
        PortState::Filtered => colors::FILTERED,
        PortState::OpenOrFiltered | PortState::Unfiltered => colors::AMBIGUOUS,
        PortState::Error(_) => colors::ERROR,
    };
    let label: ColoredString = state.label().color(color);
    if *state == PortState::Open { label.bold() } else { label }
}

/// Keeps the last octet so results stay distinguishable.
pub fn addr(addr: Ipv4Addr, redact: bool) -> String {
    if redact {
        format!("x.x.x.{}", addr.octets()[3])
    } else {
        addr.to_string()
    }
}

/// Keeps the vendor half of the address.
pub fn mac(mac: MacAddr, redact: bool) -> String {
    if redact {
        format!("{:02x}:{:02x}:{:02x}:xx:xx:xx", mac.0, mac.1, mac.2)
    } else {
        mac.to_string()
    }
}

pub fn summary(summary: &Summary) -> String {
    let counts: Vec<String> = summary
        .entries()
        .into_iter()
        .map(|(label, count)| format!("{count} {label}"))
        .collect();

    if counts.is_empty() {
        "0 ports scanned".to_string()
    } else {
        format!("{} ports scanned: {}", summary.total(), counts.join(", "))
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
