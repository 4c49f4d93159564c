//! # Result Aggregator
//!
//! Collects one [`ScanResult`] per port for a run, in the order they arrive.

use std::collections::HashSet;
use std::fmt::Write;

use portr_common::scan::{PortState, ScanResult};

#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<ScanResult>,
    seen: HashSet<u16>,
}

/// Count of ports per state, in a fixed display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub open_or_filtered: usize,
    pub unfiltered: usize,
    pub error: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.open + self.closed + self.filtered + self.open_or_filtered + self.unfiltered + self.error
    }

    /// Non-zero `(label, count)` pairs.
    pub fn entries(&self) -> Vec<(&'static str, usize)> {
        [
            (PortState::Open.label(), self.open),
            (PortState::Closed.label(), self.closed),
            (PortState::Filtered.label(), self.filtered),
            (PortState::OpenOrFiltered.label(), self.open_or_filtered),
            (PortState::Unfiltered.label(), self.unfiltered),
            ("error", self.error),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

impl ResultAggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Accepts `result` unless its port already has one. Returns whether it
    /// was recorded.
    pub fn record(&mut self, result: ScanResult) -> bool {
        if !self.seen.insert(result.port) {
            return false;
        }
        self.results.push(result);
        true
    }

    pub fn contains(&self, port: u16) -> bool {
        self.seen.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in &self.results {
            match result.state {
                PortState::Open => summary.open += 1,
                PortState::Closed => summary.closed += 1,
                PortState::Filtered => summary.filtered += 1,
                PortState::OpenOrFiltered => summary.open_or_filtered += 1,
                PortState::Unfiltered => summary.unfiltered += 1,
                PortState::Error(_) => summary.error += 1,
            }
        }
        summary
    }

    /// Plain text, one line per port in arrival order: `port/proto state evidence`.
    pub fn render(&self, proto: &str) -> String {
        let mut out = String::new();
        for result in &self.results {
            let port = format!("{}/{proto}", result.port);
            let _ = writeln!(out, "{port:<10} {:<14} {}", result.state.label(), result.evidence);
        }
        out
    }

    pub fn into_results(self) -> Vec<ScanResult> {
        self.results
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
