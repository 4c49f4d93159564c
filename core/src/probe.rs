//! # Probe Engine
//!
//! One entry point, [`ProbeEngine::probe`], dispatching on the closed set of
//! strategies. Raw strategies (SYN, ACK) run on a blocking thread with their
//! own transport handle; connect and UDP probes use the async socket API.

use std::net::Ipv4Addr;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pnet::util::MacAddr;
use tokio::sync::OnceCell;

use portr_common::config::Timings;
use portr_common::error::ScanError;
use portr_common::network::interface::NetworkInterfaceExtension;
use portr_common::network::target::Target;
use portr_common::scan::{PortState, ScanJob, Strategy};
use portr_protocols::payloads::PayloadTable;
use portr_protocols::tcp::FrameContext;

use crate::network::arp;
use crate::network::transport::{DatalinkFactory, RawTransport, TransportFactory};

pub mod ack;
pub mod syn;
pub mod tcp;
pub mod udp;

/// What a single probe attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Settled(PortState),
    /// Nothing came back. What that means is up to the fallback chain.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub outcome: Outcome,
    pub evidence: String,
}

impl Probe {
    pub fn settled(state: PortState, evidence: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Settled(state),
            evidence: evidence.into(),
        }
    }

    pub fn silent(evidence: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Silent,
            evidence: evidence.into(),
        }
    }

    pub fn failed(err: &ScanError) -> Self {
        let reason: String = err.to_string();
        Self {
            outcome: Outcome::Settled(PortState::Error(reason.clone())),
            evidence: reason,
        }
    }
}

#[async_trait]
pub trait ProbeEngine: Send + Sync {
    async fn probe(&self, job: &ScanJob) -> Probe;

    /// Whether `strategy` can run at all in this process.
    fn supports(&self, _strategy: Strategy) -> bool {
        true
    }
}

/// Per-probe state of a raw SYN or ACK exchange.
#[derive(Debug, Clone, Copy)]
pub struct RawSession {
    pub ctx: FrameContext,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Hands out source ports from the dynamic range, round robin from a random
/// start. A port stays out of rotation while its [`PortLease`] is alive, so
/// probes in flight never share one, however long they wait.
#[derive(Debug)]
pub struct EphemeralPorts {
    next: AtomicUsize,
    leased: Arc<Mutex<HashSet<u16>>>,
}

impl EphemeralPorts {
    pub const FIRST: u16 = 49_152;
    pub const SPAN: usize = (u16::MAX - Self::FIRST) as usize + 1;

    pub fn new() -> Self {
        Self::starting_at(rand::random_range(0..Self::SPAN))
    }

    pub fn starting_at(offset: usize) -> Self {
        Self {
            next: AtomicUsize::new(offset),
            leased: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The next port not held by a live lease, or `None` when every port in
    /// the range is taken.
    pub fn lease(&self) -> Option<PortLease> {
        let mut leased = self.leased.lock().unwrap_or_else(PoisonError::into_inner);
        if leased.len() >= Self::SPAN {
            return None;
        }
        loop {
            let n: usize = self.next.fetch_add(1, Ordering::Relaxed) % Self::SPAN;
            let port: u16 = Self::FIRST + n as u16;
            if leased.insert(port) {
                return Some(PortLease {
                    port,
                    leased: Arc::clone(&self.leased),
                });
            }
        }
    }
}

impl Default for EphemeralPorts {
    fn default() -> Self {
        Self::new()
    }
}

/// A source port reserved for one probe. Dropping it returns the port.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    leased: Arc<Mutex<HashSet<u16>>>,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.port);
    }
}

type RawRun = fn(&mut dyn RawTransport, &RawSession, Duration) -> Probe;

/// The production engine: crafted frames for SYN/ACK, sockets for the rest.
pub struct StrategyEngine {
    factory: Arc<dyn TransportFactory>,
    payloads: PayloadTable,
    timings: Timings,
    ports: EphemeralPorts,
    raw_capable: bool,
    link: OnceCell<Result<MacAddr, ScanError>>,
}

impl StrategyEngine {
    pub fn new(factory: Arc<dyn TransportFactory>, payloads: PayloadTable, timings: Timings, raw_capable: bool) -> Self {
        Self {
            factory,
            payloads,
            timings,
            ports: EphemeralPorts::new(),
            raw_capable,
            link: OnceCell::new(),
        }
    }

    /// Engine capturing on the interface that routes to `target`.
    pub fn for_target(target: &Target, payloads: PayloadTable, timings: Timings, raw_capable: bool) -> Self {
        let factory = DatalinkFactory::new(target.interface.clone(), timings.capture_poll);
        Self::new(Arc::new(factory), payloads, timings, raw_capable)
    }

    /// Hardware address of the next hop towards `target`, resolved at most
    /// once per engine and shared by every raw probe.
    pub async fn link_addr(&self, target: &Arc<Target>) -> Result<MacAddr, ScanError> {
        if let Some(mac) = target.hw_addr() {
            return Ok(mac);
        }
        let resolved: Result<MacAddr, ScanError> = self.link.get_or_init(|| self.resolve_link(target)).await.clone();
        resolved.map(|mac| target.remember_hw_addr(mac))
    }

    async fn resolve_link(&self, target: &Arc<Target>) -> Result<MacAddr, ScanError> {
        if target.interface.is_loopback() {
            return Ok(MacAddr::zero());
        }
        let source_mac: MacAddr = target.interface.hardware_addr().ok_or_else(|| {
            ScanError::Construction(format!("interface {} has no usable hardware address", target.interface.name))
        })?;

        let factory: Arc<dyn TransportFactory> = Arc::clone(&self.factory);
        let (source, next_hop): (Ipv4Addr, Ipv4Addr) = (target.source, target.next_hop);
        let timeout: Duration = self.timings.arp;

        tokio::task::spawn_blocking(move || {
            let mut transport: Box<dyn RawTransport> = factory.open()?;
            arp::resolve_mac(transport.as_mut(), source_mac, source, next_hop, timeout)
        })
        .await
        .map_err(|e| ScanError::Transport(format!("arp task failed: {e}")))?
    }

    async fn raw_probe(&self, job: &ScanJob, run: RawRun, timeout: Duration) -> Probe {
        if !self.raw_capable {
            return Probe::failed(&ScanError::Privilege(job.strategy));
        }
        let dst_mac: MacAddr = match self.link_addr(&job.target).await {
            Ok(mac) => mac,
            Err(e) => return Probe::failed(&e),
        };
        let target: &Target = &job.target;
        let ctx: FrameContext = match FrameContext::from_interface(&target.interface, target.source, dst_mac, target.addr) {
            Ok(ctx) => ctx,
            Err(e) => return Probe::failed(&ScanError::from(e)),
        };
        let Some(lease) = self.ports.lease() else {
            return Probe::failed(&ScanError::ResourceExhaustion("no free ephemeral source port".to_string()));
        };
        let session = RawSession {
            ctx,
            src_port: lease.port(),
            dst_port: job.port,
        };

        let factory: Arc<dyn TransportFactory> = Arc::clone(&self.factory);
        tokio::task::spawn_blocking(move || {
            let _lease: PortLease = lease;
            match factory.open() {
                Ok(mut transport) => run(transport.as_mut(), &session, timeout),
                Err(e) => Probe::failed(&e),
            }
        })
        .await
        .unwrap_or_else(|e| Probe::failed(&ScanError::Transport(format!("probe task failed: {e}"))))
    }
}

#[async_trait]
impl ProbeEngine for StrategyEngine {
    async fn probe(&self, job: &ScanJob) -> Probe {
        match job.strategy {
            Strategy::Syn => self.raw_probe(job, syn::run, self.timings.syn).await,
            Strategy::Ack => self.raw_probe(job, ack::run, self.timings.ack).await,
            Strategy::TcpConnect => tcp::probe(job.target.addr, job.port, &self.timings).await,
            Strategy::Udp => udp::probe(job.target.addr, job.port, self.payloads.for_port(job.port), &self.timings).await,
        }
    }

    fn supports(&self, strategy: Strategy) -> bool {
        !strategy.requires_raw_socket() || self.raw_capable
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
