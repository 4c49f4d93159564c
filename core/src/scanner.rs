//! # Scan Orchestration
//!
//! [`PortScanner`] fans a port list out into one task per port, at most
//! `concurrency` of them probing at a time, and funnels their results through
//! a single channel into a [`ResultAggregator`]. [`perform_scan`] wraps it
//! with the run-level preconditions: privilege, route and resource limits.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use pnet::util::MacAddr;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use portr_common::config::ScanConfig;
use portr_common::error::ScanError;
use portr_common::network::ports::PortList;
use portr_common::network::route::Route;
use portr_common::network::target::Target;
use portr_common::scan::{ScanResult, Strategy};
use portr_common::system::SystemRepository;
use portr_common::{info, warn};
use portr_protocols::payloads::PayloadTable;

use crate::aggregator::ResultAggregator;
use crate::probe::{EphemeralPorts, ProbeEngine, StrategyEngine};

pub mod chain;

pub struct PortScanner<E: ProbeEngine + 'static> {
    engine: Arc<E>,
    concurrency: usize,
    cancel: Arc<AtomicBool>,
}

impl<E: ProbeEngine + 'static> PortScanner<E> {
    pub fn new(engine: Arc<E>, concurrency: usize) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Once set, ports not yet started are reported as cancelled. Probes
    /// already in flight run to completion.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scans every port in `ports` and returns exactly one result per port.
    /// `on_result` sees each result as it arrives.
    pub async fn run<F>(&self, target: Arc<Target>, ports: &PortList, strategy: Strategy, mut on_result: F) -> ResultAggregator
    where
        F: FnMut(&ScanResult),
    {
        let ports: Vec<u16> = ports.as_slice().to_vec();
        let slots: usize = self.concurrency.min(ports.len()).max(1);
        let semaphore: Arc<Semaphore> = Arc::new(Semaphore::new(slots));
        let (tx, mut rx) = mpsc::unbounded_channel::<ScanResult>();

        tracing::debug!(ports = ports.len(), slots, %strategy, "dispatching");
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&self.engine),
            target,
            ports.clone(),
            strategy,
            semaphore,
            Arc::clone(&self.cancel),
            tx,
        ));

        let mut aggregator = ResultAggregator::with_capacity(ports.len());
        while let Some(result) = rx.recv().await {
            on_result(&result);
            if !aggregator.record(result) {
                warn!("dropping duplicate result");
            }
        }
        if let Err(e) = dispatcher.await {
            tracing::error!("dispatcher failed: {e}");
        }

        for port in ports {
            if !aggregator.contains(port) {
                let result = ScanResult::error(port, "probe task lost");
                on_result(&result);
                aggregator.record(result);
            }
        }
        aggregator
    }
}

async fn dispatch<E: ProbeEngine + 'static>(
    engine: Arc<E>,
    target: Arc<Target>,
    ports: Vec<u16>,
    strategy: Strategy,
    semaphore: Arc<Semaphore>,
    cancel: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<ScanResult>,
) {
    let mut tasks: JoinSet<()> = JoinSet::new();

    for port in ports {
        if cancel.load(Ordering::SeqCst) {
            let _ = tx.send(ScanResult::error(port, "cancelled before dispatch"));
            continue;
        }
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let _ = tx.send(ScanResult::error(port, "scheduler closed"));
                continue;
            }
        };
        // Waiting for a slot can take a while; look again.
        if cancel.load(Ordering::SeqCst) {
            let _ = tx.send(ScanResult::error(port, "cancelled before dispatch"));
            continue;
        }

        let (engine, target, tx) = (Arc::clone(&engine), Arc::clone(&target), tx.clone());
        tasks.spawn(async move {
            let _permit = permit;
            let probe = tokio::spawn(async move { chain::resolve_port(engine.as_ref(), target, port, strategy).await });
            let result: ScanResult = match probe.await {
                Ok(result) => result,
                Err(e) => ScanResult::error(port, format!("probe task failed: {e}")),
            };
            let _ = tx.send(result);
        });
    }

    while tasks.join_next().await.is_some() {}
}

/// What the caller asks for.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub addr: Ipv4Addr,
    pub ports: PortList,
    pub strategy: Strategy,
}

pub struct ScanReport {
    pub target: Arc<Target>,
    pub strategy: Strategy,
    pub results: ResultAggregator,
    pub elapsed: Duration,
    /// Hardware address of the next hop, when a raw strategy resolved it.
    pub link_addr: Option<MacAddr>,
    pub concurrency: usize,
}

/// Workers never exceed the port count, the descriptor budget, the user's
/// cap, or the number of distinct ephemeral ports.
pub fn worker_bound(ports: usize, ceiling: usize, max_parallel: Option<usize>) -> usize {
    ports
        .min(ceiling)
        .min(max_parallel.unwrap_or(usize::MAX))
        .min(EphemeralPorts::SPAN)
        .max(1)
}

/// Checks the run-level preconditions, then scans. Errors returned here are
/// [`ScanError`]s (wrapped in `anyhow`) raised before any port is probed.
pub async fn perform_scan<F>(
    request: &ScanRequest,
    cfg: &ScanConfig,
    system: &dyn SystemRepository,
    cancel: Arc<AtomicBool>,
    on_result: F,
) -> anyhow::Result<ScanReport>
where
    F: FnMut(&ScanResult),
{
    let started: Instant = Instant::now();
    let strategy: Strategy = request.strategy;
    let raw_capable: bool = system.has_raw_socket_capability();

    if strategy.requires_raw_socket() && !raw_capable {
        return Err(ScanError::Privilege(strategy).into());
    }
    let route: Route = system.resolve_route(request.addr)?;
    let ceiling: usize = system.max_concurrency()?;

    let target: Arc<Target> = Arc::new(Target::new(request.addr, route));
    info!(
        "Scanning {} from {} on {} ({} ports, {strategy})",
        target.addr,
        target.source,
        target.interface.name,
        request.ports.len()
    );

    let engine = Arc::new(StrategyEngine::for_target(
        &target,
        PayloadTable::standard()?,
        cfg.timings,
        raw_capable,
    ));

    let link_addr: Option<MacAddr> = if strategy.requires_raw_socket() {
        match engine.link_addr(&target).await {
            Ok(mac) => Some(mac),
            Err(e) => {
                warn!("Could not resolve the link address of {}: {e}", target.next_hop);
                None
            }
        }
    } else {
        None
    };

    let concurrency: usize = worker_bound(request.ports.len(), ceiling, cfg.max_parallel);
    let scanner = PortScanner::new(engine, concurrency).with_cancel(cancel);
    let results = scanner
        .run(Arc::clone(&target), &request.ports, strategy, on_result)
        .await;

    Ok(ScanReport {
        target,
        strategy,
        results,
        elapsed: started.elapsed(),
        link_addr,
        concurrency,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
