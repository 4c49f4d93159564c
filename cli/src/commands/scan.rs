use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use portr_common::config::{Config, ScanConfig, Timings};
use portr_common::error::ScanError;
use portr_common::scan::{PortState, ScanResult, Strategy};
use portr_common::system::SystemRepository;
use portr_common::vendors::VendorRepository;
use portr_common::{info, success, warn};
use portr_core::scanner::{self, ScanReport, ScanRequest};
use portr_core::system::SystemRepo;
use portr_core::vendors::MacOuiRepo;
use tracing::{Instrument, Span};

use crate::commands::ScanArgs;
use crate::terminal::{format, print, spinner};

pub async fn scan(args: ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    let system = SystemRepo;
    let strategy: Strategy = args.strategy.unwrap_or_else(|| default_strategy(&system));
    let scan_cfg: ScanConfig = scan_config(&args);

    let request = ScanRequest {
        addr: args.target.addr,
        ports: args.ports,
        strategy,
    };

    if cfg.quiet == 0 {
        let shown: String = format::addr(request.addr, cfg.redact);
        match &args.target.hostname {
            Some(name) => print::aligned_line("Target", format!("{shown} ({name})")),
            None => print::aligned_line("Target", shown),
        }
        print::aligned_line("Ports", request.ports.len().to_string());
        print::aligned_line("Scan type", strategy.to_string());
    }

    let cancel: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(Arc::clone(&cancel));

    let attended: bool = cfg.quiet == 0 && console::Term::stdout().is_term();
    let progress: Span = spinner::scan_progress(request.ports.len(), attended);
    let proto: &'static str = strategy.transport_label();
    let mut open: usize = 0;

    let outcome = scanner::perform_scan(&request, &scan_cfg, &system, cancel, |result: &ScanResult| {
        if result.state == PortState::Open {
            open += 1;
        }
        spinner::advance(&progress, open);
        if attended || cfg.quiet >= 2 {
            print::result_line(result, proto, cfg.quiet);
        }
    })
    .instrument(progress.clone())
    .await;

    let report: ScanReport = match outcome {
        Ok(report) => report,
        Err(e) => return Err(explain(e)),
    };

    if !attended && cfg.quiet < 2 {
        print::raw(report.results.render(proto).trim_end());
    }
    summarize(&report, cfg);
    Ok(())
}

fn default_strategy(system: &dyn SystemRepository) -> Strategy {
    if system.has_raw_socket_capability() {
        Strategy::Syn
    } else {
        info!("No raw socket capability, falling back to a connect scan");
        Strategy::TcpConnect
    }
}

fn scan_config(args: &ScanArgs) -> ScanConfig {
    let mut timings: Timings = Timings::default();
    if let Some(ms) = args.timeout {
        timings.syn = Duration::from_millis(ms);
        timings.ack = Duration::from_millis(ms);
    }
    if let Some(ms) = args.connect_timeout {
        timings.connect = Duration::from_millis(ms);
    }
    if let Some(ms) = args.banner_timeout {
        timings.banner = Duration::from_millis(ms);
    }
    if let Some(ms) = args.arp_timeout {
        timings.arp = Duration::from_millis(ms);
    }
    ScanConfig {
        timings,
        max_parallel: args.max_parallel,
    }
}

fn spawn_interrupt_handler(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for probes in flight");
            cancel.store(true, Ordering::SeqCst);
        }
    });
}

fn explain(err: anyhow::Error) -> anyhow::Error {
    let hint: String = match err.downcast_ref::<ScanError>() {
        Some(ScanError::Privilege(strategy)) => {
            format!("cannot run a {strategy} scan here; try a connect scan with '-s tcp'")
        }
        Some(ScanError::Routing(_)) => "target is unreachable from this host".to_string(),
        Some(ScanError::ResourceLimit(_)) => "could not size the worker pool".to_string(),
        _ => "scan failed".to_string(),
    };
    err.context(hint)
}

fn summarize(report: &ScanReport, cfg: &Config) {
    if cfg.quiet >= 2 {
        return;
    }
    if let Some(mac) = report.link_addr.filter(|_| cfg.quiet == 0) {
        let vendor: Option<String> = MacOuiRepo.get_vendor(mac);
        let mac: String = format::mac(mac, cfg.redact);
        match vendor {
            Some(vendor) => print::aligned_line("Next hop", format!("{mac} ({vendor})")),
            None => print::aligned_line("Next hop", mac),
        }
    }

    let summary = report.results.summary();
    print::fat_separator();
    let line: String = format::summary(&summary);
    if summary.open > 0 {
        success!("{line} in {:.2?}", report.elapsed);
    } else {
        info!("{line} in {:.2?}", report.elapsed);
    }
    tracing::debug!(workers = report.concurrency, target = %report.target.addr, "scan finished");
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
