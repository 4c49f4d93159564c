use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use portr_common::config::ScanConfig;
use portr_common::error::ScanError;
use portr_common::network::ports::PortList;
use portr_common::scan::{PortState, ScanResult, Strategy};
use portr_core::scanner::{self, ScanRequest};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};

use crate::util::LoopbackSystem;

fn fast_config() -> ScanConfig {
    let mut cfg = ScanConfig::default();
    cfg.timings.connect = Duration::from_millis(500);
    cfg.timings.banner = Duration::from_millis(200);
    cfg.timings.udp = Duration::from_millis(200);
    cfg
}

fn request(ports: &[u16], strategy: Strategy) -> ScanRequest {
    ScanRequest {
        addr: Ipv4Addr::LOCALHOST,
        ports: ports.iter().copied().collect::<PortList>(),
        strategy,
    }
}

/// A loopback port with nothing listening on it.
async fn closed_tcp_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn silent_tcp_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    port
}

async fn greeting_tcp_listener(greeting: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let _ = socket.write_all(greeting).await;
        }
    });
    port
}

fn by_port(results: Vec<ScanResult>) -> HashMap<u16, ScanResult> {
    results.into_iter().map(|r| (r.port, r)).collect()
}

#[tokio::test]
async fn connect_scan_classifies_loopback_ports() {
    let closed_a = closed_tcp_port().await;
    let closed_b = closed_tcp_port().await;
    let open = silent_tcp_listener().await;
    let system = LoopbackSystem::default();
    let mut streamed = 0;

    let report = scanner::perform_scan(
        &request(&[closed_a, closed_b, open], Strategy::TcpConnect),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| streamed += 1,
    )
    .await
    .expect("scan should run");

    assert_eq!(streamed, 3);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.link_addr, None);
    let results = by_port(report.results.into_results());
    assert_eq!(results[&closed_a].state, PortState::Closed);
    assert_eq!(results[&closed_b].state, PortState::Closed);
    assert_eq!(results[&open].state, PortState::Open);
    assert_eq!(results[&open].evidence, "tcp: handshake completed, no banner");
}

#[tokio::test]
async fn connect_scan_reports_banner() {
    let port = greeting_tcp_listener(b"220 portr.test ESMTP\r\n").await;
    let system = LoopbackSystem::default();

    let report = scanner::perform_scan(
        &request(&[port], Strategy::TcpConnect),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| {},
    )
    .await
    .unwrap();

    let result = report.results.iter().next().unwrap();
    assert_eq!(result.state, PortState::Open);
    assert_eq!(result.evidence, "tcp: banner: 220 portr.test ESMTP");
}

#[tokio::test]
async fn udp_scan_separates_answering_refusing_and_silent_ports() {
    let echo = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let echo_port = echo.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((n, peer)) = echo.recv_from(&mut buf).await {
            let _ = echo.send_to(&buf[..n], peer).await;
        }
    });

    let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let silent_port = sink.local_addr().unwrap().port();

    let refusing_port = {
        let s = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        s.local_addr().unwrap().port()
    };

    let system = LoopbackSystem::default();
    let report = scanner::perform_scan(
        &request(&[echo_port, refusing_port, silent_port], Strategy::Udp),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| {},
    )
    .await
    .unwrap();

    let results = by_port(report.results.into_results());
    assert_eq!(results[&echo_port].state, PortState::Open);
    assert_eq!(results[&refusing_port].state, PortState::Closed);
    // No raw sockets, so the ACK follow-up is skipped.
    assert_eq!(results[&silent_port].state, PortState::OpenOrFiltered);
    drop(sink);
}

#[tokio::test]
async fn raw_strategy_without_privilege_fails_before_probing() {
    let system = LoopbackSystem::default();
    let mut streamed = 0;

    let err = scanner::perform_scan(
        &request(&[22, 80], Strategy::Syn),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| streamed += 1,
    )
    .await
    .err()
    .expect("syn scan must be refused");

    assert_eq!(err.downcast_ref::<ScanError>(), Some(&ScanError::Privilege(Strategy::Syn)));
    assert_eq!(streamed, 0);
}

#[tokio::test]
async fn unroutable_target_is_a_run_level_error() {
    let system = LoopbackSystem::default();
    let mut req = request(&[80], Strategy::TcpConnect);
    req.addr = Ipv4Addr::new(10, 255, 255, 1);

    let err = scanner::perform_scan(&req, &fast_config(), &system, Arc::new(AtomicBool::new(false)), |_| {})
        .await
        .err()
        .unwrap();

    let scan_err = err.downcast_ref::<ScanError>().unwrap();
    assert!(matches!(scan_err, ScanError::Routing(_)));
    assert!(scan_err.is_fatal_to_run());
}

#[tokio::test]
async fn failing_resource_limit_stops_the_run() {
    let system = LoopbackSystem {
        ceiling: Err(ScanError::ResourceLimit("ulimit unavailable".into())),
        ..LoopbackSystem::default()
    };

    let err = scanner::perform_scan(
        &request(&[80], Strategy::TcpConnect),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| {},
    )
    .await
    .err()
    .unwrap();

    assert!(matches!(err.downcast_ref::<ScanError>(), Some(ScanError::ResourceLimit(_))));
}

#[tokio::test]
async fn worker_count_respects_max_parallel() {
    let ports: Vec<u16> = vec![closed_tcp_port().await, closed_tcp_port().await, closed_tcp_port().await];
    let system = LoopbackSystem::default();
    let mut cfg = fast_config();
    cfg.max_parallel = Some(2);

    let report = scanner::perform_scan(
        &request(&ports, Strategy::TcpConnect),
        &cfg,
        &system,
        Arc::new(AtomicBool::new(false)),
        |_| {},
    )
    .await
    .unwrap();

    assert_eq!(report.concurrency, 2);
    assert_eq!(report.results.len(), 3);
}

#[tokio::test]
async fn cancelled_run_still_reports_every_port() {
    let system = LoopbackSystem::default();

    let report = scanner::perform_scan(
        &request(&[1, 2, 3, 4], Strategy::TcpConnect),
        &fast_config(),
        &system,
        Arc::new(AtomicBool::new(true)),
        |_| {},
    )
    .await
    .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.results.summary().error, 4);
}
