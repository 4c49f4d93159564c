//! Full handshake through the operating system's TCP stack, followed by a
//! best-effort banner read.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use portr_common::config::Timings;
use portr_common::error::ScanError;
use portr_common::scan::PortState;
use portr_protocols::payloads;

use crate::probe::Probe;

const BANNER_BUF_LEN: usize = 2048;
const BANNER_MAX_CHARS: usize = 120;

/// EMFILE and ENFILE.
const EXHAUSTION_OS_ERRORS: [i32; 2] = [24, 23];

pub async fn probe(addr: Ipv4Addr, port: u16, timings: &Timings) -> Probe {
    let socket_addr: SocketAddr = SocketAddr::from((addr, port));
    let connect_timeout: Duration = timings.connect;
    let connector = move || async move {
        match timeout(connect_timeout, TcpStream::connect(socket_addr)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(io::Error::from(io::ErrorKind::TimedOut)),
        }
    };

    match connect_with_retry(connector, timings.exhaustion_retries, timings.exhaustion_backoff).await {
        Connect::Established(stream) => {
            let evidence: String = match grab_banner(stream, port, timings.banner).await {
                Some(banner) => format!("banner: {banner}"),
                None => "handshake completed, no banner".to_string(),
            };
            Probe::settled(PortState::Open, evidence)
        }
        Connect::Refused(e) => Probe::settled(PortState::Closed, format!("connection refused ({e})")),
        Connect::TimedOut => Probe::settled(PortState::Closed, format!("no handshake within {connect_timeout:?}")),
        Connect::Failed(e) => Probe::settled(PortState::Closed, format!("connect failed ({e})")),
        Connect::Exhausted(e) => Probe::failed(&ScanError::ResourceExhaustion(e.to_string())),
    }
}

#[derive(Debug)]
pub enum Connect<S> {
    Established(S),
    Refused(io::Error),
    TimedOut,
    Failed(io::Error),
    /// Descriptor exhaustion outlasted every retry.
    Exhausted(io::Error),
}

/// Runs `connect`, retrying up to `retries` times after `backoff` when the
/// process is out of descriptors. Any other outcome is returned at once.
pub async fn connect_with_retry<S, F, Fut>(mut connect: F, retries: u32, backoff: Duration) -> Connect<S>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<S>>,
{
    let mut attempt: u32 = 0;
    loop {
        match connect().await {
            Ok(stream) => return Connect::Established(stream),
            Err(e) if is_exhaustion(&e) => {
                if attempt >= retries {
                    return Connect::Exhausted(e);
                }
                attempt += 1;
                portr_common::warn!("out of descriptors ({e}), retrying in {backoff:?}");
                tokio::time::sleep(backoff).await;
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset) => {
                return Connect::Refused(e);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Connect::TimedOut,
            Err(e) => return Connect::Failed(e),
        }
    }
}

pub fn is_exhaustion(e: &io::Error) -> bool {
    e.raw_os_error().is_some_and(|code| EXHAUSTION_OS_ERRORS.contains(&code))
        || e.to_string().to_ascii_lowercase().contains("too many open files")
}

async fn grab_banner(mut stream: TcpStream, port: u16, deadline: Duration) -> Option<String> {
    if let Some(request) = payloads::banner_request(port) {
        if let Err(e) = stream.write_all(request).await {
            debug!(port, "banner request not sent: {e}");
        }
    }
    let mut buf: Vec<u8> = vec![0u8; BANNER_BUF_LEN];
    match timeout(deadline, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => sanitize_banner(&buf[..n]),
        _ => None,
    }
}

/// First line of `raw`, control characters removed, length capped.
pub fn sanitize_banner(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line: String = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())?
        .chars()
        .filter(|c| !c.is_control())
        .take(BANNER_MAX_CHARS)
        .collect();
    if line.is_empty() { None } else { Some(line) }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
