//! # Raw Link-Layer Transport
//!
//! A [`RawTransport`] is one capture/inject handle on one interface. Probes
//! each open their own through a [`TransportFactory`] and drop it when they
//! finish, so a handle is never read from two threads and replies are only
//! ever seen by the probe that is waiting for them.

use std::io;
use std::time::{Duration, Instant};

use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

use portr_common::error::ScanError;
use portr_protocols::filter::FrameFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Frame(Vec<u8>),
    Timeout,
}

pub trait RawTransport: Send {
    /// Puts `frame` on the wire as is.
    fn inject(&mut self, frame: &[u8]) -> Result<(), ScanError>;

    /// Blocks until a frame passing the installed filter arrives or
    /// `deadline` passes.
    fn next_frame(&mut self, deadline: Instant) -> Result<Capture, ScanError>;

    /// Replaces the current filter. Frames that do not match are dropped
    /// before `next_frame` returns.
    fn install_filter(&mut self, filter: FrameFilter);
}

pub trait TransportFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn RawTransport>, ScanError>;
}

/// Opens `AF_PACKET` style channels through `pnet::datalink`.
pub struct DatalinkFactory {
    interface: NetworkInterface,
    poll: Duration,
}

impl DatalinkFactory {
    /// `poll` is the read timeout of the underlying handle: how often a
    /// blocked read wakes up to look at its deadline.
    pub fn new(interface: NetworkInterface, poll: Duration) -> Self {
        Self { interface, poll }
    }
}

impl TransportFactory for DatalinkFactory {
    fn open(&self) -> Result<Box<dyn RawTransport>, ScanError> {
        let (tx, rx) = open_eth_channel(&self.interface, &get_config(self.poll), datalink::channel)?;
        Ok(Box::new(DatalinkTransport::new(tx, rx)))
    }
}

pub struct DatalinkTransport {
    tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
    filter: FrameFilter,
}

impl DatalinkTransport {
    pub fn new(tx: Box<dyn DataLinkSender>, rx: Box<dyn DataLinkReceiver>) -> Self {
        Self {
            tx,
            rx,
            filter: FrameFilter::accept_all(),
        }
    }
}

impl RawTransport for DatalinkTransport {
    fn inject(&mut self, frame: &[u8]) -> Result<(), ScanError> {
        match self.tx.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(ScanError::Transport(format!("inject failed: {e}"))),
            None => Err(ScanError::Transport("inject failed: sender unavailable".to_string())),
        }
    }

    fn next_frame(&mut self, deadline: Instant) -> Result<Capture, ScanError> {
        loop {
            if Instant::now() >= deadline {
                return Ok(Capture::Timeout);
            }
            match self.rx.next() {
                Ok(frame) => {
                    if self.filter.matches(frame) {
                        return Ok(Capture::Frame(frame.to_vec()));
                    }
                }
                Err(e) if is_read_timeout(&e) => {}
                Err(e) => return Err(ScanError::Transport(format!("capture read failed: {e}"))),
            }
        }
    }

    fn install_filter(&mut self, filter: FrameFilter) {
        tracing::trace!(%filter, "installing capture filter");
        self.filter = filter;
    }
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), ScanError>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg)
        .map_err(|e| ScanError::Transport(format!("opening on {}: {e}", intf.name)))?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => Err(ScanError::Transport(format!("non-ethernet channel for {}", intf.name))),
    }
}

fn get_config(poll: Duration) -> Config {
    Config {
        read_timeout: Some(poll),
        ..Default::default()
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
