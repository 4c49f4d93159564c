use std::time::Duration;

/// Presentation settings for the command line front end.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Skips the banner line at startup.
    pub no_banner: bool,
    /// Masks addresses in the output (screenshots, bug reports).
    pub redact: bool,
    /// 0 prints everything, 1 drops headers, 2 prints only open ports.
    pub quiet: u8,
}

/// Every deadline a scan can block on.
///
/// No probe waits without one of these bounding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long a SYN probe waits for SYN+ACK or RST.
    pub syn: Duration,
    /// How long an ACK probe waits for RST or ICMP unreachable.
    pub ack: Duration,
    /// TCP handshake deadline for connect probes.
    pub connect: Duration,
    /// Deadline for the optional banner read after a successful connect.
    pub banner: Duration,
    /// Read deadline for a single UDP attempt.
    pub udp: Duration,
    /// Send/receive cycles before a silent UDP port is declared open|filtered.
    pub udp_attempts: u32,
    /// ARP reply deadline.
    pub arp: Duration,
    /// Pause before retrying a connect that hit descriptor exhaustion.
    pub exhaustion_backoff: Duration,
    pub exhaustion_retries: u32,
    /// Read timeout of a capture handle; bounds how late a deadline is noticed.
    pub capture_poll: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            syn: Duration::from_secs(5),
            ack: Duration::from_secs(5),
            connect: Duration::from_secs(2),
            banner: Duration::from_secs(3),
            udp: Duration::from_secs(2),
            udp_attempts: 2,
            arp: Duration::from_secs(3),
            exhaustion_backoff: Duration::from_secs(2),
            exhaustion_retries: 1,
            capture_poll: Duration::from_millis(50),
        }
    }
}

/// Knobs for one scan run.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub timings: Timings,
    /// Upper bound on parallel probes on top of the resource ceiling.
    pub max_parallel: Option<usize>,
}
