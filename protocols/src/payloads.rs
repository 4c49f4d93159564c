//! # UDP Probe Payloads
//!
//! Most UDP services stay silent unless they receive a request they
//! understand, so well-known ports get a minimal valid one. The table is
//! built once at startup and shared read-only between probes; [`PayloadTable::with`]
//! derives an extended copy instead of mutating it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dns;

pub const DNS_PORT: u16 = 53;
pub const NTP_PORT: u16 = 123;
pub const SNMP_PORT: u16 = 161;

const NTP_PACKET_LEN: usize = 48;
/// LI = 0, version 3, mode 3 (client).
const NTP_CLIENT_HEADER: u8 = 0x1b;

/// SNMPv1 GetRequest for sysDescr.0 with community "public".
const SNMP_GET_SYSDESCR: [u8; 40] = [
    0x30, 0x26, // SEQUENCE
    0x02, 0x01, 0x00, // version 1
    0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', // community
    0xa0, 0x19, // GetRequest PDU
    0x02, 0x01, 0x01, // request id
    0x02, 0x01, 0x00, // error status
    0x02, 0x01, 0x00, // error index
    0x30, 0x0e, 0x30, 0x0c, // varbind list, varbind
    0x06, 0x08, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00, // 1.3.6.1.2.1.1.1.0
    0x05, 0x00, // NULL
];

const HTTP_HEAD: &[u8] = b"HEAD / HTTP/1.0\r\n\r\n";

#[derive(Debug, Clone, Default)]
pub struct PayloadTable {
    entries: Arc<HashMap<u16, Vec<u8>>>,
}

impl PayloadTable {
    /// DNS, NTP and SNMP requests.
    pub fn standard() -> anyhow::Result<Self> {
        let mut entries: HashMap<u16, Vec<u8>> = HashMap::new();
        entries.insert(DNS_PORT, dns::create_root_ns_query(rand::random())?);
        entries.insert(NTP_PORT, ntp_client_request());
        entries.insert(SNMP_PORT, SNMP_GET_SYSDESCR.to_vec());
        tracing::debug!(ports = ?entries.keys().collect::<Vec<_>>(), "udp payload table ready");
        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    /// Payload for `port`; unknown ports get an empty datagram.
    pub fn for_port(&self, port: u16) -> &[u8] {
        self.entries.get(&port).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, port: u16) -> bool {
        self.entries.contains_key(&port)
    }

    /// A copy of this table with `payload` registered for `port`.
    pub fn with(&self, port: u16, payload: impl Into<Vec<u8>>) -> Self {
        let mut entries: HashMap<u16, Vec<u8>> = (*self.entries).clone();
        entries.insert(port, payload.into());
        Self {
            entries: Arc::new(entries),
        }
    }
}

fn ntp_client_request() -> Vec<u8> {
    let mut packet: Vec<u8> = vec![0u8; NTP_PACKET_LEN];
    packet[0] = NTP_CLIENT_HEADER;
    packet
}

/// Bytes to send after a TCP handshake to coax a banner out of services that
/// wait for the client to speak first.
pub fn banner_request(port: u16) -> Option<&'static [u8]> {
    match port {
        80 | 8000 | 8080 => Some(HTTP_HEAD),
        _ => None,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_ports_have_payloads() {
        let table = PayloadTable::standard().unwrap();

        let dns = table.for_port(DNS_PORT);
        assert_eq!(dns.len(), 17);
        assert_eq!(&dns[2..4], &[0x01, 0x00]);

        let ntp = table.for_port(NTP_PORT);
        assert_eq!(ntp.len(), NTP_PACKET_LEN);
        assert_eq!(ntp[0], NTP_CLIENT_HEADER);

        let snmp = table.for_port(SNMP_PORT);
        assert_eq!(snmp[0], 0x30);
        assert_eq!(usize::from(snmp[1]) + 2, snmp.len());
    }

    #[test]
    fn unknown_port_gets_empty_payload() {
        let table = PayloadTable::standard().unwrap();
        assert!(table.for_port(31_337).is_empty());
        assert!(!table.contains(31_337));
    }

    #[test]
    fn with_returns_a_new_table_and_leaves_original_alone() {
        let table = PayloadTable::standard().unwrap();
        let extended = table.with(5353, b"mdns".to_vec());

        assert_eq!(extended.for_port(5353), b"mdns");
        assert!(table.for_port(5353).is_empty());
        assert_eq!(extended.for_port(NTP_PORT), table.for_port(NTP_PORT));
    }

    #[test]
    fn banner_request_only_for_http_ports() {
        assert_eq!(banner_request(80), Some(HTTP_HEAD));
        assert_eq!(banner_request(8080), Some(HTTP_HEAD));
        assert_eq!(banner_request(22), None);
    }
}
