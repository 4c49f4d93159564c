use pnet::packet::dns::{DnsClass, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use crate::PacketError;

pub const DNS_HDR_LEN: usize = 12;

/// A recursive query for the root zone's NS records. Any resolver answers it.
pub fn create_root_ns_query(id: u16) -> Result<Vec<u8>, PacketError> {
    // Root name, then QTYPE and QCLASS.
    let qname: [u8; 1] = [0];
    let total: usize = DNS_HDR_LEN + qname.len() + 4;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket = MutableDnsPacket::new(&mut buffer).ok_or(PacketError::DnsBuffer)?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    let mut cursor: usize = DNS_HDR_LEN;
    buffer[cursor..cursor + qname.len()].copy_from_slice(&qname);
    cursor += qname.len();
    buffer[cursor..cursor + 2].copy_from_slice(&DnsTypes::NS.0.to_be_bytes());
    cursor += 2;
    buffer[cursor..cursor + 2].copy_from_slice(&DnsClass(1).0.to_be_bytes());

    Ok(buffer)
}

/// One line summary of a DNS response, or `None` if `payload` is not one.
pub fn describe_response(payload: &[u8]) -> Option<String> {
    let packet: dns_parser::Packet = dns_parser::Packet::parse(payload).ok()?;
    if packet.header.query {
        return None;
    }
    let mut summary: String = format!(
        "dns response id {} (rcode {:?}, {} answers, {} authority)",
        packet.header.id,
        packet.header.response_code,
        packet.answers.len(),
        packet.nameservers.len()
    );
    if let Some(first) = packet.answers.first() {
        summary.push_str(&format!(", first for '{}'", first.name));
    }
    Some(summary)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
