use portr_common::error::ScanError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("buffer too small for ethernet header")]
    EthernetBuffer,
    #[error("buffer too small for ipv4 header")]
    Ipv4Buffer,
    #[error("buffer too small for tcp header")]
    TcpBuffer,
    #[error("buffer too small for arp payload")]
    ArpBuffer,
    #[error("buffer too small for dns query")]
    DnsBuffer,
    #[error("interface has no name")]
    EmptyInterfaceName,
    #[error("interface {0} has no usable hardware address")]
    MissingHardwareAddr(String),
}

impl From<PacketError> for ScanError {
    fn from(err: PacketError) -> Self {
        ScanError::Construction(err.to_string())
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
