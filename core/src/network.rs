pub mod arp;
pub mod transport;
