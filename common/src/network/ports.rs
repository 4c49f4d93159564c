//! Port list parsing: `22`, `22,80,443`, `1-1024`, or any mix of those.

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Context, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn to_iter(&self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.end
    }
}

/// An ordered, duplicate-free list of ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortList {
    ports: Vec<u16>,
    seen: HashSet<u16>,
}

impl PortList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `port` unless it is already present.
    pub fn add_single(&mut self, port: u16) {
        if self.seen.insert(port) {
            self.ports.push(port);
        }
    }

    pub fn add_range(&mut self, range: PortRange) {
        range.to_iter().for_each(|port| self.add_single(port));
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.ports
    }
}

impl FromIterator<u16> for PortList {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut list = PortList::new();
        for port in iter {
            list.add_single(port);
        }
        list
    }
}

impl FromStr for PortList {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut list = PortList::new();
        for token in s.split(',').map(str::trim) {
            if token.is_empty() {
                bail!("empty entry in port list '{s}'");
            }
            match token.split_once('-') {
                Some((start, end)) => {
                    let start: u16 = parse_port(start)?;
                    let end: u16 = parse_port(end)?;
                    if start > end {
                        bail!("reversed port range {start}-{end}");
                    }
                    list.add_range(PortRange::new(start, end));
                }
                None => list.add_single(parse_port(token)?),
            }
        }
        Ok(list)
    }
}

fn parse_port(token: &str) -> anyhow::Result<u16> {
    let port: u16 = token
        .trim()
        .parse()
        .with_context(|| format!("invalid port '{token}'"))?;
    if port == 0 {
        bail!("port 0 cannot be scanned");
    }
    Ok(port)
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
    fn parses_singles_and_ranges_in_order() {
        let list: PortList = "80,22-24,443".parse().unwrap();
        assert_eq!(list.as_slice(), &[80, 22, 23, 24, 443]);
    }

    #[test]
    fn drops_duplicates_keeping_first_position() {
        let list: PortList = "53,22-25,53,23".parse().unwrap();
        assert_eq!(list.as_slice(), &[53, 22, 23, 24, 25]);
    }

    #[test]
    fn rejects_port_zero() {
        let err = "0,22".parse::<PortList>().unwrap_err();
        assert!(err.to_string().contains("port 0"));
    }

    #[test]
    fn rejects_reversed_range() {
        let err = "100-90".parse::<PortList>().unwrap_err();
        assert!(err.to_string().contains("reversed port range 100-90"));
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!("70000".parse::<PortList>().is_err());
        assert!("http".parse::<PortList>().is_err());
        assert!("22,,80".parse::<PortList>().is_err());
    }

    #[test]
    fn full_range_is_accepted() {
        let list: PortList = "1-65535".parse().unwrap();
        assert_eq!(list.len(), 65535);
        assert_eq!(list.as_slice().last(), Some(&65535));
    }

    #[test]
    fn full_range_with_repeats_collects_once_per_port() {
        let list: PortList = (1..=65535u16).chain(1..=65535u16).collect();
        assert_eq!(list.len(), 65535);
        assert_eq!(list.as_slice().first(), Some(&1));
        assert_eq!(list.as_slice().last(), Some(&65535));
    }

    #[test]
    fn collects_from_iterator_without_duplicates() {
        let list: PortList = vec![22, 53, 22, 80].into_iter().collect();
        assert_eq!(list.into_vec(), vec![22, 53, 80]);
    }
}
