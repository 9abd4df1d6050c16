//! Address values used by the resolver and the alias remediation output.

use anyhow::{Context, Result};
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Render an address in fully expanded form.
///
/// IPv4 is the usual dotted quad. IPv6 is eight zero-padded groups with no
/// `::` compression, which is what `ifconfig` expects when pasted verbatim.
pub fn exploded(addr: &IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6
            .segments()
            .iter()
            .map(|s| format!("{:04x}", s))
            .collect::<Vec<_>>()
            .join(":"),
    }
}

/// An IP address with an optional port. Compared by literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkAddress {
    ip: IpAddr,
    port: Option<u16>,
}

impl NetworkAddress {
    pub const fn new(ip: IpAddr, port: Option<u16>) -> Self {
        Self { ip, port }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port) {
            (ip, None) => write!(f, "{}", ip),
            (IpAddr::V4(ip), Some(port)) => write!(f, "{}:{}", ip, port),
            (IpAddr::V6(ip), Some(port)) => write!(f, "[{}]:{}", ip, port),
        }
    }
}

/// A subnet such as `192.168.10.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange(IpNet);

impl AddressRange {
    pub fn netmask(&self) -> IpAddr {
        self.0.netmask()
    }

    /// The first `count` usable host addresses of the range.
    pub fn host_addrs(&self, count: usize) -> Vec<IpAddr> {
        self.0.hosts().take(count).collect()
    }
}

impl FromStr for AddressRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let net = s
            .parse::<IpNet>()
            .with_context(|| format!("Invalid address range: {}", s))?;
        Ok(Self(net))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
