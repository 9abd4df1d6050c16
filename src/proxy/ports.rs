//! Port set published by the proxy container.

use std::collections::BTreeSet;
use std::fmt;

/// Ports published by the proxy: the defaults plus whatever the caller adds,
/// ascending and without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPortSet(Vec<u16>);

impl ProxyPortSet {
    pub fn new(defaults: &[u16], extra: &[u16]) -> Self {
        let ports: BTreeSet<u16> = defaults.iter().chain(extra).copied().collect();
        Self(ports.into_iter().collect())
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for ProxyPortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
