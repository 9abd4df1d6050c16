//! Socket predicates used to vet candidate addresses.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;
use tracing::trace;

/// Upper bound for a listening check. Probes must never block longer.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Address checks, behind a trait so resolvers can be driven by scripted answers.
pub trait Probe {
    fn can_bind(&self, addr: IpAddr, port: u16) -> bool;
    fn is_listening(&self, addr: IpAddr, port: u16) -> bool;
}

/// Probe backed by real sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketProbe;

impl Probe for SocketProbe {
    fn can_bind(&self, addr: IpAddr, port: u16) -> bool {
        can_bind(addr, port)
    }

    fn is_listening(&self, addr: IpAddr, port: u16) -> bool {
        is_listening(addr, port)
    }
}

/// Whether a listening socket can be opened on `(addr, port)`.
///
/// The socket is closed again immediately. Any OS error yields `false`.
pub fn can_bind(addr: IpAddr, port: u16) -> bool {
    match TcpListener::bind(SocketAddr::new(addr, port)) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            trace!(%addr, port, error = %e, "probe:bind failed");
            false
        }
    }
}

/// Whether something accepts TCP connections on `(addr, port)` within [`PROBE_TIMEOUT`].
pub fn is_listening(addr: IpAddr, port: u16) -> bool {
    match TcpStream::connect_timeout(&SocketAddr::new(addr, port), PROBE_TIMEOUT) {
        Ok(stream) => {
            drop(stream);
            true
        }
        Err(e) => {
            trace!(%addr, port, error = %e, "probe:connect failed");
            false
        }
    }
}
