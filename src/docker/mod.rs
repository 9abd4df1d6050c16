//! Container backend interface.
//!
//! Everything the proxy manager and host resolver need from Docker goes
//! through [`DockerAdapter`]. [`DockerCli`] shells out to the `docker`
//! executable; tests use an in-memory double.

mod cli;
#[cfg(test)]
pub mod fake;

pub use cli::DockerCli;

use anyhow::Result;
use std::fmt;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cmd::CommandFailed;
use crate::host::addr::exploded;

/// How the Docker daemon is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerVmType {
    /// Native daemon reachable directly.
    DockerEngine,
    /// Daemon running inside a docker-machine VM.
    DockerMachine,
    /// No usable Docker found.
    None,
}

impl DockerVmType {
    /// Whether containers live behind a VM and cannot route host-side ranges.
    pub fn is_vm(&self) -> bool {
        matches!(self, DockerVmType::DockerMachine)
    }
}

/// Docker is missing or not set up. Each message is one line for the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join("\n"))]
pub struct DockerValidationError {
    pub messages: Vec<String>,
}

impl DockerValidationError {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Whether an error means "Docker is absent or misconfigured" rather than a real fault.
///
/// Covers validation failures, docker commands exiting non-zero, and the
/// executable not being found at all.
pub fn is_docker_unavailable(err: &anyhow::Error) -> bool {
    if err.is::<DockerValidationError>() || err.is::<CommandFailed>() {
        return true;
    }
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Which containers a registry query sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerScope {
    /// Running containers only.
    Running,
    /// Running and exited containers.
    All,
}

/// `-p host_ip:host_port:container_port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: IpAddr,
    pub host_port: u16,
    pub container_port: u16,
}

impl PortMapping {
    /// Publish `port` on `host_ip` to the same port inside the container.
    pub fn same_port(host_ip: IpAddr, port: u16) -> Self {
        Self {
            host_ip,
            host_port: port,
            container_port: port,
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host_ip {
            IpAddr::V4(_) => write!(
                f,
                "{}:{}:{}",
                exploded(&self.host_ip),
                self.host_port,
                self.container_port
            ),
            IpAddr::V6(_) => write!(
                f,
                "[{}]:{}:{}",
                exploded(&self.host_ip),
                self.host_port,
                self.container_port
            ),
        }
    }
}

/// `-v source:target[:ro]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.target)?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// A detached `docker run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub name: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub image: String,
}

impl RunSpec {
    /// Arguments following `docker run`, image last.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-d".to_string(), "--name".to_string(), self.name.clone()];
        for port in &self.ports {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        for volume in &self.volumes {
            args.push("-v".to_string());
            args.push(volume.to_string());
        }
        args.push(self.image.clone());
        args
    }
}

/// Operations on the container backend. All calls block until the backend answers.
pub trait DockerAdapter {
    /// Detect how the daemon is hosted. Never fails; absence is [`DockerVmType::None`].
    fn vm_type(&self) -> DockerVmType;

    /// Check that the detected backend is usable.
    fn validate_vm(&self, vm_type: DockerVmType) -> Result<(), DockerValidationError>;

    /// Ids of containers in `scope` matching `filter` (e.g. `name=foo`), or `None`.
    fn ps(&self, filter: &str, scope: ContainerScope) -> Result<Option<String>>;

    /// Ids of local images matching `reference`, or `None`.
    fn images(&self, reference: &str) -> Result<Option<String>>;

    fn pull(&self, reference: &str) -> Result<()>;

    fn run(&self, spec: &RunSpec) -> Result<()>;

    /// Force-remove containers by name.
    fn rm(&self, names: &[&str]) -> Result<()>;
}
