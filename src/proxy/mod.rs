//! Lifecycle of the local HAProxy container fronting the sandbox nodes.
//!
//! No state is kept between calls. Whether the proxy is running is asked of
//! Docker every time, and starting always removes any previous container
//! first, so at most one proxy exists.

pub mod haproxy;
pub mod ports;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::bundle::BundleDeployer;
use crate::config::{HAPROXY_CONTAINER_CFG_DIR, ProxySettings};
use crate::docker::{
    ContainerScope, DockerAdapter, PortMapping, RunSpec, VolumeMount, is_docker_unavailable,
};
use crate::ui::headline;
use ports::ProxyPortSet;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Failed to prepare HAProxy configuration in {}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Docker backend error")]
    Backend(#[source] anyhow::Error),

    #[error("Failed to deploy bundle {bundle}")]
    Deploy {
        bundle: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result of [`ProxyManager::start_proxy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Container started and companion bundle deployed.
    Started { ports: Vec<u16> },
    /// Docker is not usable here; nothing was done.
    Skipped,
}

/// What the container registry says about the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyStatus {
    Running(String),
    Stopped,
}

/// Everything needed to launch one proxy container. Built per start, then dropped.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_addr: IpAddr,
    pub ports: ProxyPortSet,
    pub container_name: String,
    pub image: String,
    pub cfg_dir: PathBuf,
    pub cfg_path: PathBuf,
}

impl ProxyConfig {
    pub fn new(settings: &ProxySettings, bind_addr: IpAddr, extra_ports: &[u16]) -> Self {
        Self {
            bind_addr,
            ports: ProxyPortSet::new(&settings.default_ports, extra_ports),
            container_name: settings.container_name.clone(),
            image: settings.image_reference(),
            cfg_dir: settings.haproxy_cfg_dir(),
            cfg_path: settings.haproxy_cfg_path(),
        }
    }

    pub fn run_spec(&self) -> RunSpec {
        RunSpec {
            name: self.container_name.clone(),
            ports: self
                .ports
                .iter()
                .map(|port| PortMapping::same_port(self.bind_addr, port))
                .collect(),
            volumes: vec![VolumeMount {
                source: self.cfg_dir.clone(),
                target: HAPROXY_CONTAINER_CFG_DIR.to_string(),
                read_only: true,
            }],
            image: self.image.clone(),
        }
    }
}

pub struct ProxyManager<'a> {
    settings: &'a ProxySettings,
    docker: &'a dyn DockerAdapter,
    deployer: &'a dyn BundleDeployer,
    out: RefCell<Box<dyn Write + 'a>>,
}

impl<'a> ProxyManager<'a> {
    pub fn new(
        settings: &'a ProxySettings,
        docker: &'a dyn DockerAdapter,
        deployer: &'a dyn BundleDeployer,
    ) -> Self {
        Self {
            settings,
            docker,
            deployer,
            out: RefCell::new(Box::new(io::stdout())),
        }
    }

    /// Send operator progress messages to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + 'a) -> Self {
        self.out = RefCell::new(Box::new(out));
        self
    }

    fn say(&self, message: impl fmt::Display) {
        // Progress output is best effort; the log file has the details.
        let _ = writeln!(self.out.borrow_mut(), "{}", message);
    }

    /// Whether a usable Docker backend is available. Never an error.
    pub fn is_docker_present(&self) -> bool {
        let vm_type = self.docker.vm_type();
        match self.docker.validate_vm(vm_type) {
            Ok(()) => true,
            Err(e) => {
                debug!(?vm_type, error = %e, "proxy:docker not present");
                false
            }
        }
    }

    /// Replace any running proxy with a fresh one bound to `bind_addr`.
    ///
    /// Silently does nothing when Docker is unavailable.
    pub fn start_proxy(
        &self,
        bind_addr: IpAddr,
        extra_ports: &[u16],
    ) -> Result<StartOutcome, ProxyError> {
        if !self.is_docker_present() {
            return Ok(StartOutcome::Skipped);
        }

        let config = ProxyConfig::new(self.settings, bind_addr, extra_ports);
        haproxy::ensure_config(&config.cfg_dir, &config.cfg_path).map_err(|source| {
            ProxyError::Config {
                path: config.cfg_path.clone(),
                source,
            }
        })?;

        self.stop_proxy()?;
        self.start_container(&config)?;
        self.deploy_companion_bundle()?;

        Ok(StartOutcome::Started {
            ports: config.ports.as_slice().to_vec(),
        })
    }

    /// Remove the proxy container if one exists.
    ///
    /// `Ok(true)` when done or nothing to do, `Ok(false)` when Docker turned
    /// out to be absent or misconfigured.
    ///
    /// Exited containers count too, since they still hold the container name.
    /// Nothing is printed unless the container was actually removed.
    pub fn stop_proxy(&self) -> Result<bool, ProxyError> {
        let existing = match self.find_haproxy(ContainerScope::All) {
            Ok(existing) => existing,
            Err(e) if is_docker_unavailable(&e) => {
                debug!(error = %e, "proxy:stop skipped, docker unavailable");
                return Ok(false);
            }
            Err(e) => return Err(ProxyError::Backend(e)),
        };

        let Some(id) = existing else {
            debug!(container = %self.settings.container_name, "proxy:not running");
            return Ok(true);
        };

        if !self.is_docker_present() {
            debug!(container = %self.settings.container_name, "proxy:stop skipped, docker not present");
            return Ok(false);
        }

        match self.docker.rm(&[self.settings.container_name.as_str()]) {
            Ok(()) => {
                info!(container = %self.settings.container_name, %id, "proxy:stopped");
                self.say(headline("Stopping HAProxy"));
                self.say("HAProxy has been successfully stopped");
                Ok(true)
            }
            Err(e) if is_docker_unavailable(&e) => {
                warn!(error = %e, "proxy:remove failed, docker unavailable");
                Ok(false)
            }
            Err(e) => Err(ProxyError::Backend(e)),
        }
    }

    /// Raw registry answer for the proxy container: its id(s), or `None`.
    pub fn get_running_haproxy(&self) -> anyhow::Result<Option<String>> {
        self.find_haproxy(ContainerScope::Running)
    }

    fn find_haproxy(&self, scope: ContainerScope) -> anyhow::Result<Option<String>> {
        self.docker
            .ps(&format!("name={}", self.settings.container_name), scope)
    }

    pub fn proxy_status(&self) -> Result<ProxyStatus, ProxyError> {
        match self.get_running_haproxy() {
            Ok(Some(id)) => Ok(ProxyStatus::Running(id)),
            Ok(None) => Ok(ProxyStatus::Stopped),
            Err(e) if is_docker_unavailable(&e) => Ok(ProxyStatus::Stopped),
            Err(e) => Err(ProxyError::Backend(e)),
        }
    }

    fn start_container(&self, config: &ProxyConfig) -> Result<(), ProxyError> {
        self.say(headline("Starting HAProxy"));

        let present = self.docker.images(&config.image).map_err(ProxyError::Backend)?;
        if present.is_none() {
            self.say(format_args!("Pulling docker image {}", config.image));
            self.docker.pull(&config.image).map_err(ProxyError::Backend)?;
        }

        self.say(format_args!("Exposing the following ports {}", config.ports));
        info!(
            container = %config.container_name,
            image = %config.image,
            addr = %config.bind_addr,
            ports = %config.ports,
            "proxy:starting container"
        );
        self.docker
            .run(&config.run_spec())
            .map_err(ProxyError::Backend)
    }

    fn deploy_companion_bundle(&self) -> Result<(), ProxyError> {
        let bundle = &self.settings.bundle;
        let configuration = &self.settings.bundle_configuration;
        self.say(format_args!(
            "Deploying bundle {} with configuration {}",
            bundle, configuration
        ));

        let deploy = || -> anyhow::Result<()> {
            self.deployer.load(bundle, configuration)?;
            self.deployer.run(bundle)
        };
        deploy().map_err(|source| ProxyError::Deploy {
            bundle: bundle.clone(),
            source,
        })
    }
}
