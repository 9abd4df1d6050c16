//! `sandboxctl proxy` commands.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Subcommand};
use std::net::{IpAddr, ToSocketAddrs};
use tracing::debug;

use crate::bundle::ConductCli;
use crate::config::{Config, ProxySettings};
use crate::docker::DockerCli;
use crate::host::HostResolver;
use crate::host::probe::SocketProbe;
use crate::proxy::{ProxyManager, ProxyStatus, StartOutcome};

#[derive(Debug, Args)]
pub struct ProxyArgs {
    #[command(subcommand)]
    pub command: ProxyCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProxyCommand {
    /// Start the proxy, replacing any running instance.
    Start {
        /// Address to publish ports on (defaults to the resolved sandbox host)
        #[arg(long)]
        bind_addr: Option<IpAddr>,
        /// Extra port to publish besides 80, 443 and 9000 (repeatable)
        #[arg(short = 'p', long = "port")]
        ports: Vec<u16>,
    },
    /// Stop and remove the proxy container.
    Stop,
    /// Show whether the proxy container is running.
    Status,
}

pub fn run(args: ProxyArgs) -> Result<()> {
    let config = Config::load()?;
    let settings = ProxySettings::from_config(&config)?;
    let docker = DockerCli::new();
    let deployer = ConductCli::default();
    let manager = ProxyManager::new(&settings, &docker, &deployer);

    match args.command {
        ProxyCommand::Start { bind_addr, ports } => {
            let bind_addr = match bind_addr {
                Some(addr) => addr,
                None => {
                    let host = HostResolver::new(&docker, &SocketProbe).resolve_host();
                    resolve_ip(&host)?
                }
            };
            match manager.start_proxy(bind_addr, &ports)? {
                StartOutcome::Started { ports } => {
                    println!("HAProxy is listening on {} ports {:?}", bind_addr, ports);
                }
                // Docker is optional for the sandbox; say nothing.
                StartOutcome::Skipped => debug!("proxy start skipped"),
            }
            Ok(())
        }
        ProxyCommand::Stop => {
            if !manager.stop_proxy()? {
                debug!("proxy stop skipped");
            }
            Ok(())
        }
        ProxyCommand::Status => {
            match manager.proxy_status()? {
                ProxyStatus::Running(id) => {
                    println!("HAProxy is running ({} {})", settings.container_name, id)
                }
                ProxyStatus::Stopped => println!("HAProxy is not running"),
            }
            Ok(())
        }
    }
}

/// Turn a host string (literal address or name) into an IP address.
fn resolve_ip(host: &str) -> Result<IpAddr> {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(addr);
    }
    (host, 0)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve host {}", host))?
        .map(|sock| sock.ip())
        .next()
        .ok_or_else(|| anyhow!("Host {} has no addresses", host))
}
