//! `sandboxctl host` commands.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use tracing::debug;

use crate::docker::DockerCli;
use crate::host::addr::AddressRange;
use crate::host::platform::{self, Platform};
use crate::host::probe::SocketProbe;
use crate::host::{HostResolver, addr_alias_setup_instructions, display_addrs};

#[derive(Debug, Args)]
pub struct HostArgs {
    #[command(subcommand)]
    pub command: HostCommand,
}

#[derive(Debug, Subcommand)]
pub enum HostCommand {
    /// Print the address the sandbox should bind to.
    Resolve,
    /// Check that the sandbox node addresses can be bound, printing alias setup commands if not.
    Aliases {
        /// Subnet the sandbox nodes live in
        #[arg(long, default_value = "192.168.10.0/24")]
        addr_range: AddressRange,
        /// Number of node addresses required
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Port used to test each address
        #[arg(long, default_value_t = 9004)]
        port: u16,
    },
}

pub fn run(args: HostArgs) -> Result<()> {
    let docker = DockerCli::new();
    let probe = SocketProbe;
    let resolver = HostResolver::new(&docker, &probe);
    debug!(platform = ?Platform::current(), arch = platform::arch(), "host:platform");

    match args.command {
        HostCommand::Resolve => {
            println!("{}", resolver.resolve_host());
            Ok(())
        }
        HostCommand::Aliases {
            addr_range,
            count,
            port,
        } => {
            let missing = resolver.find_missing_aliases(&addr_range, count, port);
            if missing.is_empty() {
                println!(
                    "Addresses {} are available",
                    display_addrs(&addr_range.host_addrs(count))
                );
                return Ok(());
            }
            print!(
                "{}",
                addr_alias_setup_instructions(&missing, &addr_range.netmask())
            );
            bail!(
                "{} of {} sandbox addresses cannot be bound",
                missing.len(),
                count
            )
        }
    }
}
