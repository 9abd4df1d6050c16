use crate::{command, logger};
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "sandboxctl")]
#[command(about = "Bootstraps the local sandbox network and manages its HAProxy container")]
struct Cli {
    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start, stop or inspect the sandbox reverse proxy
    Proxy(command::proxy::ProxyArgs),

    /// Resolve bind addresses and check loopback aliases
    Host(command::host::HostArgs),

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;
    tracing::info!(args = ?std::env::args().collect::<Vec<_>>(), "sandboxctl start");

    match cli.command {
        Commands::Proxy(args) => command::proxy::run(args),
        Commands::Host(args) => command::host::run(args),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
