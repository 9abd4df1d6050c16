//! Deployment of bundles through the orchestrator's `conduct` CLI.

use anyhow::Result;
use tracing::info;

use crate::cmd::Cmd;

/// Loads and runs bundles on the orchestrator. Neither call prompts the operator.
pub trait BundleDeployer {
    fn load(&self, bundle: &str, configuration: &str) -> Result<()>;
    fn run(&self, bundle: &str) -> Result<()>;
}

/// [`BundleDeployer`] that invokes the `conduct` executable.
#[derive(Debug, Clone)]
pub struct ConductCli {
    program: String,
}

impl Default for ConductCli {
    fn default() -> Self {
        Self::new("conduct")
    }
}

impl ConductCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn load_args(bundle: &str, configuration: &str) -> Vec<String> {
        vec![
            "load".to_string(),
            bundle.to_string(),
            configuration.to_string(),
            "--disable-instructions".to_string(),
        ]
    }

    fn run_args(bundle: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            bundle.to_string(),
            "--disable-instructions".to_string(),
        ]
    }
}

impl BundleDeployer for ConductCli {
    fn load(&self, bundle: &str, configuration: &str) -> Result<()> {
        info!(bundle, configuration, "bundle:load");
        Cmd::new(self.program.as_str())
            .args(Self::load_args(bundle, configuration))
            .run()?;
        Ok(())
    }

    fn run(&self, bundle: &str) -> Result<()> {
        info!(bundle, "bundle:run");
        Cmd::new(self.program.as_str())
            .args(Self::run_args(bundle))
            .run()?;
        Ok(())
    }
}
