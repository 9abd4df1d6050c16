use anyhow::Result;
use tracing::{debug, info};

use super::{ContainerScope, DockerAdapter, DockerValidationError, DockerVmType, RunSpec};
use crate::cmd::Cmd;
use crate::spinner;

const DOCKER: &str = "docker";
const DOCKER_MACHINE: &str = "docker-machine";

/// docker-machine VM used when `DOCKER_MACHINE_NAME` is not set.
const DEFAULT_MACHINE_NAME: &str = "default";

/// [`DockerAdapter`] that runs the `docker` and `docker-machine` executables.
#[derive(Debug, Default, Clone)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    fn machine_name() -> String {
        std::env::var("DOCKER_MACHINE_NAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_MACHINE_NAME.to_string())
    }
}

fn non_empty(stdout: String) -> Option<String> {
    if stdout.is_empty() { None } else { Some(stdout) }
}

fn ps_args(filter: &str, scope: ContainerScope) -> Vec<&str> {
    let mut args = vec!["ps", "--quiet"];
    if scope == ContainerScope::All {
        args.push("--all");
    }
    args.extend(["--filter", filter]);
    args
}

impl DockerAdapter for DockerCli {
    fn vm_type(&self) -> DockerVmType {
        // A spawn failure means the docker client is not installed.
        let engine_up = Cmd::new(DOCKER)
            .arg("info")
            .run_as_check()
            .unwrap_or(false);

        let vm_type = if engine_up {
            DockerVmType::DockerEngine
        } else if which::which(DOCKER_MACHINE).is_ok() {
            DockerVmType::DockerMachine
        } else {
            DockerVmType::None
        };
        debug!(?vm_type, "docker:vm type");
        vm_type
    }

    fn validate_vm(&self, vm_type: DockerVmType) -> Result<(), DockerValidationError> {
        match vm_type {
            DockerVmType::DockerEngine => Ok(()),
            DockerVmType::DockerMachine => {
                let name = Self::machine_name();
                let status = Cmd::new(DOCKER_MACHINE)
                    .args(["status", name.as_str()])
                    .run_and_capture_stdout()
                    .unwrap_or_default();
                if status == "Running" {
                    Ok(())
                } else {
                    Err(DockerValidationError::new([
                        format!("Docker VM {} is not running.", name),
                        format!("Start it with: docker-machine start {}", name),
                        format!("Then configure the shell: eval \"$(docker-machine env {})\"", name),
                    ]))
                }
            }
            DockerVmType::None => Err(DockerValidationError::new([
                "Docker is not installed or the Docker daemon is not reachable.",
                "Install Docker from https://docs.docker.com/engine/installation/",
            ])),
        }
    }

    fn ps(&self, filter: &str, scope: ContainerScope) -> Result<Option<String>> {
        let out = Cmd::new(DOCKER)
            .args(ps_args(filter, scope))
            .run_and_capture_stdout()?;
        Ok(non_empty(out))
    }

    fn images(&self, reference: &str) -> Result<Option<String>> {
        let out = Cmd::new(DOCKER)
            .args(["images", "--quiet", reference])
            .run_and_capture_stdout()?;
        Ok(non_empty(out))
    }

    fn pull(&self, reference: &str) -> Result<()> {
        spinner::with_spinner(&format!("Pulling docker image {}", reference), || {
            Cmd::new(DOCKER).args(["pull", reference]).run()?;
            Ok(())
        })
    }

    fn run(&self, spec: &RunSpec) -> Result<()> {
        info!(container = %spec.name, image = %spec.image, "docker:run");
        Cmd::new(DOCKER).arg("run").args(spec.to_args()).run()?;
        Ok(())
    }

    fn rm(&self, names: &[&str]) -> Result<()> {
        info!(containers = ?names, "docker:rm");
        Cmd::new(DOCKER)
            .args(["rm", "-f"])
            .args(names.iter().copied())
            .run()?;
        Ok(())
    }
}
