//! In-memory [`DockerAdapter`] for tests.

use anyhow::Result;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use super::{ContainerScope, DockerAdapter, DockerValidationError, DockerVmType, RunSpec};
use crate::cmd::CommandFailed;

#[derive(Debug, Clone)]
struct Container {
    id: String,
    running: bool,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeMap<String, Container>,
    images: BTreeSet<String>,
    calls: Vec<String>,
    runs: Vec<RunSpec>,
    next_id: u32,
}

/// Scriptable Docker double. Records every call in order.
#[derive(Debug)]
pub struct FakeDocker {
    pub vm_type: DockerVmType,
    pub valid: bool,
    pub fail_rm: bool,
    pub fail_ps: Option<String>,
    state: RefCell<State>,
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::engine()
    }
}

fn command_failed(args: &[&str], stderr: &str) -> anyhow::Error {
    CommandFailed {
        command: "docker".to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        status: Some(1),
        stderr: stderr.to_string(),
    }
    .into()
}

impl FakeDocker {
    /// A healthy native engine with no containers or images.
    pub fn engine() -> Self {
        Self {
            vm_type: DockerVmType::DockerEngine,
            valid: true,
            fail_rm: false,
            fail_ps: None,
            state: RefCell::new(State::default()),
        }
    }

    /// No Docker at all.
    pub fn absent() -> Self {
        Self {
            vm_type: DockerVmType::None,
            valid: false,
            ..Self::engine()
        }
    }

    pub fn with_vm_type(mut self, vm_type: DockerVmType) -> Self {
        self.vm_type = vm_type;
        self
    }

    pub fn with_image(self, reference: &str) -> Self {
        self.state.borrow_mut().images.insert(reference.to_string());
        self
    }

    pub fn with_container(self, name: &str) -> Self {
        self.add_container(name, true);
        self
    }

    /// A container that has exited but still holds its name.
    pub fn with_exited_container(self, name: &str) -> Self {
        self.add_container(name, false);
        self
    }

    fn add_container(&self, name: &str, running: bool) {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("c{:04}", state.next_id);
        state
            .containers
            .insert(name.to_string(), Container { id, running });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn runs(&self) -> Vec<RunSpec> {
        self.state.borrow().runs.clone()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state.borrow().containers.keys().cloned().collect()
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state.borrow().images.contains(reference)
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl DockerAdapter for FakeDocker {
    fn vm_type(&self) -> DockerVmType {
        self.record("vm_type".to_string());
        self.vm_type
    }

    fn validate_vm(&self, vm_type: DockerVmType) -> Result<(), DockerValidationError> {
        self.record(format!("validate_vm {:?}", vm_type));
        if self.valid {
            Ok(())
        } else {
            Err(DockerValidationError::new(["Docker is not installed."]))
        }
    }

    fn ps(&self, filter: &str, scope: ContainerScope) -> Result<Option<String>> {
        match scope {
            ContainerScope::Running => self.record(format!("ps {}", filter)),
            ContainerScope::All => self.record(format!("ps --all {}", filter)),
        }
        if let Some(message) = &self.fail_ps {
            return Err(anyhow::anyhow!("{}", message));
        }
        let name = filter.strip_prefix("name=").unwrap_or(filter);
        let state = self.state.borrow();
        let ids: Vec<&str> = state
            .containers
            .iter()
            .filter(|(n, c)| n.contains(name) && (c.running || scope == ContainerScope::All))
            .map(|(_, c)| c.id.as_str())
            .collect();
        Ok(if ids.is_empty() {
            None
        } else {
            Some(ids.join("\n"))
        })
    }

    fn images(&self, reference: &str) -> Result<Option<String>> {
        self.record(format!("images {}", reference));
        Ok(self
            .has_image(reference)
            .then(|| format!("img-{}", reference)))
    }

    fn pull(&self, reference: &str) -> Result<()> {
        self.record(format!("pull {}", reference));
        self.state.borrow_mut().images.insert(reference.to_string());
        Ok(())
    }

    fn run(&self, spec: &RunSpec) -> Result<()> {
        self.record(format!("run {}", spec.name));
        if self.state.borrow().containers.contains_key(&spec.name) {
            return Err(command_failed(
                &["run", "--name", &spec.name],
                "Conflict. The container name is already in use",
            ));
        }
        self.add_container(&spec.name, true);
        self.state.borrow_mut().runs.push(spec.clone());
        Ok(())
    }

    fn rm(&self, names: &[&str]) -> Result<()> {
        self.record(format!("rm {}", names.join(" ")));
        if self.fail_rm {
            return Err(command_failed(&["rm", "-f"], "Cannot connect to the Docker daemon"));
        }
        let mut state = self.state.borrow_mut();
        for name in names {
            state.containers.remove(*name);
        }
        Ok(())
    }
}
