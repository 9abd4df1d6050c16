use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ports the proxy always publishes, whatever the caller asks for.
pub const DEFAULT_PROXY_PORTS: [u16; 3] = [80, 443, 9000];

/// Where the official HAProxy image reads its configuration.
pub const HAPROXY_CONTAINER_CFG_DIR: &str = "/usr/local/etc/haproxy";

const DEFAULT_IMAGE: &str = "haproxy";
const DEFAULT_IMAGE_VERSION: &str = "1.5";
const DEFAULT_CONTAINER_NAME: &str = "sandbox-haproxy";
const DEFAULT_BUNDLE: &str = "conductr-haproxy";
const DEFAULT_BUNDLE_CONFIGURATION: &str = "conductr-haproxy-dev-mode";

/// User configuration, read from ~/.config/sandboxctl/config.yaml.
/// Every field is optional; unset fields take the built-in defaults.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Host directory holding proxy state. Default: ~/.conductr/proxy
    #[serde(default)]
    pub proxy_dir: Option<PathBuf>,

    /// HAProxy image name. Default: haproxy
    #[serde(default)]
    pub image: Option<String>,

    /// HAProxy image tag. Default: 1.5
    #[serde(default)]
    pub image_version: Option<String>,

    /// Name of the proxy container. Default: sandbox-haproxy
    #[serde(default)]
    pub container_name: Option<String>,

    /// Companion bundle deployed after the container starts. Default: conductr-haproxy
    #[serde(default)]
    pub bundle: Option<String>,

    /// Configuration variant loaded with the bundle. Default: conductr-haproxy-dev-mode
    #[serde(default)]
    pub bundle_configuration: Option<String>,
}

impl Config {
    /// Load the global configuration file if present.
    pub fn load() -> Result<Self> {
        debug!("config:loading");
        match global_config_path() {
            Some(path) => Ok(Self::load_from_path(&path)?.unwrap_or_default()),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path. `None` if the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "config:reading file");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        // An empty file is a valid "all defaults" config.
        if contents.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config at {}: {}", path.display(), e))?;
        Ok(Some(config))
    }
}

fn global_config_path() -> Option<PathBuf> {
    let dir = home::home_dir()?.join(".config/sandboxctl");
    ["config.yaml", "config.yml"]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Resolved, immutable settings for the proxy lifecycle.
/// Built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySettings {
    pub proxy_dir: PathBuf,
    pub image: String,
    pub image_version: String,
    pub container_name: String,
    pub bundle: String,
    pub bundle_configuration: String,
    pub default_ports: Vec<u16>,
}

impl ProxySettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let home = home::home_dir();
        let proxy_dir = match &config.proxy_dir {
            Some(dir) => expand_home(dir, home.as_deref()),
            None => home
                .context("Could not determine home directory")?
                .join(".conductr")
                .join("proxy"),
        };
        Ok(Self::with_proxy_dir(config, proxy_dir))
    }

    /// Settings rooted at an explicit proxy directory.
    pub fn with_proxy_dir(config: &Config, proxy_dir: PathBuf) -> Self {
        Self {
            proxy_dir,
            image: config
                .image
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            image_version: config
                .image_version
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_VERSION.to_string()),
            container_name: config
                .container_name
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string()),
            bundle: config
                .bundle
                .clone()
                .unwrap_or_else(|| DEFAULT_BUNDLE.to_string()),
            bundle_configuration: config
                .bundle_configuration
                .clone()
                .unwrap_or_else(|| DEFAULT_BUNDLE_CONFIGURATION.to_string()),
            default_ports: DEFAULT_PROXY_PORTS.to_vec(),
        }
    }

    /// `image:version`
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image, self.image_version)
    }

    /// Directory mounted read-only into the container.
    pub fn haproxy_cfg_dir(&self) -> PathBuf {
        self.proxy_dir.join("haproxy")
    }

    pub fn haproxy_cfg_path(&self) -> PathBuf {
        self.haproxy_cfg_dir().join("haproxy.cfg")
    }
}
