//! Operating system and architecture detection, and per-OS network command syntax.

use std::net::IpAddr;

use super::addr::exploded;

/// Host operating system, as far as alias setup is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    /// Anything else, carrying the OS name for messages.
    Other(String),
}

impl Platform {
    /// Detect the platform this binary was built for.
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an `std::env::consts::OS` style name to a platform.
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            other => Platform::Other(other.to_string()),
        }
    }

    /// Name of the loopback interface. Other platforms get `lo` as a placeholder.
    pub fn loopback_device_name(&self) -> &'static str {
        match self {
            Platform::MacOs => "lo0",
            Platform::Linux | Platform::Other(_) => "lo",
        }
    }

    /// Formatter for alias setup on this platform's loopback device.
    pub fn alias_formatter(&self) -> AliasFormatter {
        AliasFormatter::for_platform(self, self.loopback_device_name())
    }
}

/// CPU architecture this binary was built for, e.g. `x86_64` or `aarch64`.
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// What an operator has to do to add address aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasInstructions {
    /// Shell commands to run, one per address.
    Commands(Vec<String>),
    /// Prose for platforms without a known command.
    Manual(String),
}

/// Alias command syntax, one variant per supported `ifconfig` dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasFormatter {
    /// `ifconfig lo:0 <addr> netmask <mask> up`
    Linux { device: String },
    /// `ifconfig lo0 alias <addr> <mask>`
    MacOs { device: String },
    /// No known command syntax.
    Manual,
}

impl AliasFormatter {
    pub fn for_platform(platform: &Platform, device: &str) -> Self {
        match platform {
            Platform::Linux => AliasFormatter::Linux {
                device: device.to_string(),
            },
            Platform::MacOs => AliasFormatter::MacOs {
                device: device.to_string(),
            },
            Platform::Other(_) => AliasFormatter::Manual,
        }
    }

    pub fn render(&self, addrs: &[IpAddr], netmask: &IpAddr) -> AliasInstructions {
        match self {
            AliasFormatter::Linux { device } => AliasInstructions::Commands(
                addrs
                    .iter()
                    .enumerate()
                    .map(|(idx, addr)| {
                        format!(
                            "sudo ifconfig {}:{} {} netmask {} up",
                            device,
                            idx,
                            exploded(addr),
                            exploded(netmask)
                        )
                    })
                    .collect(),
            ),
            AliasFormatter::MacOs { device } => AliasInstructions::Commands(
                addrs
                    .iter()
                    .map(|addr| {
                        format!(
                            "sudo ifconfig {} alias {} {}",
                            device,
                            exploded(addr),
                            exploded(netmask)
                        )
                    })
                    .collect(),
            ),
            AliasFormatter::Manual => AliasInstructions::Manual(format!(
                "Setup aliases for {} addresses with {} subnet mask",
                super::display_addrs(addrs),
                netmask
            )),
        }
    }
}
