//! Bind address resolution for the sandbox and its proxy.
//!
//! Picks the address a local orchestrator or proxy should bind to and renders
//! the `ifconfig` commands an operator needs when loopback aliases are missing.

pub mod addr;
pub mod platform;
pub mod probe;

use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

use crate::docker::DockerAdapter;
use addr::{AddressRange, NetworkAddress};
use platform::{AliasFormatter, AliasInstructions, Platform};
use probe::Probe;

/// Checked before [`HOST_ENV`].
pub const IP_ENV: &str = "CONDUCTR_IP";
pub const HOST_ENV: &str = "CONDUCTR_HOST";

/// Bridge address of the local multi-node network, probed on its control port.
pub const DEFAULT_CANDIDATE: NetworkAddress =
    NetworkAddress::new(IpAddr::V4(Ipv4Addr::new(192, 168, 10, 1)), Some(9005));

/// Used when a VM-hosted Docker daemon cannot reach [`DEFAULT_CANDIDATE`].
pub const LOOPBACK_FALLBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

const ALIAS_HEADER: &str = "Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.";
const ALIAS_INSTRUCTION: &str = "Please run the following and then try your command again:";

/// Host override from the environment: [`IP_ENV`] first, then [`HOST_ENV`].
pub fn resolve_host_from_env() -> Option<String> {
    host_from_lookup(|key| std::env::var(key).ok())
}

fn host_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    [IP_ENV, HOST_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

/// Comma separated address list, in input order.
pub fn display_addrs(addrs: &[IpAddr]) -> String {
    addrs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Remediation text for missing aliases on the current platform.
pub fn addr_alias_setup_instructions(addrs: &[IpAddr], netmask: &IpAddr) -> String {
    alias_setup_instructions(&Platform::current().alias_formatter(), addrs, netmask)
}

/// Remediation text using a specific formatter.
pub fn alias_setup_instructions(
    formatter: &AliasFormatter,
    addrs: &[IpAddr],
    netmask: &IpAddr,
) -> String {
    match formatter.render(addrs, netmask) {
        AliasInstructions::Commands(lines) => {
            let mut out = format!("{}\n\n{}\n\n", ALIAS_HEADER, ALIAS_INSTRUCTION);
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
            out
        }
        AliasInstructions::Manual(sentence) => sentence,
    }
}

/// Resolves default bind addresses using the Docker backend and socket probes.
pub struct HostResolver<'a> {
    docker: &'a dyn DockerAdapter,
    probe: &'a dyn Probe,
}

impl<'a> HostResolver<'a> {
    pub fn new(docker: &'a dyn DockerAdapter, probe: &'a dyn Probe) -> Self {
        Self { docker, probe }
    }

    /// The default bind address.
    ///
    /// A VM-hosted Docker daemon can only use the candidate bridge address if
    /// something already answers there; otherwise loopback is the only
    /// reachable choice.
    pub fn resolve_default_ip(&self) -> IpAddr {
        let candidate = DEFAULT_CANDIDATE.ip();
        let vm_type = self.docker.vm_type();
        if vm_type.is_vm() {
            let port = DEFAULT_CANDIDATE.port().unwrap_or_default();
            if !self.probe.is_listening(candidate, port) {
                debug!(?vm_type, %candidate, "host:candidate unreachable, using loopback");
                return LOOPBACK_FALLBACK;
            }
        }
        debug!(?vm_type, %candidate, "host:default ip");
        candidate
    }

    pub fn resolve_default_host(&self) -> IpAddr {
        self.resolve_default_ip()
    }

    /// Environment override if set, otherwise the default host.
    pub fn resolve_host(&self) -> String {
        match resolve_host_from_env() {
            Some(host) => {
                debug!(%host, "host:from env");
                host
            }
            None => self.resolve_default_host().to_string(),
        }
    }

    /// The first `count` addresses of `range` that cannot be bound on `port`.
    pub fn find_missing_aliases(
        &self,
        range: &AddressRange,
        count: usize,
        port: u16,
    ) -> Vec<IpAddr> {
        range
            .host_addrs(count)
            .into_iter()
            .filter(|addr| !self.probe.can_bind(*addr, port))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::DockerVmType;
    use crate::docker::fake::FakeDocker;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Probe answering from fixed sets and recording what was asked.
    #[derive(Default)]
    struct ScriptedProbe {
        listening: bool,
        bindable: Vec<IpAddr>,
        asked: RefCell<Vec<(IpAddr, u16)>>,
    }

    impl Probe for ScriptedProbe {
        fn can_bind(&self, addr: IpAddr, port: u16) -> bool {
            self.asked.borrow_mut().push((addr, port));
            self.bindable.contains(&addr)
        }

        fn is_listening(&self, addr: IpAddr, port: u16) -> bool {
            self.asked.borrow_mut().push((addr, port));
            self.listening
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn vm_backend_without_listener_falls_back_to_loopback() {
        let docker = FakeDocker::engine().with_vm_type(DockerVmType::DockerMachine);
        let probe = ScriptedProbe::default();
        let resolver = HostResolver::new(&docker, &probe);

        assert_eq!(resolver.resolve_default_ip(), ip("127.0.0.1"));
        assert_eq!(*probe.asked.borrow(), vec![(ip("192.168.10.1"), 9005)]);
    }

    #[test]
    fn vm_backend_with_listener_uses_candidate() {
        let docker = FakeDocker::engine().with_vm_type(DockerVmType::DockerMachine);
        let probe = ScriptedProbe {
            listening: true,
            ..Default::default()
        };
        let resolver = HostResolver::new(&docker, &probe);

        assert_eq!(resolver.resolve_default_ip(), ip("192.168.10.1"));
        assert_eq!(*probe.asked.borrow(), vec![(ip("192.168.10.1"), 9005)]);
    }

    #[test]
    fn native_backend_uses_candidate_without_probing() {
        let docker = FakeDocker::engine();
        let probe = ScriptedProbe::default();
        let resolver = HostResolver::new(&docker, &probe);

        assert_eq!(resolver.resolve_default_ip(), ip("192.168.10.1"));
        assert!(probe.asked.borrow().is_empty());
    }

    #[test]
    fn no_docker_uses_candidate() {
        let docker = FakeDocker::absent();
        let probe = ScriptedProbe::default();
        let resolver = HostResolver::new(&docker, &probe);

        assert_eq!(resolver.resolve_default_host(), ip("192.168.10.1"));
    }

    #[test]
    fn env_ip_wins_over_host() {
        let env: HashMap<&str, &str> = [(IP_ENV, "10.0.0.5"), (HOST_ENV, "example.local")].into();
        let result = host_from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(result.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn env_host_used_when_ip_unset_or_empty() {
        let env: HashMap<&str, &str> = [(IP_ENV, ""), (HOST_ENV, "example.local")].into();
        let result = host_from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(result.as_deref(), Some("example.local"));
    }

    #[test]
    fn env_unset_yields_none() {
        assert_eq!(host_from_lookup(|_| None), None);
    }

    #[test]
    fn display_addrs_keeps_order() {
        let addrs = [ip("192.168.1.2"), ip("192.168.1.1")];
        assert_eq!(display_addrs(&addrs), "192.168.1.2, 192.168.1.1");
    }

    #[test]
    fn missing_aliases_are_unbindable_hosts() {
        let docker = FakeDocker::engine();
        let probe = ScriptedProbe {
            bindable: vec![ip("192.168.10.1")],
            ..Default::default()
        };
        let resolver = HostResolver::new(&docker, &probe);
        let range: AddressRange = "192.168.10.0/24".parse().unwrap();

        let missing = resolver.find_missing_aliases(&range, 3, 9004);
        assert_eq!(missing, vec![ip("192.168.10.2"), ip("192.168.10.3")]);
        assert!(probe.asked.borrow().iter().all(|(_, port)| *port == 9004));
    }

    fn ipv4_fixture() -> (Vec<IpAddr>, IpAddr) {
        let range: AddressRange = "192.168.1.0/24".parse().unwrap();
        (vec![ip("192.168.1.1"), ip("192.168.1.2")], range.netmask())
    }

    fn ipv6_fixture() -> (Vec<IpAddr>, IpAddr) {
        let range: AddressRange = "0:0:0:0:0:ffff:c0a8:101/128".parse().unwrap();
        (
            vec![ip("0:0:0:0:0:ffff:c0a8:101"), ip("0:0:0:0:0:ffff:c0a8:102")],
            range.netmask(),
        )
    }

    fn formatter(platform: Platform) -> AliasFormatter {
        AliasFormatter::for_platform(&platform, "ix0")
    }

    #[test]
    fn alias_instructions_linux_ipv4() {
        let (addrs, mask) = ipv4_fixture();
        let expected = "\
Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.

Please run the following and then try your command again:

sudo ifconfig ix0:0 192.168.1.1 netmask 255.255.255.0 up
sudo ifconfig ix0:1 192.168.1.2 netmask 255.255.255.0 up
";
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::Linux), &addrs, &mask),
            expected
        );
    }

    #[test]
    fn alias_instructions_linux_ipv6_are_exploded() {
        let (addrs, mask) = ipv6_fixture();
        let expected = "\
Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.

Please run the following and then try your command again:

sudo ifconfig ix0:0 0000:0000:0000:0000:0000:ffff:c0a8:0101 netmask ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff up
sudo ifconfig ix0:1 0000:0000:0000:0000:0000:ffff:c0a8:0102 netmask ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff up
";
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::Linux), &addrs, &mask),
            expected
        );
    }

    #[test]
    fn alias_instructions_macos_ipv4() {
        let (addrs, mask) = ipv4_fixture();
        let expected = "\
Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.

Please run the following and then try your command again:

sudo ifconfig ix0 alias 192.168.1.1 255.255.255.0
sudo ifconfig ix0 alias 192.168.1.2 255.255.255.0
";
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::MacOs), &addrs, &mask),
            expected
        );
    }

    #[test]
    fn alias_instructions_macos_ipv6() {
        let (addrs, mask) = ipv6_fixture();
        let expected = "\
Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.

Please run the following and then try your command again:

sudo ifconfig ix0 alias 0000:0000:0000:0000:0000:ffff:c0a8:0101 ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff
sudo ifconfig ix0 alias 0000:0000:0000:0000:0000:ffff:c0a8:0102 ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff
";
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::MacOs), &addrs, &mask),
            expected
        );
    }

    #[test]
    fn alias_instructions_unknown_os_ipv4() {
        let (addrs, mask) = ipv4_fixture();
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::Other("plan9".into())), &addrs, &mask),
            "Setup aliases for 192.168.1.1, 192.168.1.2 addresses with 255.255.255.0 subnet mask"
        );
    }

    #[test]
    fn alias_instructions_unknown_os_ipv6_uses_compressed_form() {
        let (addrs, mask) = ipv6_fixture();
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::Other("plan9".into())), &addrs, &mask),
            "Setup aliases for ::ffff:192.168.1.1, ::ffff:192.168.1.2 addresses with ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff subnet mask"
        );
    }

    #[test]
    fn alias_instructions_single_address() {
        let (addrs, mask) = ipv4_fixture();
        let expected = "\
Whoops. Network address aliases are required so that the sandbox can operate as a cluster of machines.

Please run the following and then try your command again:

sudo ifconfig ix0:0 192.168.1.1 netmask 255.255.255.0 up
";
        assert_eq!(
            alias_setup_instructions(&formatter(Platform::Linux), &addrs[..1], &mask),
            expected
        );
    }
}
