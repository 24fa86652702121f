// ABOUTME: Translates a manifest service into the engine's container configuration.
// ABOUTME: Applies ownership labels, resource defaults, network, and port/volume parsing.

use crate::config::Settings;
use crate::manifest::{ManifestError, ServiceDefinition};
use crate::runtime::{
    APP_LABEL, ContainerConfig, HealthcheckConfig, MANAGED_LABEL, OWNER_LABEL, PortMapping,
    Protocol, ResourceLimits, RestartPolicyConfig, SERVICE_LABEL, VolumeMount,
};
use crate::types::{AppName, ServiceName};

use super::service::deploy_name;

pub const DEFAULT_CPU_SHARES: u32 = 128;
pub const MIN_MEMORY: u64 = 16 * 1024 * 1024;
pub const MAX_MEMORY: u64 = 768 * 1024 * 1024;

/// Who is deploying what, and with which settings.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub app: &'a AppName,
    pub owner: &'a str,
    pub settings: &'a Settings,
}

/// Container configuration for one service under its temporary name.
///
/// The image is the declared one; the coordinator swaps in whatever
/// reference it actually pulled.
pub fn build_container_config(
    ctx: BuildContext<'_>,
    service: &ServiceName,
    def: &ServiceDefinition,
) -> Result<ContainerConfig, ManifestError> {
    let mut labels = def.labels.as_map().clone();
    labels.insert(APP_LABEL.to_string(), ctx.app.to_string());
    labels.insert(SERVICE_LABEL.to_string(), service.to_string());
    labels.insert(OWNER_LABEL.to_string(), ctx.owner.to_string());
    labels.insert(MANAGED_LABEL.to_string(), "true".to_string());

    let ports = def
        .ports
        .iter()
        .map(|p| {
            parse_port_mapping(p).ok_or_else(|| ManifestError::InvalidPort {
                service: service.to_string(),
                spec: p.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let volumes = def
        .volumes
        .iter()
        .map(|v| {
            parse_volume_mount(v).ok_or_else(|| ManifestError::InvalidVolume {
                service: service.to_string(),
                spec: v.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let memory = match &def.mem_limit {
        Some(limit) => limit.bytes().ok_or_else(|| ManifestError::InvalidMemory {
            service: service.to_string(),
        })?,
        None => MAX_MEMORY,
    };

    let restart_policy = def
        .restart
        .as_ref()
        .map(RestartPolicyConfig::from)
        .unwrap_or_default();

    let healthcheck: Option<HealthcheckConfig> =
        def.healthcheck.as_ref().map(|hc| hc.to_engine_config());

    Ok(ContainerConfig {
        name: deploy_name(ctx.app, service),
        image: def.image.clone(),
        env: def.environment.as_map().clone(),
        labels,
        ports,
        volumes,
        command: def.command.as_ref().map(|c| c.to_args()),
        entrypoint: def.entrypoint.as_ref().map(|e| e.to_args()),
        user: Some(
            def.user
                .clone()
                .unwrap_or_else(|| ctx.settings.container_user.clone()),
        ),
        restart_policy,
        resources: ResourceLimits {
            memory: Some(memory.clamp(MIN_MEMORY, MAX_MEMORY)),
            cpu_shares: Some(def.cpu_shares.unwrap_or(DEFAULT_CPU_SHARES)),
            cpus: None,
        },
        healthcheck,
        stop_timeout: def.stop_grace_period,
        read_only: def.read_only,
        network: Some(ctx.settings.network.clone()),
        network_aliases: vec![service.as_alias()],
    })
}

/// Parse a volume mount string like "source:target" or "source:target:ro".
fn parse_volume_mount(spec: &str) -> Option<VolumeMount> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (source, target, read_only) = match parts.as_slice() {
        [source, target] => (*source, *target, false),
        [source, target, mode] => (*source, *target, *mode == "ro"),
        _ => return None,
    };
    if source.is_empty() || !target.starts_with('/') {
        return None;
    }
    Some(VolumeMount {
        source: source.to_string(),
        target: target.to_string(),
        read_only,
    })
}

/// Parse "80", "8080:80", "127.0.0.1:8080:80", each with an optional "/udp".
fn parse_port_mapping(spec: &str) -> Option<PortMapping> {
    let (port_part, protocol) = match spec.split_once('/') {
        Some((ports, "udp")) => (ports, Protocol::Udp),
        Some((ports, "tcp")) => (ports, Protocol::Tcp),
        Some(_) => return None,
        None => (spec, Protocol::Tcp),
    };

    let parts: Vec<&str> = port_part.split(':').collect();
    let (host_ip, host_port, container_port) = match parts.as_slice() {
        [container] => (None, None, container.parse().ok()?),
        [host, container] => (None, Some(host.parse().ok()?), container.parse().ok()?),
        [ip, host, container] => (
            Some(ip.to_string()),
            Some(host.parse().ok()?),
            container.parse().ok()?,
        ),
        _ => return None,
    };

    Some(PortMapping {
        host_port,
        container_port,
        protocol,
        host_ip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn build(yaml: &str) -> Result<ContainerConfig, ManifestError> {
        let manifest = Manifest::parse(yaml.as_bytes()).unwrap();
        let (name, def) = manifest.services().next().unwrap();
        let app = AppName::new("shop").unwrap();
        let settings = Settings::default();
        build_container_config(
            BuildContext {
                app: &app,
                owner: "alice",
                settings: &settings,
            },
            name,
            def,
        )
    }

    #[test]
    fn applies_defaults_and_labels() {
        let config = build("services:\n  web:\n    image: app:1.0\n").unwrap();
        assert_eq!(config.name, "shop_web_deploy");
        assert_eq!(config.labels.get(APP_LABEL).map(String::as_str), Some("shop"));
        assert_eq!(config.labels.get(OWNER_LABEL).map(String::as_str), Some("alice"));
        assert_eq!(config.user.as_deref(), Some("1000"));
        assert_eq!(config.resources.cpu_shares, Some(DEFAULT_CPU_SHARES));
        assert_eq!(config.resources.memory, Some(MAX_MEMORY));
        assert_eq!(config.restart_policy, RestartPolicyConfig::default());
        assert_eq!(config.network.as_deref(), Some("traefik"));
        assert_eq!(config.network_aliases[0].as_str(), "web");
    }

    #[test]
    fn memory_is_clamped() {
        let small = build("services:\n  web:\n    image: app\n    mem_limit: 1m\n").unwrap();
        assert_eq!(small.resources.memory, Some(MIN_MEMORY));
        let large = build("services:\n  web:\n    image: app\n    mem_limit: 4g\n").unwrap();
        assert_eq!(large.resources.memory, Some(MAX_MEMORY));
        let fits = build("services:\n  web:\n    image: app\n    mem_limit: 256m\n").unwrap();
        assert_eq!(fits.resources.memory, Some(256 * 1024 * 1024));
    }

    #[test]
    fn manifest_labels_cannot_spoof_ownership() {
        let config = build(
            "services:\n  web:\n    image: app\n    labels:\n      swapdock.owner: mallory\n      tier: front\n",
        )
        .unwrap();
        assert_eq!(config.labels.get(OWNER_LABEL).map(String::as_str), Some("alice"));
        assert_eq!(config.labels.get("tier").map(String::as_str), Some("front"));
    }

    #[test]
    fn parses_port_forms() {
        assert_eq!(
            parse_port_mapping("8080:80"),
            Some(PortMapping {
                host_port: Some(8080),
                container_port: 80,
                protocol: Protocol::Tcp,
                host_ip: None,
            })
        );
        assert_eq!(parse_port_mapping("53/udp").unwrap().protocol, Protocol::Udp);
        assert_eq!(
            parse_port_mapping("127.0.0.1:8080:80").unwrap().host_ip.as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(parse_port_mapping("http"), None);
        assert_eq!(parse_port_mapping("80/sctp"), None);
    }

    #[test]
    fn parses_volume_forms() {
        let ro = parse_volume_mount("./conf:/etc/app:ro").unwrap();
        assert!(ro.read_only);
        assert!(!ro.is_named_volume());
        assert!(parse_volume_mount("data:/data").unwrap().is_named_volume());
        assert!(parse_volume_mount("/data").is_none());
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = build("services:\n  web:\n    image: app\n    ports: [\"abc\"]\n").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidPort { .. }));
    }
}
