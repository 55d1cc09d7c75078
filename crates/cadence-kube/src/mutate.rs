//! Pod template mutation applied before a workload is submitted
//!
//! Mutators only touch the environment entries they own, on containers named
//! explicitly by the caller. They never perform I/O: configuration is fetched
//! by the builder and handed in. Applying a mutation twice leaves the pod spec
//! exactly as applying it once.

use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec};
use url::Url;

use crate::error::{KubeError, Result};

/// Annotation listing the containers that receive proxy settings
pub const INJECT_PROXY_ANNOTATION: &str = "config.openshift.io/inject-proxy";

pub const HTTP_PROXY_ENV: &str = "HTTP_PROXY";
pub const HTTPS_PROXY_ENV: &str = "HTTPS_PROXY";
pub const NO_PROXY_ENV: &str = "NO_PROXY";

pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
pub const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

/// Address of the internal API load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerAddress {
    pub host: String,
    /// Only set when the URL names a port explicitly
    pub port: Option<String>,
}

/// Split a comma-separated container list from an annotation value
pub fn parse_container_names(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Upsert `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` on the named containers
///
/// Empty values are still written. Names that match no container are ignored.
pub fn inject_proxy(
    pod_spec: &mut PodSpec,
    container_names: &[&str],
    http_proxy: &str,
    https_proxy: &str,
    no_proxy: &str,
) {
    for container in named_containers(pod_spec, container_names) {
        let env = container.env.get_or_insert_with(Vec::new);
        upsert_env(env, HTTP_PROXY_ENV, http_proxy);
        upsert_env(env, HTTPS_PROXY_ENV, https_proxy);
        upsert_env(env, NO_PROXY_ENV, no_proxy);
    }
}

/// Point the named containers at the internal API load balancer
///
/// Rewrites `KUBERNETES_SERVICE_HOST`, and `KUBERNETES_SERVICE_PORT` when a
/// port is given. An empty host leaves the pod spec untouched.
pub fn rewrite_service_host_env(
    pod_spec: &mut PodSpec,
    container_names: &[&str],
    host: &str,
    port: Option<&str>,
) {
    if host.is_empty() {
        return;
    }

    for container in named_containers(pod_spec, container_names) {
        let env = container.env.get_or_insert_with(Vec::new);
        upsert_env(env, SERVICE_HOST_ENV, host);
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            upsert_env(env, SERVICE_PORT_ENV, port);
        }
    }
}

/// Extract the load balancer host and explicit port from an internal API URL
///
/// Returns `None` when the URL is empty or carries no host, in which case no
/// substitution should happen. A port written in the URL is kept even when it
/// equals the scheme default.
pub fn parse_internal_api_url(raw: &str) -> Result<Option<LoadBalancerAddress>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let url = Url::parse(raw)
        .map_err(|e| KubeError::InvalidConfig(format!("internal API URL '{}': {}", raw, e)))?;

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.trim_start_matches('[').trim_end_matches(']'),
        _ => return Ok(None),
    };

    let port = if has_explicit_port(raw) {
        url.port_or_known_default()
    } else {
        None
    };

    Ok(Some(LoadBalancerAddress {
        host: host.to_string(),
        port: port.map(|p| p.to_string()),
    }))
}

/// Whether the authority of `raw` carries a `:port` suffix
///
/// `Url` drops ports equal to the scheme default, so this reads the input.
fn has_explicit_port(raw: &str) -> bool {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };

    after_host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty())
}

fn named_containers<'a>(
    pod_spec: &'a mut PodSpec,
    names: &'a [&'a str],
) -> impl Iterator<Item = &'a mut Container> + 'a {
    pod_spec
        .containers
        .iter_mut()
        .chain(pod_spec.init_containers.iter_mut().flatten())
        .filter(move |c| names.contains(&c.name.as_str()))
}

/// Leave exactly one `name` entry holding `value`, at the first existing position
fn upsert_env(env: &mut Vec<EnvVar>, name: &str, value: &str) {
    let entry = EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    };

    let mut seen = false;
    env.retain_mut(|e| {
        if e.name != name {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        *e = entry.clone();
        true
    });

    if !seen {
        env.push(entry);
    }
}
