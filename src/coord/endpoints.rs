//! Coordination endpoint resolution.
//!
//! Priority: explicit `--etcd-servers` list, then the Kubernetes-style
//! `<SERVICE>_SERVICE_HOST`/`<SERVICE>_SERVICE_PORT` environment pair, then
//! etcd on localhost.

use tracing::info;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";

pub fn resolve_endpoints(
    etcd_servers: Option<&str>,
    k8s_service_name: Option<&str>,
) -> Vec<String> {
    if let Some(list) = etcd_servers {
        let endpoints: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(normalize_endpoint)
            .collect();
        if !endpoints.is_empty() {
            info!("etcd: using explicit servers: {:?}", endpoints);
            return endpoints;
        }
    }

    if let Some(service) = k8s_service_name {
        if let Some(endpoint) = endpoint_from_k8s_env(service) {
            info!("etcd: resolved from k8s service {}: {}", service, endpoint);
            return vec![endpoint];
        }
    }

    info!("etcd: no servers given, defaulting to localhost");
    vec![DEFAULT_ENDPOINT.to_string()]
}

fn endpoint_from_k8s_env(service: &str) -> Option<String> {
    let prefix = service.to_uppercase().replace('-', "_");
    let host = std::env::var(format!("{}_SERVICE_HOST", prefix)).ok()?;
    let port = std::env::var(format!("{}_SERVICE_PORT", prefix)).ok()?;
    if host.is_empty() || port.is_empty() {
        return None;
    }
    Some(normalize_endpoint(&format!("{}:{}", host, port)))
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", endpoint.trim_end_matches('/'))
    }
}
