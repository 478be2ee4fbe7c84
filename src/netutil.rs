use crate::error::ClusterError;

/// Discover the IP this node should advertise to its peers.
///
/// Container schedulers usually inject the address via environment; a
/// plain interface scan is the fallback for bare-metal CoreOS hosts.
pub fn discover_local_ip() -> Result<String, ClusterError> {
    for var in ["COUCHBASE_LOCAL_IP", "POD_IP", "HOST_IP"] {
        if let Ok(ip) = std::env::var(var) {
            if !ip.is_empty() {
                return Ok(ip);
            }
        }
    }

    for iface in pnet_datalink::interfaces() {
        for ip in iface.ips {
            if let ipnetwork::IpNetwork::V4(ipv4) = ip {
                let addr = ipv4.ip();
                if !addr.is_loopback() && !addr.is_link_local() {
                    return Ok(addr.to_string());
                }
            }
        }
    }

    Err(ClusterError::Config(
        "failed to discover local IP, set COUCHBASE_LOCAL_IP or HOST_IP env".to_string(),
    ))
}

/// Split a `host:port` string. Returns `None` when there is no colon or the
/// port does not parse.
pub fn split_host_port(s: &str) -> Option<(&str, u16)> {
    let (host, port) = s.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_host_port_valid() {
        assert_eq!(split_host_port("10.0.0.1:8091"), Some(("10.0.0.1", 8091)));
    }

    #[test]
    fn split_host_port_rejects_bare_host() {
        assert_eq!(split_host_port("10.0.0.1"), None);
        assert_eq!(split_host_port(":8091"), None);
        assert_eq!(split_host_port("10.0.0.1:notaport"), None);
    }
}
