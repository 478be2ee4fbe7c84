//! Gateway config rewriting.
//!
//! The stored gateway config may reference the database by placeholder
//! instead of a fixed address. The rewrite subcommand resolves the
//! placeholder against whichever database node is currently live and
//! writes the rendered config where the gateway container expects it.

use std::path::Path;

use tracing::info;

use crate::coord::{keys, CoordClient};
use crate::error::ClusterError;
use crate::fleet::unit::{has_placeholders, render};
use crate::syncgw::cluster::find_couchbase_node;

/// The one binding the rewrite provides.
const VAR_COUCHBASE_SERVER_IP: &str = "COUCHBASE_SERVER_IP";

pub async fn fetch_sync_gw_config(coord: &CoordClient) -> Result<String, ClusterError> {
    let node = coord.get(keys::KEY_SYNC_GW_CONFIG).await?;
    Ok(node.value.unwrap_or_default())
}

/// Render the stored config against the live database node and write it to
/// `destination`. A config without placeholders needs no live node and no
/// rewrite; the call is a no-op then.
pub async fn rewrite_config(coord: &CoordClient, destination: &Path) -> Result<(), ClusterError> {
    let config = fetch_sync_gw_config(coord).await?;

    if !has_placeholders(&config) {
        info!("syncgw: stored config has no placeholders, nothing to rewrite");
        return Ok(());
    }

    let live = find_couchbase_node(coord)
        .await?
        .ok_or(ClusterError::NoLiveNode)?;
    info!("syncgw: rendering config against live node {}", live.ip);

    let rendered = render(&config, &[(VAR_COUCHBASE_SERVER_IP, live.ip.as_str())])?;
    std::fs::write(destination, rendered)?;
    info!("syncgw: wrote rendered config to {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fleet::unit::{has_placeholders, render};

    const TEMPLATED_CONFIG: &str = r#"{
        "interface": ":4984",
        "databases": {
            "db": {"server": "http://{{COUCHBASE_SERVER_IP}}:8091", "bucket": "default"}
        }
    }"#;

    #[test]
    fn placeholder_config_renders_against_ip() {
        assert!(has_placeholders(TEMPLATED_CONFIG));
        let rendered = render(TEMPLATED_CONFIG, &[("COUCHBASE_SERVER_IP", "10.0.0.7")]).unwrap();
        assert!(rendered.contains("http://10.0.0.7:8091"));
        assert!(!has_placeholders(&rendered));
    }

    #[test]
    fn plain_config_is_detected_as_placeholder_free() {
        let config = r#"{"databases": {"db": {"server": "walrus:"}}}"#;
        assert!(!has_placeholders(config));
    }
}
