use std::time::Duration;

use tracing::{info, warn};

use crate::coord::{CoordClient, CoordError};

/// Publish liveness into the coordination store until the process dies.
///
/// Each iteration refreshes the TTL on the node-state directory (so the
/// whole namespace expires once the last node is gone, leaving a clean
/// slate), then writes this node's `ip:port` child with the same TTL, then
/// sleeps half the TTL. This is the only mechanism by which a node
/// advertises itself to its peers.
///
/// Errors are never fatal here; they are logged, and the first successful
/// publish after a failure is logged as a recovery.
pub async fn run(coord: &CoordClient, dir_key: &str, child_key: &str, value: &str, ttl_secs: u64) {
    info!(
        "heartbeat: publishing {}={} every {}s (ttl {}s)",
        child_key,
        value,
        ttl_secs / 2,
        ttl_secs
    );

    let mut last_err: Option<String> = None;

    loop {
        match coord.update_dir(dir_key, ttl_secs).await {
            Ok(()) => {}
            // The directory expires when every node was down longer than
            // the TTL; recreate it so our child write lands under a dir
            // that carries a TTL again.
            Err(CoordError::NotFound(_)) => {
                if let Err(e) = coord.create_dir(dir_key, Some(ttl_secs)).await {
                    warn!("heartbeat: failed to recreate {}: {}", dir_key, e);
                }
            }
            Err(e) => {
                warn!("heartbeat: failed to refresh ttl on {}: {}", dir_key, e);
            }
        }

        match coord.set(child_key, value, Some(ttl_secs)).await {
            Ok(()) => {
                if last_err.take().is_some() {
                    info!("heartbeat: publishing {} recovered", child_key);
                }
            }
            Err(e) => {
                warn!(
                    "heartbeat: failed to publish {}: {}, peers cannot discover this node until this resolves",
                    child_key, e
                );
                last_err = Some(e.to_string());
            }
        }

        tokio::time::sleep(Duration::from_secs(ttl_secs / 2)).await;
    }
}
