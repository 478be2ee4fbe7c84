//! The coordination key namespace.
//!
//! Everything this suite persists lives under `/couchbase.com`. Ephemeral
//! keys rely on the store's native TTL expiry for cleanup; nothing is
//! deleted explicitly.

pub const KEY_NODE_STATE: &str = "/couchbase.com/couchbase-node-state";
pub const KEY_USER_PASS: &str = "/couchbase.com/userpass";
pub const KEY_REMOVE_REBALANCE_DISABLED: &str = "/couchbase.com/remove-rebalance-disabled";
pub const KEY_SYNC_GW_NODE_STATE: &str = "/couchbase.com/sync-gw-node-state";
pub const KEY_SYNC_GW_CONFIG: &str = "/couchbase.com/sync-gateway/config";
pub const KEY_SYNC_GW_COMMIT: &str = "/couchbase.com/sync-gateway/commit";

/// Per-node liveness child under a node-state directory.
pub fn state_child(dir: &str, ip: &str) -> String {
    format!("{}/{}", dir, ip)
}

/// The trailing path segment of a coordination key; used to recover the
/// node IP from a node-state child key.
pub fn last_segment(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
