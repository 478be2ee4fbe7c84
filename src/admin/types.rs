//! Typed views of the Couchbase admin REST payloads.
//!
//! Only the fields the orchestration logic reads are modelled. A missing
//! field is a decode error and is surfaced as a contract violation rather
//! than silently defaulted; the remote is expected to implement the
//! documented admin surface.

use serde::{Deserialize, Deserializer};

/// `GET /pools`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsRoot {
    #[serde(rename = "implementationVersion")]
    pub implementation_version: String,
}

/// `GET /pools/default`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolDetails {
    pub nodes: Vec<NodeInfo>,
}

/// One entry of the `nodes` array.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    /// `ip:port` of the node's admin endpoint.
    pub hostname: String,
    /// Opaque cluster-internal name, e.g. `ns_1@10.231.192.180`. Required
    /// when triggering a rebalance.
    #[serde(rename = "otpNode")]
    pub otp_node: String,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Healthy,
    Warmup,
    Other(String),
}

impl<'de> Deserialize<'de> for NodeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "healthy" => NodeStatus::Healthy,
            "warmup" => NodeStatus::Warmup,
            _ => NodeStatus::Other(raw),
        })
    }
}

/// One entry of `GET /pools/default/buckets`.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketInfo {
    pub name: String,
}

/// `GET /pools/default/rebalanceProgress`.
#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceProgress {
    pub status: String,
}

impl RebalanceProgress {
    /// A rebalance is considered finished only at the terminal status
    /// `none`; everything else counts as still running.
    pub fn is_running(&self) -> bool {
        self.status != "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pool_details() {
        let body = r#"{
            "name": "default",
            "nodes": [
                {"hostname": "10.231.192.180:8091",
                 "otpNode": "ns_1@10.231.192.180",
                 "status": "healthy",
                 "clusterMembership": "active"},
                {"hostname": "10.231.192.181:8091",
                 "otpNode": "ns_1@10.231.192.181",
                 "status": "warmup"}
            ],
            "rebalanceStatus": "none"
        }"#;
        let details: PoolDetails = serde_json::from_str(body).unwrap();
        assert_eq!(details.nodes.len(), 2);
        assert_eq!(details.nodes[0].status, NodeStatus::Healthy);
        assert_eq!(details.nodes[1].status, NodeStatus::Warmup);
        assert_eq!(details.nodes[0].otp_node, "ns_1@10.231.192.180");
    }

    #[test]
    fn unknown_status_is_preserved() {
        let node: NodeInfo = serde_json::from_str(
            r#"{"hostname": "10.0.0.1:8091", "otpNode": "ns_1@10.0.0.1", "status": "unhealthy"}"#,
        )
        .unwrap();
        assert_eq!(node.status, NodeStatus::Other("unhealthy".to_string()));
    }

    #[test]
    fn missing_otp_node_is_a_decode_error() {
        let result: Result<NodeInfo, _> =
            serde_json::from_str(r#"{"hostname": "10.0.0.1:8091", "status": "healthy"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decodes_version_and_rebalance() {
        let pools: PoolsRoot = serde_json::from_str(
            r#"{"implementationVersion": "3.0.1-1444-rel-community", "isAdminCreds": true}"#,
        )
        .unwrap();
        assert_eq!(pools.implementation_version, "3.0.1-1444-rel-community");

        let progress: RebalanceProgress = serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert!(progress.is_running());
        let progress: RebalanceProgress = serde_json::from_str(r#"{"status": "none"}"#).unwrap();
        assert!(!progress.is_running());
    }
}
