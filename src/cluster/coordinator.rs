use tracing::{debug, info, warn};

use crate::admin::{
    AdminClient, AdminCredentials, BucketInfo, CredentialOrder, NodeStatus, PoolDetails, PoolsRoot,
    RebalanceProgress,
};
use crate::cluster::{heartbeat, ram};
use crate::coord::{keys, ChildNode, CoordClient, CoordError, DirCreate};
use crate::error::ClusterError;
use crate::netutil::split_host_port;
use crate::retry::{self, retry_loop, retry_loop_transient};

pub const LOCAL_COUCHBASE_PORT: u16 = 8091;
pub const HEARTBEAT_TTL_SECS: u64 = 10;

const DEFAULT_BUCKET_RAM_MB: u32 = 128;
const DEFAULT_BUCKET_REPLICAS: u32 = 1;
const FALLBACK_CLUSTER_RAM_MB: u32 = 1024;

const MAX_RETRIES_JOIN_CLUSTER: u32 = 10;
const MAX_RETRIES_FETCH_DETAILS: u32 = 10;
const MAX_RETRIES_HEALTHY: u32 = 25;
const MAX_RETRIES_REBALANCE_DONE: u32 = 500;

/// A reachable cluster node, as advertised through the coordination store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveNode {
    pub ip: String,
    pub port: u16,
}

impl LiveNode {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    pub fn hostport(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Parameters of a bucket to create through the admin API.
#[derive(Debug, Clone)]
pub struct BucketSpec {
    pub name: String,
    pub ram_mb: u32,
    pub replicas: u32,
}

impl BucketSpec {
    pub fn default_bucket() -> Self {
        Self {
            name: "default".to_string(),
            ram_mb: DEFAULT_BUCKET_RAM_MB,
            replicas: DEFAULT_BUCKET_REPLICAS,
        }
    }
}

/// Read the cluster admin credentials from the coordination store,
/// retrying while the launcher may not have written them yet. A stored
/// value equal to the factory defaults is refused outright.
pub async fn load_admin_credentials(coord: &CoordClient) -> Result<AdminCredentials, ClusterError> {
    let coord = coord.clone();
    retry_loop(
        move || {
            let coord = coord.clone();
            async move {
                match coord.get(keys::KEY_USER_PASS).await {
                    Ok(node) => {
                        let raw = node.value.unwrap_or_default();
                        AdminCredentials::parse(&raw).map(Some)
                    }
                    Err(e) => {
                        warn!(
                            "cluster: could not read {} yet: {}, will retry",
                            keys::KEY_USER_PASS,
                            e
                        );
                        Ok(None)
                    }
                }
            }
        },
        retry::fixed(MAX_RETRIES_JOIN_CLUSTER, 10),
    )
    .await
}

/// Leading integer of an `implementationVersion` string, e.g. `3` for
/// `3.0.1-1444-rel-community`.
fn major_version_of(version: &str) -> Option<u32> {
    version.chars().next().and_then(|c| c.to_digit(10))
}

/// Recover the `ip:port` a node advertised. The heartbeat stores the full
/// endpoint in the value; the child key alone only carries the IP, so the
/// default admin port is assumed when the value is unusable.
fn advertised_node(child: &ChildNode) -> LiveNode {
    match child.value.as_deref().and_then(split_host_port) {
        Some((ip, port)) => LiveNode {
            ip: ip.to_string(),
            port,
        },
        None => LiveNode {
            ip: child.key.clone(),
            port: LOCAL_COUCHBASE_PORT,
        },
    }
}

async fn find_live_node_excluding(
    coord: &CoordClient,
    admin: &AdminClient,
    exclude_ip: Option<&str>,
) -> Result<Option<LiveNode>, ClusterError> {
    let children = match coord.list(keys::KEY_NODE_STATE).await {
        Ok(children) => children,
        Err(CoordError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    for child in &children {
        let node = advertised_node(child);
        if exclude_ip == Some(node.ip.as_str()) {
            continue;
        }
        if !admin.verify_rest_endpoint(&node.ip, node.port).await {
            info!(
                "cluster: node {} advertised but REST endpoint not answering, skipping",
                node.hostport()
            );
            continue;
        }
        return Ok(Some(node));
    }

    Ok(None)
}

/// First advertised node whose REST endpoint answers, in the store's
/// listing order. `None` when nothing is advertised or reachable.
pub async fn find_live_node(
    coord: &CoordClient,
    admin: &AdminClient,
) -> Result<Option<LiveNode>, ClusterError> {
    find_live_node_excluding(coord, admin, None).await
}

/// Like [`find_live_node`], but prefers a node other than `local_ip`.
/// Ejecting a node through its own admin endpoint mid-rebalance is dubious,
/// so removal coordinates through a peer whenever one answers.
pub async fn find_live_peer(
    coord: &CoordClient,
    admin: &AdminClient,
    local_ip: &str,
) -> Result<Option<LiveNode>, ClusterError> {
    if let Some(peer) = find_live_node_excluding(coord, admin, Some(local_ip)).await? {
        return Ok(Some(peer));
    }
    find_live_node_excluding(coord, admin, None).await
}

/// Coordinates one Couchbase node's participation in the cluster: founder
/// election, first-time initialization, joining, rebalance, removal, and
/// the membership health queries the launchers poll.
///
/// Cheaply cloneable; retry workers operate on clones.
#[derive(Clone)]
pub struct CouchbaseCluster {
    coord: CoordClient,
    admin: AdminClient,
    local: Option<LiveNode>,
    version: Option<String>,
}

impl CouchbaseCluster {
    pub fn new(coord: CoordClient, credentials: AdminCredentials) -> Self {
        Self {
            coord,
            admin: AdminClient::new(credentials),
            local: None,
            version: None,
        }
    }

    /// Set the advertised local node, using the default admin port.
    pub fn with_local_node(self, ip: impl Into<String>) -> Self {
        self.with_local_endpoint(ip, LOCAL_COUCHBASE_PORT)
    }

    pub fn with_local_endpoint(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.local = Some(LiveNode {
            ip: ip.into(),
            port,
        });
        self
    }

    pub fn coord(&self) -> &CoordClient {
        &self.coord
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    fn local(&self) -> Result<&LiveNode, ClusterError> {
        self.local
            .as_ref()
            .ok_or_else(|| ClusterError::Config("local node IP is not set".to_string()))
    }

    /// Run the sidekick state machine: elect or join, then heartbeat
    /// forever. Only returns on a bootstrap error.
    pub async fn start_couchbase_sidekick(&mut self) -> Result<(), ClusterError> {
        let local = self.local()?.clone();

        let founder = self.become_first_cluster_node().await?;
        self.fetch_cluster_details().await?;

        if founder {
            info!("cluster: we are the first node, initializing cluster and default bucket");
            self.cluster_init().await?;
            self.create_default_bucket().await?;
        } else {
            self.join_existing_cluster().await?;
        }

        heartbeat::run(
            &self.coord,
            keys::KEY_NODE_STATE,
            &keys::state_child(keys::KEY_NODE_STATE, &local.ip),
            &local.hostport(),
            HEARTBEAT_TTL_SECS,
        )
        .await;

        Err(ClusterError::Config(
            "heartbeat loop exited unexpectedly".to_string(),
        ))
    }

    /// Founder election: an atomic directory create on the node-state key.
    /// Created with no TTL; the heartbeat starts refreshing it with a short
    /// one once bootstrap completes.
    pub async fn become_first_cluster_node(&self) -> Result<bool, ClusterError> {
        match self.coord.create_dir(keys::KEY_NODE_STATE, None).await? {
            DirCreate::Created => {
                info!("cluster: created {}, we are the founder", keys::KEY_NODE_STATE);
                Ok(true)
            }
            DirCreate::AlreadyExists => {
                info!(
                    "cluster: {} already exists, joining as a later node",
                    keys::KEY_NODE_STATE
                );
                Ok(false)
            }
        }
    }

    /// Poll the local `/pools` endpoint until the server answers with its
    /// version. The server may still be starting, so transport failures
    /// are retried; a payload without the version field is a contract
    /// violation and aborts.
    pub async fn fetch_cluster_details(&mut self) -> Result<(), ClusterError> {
        let url = format!("{}/pools", self.local()?.base_url());
        let admin = self.admin.clone();

        let version = retry_loop(
            move || {
                let admin = admin.clone();
                let url = url.clone();
                async move {
                    match admin.get_json::<PoolsRoot>(&url).await {
                        Ok(pools) => Ok(Some(pools.implementation_version)),
                        Err(e) if e.is_transient_remote() => {
                            warn!(
                                "cluster: {} not answering yet ({}), assuming the server is still starting",
                                url, e
                            );
                            Ok(None)
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            retry::fixed(MAX_RETRIES_FETCH_DETAILS, 10),
        )
        .await?;

        info!("cluster: couchbase version {}", version);
        self.version = Some(version);
        Ok(())
    }

    pub fn major_version(&self) -> Result<u32, ClusterError> {
        let version = self.version.as_deref().unwrap_or_default();
        major_version_of(version).ok_or_else(|| {
            ClusterError::RemoteContract(format!(
                "cannot determine major version from {:?}",
                version
            ))
        })
    }

    /// One-time cluster initialization, idempotent: a 401 from the
    /// settings endpoint under factory credentials means a password was
    /// already set and there is nothing to do.
    pub async fn cluster_init(&self) -> Result<(), ClusterError> {
        let base = self.local()?.base_url();
        if self.admin.is_password_set(&base).await? {
            info!("cluster: password already set, skipping initialization");
            return Ok(());
        }

        self.set_cluster_password().await?;

        // 3.x additionally wants an explicit cluster RAM quota.
        if self.major_version()? >= 3 {
            self.set_cluster_ram().await?;
        }

        Ok(())
    }

    async fn set_cluster_password(&self) -> Result<(), ClusterError> {
        let local = self.local()?.clone();
        let url = format!("{}/settings/web", local.base_url());
        let creds = self.admin.stored_credentials().clone();
        let port = local.port.to_string();

        info!("cluster: setting admin credentials for {}", creds.username);
        self.admin
            .post_form(
                CredentialOrder::TryDefaultFirst,
                &url,
                &[
                    ("username", creds.username.as_str()),
                    ("password", creds.password.as_str()),
                    ("port", port.as_str()),
                ],
            )
            .await
    }

    pub async fn set_cluster_ram(&self) -> Result<(), ClusterError> {
        let ram_mb = match ram::cluster_ram_mb().await {
            Ok(mb) => mb,
            Err(e) => {
                warn!(
                    "cluster: failed to calculate cluster RAM ({}), defaulting to {} MB",
                    e, FALLBACK_CLUSTER_RAM_MB
                );
                FALLBACK_CLUSTER_RAM_MB
            }
        };

        info!("cluster: setting cluster RAM quota to {} MB", ram_mb);
        let url = format!("{}/pools/default", self.local()?.base_url());
        let ram = ram_mb.to_string();
        self.admin
            .post_form(
                CredentialOrder::TryStoredFirst,
                &url,
                &[("memoryQuota", ram.as_str())],
            )
            .await
    }

    /// Idempotent over the set of existing bucket names.
    pub async fn create_default_bucket(&self) -> Result<(), ClusterError> {
        let local = self.local()?.clone();
        let url = format!("{}/pools/default/buckets", local.base_url());
        let buckets: Vec<BucketInfo> = self.admin.get_json(&url).await?;

        if buckets.iter().any(|b| b.name == "default") {
            info!("cluster: default bucket already exists, nothing to do");
            return Ok(());
        }

        self.create_bucket_on(&local, &BucketSpec::default_bucket())
            .await
    }

    pub async fn create_bucket_on(
        &self,
        node: &LiveNode,
        spec: &BucketSpec,
    ) -> Result<(), ClusterError> {
        info!(
            "cluster: creating bucket {} ({} MB, {} replicas) via {}",
            spec.name,
            spec.ram_mb,
            spec.replicas,
            node.hostport()
        );
        let url = format!("{}/pools/default/buckets", node.base_url());
        let ram = spec.ram_mb.to_string();
        let replicas = spec.replicas.to_string();
        self.admin
            .post_form(
                CredentialOrder::TryStoredFirst,
                &url,
                &[
                    ("name", spec.name.as_str()),
                    ("ramQuotaMB", ram.as_str()),
                    ("authType", "none"),
                    ("replicaNumber", replicas.as_str()),
                    ("proxyPort", "11215"),
                ],
            )
            .await
    }

    pub async fn find_live_node(&self) -> Result<Option<LiveNode>, ClusterError> {
        find_live_node(&self.coord, &self.admin).await
    }

    /// Discover a live peer (retrying while the founder may still be
    /// bootstrapping) and add ourselves to its cluster.
    pub async fn join_existing_cluster(&self) -> Result<(), ClusterError> {
        info!("cluster: joining existing cluster");

        let this = self.clone();
        let live = retry_loop_transient(
            move || {
                let this = this.clone();
                async move {
                    let found = this.find_live_node().await?;
                    if found.is_none() {
                        info!("cluster: no live node yet, will retry");
                    }
                    Ok(found)
                }
            },
            retry::linear_backoff(MAX_RETRIES_JOIN_CLUSTER, 10),
        )
        .await?;

        self.join_live_node(&live).await
    }

    /// Join through a live node: wait to become a healthy member, adding
    /// ourselves first if the cluster does not know us yet, then rebalance
    /// once no other rebalance is running.
    pub async fn join_live_node(&self, live: &LiveNode) -> Result<(), ClusterError> {
        info!("cluster: joining via live node {}", live.hostport());

        if let Err(e) = self.wait_until_in_cluster_and_healthy(live).await {
            info!("cluster: not yet a healthy member ({}), adding this node", e);
            self.add_node_retry(live).await?;
        } else {
            info!("cluster: already a healthy member");
        }

        self.wait_until_no_rebalance_running(live, 5).await?;

        // TODO: coordinate so that N nodes arriving together trigger a
        // single rebalance instead of N.
        self.trigger_rebalance(live).await
    }

    pub async fn cluster_nodes(&self, live: &LiveNode) -> Result<Vec<crate::admin::NodeInfo>, ClusterError> {
        let details: PoolDetails = self
            .admin
            .get_json(&format!("{}/pools/default", live.base_url()))
            .await?;
        Ok(details.nodes)
    }

    /// The cluster's view of the local node, or `None` while it is not a
    /// member.
    pub async fn local_cluster_node(
        &self,
        live: &LiveNode,
    ) -> Result<Option<crate::admin::NodeInfo>, ClusterError> {
        let local_ip = self.local()?.ip.clone();
        let nodes = self.cluster_nodes(live).await?;
        Ok(nodes.into_iter().find(|n| n.hostname.contains(&local_ip)))
    }

    pub async fn otp_node_list(&self, live: &LiveNode) -> Result<Vec<String>, ClusterError> {
        let nodes = self.cluster_nodes(live).await?;
        Ok(nodes.into_iter().map(|n| n.otp_node).collect())
    }

    pub async fn local_otp_node(&self, live: &LiveNode) -> Result<String, ClusterError> {
        let local_ip = self.local()?.ip.clone();
        let otp_nodes = self.otp_node_list(live).await?;
        otp_nodes
            .into_iter()
            .find(|otp| otp.contains(&local_ip))
            .ok_or(ClusterError::NodeNotInCluster(local_ip))
    }

    pub async fn wait_until_in_cluster_and_healthy(
        &self,
        live: &LiveNode,
    ) -> Result<(), ClusterError> {
        let this = self.clone();
        let live = live.clone();
        let local_ip = self.local()?.ip.clone();

        retry_loop(
            move || {
                let this = this.clone();
                let live = live.clone();
                let local_ip = local_ip.clone();
                async move {
                    let node = this
                        .local_cluster_node(&live)
                        .await?
                        .ok_or(ClusterError::NodeNotInCluster(local_ip))?;
                    match node.status {
                        NodeStatus::Healthy => Ok(Some(())),
                        NodeStatus::Warmup => {
                            info!("cluster: node is warming up, waiting");
                            Ok(None)
                        }
                        NodeStatus::Other(s) => Err(ClusterError::RemoteContract(format!(
                            "unexpected node status: {}",
                            s
                        ))),
                    }
                }
            },
            retry::fixed(MAX_RETRIES_HEALTHY, 10),
        )
        .await
    }

    /// Ask a live node to adopt the local one. A reply complaining that the
    /// node is already part of the cluster is a success.
    pub async fn add_node(&self, live: &LiveNode) -> Result<(), ClusterError> {
        let local_ip = self.local()?.ip.clone();
        let creds = self.admin.stored_credentials().clone();
        let url = format!("{}/controller/addNode", live.base_url());

        info!("cluster: addNode {} via {}", local_ip, live.hostport());
        let result = self
            .admin
            .post_form(
                CredentialOrder::TryStoredFirst,
                &url,
                &[
                    ("hostname", local_ip.as_str()),
                    ("user", creds.username.as_str()),
                    ("password", creds.password.as_str()),
                ],
            )
            .await;

        match result {
            Err(ClusterError::RemoteStatus { ref body, .. })
                if body.contains("Node is already part of cluster") =>
            {
                info!("cluster: node already part of cluster, nothing to add");
                Ok(())
            }
            other => other,
        }
    }

    /// addNode is flaky on a busy cluster (spurious 400s have been seen in
    /// the wild), so it gets its own bounded retry.
    pub async fn add_node_retry(&self, live: &LiveNode) -> Result<(), ClusterError> {
        let this = self.clone();
        let live = live.clone();
        retry_loop_transient(
            move || {
                let this = this.clone();
                let live = live.clone();
                async move { this.add_node(&live).await.map(Some) }
            },
            retry::linear_backoff(MAX_RETRIES_JOIN_CLUSTER, 10),
        )
        .await
    }

    pub async fn is_rebalancing(&self, live: &LiveNode) -> Result<bool, ClusterError> {
        let progress: RebalanceProgress = self
            .admin
            .get_json(&format!("{}/pools/default/rebalanceProgress", live.base_url()))
            .await?;
        Ok(progress.is_running())
    }

    pub async fn wait_until_no_rebalance_running(
        &self,
        live: &LiveNode,
        sleep_secs: u64,
    ) -> Result<(), ClusterError> {
        let this = self.clone();
        let live = live.clone();
        retry_loop(
            move || {
                let this = this.clone();
                let live = live.clone();
                async move {
                    if this.is_rebalancing(&live).await? {
                        debug!("cluster: rebalance still running");
                        Ok(None)
                    } else {
                        Ok(Some(()))
                    }
                }
            },
            retry::fixed(MAX_RETRIES_REBALANCE_DONE, sleep_secs),
        )
        .await
    }

    /// Rebalance with the full known-node set and no ejections.
    pub async fn trigger_rebalance(&self, live: &LiveNode) -> Result<(), ClusterError> {
        let known = self.otp_node_list(live).await?.join(",");
        info!("cluster: triggering rebalance, knownNodes={}", known);

        let url = format!("{}/controller/rebalance", live.base_url());
        self.admin
            .post_form(
                CredentialOrder::TryStoredFirst,
                &url,
                &[("ejectedNodes", ""), ("knownNodes", known.as_str())],
            )
            .await
    }

    /// Rebalance the local node out of the cluster.
    pub async fn trigger_rebalance_remove_local(
        &self,
        live: &LiveNode,
    ) -> Result<(), ClusterError> {
        let known = self.otp_node_list(live).await?.join(",");
        let ejected = self.local_otp_node(live).await?;
        info!(
            "cluster: rebalancing out {}, knownNodes={}",
            ejected, known
        );

        let url = format!("{}/controller/rebalance", live.base_url());
        self.admin
            .post_form(
                CredentialOrder::TryStoredFirst,
                &url,
                &[
                    ("ejectedNodes", ejected.as_str()),
                    ("knownNodes", known.as_str()),
                ],
            )
            .await
    }

    /// Graceful removal on shutdown: eject the local node and wait for the
    /// rebalance to settle. Skipped entirely while the launcher's
    /// remove-disable flag is present (mass teardown in progress).
    pub async fn remove_and_rebalance(&self) -> Result<(), ClusterError> {
        if self.remove_rebalance_disabled().await {
            info!("cluster: remove-and-rebalance is disabled, skipping");
            return Ok(());
        }

        let local_ip = self.local()?.ip.clone();
        let live = find_live_peer(&self.coord, &self.admin, &local_ip)
            .await?
            .ok_or(ClusterError::NoLiveNode)?;
        if live.ip == local_ip {
            warn!("cluster: no live peer found, coordinating removal through the local node");
        }

        self.trigger_rebalance_remove_local(&live).await?;
        self.wait_until_no_rebalance_running(&live, 5).await
    }

    /// Presence of the flag key disables graceful removal. Only a typed
    /// not-found answer means absent; any other failure is logged and
    /// treated as absent rather than blocking shutdown.
    pub async fn remove_rebalance_disabled(&self) -> bool {
        match self.coord.get(keys::KEY_REMOVE_REBALANCE_DISABLED).await {
            Ok(_) => true,
            Err(CoordError::NotFound(_)) => false,
            Err(e) => {
                warn!(
                    "cluster: could not check {}: {}, proceeding with removal",
                    keys::KEY_REMOVE_REBALANCE_DISABLED,
                    e
                );
                false
            }
        }
    }

    /// True iff the cluster has at least `min_nodes` members (when given)
    /// and every member reports healthy.
    pub async fn check_num_nodes_cluster_healthy(
        &self,
        min_nodes: Option<usize>,
        live: &LiveNode,
    ) -> Result<bool, ClusterError> {
        let nodes = self.cluster_nodes(live).await?;

        if let Some(min) = min_nodes {
            if nodes.len() < min {
                info!("cluster: {} of {} expected nodes present", nodes.len(), min);
                return Ok(false);
            }
        }

        for node in &nodes {
            if node.status != NodeStatus::Healthy {
                info!(
                    "cluster: node {} not healthy yet (status {:?})",
                    node.hostname, node.status
                );
                return Ok(false);
            }
        }

        debug!("cluster: all {} nodes healthy", nodes.len());
        Ok(true)
    }

    pub async fn wait_until_cluster_running(&self, max_attempts: u32) -> Result<(), ClusterError> {
        self.wait_until_nodes_running(None, max_attempts).await
    }

    pub async fn wait_until_num_nodes_running(
        &self,
        num_nodes: usize,
        max_attempts: u32,
    ) -> Result<(), ClusterError> {
        self.wait_until_nodes_running(Some(num_nodes), max_attempts)
            .await
    }

    async fn wait_until_nodes_running(
        &self,
        min_nodes: Option<usize>,
        max_attempts: u32,
    ) -> Result<(), ClusterError> {
        let this = self.clone();
        retry_loop_transient(
            move || {
                let this = this.clone();
                async move {
                    let live = match this.find_live_node().await? {
                        Some(live) => live,
                        None => {
                            info!("cluster: no live node found yet, will retry");
                            return Ok(None);
                        }
                    };
                    let healthy = this
                        .check_num_nodes_cluster_healthy(min_nodes, &live)
                        .await?;
                    Ok(healthy.then_some(()))
                }
            },
            retry::capped_linear_backoff(max_attempts, 10, 300),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(key: &str, value: Option<&str>) -> ChildNode {
        ChildNode {
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn advertised_node_prefers_value_endpoint() {
        let node = advertised_node(&child("10.0.0.1", Some("10.0.0.1:9091")));
        assert_eq!(
            node,
            LiveNode {
                ip: "10.0.0.1".to_string(),
                port: 9091
            }
        );
    }

    #[test]
    fn advertised_node_falls_back_to_key_and_default_port() {
        let node = advertised_node(&child("10.0.0.2", None));
        assert_eq!(node.ip, "10.0.0.2");
        assert_eq!(node.port, LOCAL_COUCHBASE_PORT);

        let node = advertised_node(&child("10.0.0.3", Some("garbage")));
        assert_eq!(node.ip, "10.0.0.3");
        assert_eq!(node.port, LOCAL_COUCHBASE_PORT);
    }

    #[test]
    fn major_version_parses_leading_digit() {
        assert_eq!(major_version_of("3.0.1-1444-rel-community"), Some(3));
        assert_eq!(major_version_of("2.2.0"), Some(2));
        assert_eq!(major_version_of(""), None);
        assert_eq!(major_version_of("beta-1"), None);
    }
}
