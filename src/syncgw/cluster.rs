use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tracing::info;

use crate::cluster::{
    find_live_node, heartbeat, load_admin_credentials, BucketSpec, CouchbaseCluster,
    HEARTBEAT_TTL_SECS,
};
use crate::coord::{keys, ChildNode, CoordClient, CoordError};
use crate::error::ClusterError;
use crate::fleet::client::{FleetClient, UnitSubmission};
use crate::fleet::unit::{self, UnitOption};
use crate::netutil::split_host_port;
use crate::retry::{self, retry_loop_transient};

pub const SYNC_GW_PUBLIC_PORT: u16 = 4984;
pub const GATEWAY_UNIT_PREFIX: &str = "sync_gw_node";
pub const GATEWAY_SIDEKICK_UNIT_PREFIX: &str = "sync_gw_sidekick";

const GATEWAY_UNIT_TEMPLATE: &str = include_str!("templates/sync_gw_node@.service");
const GATEWAY_SIDEKICK_UNIT_TEMPLATE: &str = include_str!("templates/sync_gw_sidekick@.service");

/// Default gateway code revision: whatever the docker image was built from.
const DEFAULT_COMMIT: &str = "image";

const MAX_GATEWAY_WAIT_ATTEMPTS: u32 = 500;
const GATEWAY_PROBE_CONCURRENCY: usize = 4;
const MAX_COUCHBASE_WAIT_ATTEMPTS: u32 = 10000;

/// Bootstraps the stateless sync gateway tier in front of an (optionally
/// awaited) Couchbase cluster.
pub struct SyncGwCluster {
    coord: CoordClient,
    fleet: FleetClient,
    pub num_nodes: usize,
    pub config_url: String,
    pub commit: String,
    pub docker_tag: String,
    pub create_bucket: Option<BucketSpec>,
    /// Cleared by `--in-memory-db`: a gateway backed by walrus does not
    /// need to wait for Couchbase Server.
    pub requires_couchbase: bool,
    pub etcd_servers: Vec<String>,
}

impl SyncGwCluster {
    pub fn new(
        coord: CoordClient,
        fleet: FleetClient,
        num_nodes: usize,
        config_url: impl Into<String>,
    ) -> Self {
        Self {
            coord,
            fleet,
            num_nodes,
            config_url: config_url.into(),
            commit: DEFAULT_COMMIT.to_string(),
            docker_tag: "latest".to_string(),
            create_bucket: None,
            requires_couchbase: true,
            etcd_servers: Vec::new(),
        }
    }

    pub async fn launch_sync_gateway(&self) -> Result<(), ClusterError> {
        self.create_bucket_if_needed().await?;

        self.coord
            .set(keys::KEY_SYNC_GW_CONFIG, &self.config_url, None)
            .await?;
        self.coord
            .set(keys::KEY_SYNC_GW_COMMIT, &self.commit, None)
            .await?;
        info!(
            "syncgw: stored config={} commit={}",
            self.config_url, self.commit
        );

        if self.requires_couchbase {
            info!("syncgw: waiting for the couchbase cluster before launching gateways");
            let creds = load_admin_credentials(&self.coord).await?;
            let cluster = CouchbaseCluster::new(self.coord.clone(), creds);
            cluster
                .wait_until_cluster_running(MAX_COUCHBASE_WAIT_ATTEMPTS)
                .await?;
        }

        for i in 1..=self.num_nodes {
            let node_name = format!("{}@{}.service", GATEWAY_UNIT_PREFIX, i);
            self.fleet
                .submit_unit(
                    &node_name,
                    &UnitSubmission {
                        desired_state: "launched".to_string(),
                        options: self.gateway_unit_options()?,
                    },
                )
                .await?;

            let sidekick_name = format!("{}@{}.service", GATEWAY_SIDEKICK_UNIT_PREFIX, i);
            self.fleet
                .submit_unit(
                    &sidekick_name,
                    &UnitSubmission {
                        desired_state: "launched".to_string(),
                        options: self.sidekick_unit_options(&i.to_string())?,
                    },
                )
                .await?;

            info!("syncgw: launched {} and {}", node_name, sidekick_name);
        }

        self.wait_for_sync_gateways().await?;
        info!("syncgw: {} gateways are up", self.num_nodes);
        Ok(())
    }

    async fn create_bucket_if_needed(&self) -> Result<(), ClusterError> {
        let Some(spec) = &self.create_bucket else {
            return Ok(());
        };

        let creds = load_admin_credentials(&self.coord).await?;
        let cluster = CouchbaseCluster::new(self.coord.clone(), creds);
        let live = cluster
            .find_live_node()
            .await?
            .ok_or(ClusterError::NoLiveNode)?;
        cluster.create_bucket_on(&live, spec).await
    }

    fn gateway_unit_options(&self) -> Result<Vec<UnitOption>, ClusterError> {
        let etcd_servers = self.etcd_servers.join(",");
        let text = unit::render(
            GATEWAY_UNIT_TEMPLATE,
            &[
                ("DOCKER_TAG", self.docker_tag.as_str()),
                ("ETCD_SERVERS", etcd_servers.as_str()),
            ],
        )?;
        unit::parse(&text)
    }

    fn sidekick_unit_options(&self, instance: &str) -> Result<Vec<UnitOption>, ClusterError> {
        let etcd_servers = self.etcd_servers.join(",");
        let text = unit::render(
            GATEWAY_SIDEKICK_UNIT_TEMPLATE,
            &[
                ("DOCKER_TAG", self.docker_tag.as_str()),
                ("ETCD_SERVERS", etcd_servers.as_str()),
                ("INSTANCE", instance),
            ],
        )?;
        unit::parse(&text)
    }

    /// Wait until at least `num_nodes` gateways advertise themselves and
    /// every advertised endpoint answers on its public port.
    pub async fn wait_for_sync_gateways(&self) -> Result<(), ClusterError> {
        let coord = self.coord.clone();
        let required = self.num_nodes;
        let probe = build_probe_client();

        retry_loop_transient(
            move || {
                let coord = coord.clone();
                let probe = probe.clone();
                async move {
                    let children = match coord.list(keys::KEY_SYNC_GW_NODE_STATE).await {
                        Ok(children) => children,
                        Err(CoordError::NotFound(_)) => {
                            info!("syncgw: no gateways advertised yet");
                            return Ok(None);
                        }
                        Err(e) => return Err(e.into()),
                    };

                    if children.len() < required {
                        info!(
                            "syncgw: {}/{} gateways advertised",
                            children.len(),
                            required
                        );
                        return Ok(None);
                    }

                    let advertised = children.len();
                    let up = stream::iter(children)
                        .map(|child| {
                            let probe = probe.clone();
                            async move { probe_gateway(&probe, &child).await }
                        })
                        .buffer_unordered(GATEWAY_PROBE_CONCURRENCY)
                        .filter(|answered| futures_util::future::ready(*answered))
                        .count()
                        .await;

                    // Every advertised gateway has to answer, not just the
                    // first `required` of them.
                    if up == advertised {
                        Ok(Some(()))
                    } else {
                        info!("syncgw: {}/{} gateways answering", up, advertised);
                        Ok(None)
                    }
                }
            },
            retry::fixed(MAX_GATEWAY_WAIT_ATTEMPTS, 10),
        )
        .await
    }

    pub fn coord(&self) -> &CoordClient {
        &self.coord
    }
}

/// Gateway sidekick: advertise this gateway's public endpoint with a TTL
/// heartbeat until the process dies.
pub async fn launch_sidekick(coord: &CoordClient, local_ip: &str) -> Result<(), ClusterError> {
    heartbeat::run(
        coord,
        keys::KEY_SYNC_GW_NODE_STATE,
        &keys::state_child(keys::KEY_SYNC_GW_NODE_STATE, local_ip),
        &format!("{}:{}", local_ip, SYNC_GW_PUBLIC_PORT),
        HEARTBEAT_TTL_SECS,
    )
    .await;

    Err(ClusterError::Config(
        "heartbeat loop exited unexpectedly".to_string(),
    ))
}

/// The endpoint a gateway advertised: `ip:port` from the heartbeat value,
/// falling back to the child key plus the default public port.
fn advertised_gateway(child: &ChildNode) -> (String, u16) {
    match child.value.as_deref().and_then(split_host_port) {
        Some((ip, port)) => (ip.to_string(), port),
        None => (child.key.clone(), SYNC_GW_PUBLIC_PORT),
    }
}

async fn probe_gateway(probe: &reqwest::Client, child: &ChildNode) -> bool {
    let (ip, port) = advertised_gateway(child);
    let url = format!("http://{}:{}/", ip, port);
    match probe.get(&url).send().await {
        Ok(resp) => resp.status().as_u16() == 200,
        Err(_) => false,
    }
}

fn build_probe_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build gateway probe client")
}

/// A live Couchbase node for gateway configs, without needing the stored
/// credentials (the liveness probe is unauthenticated).
pub async fn find_couchbase_node(coord: &CoordClient) -> Result<Option<crate::cluster::LiveNode>, ClusterError> {
    let admin = crate::admin::AdminClient::new(crate::admin::AdminCredentials::factory_default());
    find_live_node(coord, &admin).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_units_render() {
        let mut sgw = SyncGwCluster::new(
            CoordClient::new("http://127.0.0.1:2379"),
            FleetClient::new(crate::fleet::DEFAULT_FLEET_API),
            2,
            "http://example.com/sync-gw-config.json",
        );
        sgw.etcd_servers = vec!["http://10.0.0.1:2379".to_string()];

        let options = sgw.gateway_unit_options().unwrap();
        assert!(options
            .iter()
            .any(|o| o.name == "Conflicts" && o.value == "sync_gw_node@*.service"));

        let sidekick = sgw.sidekick_unit_options("3").unwrap();
        let machine_of = sidekick
            .iter()
            .find(|o| o.section == "X-Fleet" && o.name == "MachineOf")
            .unwrap();
        assert_eq!(machine_of.value, "sync_gw_node@3.service");
    }

    #[test]
    fn advertised_gateway_parses_value() {
        let child = ChildNode {
            key: "10.0.0.5".to_string(),
            value: Some("10.0.0.5:4985".to_string()),
        };
        assert_eq!(advertised_gateway(&child), ("10.0.0.5".to_string(), 4985));

        let bare = ChildNode {
            key: "10.0.0.6".to_string(),
            value: None,
        };
        assert_eq!(
            advertised_gateway(&bare),
            ("10.0.0.6".to_string(), SYNC_GW_PUBLIC_PORT)
        );
    }
}
