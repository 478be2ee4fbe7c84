use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::admin::AdminCredentials;
use crate::cluster::CouchbaseCluster;
use crate::coord::{keys, CoordClient, CoordError};
use crate::error::ClusterError;
use crate::fleet::client::{FleetClient, UnitSubmission};
use crate::fleet::unit::{self, UnitOption};

pub const NODE_UNIT_PREFIX: &str = "couchbase_node";
pub const SIDEKICK_UNIT_PREFIX: &str = "couchbase_sidekick";

const NODE_UNIT_TEMPLATE: &str = include_str!("templates/couchbase_node@.service");
const SIDEKICK_UNIT_TEMPLATE: &str = include_str!("templates/couchbase_sidekick@.service");

/// How long the remove-disable flag stays up during a mass stop/destroy.
/// Long enough for every sidekick's shutdown hook to observe it; short
/// enough to expire on its own.
const REMOVE_DISABLE_TTL_SECS: u64 = 300;

const MAX_LAUNCH_WAIT_ATTEMPTS: u32 = 10000;
const MAX_QUIESCENT_CHECKS: u32 = 500;

/// Bootstraps an N-node Couchbase cluster on a fleet of machines: writes
/// the shared credentials, submits one server unit and one sidekick unit
/// per node, and waits for the cluster to settle.
pub struct CouchbaseFleet {
    coord: CoordClient,
    fleet: FleetClient,
    pub num_nodes: usize,
    pub user_pass: String,
    pub cb_version: String,
    pub docker_tag: String,
    pub etcd_servers: Vec<String>,
    pub skip_clean_slate_check: bool,
    /// Pause between the consecutive rebalance-quiescence checks.
    pub quiescent_pause: Duration,
}

impl CouchbaseFleet {
    pub fn new(
        coord: CoordClient,
        fleet: FleetClient,
        num_nodes: usize,
        user_pass: impl Into<String>,
        cb_version: impl Into<String>,
    ) -> Self {
        Self {
            coord,
            fleet,
            num_nodes,
            user_pass: user_pass.into(),
            cb_version: cb_version.into(),
            docker_tag: "latest".to_string(),
            etcd_servers: Vec::new(),
            skip_clean_slate_check: false,
            quiescent_pause: Duration::from_secs(15),
        }
    }

    pub async fn launch_couchbase_server(&self) -> Result<(), ClusterError> {
        self.verify_enough_machines_available().await?;

        if self.skip_clean_slate_check {
            warn!("fleet: skipping the clean-slate check on request");
        } else {
            self.verify_clean_slate().await?;
        }

        self.write_userpass().await?;

        for i in 1..=self.num_nodes {
            let node_name = format!("{}@{}.service", NODE_UNIT_PREFIX, i);
            self.fleet
                .submit_unit(
                    &node_name,
                    &UnitSubmission {
                        desired_state: "launched".to_string(),
                        options: self.node_unit_options()?,
                    },
                )
                .await?;

            let sidekick_name = format!("{}@{}.service", SIDEKICK_UNIT_PREFIX, i);
            self.fleet
                .submit_unit(
                    &sidekick_name,
                    &UnitSubmission {
                        desired_state: "launched".to_string(),
                        options: self.sidekick_unit_options(&i.to_string())?,
                    },
                )
                .await?;

            info!("fleet: launched {} and {}", node_name, sidekick_name);
        }

        self.wait_for_fleet_launch().await?;
        info!("fleet: couchbase cluster with {} nodes is up", self.num_nodes);
        Ok(())
    }

    /// The number of nodes asked for must not exceed the machines fleet
    /// knows about. Doubles as a fail-fast probe of the fleet API.
    async fn verify_enough_machines_available(&self) -> Result<(), ClusterError> {
        let machines = match self.fleet.machines().await {
            Ok(machines) => machines,
            Err(e) => {
                return Err(ClusterError::Config(format!(
                    "fleet API at {} is not answering ({}). Is fleet running and its API socket forwarded?",
                    self.fleet.base_url(),
                    e
                )))
            }
        };

        if machines.len() < self.num_nodes {
            return Err(ClusterError::Config(format!(
                "requested {} nodes but only {} machines are available",
                self.num_nodes,
                machines.len()
            )));
        }

        info!("fleet: {} machines available", machines.len());
        Ok(())
    }

    /// A fresh bootstrap expects no residue from a previous cluster: the
    /// node-state key must be absent. Only a typed not-found answer counts
    /// as absent.
    async fn verify_clean_slate(&self) -> Result<(), ClusterError> {
        match self.coord.get(keys::KEY_NODE_STATE).await {
            Err(CoordError::NotFound(_)) => Ok(()),
            Ok(_) => Err(ClusterError::Config(format!(
                "{} already exists: residue from a previous cluster. Run destroy first, or pass --skip-clean-slate-check",
                keys::KEY_NODE_STATE
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_userpass(&self) -> Result<(), ClusterError> {
        // Validation only; the raw string is what gets stored.
        AdminCredentials::parse(&self.user_pass)?;
        self.coord
            .set(keys::KEY_USER_PASS, &self.user_pass, None)
            .await?;
        info!("fleet: stored cluster admin credentials");
        Ok(())
    }

    fn render_node_unit(&self) -> Result<String, ClusterError> {
        unit::render(
            NODE_UNIT_TEMPLATE,
            &[
                ("CB_VERSION", self.cb_version.as_str()),
                ("DOCKER_TAG", self.docker_tag.as_str()),
            ],
        )
    }

    fn render_sidekick_unit(&self, instance: &str) -> Result<String, ClusterError> {
        let etcd_servers = self.etcd_servers.join(",");
        unit::render(
            SIDEKICK_UNIT_TEMPLATE,
            &[
                ("DOCKER_TAG", self.docker_tag.as_str()),
                ("ETCD_SERVERS", etcd_servers.as_str()),
                ("INSTANCE", instance),
            ],
        )
    }

    fn node_unit_options(&self) -> Result<Vec<UnitOption>, ClusterError> {
        unit::parse(&self.render_node_unit()?)
    }

    fn sidekick_unit_options(&self, instance: &str) -> Result<Vec<UnitOption>, ClusterError> {
        unit::parse(&self.render_sidekick_unit(instance)?)
    }

    /// Render the unit files to disk instead of submitting them, for
    /// operators who drive fleetctl by hand. The sidekick keeps the `%i`
    /// instance specifier so one template file serves every index.
    pub fn generate_units(&self, output_dir: &Path) -> Result<(), ClusterError> {
        std::fs::create_dir_all(output_dir)?;

        let node_path = output_dir.join(format!("{}@.service", NODE_UNIT_PREFIX));
        std::fs::write(&node_path, self.render_node_unit()?)?;
        info!("fleet: wrote {}", node_path.display());

        let sidekick_path = output_dir.join(format!("{}@.service", SIDEKICK_UNIT_PREFIX));
        std::fs::write(&sidekick_path, self.render_sidekick_unit("%i")?)?;
        info!("fleet: wrote {}", sidekick_path.display());

        Ok(())
    }

    /// Wait until all N nodes advertise themselves and report healthy, then
    /// require one quiescent rebalance observation per node, consecutively.
    ///
    /// The double-check absorbs the brief false-quiescent window between a
    /// node becoming healthy and it triggering its join rebalance.
    pub async fn wait_for_fleet_launch(&self) -> Result<(), ClusterError> {
        let creds = AdminCredentials::parse(&self.user_pass)?;
        let cluster = CouchbaseCluster::new(self.coord.clone(), creds);

        cluster
            .wait_until_num_nodes_running(self.num_nodes, MAX_LAUNCH_WAIT_ATTEMPTS)
            .await?;
        info!("fleet: all {} nodes are up and healthy", self.num_nodes);

        let required = self.num_nodes as u32;
        let mut consecutive: u32 = 0;
        let mut checks: u32 = 0;

        while consecutive < required {
            checks += 1;
            if checks > MAX_QUIESCENT_CHECKS {
                return Err(ClusterError::Exhausted {
                    attempts: checks - 1,
                    last: None,
                });
            }

            let live = cluster
                .find_live_node()
                .await?
                .ok_or(ClusterError::NoLiveNode)?;

            if cluster.is_rebalancing(&live).await? {
                info!("fleet: rebalance in progress, restarting quiescence count");
                consecutive = 0;
            } else {
                consecutive += 1;
                info!("fleet: cluster quiescent ({}/{})", consecutive, required);
                if consecutive >= required {
                    break;
                }
            }

            tokio::time::sleep(self.quiescent_pause).await;
        }

        Ok(())
    }

}

/// Drive every couchbase unit to `inactive`. With `all_units`, every unit
/// fleet knows about is stopped, not just the couchbase-prefixed ones.
pub async fn stop_units(
    coord: &CoordClient,
    fleet: &FleetClient,
    all_units: bool,
) -> Result<(), ClusterError> {
    teardown_units(coord, fleet, all_units, false).await
}

/// Destroy the couchbase units (or, with `all_units`, everything).
pub async fn destroy_units(
    coord: &CoordClient,
    fleet: &FleetClient,
    all_units: bool,
) -> Result<(), ClusterError> {
    teardown_units(coord, fleet, all_units, true).await
}

async fn teardown_units(
    coord: &CoordClient,
    fleet: &FleetClient,
    all_units: bool,
    destroy: bool,
) -> Result<(), ClusterError> {
    // A mass teardown must not have every sidekick's shutdown hook trigger
    // its own rebalance; the TTL'd flag suppresses them and then expires
    // on its own.
    coord
        .set(
            keys::KEY_REMOVE_REBALANCE_DISABLED,
            "true",
            Some(REMOVE_DISABLE_TTL_SECS),
        )
        .await?;

    let units = fleet.list_units().await?;
    for unit in units {
        if !all_units
            && !unit.name.contains(NODE_UNIT_PREFIX)
            && !unit.name.contains(SIDEKICK_UNIT_PREFIX)
        {
            continue;
        }

        if destroy {
            info!("fleet: destroying {}", unit.name);
            fleet.destroy_unit(&unit.name).await?;
        } else {
            info!("fleet: stopping {}", unit.name);
            fleet.set_desired_state(&unit.name, "inactive").await?;
        }
    }

    Ok(())
}
