use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use cbcluster::admin::{AdminClient, AdminCredentials};
use cbcluster::cluster::{find_live_node, load_admin_credentials, CouchbaseCluster};
use cbcluster::coord::{resolve_endpoints, CoordClient};
use cbcluster::{logging, netutil};

const MAX_WAIT_ATTEMPTS: u32 = 10000;

#[derive(Parser)]
#[command(
    name = "couchbase-cluster",
    about = "Couchbase Server cluster sidekick and membership tooling"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CoordOpts {
    /// Comma separated list of etcd servers; omit to use etcd on localhost
    #[arg(long)]
    etcd_servers: Option<String>,

    /// Resolve etcd through the <NAME>_SERVICE_HOST/_PORT environment pair
    #[arg(long)]
    k8s_service_name: Option<String>,
}

impl CoordOpts {
    async fn connect(&self) -> Result<CoordClient> {
        let endpoints =
            resolve_endpoints(self.etcd_servers.as_deref(), self.k8s_service_name.as_deref());
        Ok(CoordClient::connect(&endpoints).await?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Block until every advertised node reports healthy
    WaitUntilRunning {
        #[command(flatten)]
        coord: CoordOpts,
    },

    /// Run the per-node sidekick: become founder or join, then heartbeat
    StartCouchbaseSidekick {
        #[command(flatten)]
        coord: CoordOpts,

        /// The IP to advertise in the coordination store
        #[arg(long)]
        local_ip: Option<String>,

        /// Discover the advertised IP from the environment or interfaces
        #[arg(long)]
        discover_local_ip: bool,
    },

    /// Gracefully rebalance the local node out of the cluster
    RemoveAndRebalance {
        #[command(flatten)]
        coord: CoordOpts,

        #[arg(long)]
        local_ip: String,
    },

    /// Print the IP of the first advertised node whose REST endpoint answers
    GetLiveNodeIp {
        #[command(flatten)]
        coord: CoordOpts,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    match Cli::parse().command {
        Command::WaitUntilRunning { coord } => {
            let coord = coord.connect().await?;
            let creds = load_admin_credentials(&coord).await?;
            let cluster = CouchbaseCluster::new(coord, creds);
            cluster.wait_until_cluster_running(MAX_WAIT_ATTEMPTS).await?;
        }

        Command::StartCouchbaseSidekick {
            coord,
            local_ip,
            discover_local_ip,
        } => {
            let ip = resolve_local_ip(local_ip, discover_local_ip)?;
            let coord = coord.connect().await?;
            let creds = load_admin_credentials(&coord).await?;
            let mut cluster = CouchbaseCluster::new(coord, creds).with_local_node(ip);
            cluster.start_couchbase_sidekick().await?;
        }

        Command::RemoveAndRebalance { coord, local_ip } => {
            let coord = coord.connect().await?;
            let creds = load_admin_credentials(&coord).await?;
            let cluster = CouchbaseCluster::new(coord, creds).with_local_node(local_ip);
            cluster.remove_and_rebalance().await?;
        }

        Command::GetLiveNodeIp { coord } => {
            let coord = coord.connect().await?;
            // The liveness probe is unauthenticated, so no stored
            // credentials are needed here.
            let admin = AdminClient::new(AdminCredentials::factory_default());
            match find_live_node(&coord, &admin).await? {
                Some(live) => println!("{}", live.ip),
                None => anyhow::bail!("no live cluster node found"),
            }
        }
    }

    Ok(())
}

fn resolve_local_ip(local_ip: Option<String>, discover: bool) -> Result<String> {
    if let Some(ip) = local_ip {
        return Ok(ip);
    }
    if discover {
        return Ok(netutil::discover_local_ip()?);
    }
    anyhow::bail!("pass --local-ip or --discover-local-ip")
}
