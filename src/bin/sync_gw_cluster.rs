use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use cbcluster::cluster::BucketSpec;
use cbcluster::coord::{resolve_endpoints, CoordClient};
use cbcluster::fleet::{FleetClient, DEFAULT_FLEET_API};
use cbcluster::logging;
use cbcluster::syncgw::{self, SyncGwCluster};

#[derive(Parser)]
#[command(
    name = "sync-gw-cluster",
    about = "Bootstrap a Sync Gateway tier in front of a Couchbase cluster"
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
    fn endpoints(&self) -> Vec<String> {
        resolve_endpoints(self.etcd_servers.as_deref(), self.k8s_service_name.as_deref())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Launch N sync gateway nodes (and their sidekicks)
    LaunchSgw {
        #[arg(long)]
        num_nodes: usize,

        /// URL where the sync gateway config json is stored
        #[arg(long)]
        config_url: String,

        /// Branch or commit of sync gateway to run; defaults to whatever
        /// the docker image was built from
        #[arg(long)]
        sync_gw_commit: Option<String>,

        /// Walrus-backed gateway: do not wait for Couchbase Server
        #[arg(long)]
        in_memory_db: bool,

        /// Create a backing bucket with this name before launching
        #[arg(long)]
        create_bucket: Option<String>,

        /// Bucket size in MB when creating a bucket
        #[arg(long, default_value_t = 512)]
        create_bucket_size: u32,

        /// Replica count when creating a bucket
        #[arg(long, default_value_t = 1)]
        create_bucket_replicas: u32,

        /// Docker tag for the spawned containers
        #[arg(long, default_value = "latest")]
        docker_tag: String,

        #[command(flatten)]
        coord: CoordOpts,

        /// Base URL of the fleet HTTP API
        #[arg(long, default_value = DEFAULT_FLEET_API)]
        fleet_api: String,
    },

    /// Gateway sidekick: publish liveness with a TTL heartbeat
    LaunchSidekick {
        /// The IP to advertise in the coordination store
        #[arg(long)]
        local_ip: String,

        #[command(flatten)]
        coord: CoordOpts,
    },

    /// Render the stored gateway config against a live database node
    Rewrite {
        /// Path where the rendered config should be written
        #[arg(long)]
        destination: PathBuf,

        #[command(flatten)]
        coord: CoordOpts,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    match Cli::parse().command {
        Command::LaunchSgw {
            num_nodes,
            config_url,
            sync_gw_commit,
            in_memory_db,
            create_bucket,
            create_bucket_size,
            create_bucket_replicas,
            docker_tag,
            coord,
            fleet_api,
        } => {
            let endpoints = coord.endpoints();
            let coord = CoordClient::connect(&endpoints).await?;
            let mut sgw =
                SyncGwCluster::new(coord, FleetClient::new(&fleet_api), num_nodes, config_url);
            if let Some(commit) = sync_gw_commit {
                sgw.commit = commit;
            }
            sgw.docker_tag = docker_tag;
            sgw.etcd_servers = endpoints;
            sgw.requires_couchbase = !in_memory_db;
            sgw.create_bucket = create_bucket.map(|name| BucketSpec {
                name,
                ram_mb: create_bucket_size,
                replicas: create_bucket_replicas,
            });
            sgw.launch_sync_gateway().await?;
        }

        Command::LaunchSidekick { local_ip, coord } => {
            let coord = CoordClient::connect(&coord.endpoints()).await?;
            syncgw::launch_sidekick(&coord, &local_ip).await?;
        }

        Command::Rewrite { destination, coord } => {
            let coord = CoordClient::connect(&coord.endpoints()).await?;
            syncgw::rewrite_config(&coord, &destination).await?;
        }
    }

    Ok(())
}
