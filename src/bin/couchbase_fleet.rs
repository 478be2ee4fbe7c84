use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use cbcluster::coord::{resolve_endpoints, CoordClient};
use cbcluster::fleet::{self, CouchbaseFleet, FleetClient, DEFAULT_FLEET_API};
use cbcluster::logging;

#[derive(Parser)]
#[command(
    name = "couchbase-fleet",
    about = "Bootstrap and tear down a Couchbase Server cluster on a fleet of machines"
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

#[derive(Args)]
struct FleetOpts {
    /// Base URL of the fleet HTTP API
    #[arg(long, default_value = DEFAULT_FLEET_API)]
    fleet_api: String,
}

#[derive(Subcommand)]
enum Command {
    /// Launch an N-node Couchbase Server cluster
    LaunchCbs {
        /// Couchbase Server version (e.g. 3.0.1 or 2.2)
        #[arg(long)]
        version: String,

        #[arg(long)]
        num_nodes: usize,

        /// Admin username and password as a single user:pass string
        #[arg(long)]
        userpass: String,

        /// Docker tag for the spawned containers
        #[arg(long, default_value = "latest")]
        docker_tag: String,

        /// Skip the check that the coordination namespace is residue-free
        #[arg(long)]
        skip_clean_slate_check: bool,

        #[command(flatten)]
        coord: CoordOpts,

        #[command(flatten)]
        fleet: FleetOpts,
    },

    /// Stop the couchbase node and sidekick units
    Stop {
        /// Stop every unit fleet knows about, not just the couchbase ones
        #[arg(long)]
        all_units: bool,

        #[command(flatten)]
        coord: CoordOpts,

        #[command(flatten)]
        fleet: FleetOpts,
    },

    /// Destroy the couchbase node and sidekick units
    Destroy {
        /// Destroy every unit fleet knows about, not just the couchbase ones
        #[arg(long)]
        all_units: bool,

        #[command(flatten)]
        coord: CoordOpts,

        #[command(flatten)]
        fleet: FleetOpts,
    },

    /// Render the unit files to a directory instead of submitting them
    GenerateUnits {
        #[arg(long)]
        version: String,

        #[arg(long)]
        num_nodes: usize,

        #[arg(long)]
        userpass: String,

        #[arg(long, default_value = "latest")]
        docker_tag: String,

        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        coord: CoordOpts,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    match Cli::parse().command {
        Command::LaunchCbs {
            version,
            num_nodes,
            userpass,
            docker_tag,
            skip_clean_slate_check,
            coord,
            fleet,
        } => {
            let endpoints = coord.endpoints();
            let coord = CoordClient::connect(&endpoints).await?;
            let mut launcher = CouchbaseFleet::new(
                coord,
                FleetClient::new(&fleet.fleet_api),
                num_nodes,
                userpass,
                version,
            );
            launcher.docker_tag = docker_tag;
            launcher.etcd_servers = endpoints;
            launcher.skip_clean_slate_check = skip_clean_slate_check;
            launcher.launch_couchbase_server().await?;
        }

        Command::Stop {
            all_units,
            coord,
            fleet,
        } => {
            let coord = CoordClient::connect(&coord.endpoints()).await?;
            fleet::stop_units(&coord, &FleetClient::new(&fleet.fleet_api), all_units).await?;
        }

        Command::Destroy {
            all_units,
            coord,
            fleet,
        } => {
            let coord = CoordClient::connect(&coord.endpoints()).await?;
            fleet::destroy_units(&coord, &FleetClient::new(&fleet.fleet_api), all_units).await?;
        }

        Command::GenerateUnits {
            version,
            num_nodes,
            userpass,
            docker_tag,
            output_dir,
            coord,
        } => {
            let endpoints = coord.endpoints();
            // Rendering only; no connection is made.
            let mut launcher = CouchbaseFleet::new(
                CoordClient::new(&endpoints[0]),
                FleetClient::new(DEFAULT_FLEET_API),
                num_nodes,
                userpass,
                version,
            );
            launcher.docker_tag = docker_tag;
            launcher.etcd_servers = endpoints;
            launcher.generate_units(&output_dir)?;
        }
    }

    Ok(())
}
