pub mod cluster;
pub mod config;

pub use cluster::{launch_sidekick, SyncGwCluster, SYNC_GW_PUBLIC_PORT};
pub use config::rewrite_config;
