pub mod client;
pub mod types;

pub use client::{
    AdminClient, AdminCredentials, CredentialOrder, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME,
};
pub use types::{BucketInfo, NodeInfo, NodeStatus, PoolDetails, PoolsRoot, RebalanceProgress};
