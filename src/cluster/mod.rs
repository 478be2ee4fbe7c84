pub mod coordinator;
pub mod heartbeat;
pub mod ram;

pub use coordinator::{
    find_live_node, find_live_peer, load_admin_credentials, BucketSpec, CouchbaseCluster,
    LiveNode, HEARTBEAT_TTL_SECS, LOCAL_COUCHBASE_PORT,
};
