use std::fmt;

use crate::coord::CoordError;

/// Crate-wide error type.
///
/// The variants map onto how callers are expected to react: transport-level
/// failures are retried by the surrounding loops, contract violations and
/// configuration problems abort immediately, and `Exhausted` is what a retry
/// loop reports once its sleeper gives up.
#[derive(Debug)]
pub enum ClusterError {
    /// Coordination store failure (etcd transport or API error).
    Coord(CoordError),
    /// HTTP transport failure talking to the admin or scheduler API.
    Http(reqwest::Error),
    /// A remote endpoint answered with a non-2xx status.
    RemoteStatus {
        url: String,
        status: u16,
        body: String,
    },
    /// The remote answered 2xx but the payload violates the documented
    /// contract (malformed JSON, missing field, unexpected status string).
    RemoteContract(String),
    /// The local node is not (yet) a member of the cluster.
    NodeNotInCluster(String),
    /// No advertised node answered its REST liveness probe.
    NoLiveNode,
    /// Bad or missing configuration; never retried.
    Config(String),
    /// Local filesystem failure (unit generation, config rewrite).
    Io(std::io::Error),
    /// A retry loop gave up.
    Exhausted {
        attempts: u32,
        last: Option<Box<ClusterError>>,
    },
}

impl ClusterError {
    /// Transient failures are the ones bounded retry loops are allowed to
    /// absorb; everything else must surface immediately.
    pub fn is_transient_remote(&self) -> bool {
        match self {
            ClusterError::Http(_) | ClusterError::RemoteStatus { .. } => true,
            ClusterError::Coord(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterError::Coord(e) => write!(f, "coordination store error: {}", e),
            ClusterError::Http(e) => write!(f, "http error: {}", e),
            ClusterError::RemoteStatus { url, status, body } => {
                write!(f, "request to {} failed: status={}, body={}", url, status, body)
            }
            ClusterError::RemoteContract(msg) => write!(f, "remote contract violation: {}", msg),
            ClusterError::NodeNotInCluster(ip) => {
                write!(f, "node {} is not a member of the cluster", ip)
            }
            ClusterError::NoLiveNode => write!(f, "no live cluster node could be found"),
            ClusterError::Config(msg) => write!(f, "config error: {}", msg),
            ClusterError::Io(e) => write!(f, "io error: {}", e),
            ClusterError::Exhausted { attempts, last } => match last {
                Some(err) => write!(f, "gave up after {} attempts, last error: {}", attempts, err),
                None => write!(f, "gave up after {} attempts", attempts),
            },
        }
    }
}

impl std::error::Error for ClusterError {}

impl From<CoordError> for ClusterError {
    fn from(e: CoordError) -> Self {
        ClusterError::Coord(e)
    }
}

impl From<reqwest::Error> for ClusterError {
    fn from(e: reqwest::Error) -> Self {
        ClusterError::Http(e)
    }
}

impl From<std::io::Error> for ClusterError {
    fn from(e: std::io::Error) -> Self {
        ClusterError::Io(e)
    }
}
