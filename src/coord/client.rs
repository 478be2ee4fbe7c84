use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// etcd v2 error codes the callers care about.
const ETCD_ERR_KEY_NOT_FOUND: i64 = 100;
const ETCD_ERR_NODE_EXIST: i64 = 105;

/// Coordination store failure, split so callers can tell the race-benign
/// and clean-slate cases apart from real trouble.
#[derive(Debug)]
pub enum CoordError {
    /// The key does not exist (etcd errorCode 100).
    NotFound(String),
    /// The key already exists (etcd errorCode 105), i.e. the losing side
    /// of an atomic create.
    AlreadyExists(String),
    /// Any other etcd API error.
    Api { code: i64, message: String },
    /// Transport-level failure reaching the store.
    Transport(reqwest::Error),
    /// The store answered with a payload we could not decode.
    Decode(String),
}

impl CoordError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CoordError::Transport(_) | CoordError::Api { .. })
    }
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::NotFound(key) => write!(f, "key not found: {}", key),
            CoordError::AlreadyExists(key) => write!(f, "key already exists: {}", key),
            CoordError::Api { code, message } => {
                write!(f, "etcd error {}: {}", code, message)
            }
            CoordError::Transport(e) => write!(f, "etcd transport error: {}", e),
            CoordError::Decode(msg) => write!(f, "etcd response decode error: {}", msg),
        }
    }
}

impl std::error::Error for CoordError {}

/// Outcome of an atomic directory create. Exactly one of any set of
/// concurrent callers observes `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirCreate {
    Created,
    AlreadyExists,
}

/// A node in the etcd v2 keyspace.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub dir: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// A directory child with the key reduced to its trailing segment.
#[derive(Debug, Clone)]
pub struct ChildNode {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

/// Typed facade over the etcd v2 HTTP API.
///
/// All reads are quorum reads; election and clean-slate detection depend
/// on linearizable answers. Cheaply cloneable, the underlying
/// `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct CoordClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoordClient {
    /// Build a client pinned to a single endpoint, without probing.
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: build_http(),
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Connect to the store, probing each endpoint in order and settling on
    /// the first one that answers `GET /version`. When none answer, the
    /// first endpoint is used anyway; the caller's retry loops own the
    /// recovery from a store that is still coming up.
    pub async fn connect(endpoints: &[String]) -> Result<Self, CoordError> {
        if endpoints.is_empty() {
            return Err(CoordError::Decode("no etcd endpoints given".to_string()));
        }

        let http = build_http();

        for endpoint in endpoints {
            let base_url = endpoint.trim_end_matches('/').to_string();
            match http.get(format!("{}/version", base_url)).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(Self { http, base_url });
                }
                Ok(resp) => {
                    warn!("etcd: endpoint {} answered {}, trying next", base_url, resp.status());
                }
                Err(e) => {
                    warn!("etcd: endpoint {} unreachable: {}, trying next", base_url, e);
                }
            }
        }

        let base_url = endpoints[0].trim_end_matches('/').to_string();
        warn!("etcd: no endpoint answered the version probe, defaulting to {}", base_url);
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/v2/keys{}", self.base_url, key)
    }

    /// Quorum read of a single key.
    pub async fn get(&self, key: &str) -> Result<Node, CoordError> {
        let url = format!("{}?quorum=true", self.key_url(key));
        let resp = self.http.get(&url).send().await.map_err(CoordError::Transport)?;
        read_node(resp).await
    }

    /// Write a value, optionally with a TTL in seconds.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), CoordError> {
        let mut form: Vec<(&str, String)> = vec![("value", value.to_string())];
        if let Some(ttl) = ttl {
            form.push(("ttl", ttl.to_string()));
        }
        let resp = self
            .http
            .put(self.key_url(key))
            .form(&form)
            .send()
            .await
            .map_err(CoordError::Transport)?;
        read_node(resp).await.map(|_| ())
    }

    /// Atomic directory create (`prevExist=false`). This is the election
    /// primitive: the store guarantees exactly one concurrent caller sees
    /// [`DirCreate::Created`].
    pub async fn create_dir(&self, key: &str, ttl: Option<u64>) -> Result<DirCreate, CoordError> {
        let mut form: Vec<(&str, String)> = vec![
            ("dir", "true".to_string()),
            ("prevExist", "false".to_string()),
        ];
        if let Some(ttl) = ttl {
            form.push(("ttl", ttl.to_string()));
        }
        let resp = self
            .http
            .put(self.key_url(key))
            .form(&form)
            .send()
            .await
            .map_err(CoordError::Transport)?;
        match read_node(resp).await {
            Ok(_) => Ok(DirCreate::Created),
            Err(CoordError::AlreadyExists(_)) => Ok(DirCreate::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    /// Refresh the TTL of an existing directory (`prevExist=true`).
    pub async fn update_dir(&self, key: &str, ttl: u64) -> Result<(), CoordError> {
        let form: Vec<(&str, String)> = vec![
            ("dir", "true".to_string()),
            ("prevExist", "true".to_string()),
            ("ttl", ttl.to_string()),
        ];
        let resp = self
            .http
            .put(self.key_url(key))
            .form(&form)
            .send()
            .await
            .map_err(CoordError::Transport)?;
        read_node(resp).await.map(|_| ())
    }

    /// List the direct children of a directory. The children's keys are
    /// reduced to their trailing path segment.
    pub async fn list(&self, key: &str) -> Result<Vec<ChildNode>, CoordError> {
        let node = self.get(key).await?;
        Ok(node
            .nodes
            .into_iter()
            .map(|child| ChildNode {
                key: child
                    .key
                    .as_deref()
                    .map(|k| super::keys::last_segment(k).to_string())
                    .unwrap_or_default(),
                value: child.value,
            })
            .collect())
    }
}

fn build_http() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build etcd HTTP client")
}

async fn read_node(resp: reqwest::Response) -> Result<Node, CoordError> {
    let status = resp.status();
    let body = resp.text().await.map_err(CoordError::Transport)?;

    if status.is_success() {
        let parsed: KeysResponse = serde_json::from_str(&body)
            .map_err(|e| CoordError::Decode(format!("{} (body: {})", e, body)))?;
        return Ok(parsed.node);
    }

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => match err.error_code {
            ETCD_ERR_KEY_NOT_FOUND => Err(CoordError::NotFound(err.cause)),
            ETCD_ERR_NODE_EXIST => Err(CoordError::AlreadyExists(err.cause)),
            code => Err(CoordError::Api {
                code,
                message: err.message,
            }),
        },
        Err(_) => Err(CoordError::Api {
            code: i64::from(status.as_u16()),
            message: body,
        }),
    }
}
