//! Integration tests for the coordinator state machine, driven against
//! stubbed etcd v2 and Couchbase admin endpoints.
//!
//! One `MockServer` plays both roles: the etcd paths live under
//! `/v2/keys/...` and the admin paths under `/pools`, `/settings`,
//! `/controller`, so a node-state child whose value points back at the
//! mock server doubles as a live Couchbase node.

use std::sync::Mutex;

use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use cbcluster::admin::{AdminClient, AdminCredentials, CredentialOrder};
use cbcluster::cluster::{find_live_node, CouchbaseCluster, LiveNode};
use cbcluster::coord::{CoordClient, DirCreate};
use cbcluster::error::ClusterError;

const NODE_STATE_PATH: &str = "/v2/keys/couchbase.com/couchbase-node-state";

fn coord_for(server: &MockServer) -> CoordClient {
    CoordClient::new(&server.uri())
}

fn cluster_for(server: &MockServer) -> CouchbaseCluster {
    CouchbaseCluster::new(
        coord_for(server),
        AdminCredentials::parse("bob:secret").unwrap(),
    )
}

fn etcd_value_body(key: &str, value: &str) -> serde_json::Value {
    serde_json::json!({
        "action": "get",
        "node": {"key": key, "value": value, "modifiedIndex": 7, "createdIndex": 7}
    })
}

fn etcd_listing_body(children: &[(&str, &str)]) -> serde_json::Value {
    let nodes: Vec<serde_json::Value> = children
        .iter()
        .map(|(ip, value)| {
            serde_json::json!({
                "key": format!("/couchbase.com/couchbase-node-state/{}", ip),
                "value": value,
                "ttl": 9
            })
        })
        .collect();
    serde_json::json!({
        "action": "get",
        "node": {
            "key": "/couchbase.com/couchbase-node-state",
            "dir": true,
            "nodes": nodes
        }
    })
}

fn etcd_not_found(key: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(serde_json::json!({
        "errorCode": 100, "message": "Key not found", "cause": key, "index": 11
    }))
}

/// Stateful compare-and-create: the first PUT wins, every later one gets
/// the etcd "already exists" envelope.
struct DirCreateResponder {
    created: Mutex<bool>,
}

impl Respond for DirCreateResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut created = self.created.lock().unwrap();
        if *created {
            ResponseTemplate::new(412).set_body_json(serde_json::json!({
                "errorCode": 105,
                "message": "Key already exists",
                "cause": "/couchbase.com/couchbase-node-state",
                "index": 3
            }))
        } else {
            *created = true;
            ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "action": "set",
                "node": {
                    "key": "/couchbase.com/couchbase-node-state",
                    "dir": true,
                    "modifiedIndex": 3,
                    "createdIndex": 3
                }
            }))
        }
    }
}

#[tokio::test]
async fn election_has_exactly_one_founder() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(NODE_STATE_PATH))
        .respond_with(DirCreateResponder {
            created: Mutex::new(false),
        })
        .mount(&server)
        .await;

    let a = cluster_for(&server);
    let b = cluster_for(&server);
    let (first, second) = tokio::join!(a.become_first_cluster_node(), b.become_first_cluster_node());

    let founders = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|f| **f)
        .count();
    assert_eq!(founders, 1, "exactly one candidate must win the election");
}

#[tokio::test]
async fn create_dir_distinguishes_the_losing_side() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(NODE_STATE_PATH))
        .respond_with(DirCreateResponder {
            created: Mutex::new(false),
        })
        .mount(&server)
        .await;

    let coord = coord_for(&server);
    assert_eq!(
        coord.create_dir("/couchbase.com/couchbase-node-state", None).await.unwrap(),
        DirCreate::Created
    );
    assert_eq!(
        coord.create_dir("/couchbase.com/couchbase-node-state", None).await.unwrap(),
        DirCreate::AlreadyExists
    );
}

#[tokio::test]
async fn find_live_node_returns_none_when_nothing_answers() {
    let server = MockServer::start().await;
    // One advertised node whose REST endpoint is down (port 1 refuses).
    Mock::given(method("GET"))
        .and(path(NODE_STATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(etcd_listing_body(&[("10.0.0.1", "127.0.0.1:1")])),
        )
        .mount(&server)
        .await;

    let admin = AdminClient::new(AdminCredentials::factory_default());
    let live = find_live_node(&coord_for(&server), &admin).await.unwrap();
    assert!(live.is_none());
}

#[tokio::test]
async fn find_live_node_skips_unreachable_and_returns_first_live() {
    let server = MockServer::start().await;
    let live_value = format!("127.0.0.1:{}", server.address().port());

    Mock::given(method("GET"))
        .and(path(NODE_STATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(etcd_listing_body(&[
            ("10.0.0.1", "127.0.0.1:1"),
            ("10.0.0.2", live_value.as_str()),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let admin = AdminClient::new(AdminCredentials::factory_default());
    let live = find_live_node(&coord_for(&server), &admin)
        .await
        .unwrap()
        .expect("second child is reachable");
    assert_eq!(live.ip, "127.0.0.1");
    assert_eq!(live.port, server.address().port());
}

#[tokio::test]
async fn find_live_node_treats_missing_directory_as_no_nodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATE_PATH))
        .respond_with(etcd_not_found("/couchbase.com/couchbase-node-state"))
        .mount(&server)
        .await;

    let admin = AdminClient::new(AdminCredentials::factory_default());
    let live = find_live_node(&coord_for(&server), &admin).await.unwrap();
    assert!(live.is_none());
}

#[tokio::test]
async fn cluster_init_short_circuits_when_password_already_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings/web"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    // Initialization already happened, so no settings POST may go out.
    Mock::given(method("POST"))
        .and(path("/settings/web"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cluster =
        cluster_for(&server).with_local_endpoint("127.0.0.1", server.address().port());
    cluster.cluster_init().await.unwrap();
}

#[tokio::test]
async fn create_default_bucket_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pools/default/buckets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "default", "bucketType": "membase"},
            {"name": "sync_gateway", "bucketType": "membase"}
        ])))
        .mount(&server)
        .await;
    // The bucket exists, so no create POST may go out.
    Mock::given(method("POST"))
        .and(path("/pools/default/buckets"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let cluster =
        cluster_for(&server).with_local_endpoint("127.0.0.1", server.address().port());
    cluster.create_default_bucket().await.unwrap();
}

#[tokio::test]
async fn post_form_falls_back_to_the_other_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settings/web"))
        .and(basic_auth("admin", "password"))
        .respond_with(ResponseTemplate::new(401).set_body_string("factory defaults rejected"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/settings/web"))
        .and(basic_auth("bob", "secret"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let admin = AdminClient::new(AdminCredentials::parse("bob:secret").unwrap());
    let url = format!("{}/settings/web", server.uri());
    admin
        .post_form(CredentialOrder::TryDefaultFirst, &url, &[("port", "8091")])
        .await
        .unwrap();
}

#[tokio::test]
async fn post_form_surfaces_the_last_failure_when_both_credentials_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pools/default"))
        .and(basic_auth("admin", "password"))
        .respond_with(ResponseTemplate::new(401).set_body_string("default rejected"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pools/default"))
        .and(basic_auth("bob", "secret"))
        .respond_with(ResponseTemplate::new(400).set_body_string("stored rejected"))
        .mount(&server)
        .await;

    let admin = AdminClient::new(AdminCredentials::parse("bob:secret").unwrap());
    let url = format!("{}/pools/default", server.uri());
    let err = admin
        .post_form(CredentialOrder::TryDefaultFirst, &url, &[("memoryQuota", "1024")])
        .await
        .unwrap_err();

    match err {
        ClusterError::RemoteStatus { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("stored rejected"));
        }
        other => panic!("expected RemoteStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn add_node_absorbs_already_part_of_cluster() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/controller/addNode"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"["Node is already part of cluster"]"#),
        )
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).with_local_node("10.99.0.1");
    let live = LiveNode {
        ip: "127.0.0.1".to_string(),
        port: server.address().port(),
    };
    cluster.add_node(&live).await.unwrap();
}

#[tokio::test]
async fn remove_and_rebalance_skips_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/keys/couchbase.com/remove-rebalance-disabled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(etcd_value_body(
            "/couchbase.com/remove-rebalance-disabled",
            "true",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/controller/rebalance"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).with_local_node("10.99.0.1");
    cluster.remove_and_rebalance().await.unwrap();
}

#[tokio::test]
async fn remove_and_rebalance_ejects_the_local_node_through_a_peer() {
    let server = MockServer::start().await;
    let port = server.address().port();
    let peer_value = format!("127.0.0.1:{}", port);

    Mock::given(method("GET"))
        .and(path("/v2/keys/couchbase.com/remove-rebalance-disabled"))
        .respond_with(etcd_not_found("/couchbase.com/remove-rebalance-disabled"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NODE_STATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(etcd_listing_body(&[
            ("10.99.0.1", "10.99.0.1:8091"),
            ("127.0.0.1", peer_value.as_str()),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nodes": [
                {"hostname": "10.99.0.1:8091", "otpNode": "ns_1@10.99.0.1", "status": "healthy"},
                {"hostname": "127.0.0.1:8091", "otpNode": "ns_1@127.0.0.1", "status": "healthy"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default/rebalanceProgress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "none"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/controller/rebalance"))
        .and(body_string_contains("ejectedNodes=ns_1%4010.99.0.1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).with_local_node("10.99.0.1");
    cluster.remove_and_rebalance().await.unwrap();
}

#[tokio::test]
async fn join_live_node_rebalances_when_already_a_healthy_member() {
    let server = MockServer::start().await;
    let port = server.address().port();

    Mock::given(method("GET"))
        .and(path("/pools/default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nodes": [
                {"hostname": "127.0.0.1:8091", "otpNode": "ns_1@127.0.0.1", "status": "healthy"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default/rebalanceProgress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "none"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/controller/addNode"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/controller/rebalance"))
        .and(body_string_contains("ejectedNodes=&"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cluster = cluster_for(&server).with_local_endpoint("127.0.0.1", port);
    let live = LiveNode {
        ip: "127.0.0.1".to_string(),
        port,
    };
    cluster.join_live_node(&live).await.unwrap();
}

/// The launcher's health predicate: a warming-up node means not ready yet.
#[tokio::test]
async fn health_predicate_rejects_warming_nodes() {
    let server = MockServer::start().await;
    let port = server.address().port();

    Mock::given(method("GET"))
        .and(path("/pools/default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nodes": [
                {"hostname": "10.0.0.1:8091", "otpNode": "ns_1@10.0.0.1", "status": "healthy"},
                {"hostname": "10.0.0.2:8091", "otpNode": "ns_1@10.0.0.2", "status": "warmup"}
            ]
        })))
        .mount(&server)
        .await;

    let cluster = cluster_for(&server);
    let live = LiveNode {
        ip: "127.0.0.1".to_string(),
        port,
    };
    assert!(!cluster
        .check_num_nodes_cluster_healthy(Some(2), &live)
        .await
        .unwrap());
    // Count shortfall also fails regardless of health.
    assert!(!cluster
        .check_num_nodes_cluster_healthy(Some(3), &live)
        .await
        .unwrap());
}

#[tokio::test]
async fn load_admin_credentials_rejects_factory_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/keys/couchbase.com/userpass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(etcd_value_body(
            "/couchbase.com/userpass",
            "admin:password",
        )))
        .mount(&server)
        .await;

    let err = cbcluster::cluster::load_admin_credentials(&coord_for(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Config(_)));
}

#[tokio::test]
async fn load_admin_credentials_reads_stored_userpass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/keys/couchbase.com/userpass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(etcd_value_body(
            "/couchbase.com/userpass",
            "bob:secret",
        )))
        .mount(&server)
        .await;

    let creds = cbcluster::cluster::load_admin_credentials(&coord_for(&server))
        .await
        .unwrap();
    assert_eq!(creds.username, "bob");
    assert_eq!(creds.password, "secret");
}
