//! CE backend tests against a mock BloodHound CE API.

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adhound_domain::resolver::{EdgeReply, EntityQuery};
use adhound_domain::{DirectoryGraph, Kind};
use adhound_store::{CeConfig, CeStore};

fn store(server: &MockServer) -> CeStore {
    CeStore::new(CeConfig {
        url: server.uri(),
        username: "admin".to_string(),
        secret: "hunter2".to_string(),
        api_token: None,
        timeout_secs: 5,
    })
    .unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .and(body_partial_json(json!({
            "login_method": "secret",
            "username": "admin",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"session_token": "tok-123"}})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn graph_reply_decodes_nodes_and_edges() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_string_contains("r.isacl = true"))
        .and(body_string_contains("'spys'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "nodes": {
                    "100": {
                        "kind": "Group",
                        "properties": {"samaccountname": "Spys", "domain": "SEVENKINGDOMS.LOCAL"}
                    },
                    "200": {
                        "kind": "Computer",
                        "properties": {"samaccountname": "BRAAVOS$", "domain": "ESSOS.LOCAL"}
                    }
                },
                "edges": [
                    {"source": 100, "target": 200, "label": "ReadLAPSPassword"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let reply = store(&server)
        .edges_from_sources(&["Spys".to_string()])
        .await
        .unwrap();

    let EdgeReply::Graph(subgraph) = reply else {
        panic!("CE backend must return a subgraph")
    };
    assert_eq!(subgraph.nodes.len(), 2);
    assert_eq!(subgraph.edges.len(), 1);
    // Numeric edge endpoints resolve against the string-keyed node map.
    assert_eq!(subgraph.edges[0].source, "100");
    assert_eq!(subgraph.nodes["100"].classify(), Kind::Group);
    assert_eq!(subgraph.edges[0].label, "ReadLAPSPassword");
}

#[tokio::test]
async fn session_token_is_cached_across_queries() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"nodes": {}, "edges": []}})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let store = store(&server);
    store.membership_closure("alice").await.unwrap();
    store.membership_closure("bob").await.unwrap();
    // mount_login's expect(1) verifies a single login on drop.
}

#[tokio::test]
async fn api_token_skips_the_login_call() {
    let server = MockServer::start().await;

    // No login mock mounted: a login attempt would fail the query.
    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .and(header("authorization", "Bearer pre-provisioned"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"nodes": {}, "edges": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = CeStore::new(CeConfig {
        url: server.uri(),
        api_token: Some("pre-provisioned".to_string()),
        ..CeConfig::default()
    })
    .unwrap();

    store.membership_closure("alice").await.unwrap();
}

#[tokio::test]
async fn empty_result_404_reads_as_empty_graph() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"context": "", "message": "resource not found"}]
        })))
        .mount(&server)
        .await;

    let closure = store(&server).membership_closure("ghost").await.unwrap();
    assert!(closure.is_empty());
}

#[tokio::test]
async fn rejected_login_fails_the_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = store(&server)
        .membership_closure("alice")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("login rejected"));
}

#[tokio::test]
async fn closure_query_carries_upn_prefix_literal() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .and(body_string_contains("toLower(n.samaccountname) = 'small council'"))
        .and(body_string_contains("STARTS WITH 'small council@'"))
        .and(body_string_contains("MemberOf*1.."))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"nodes": {}, "edges": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .membership_closure("SMALL COUNCIL@SEVENKINGDOMS.LOCAL")
        .await
        .unwrap();
}

#[tokio::test]
async fn listing_flattens_node_properties() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/graphs/cypher"))
        .and(body_string_contains("u.enabled = true"))
        .and(body_string_contains("'north.sevenkingdoms.local'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "nodes": {
                    "1": {"kind": "User", "properties": {"samaccountname": "jeor.mormont"}},
                    "2": {"kind": "User", "properties": {"samaccountname": "jon.snow"}}
                },
                "edges": []
            }
        })))
        .mount(&server)
        .await;

    let records = store(&server)
        .list_entities(&EntityQuery::new("NORTH.SEVENKINGDOMS.LOCAL", Kind::User))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .any(|record| record["samaccountname"] == json!("jon.snow")));
}
