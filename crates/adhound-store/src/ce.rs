//! BloodHound CE backend over the HTTP graph API.
//!
//! Authenticates with `POST /api/v2/login` (login method `secret`) and
//! caches the returned session token for the lifetime of the store. Graph
//! queries go through `POST /api/v2/graphs/cypher`, which accepts only
//! query text, so parameters are rendered as escaped inline literals. The
//! reply is a raw node map plus edge list referencing nodes by opaque id;
//! it is decoded into a [`Subgraph`] and handed to the engine untouched.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use adhound_domain::normalize::{fold_domain, normalize};
use adhound_domain::resolver::{EdgeReply, EntityQuery, Record, Subgraph, SubgraphEdge};
use adhound_domain::{DirectoryGraph, DomainError, DomainResult, Entity, Kind};

use crate::error::{StoreError, StoreResult};
use crate::query::CypherQuery;

/// Connection settings for a BloodHound CE instance.
#[derive(Debug, Clone)]
pub struct CeConfig {
    /// Base URL of the API, e.g. `http://localhost:8080`.
    pub url: String,
    pub username: String,
    pub secret: String,
    /// Pre-provisioned bearer token; skips the login call when set.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            secret: String::new(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

/// Directory graph backed by the BloodHound CE API.
pub struct CeStore {
    client: Client,
    config: CeConfig,
    /// Session token cache, filled on first use.
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct LoginReply {
    data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
    session_token: String,
}

#[derive(Deserialize)]
struct CypherReply {
    #[serde(default)]
    data: GraphData,
}

#[derive(Deserialize, Default)]
struct GraphData {
    #[serde(default)]
    nodes: HashMap<String, CeNode>,
    #[serde(default)]
    edges: Vec<CeEdge>,
}

#[derive(Deserialize)]
struct CeNode {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    kinds: Vec<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
struct CeEdge {
    source: Value,
    target: Value,
    #[serde(default)]
    label: String,
}

impl CeStore {
    pub fn new(config: CeConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.url.trim_end_matches('/'))
    }

    /// Returns the cached session token, logging in on first use.
    async fn session_token(&self) -> StoreResult<String> {
        if let Some(token) = &self.config.api_token {
            return Ok(token.clone());
        }
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }

        let response = self
            .client
            .post(self.endpoint("/api/v2/login"))
            .json(&json!({
                "login_method": "secret",
                "username": self.config.username,
                "secret": self.config.secret,
            }))
            .send()
            .await
            .map_err(|e| StoreError::transport(e, self.config.timeout_secs))?;

        if !response.status().is_success() {
            return Err(StoreError::Auth {
                message: format!("login rejected with {}", response.status()),
            });
        }
        let reply: LoginReply = response.json().await.map_err(|e| StoreError::Decode {
            message: format!("invalid login reply: {e}"),
        })?;

        let mut cached = self.token.write().await;
        *cached = Some(reply.data.session_token.clone());
        Ok(reply.data.session_token)
    }

    /// Runs a cypher query and decodes the graph reply.
    ///
    /// The API signals an empty result set with 404, which is a valid
    /// empty graph here, not an error.
    #[instrument(skip(self, query), level = "debug")]
    async fn run_cypher(&self, query: &CypherQuery) -> StoreResult<Subgraph> {
        let token = self.session_token().await?;
        let response = self
            .client
            .post(self.endpoint("/api/v2/graphs/cypher"))
            .bearer_auth(token)
            .json(&json!({
                "query": query.render_inline(),
                "include_properties": true,
            }))
            .send()
            .await
            .map_err(|e| StoreError::transport(e, self.config.timeout_secs))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Subgraph::default());
        }
        if status == StatusCode::UNAUTHORIZED {
            // Session expired; drop the cache so the next call re-logs-in.
            *self.token.write().await = None;
            return Err(StoreError::Auth {
                message: "session token rejected".to_string(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Query {
                message: format!("cypher endpoint returned {status}"),
            });
        }

        let reply: CypherReply = response.json().await.map_err(|e| StoreError::Decode {
            message: format!("invalid graph reply: {e}"),
        })?;

        let mut subgraph = Subgraph::default();
        for (id, node) in reply.data.nodes {
            subgraph.nodes.insert(id, node.into_entity());
        }
        for edge in reply.data.edges {
            subgraph.edges.push(SubgraphEdge {
                source: node_key(&edge.source),
                target: node_key(&edge.target),
                label: edge.label,
            });
        }
        debug!(
            nodes = subgraph.nodes.len(),
            edges = subgraph.edges.len(),
            "decoded graph reply"
        );
        Ok(subgraph)
    }
}

impl CeNode {
    fn into_entity(self) -> Entity {
        let kinds = match self.kind {
            Some(kind) => vec![kind],
            None => self.kinds,
        };
        Entity::new(kinds, self.properties)
    }
}

/// Edge endpoint references arrive as JSON strings or numbers depending
/// on the server version; node map keys are always strings.
fn node_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the listing statement for one entity kind plus its filters.
fn listing_query(query: &EntityQuery) -> CypherQuery {
    let filters = &query.filters;
    let mut text = match (&filters.ou_dn, query.kind) {
        (Some(_), Kind::User) => String::from(
            "MATCH (ou:OU) WHERE toLower(ou.distinguishedname) = $ou \
             MATCH (u:User) WHERE toLower(u.distinguishedname) ENDS WITH toLower(ou.distinguishedname) \
             AND toLower(u.domain) = $domain AND u.enabled = true",
        ),
        (_, Kind::User) => String::from(
            "MATCH (u:User) WHERE toLower(u.domain) = $domain AND u.enabled = true",
        ),
        (_, Kind::Computer) => String::from(
            "MATCH (u:Computer) WHERE toLower(u.domain) = $domain AND u.enabled = true",
        ),
        (_, Kind::Group) => {
            String::from("MATCH (u:Group) WHERE toLower(u.domain) = $domain")
        }
        (_, kind) => format!(
            "MATCH (u:{}) WHERE toLower(u.domain) = $domain",
            kind.as_str()
        ),
    };

    if filters.admin_count {
        // Direct admincount, or inherited through the membership closure.
        text.push_str(
            " AND (u.admincount = true \
             OR EXISTS((u)-[:MemberOf*1..]->(:Group {admincount: true})))",
        );
    }
    if filters.high_value {
        text.push_str(" AND u.system_tags CONTAINS 'admin_tier_0'");
    }
    if filters.password_not_required {
        text.push_str(" AND u.passwordnotreqd = true");
    }
    if filters.password_never_expires {
        text.push_str(" AND u.pwdneverexpires = true");
    }
    if filters.has_laps.is_some() {
        text.push_str(" AND u.haslaps = $laps");
    }
    text.push_str(" RETURN u");

    let mut cypher = CypherQuery::new(text).param("domain", fold_domain(&query.domain));
    if let Some(ou) = &filters.ou_dn {
        cypher = cypher.param("ou", ou.trim().to_ascii_lowercase());
    }
    if let Some(laps) = filters.has_laps {
        cypher = cypher.param("laps", laps);
    }
    cypher
}

#[async_trait]
impl DirectoryGraph for CeStore {
    async fn membership_closure(&self, principal: &str) -> DomainResult<Vec<Entity>> {
        let name = normalize(principal).to_ascii_lowercase();
        let query = CypherQuery::new(
            "MATCH (n) WHERE toLower(n.samaccountname) = $name \
             OR toLower(n.name) STARTS WITH $prefix \
             OPTIONAL MATCH p = (n)-[:MemberOf*1..]->(:Group) \
             RETURN n, p",
        )
        .param("name", name.clone())
        .param("prefix", format!("{name}@"));

        let subgraph = self.run_cypher(&query).await.map_err(DomainError::from)?;
        Ok(subgraph.nodes.into_values().collect())
    }

    async fn edges_from_sources(&self, sources: &[String]) -> DomainResult<EdgeReply> {
        let names: Vec<String> = sources.iter().map(|s| s.to_ascii_lowercase()).collect();
        let query = CypherQuery::new(
            "MATCH (n)-[r]->(m) \
             WHERE toLower(n.samaccountname) IN $names AND r.isacl = true \
             RETURN n, r, m",
        )
        .param("names", names);

        let subgraph = self.run_cypher(&query).await.map_err(DomainError::from)?;
        Ok(EdgeReply::Graph(subgraph))
    }

    async fn edges_in_domain(&self, domain: &str) -> DomainResult<EdgeReply> {
        let query = CypherQuery::new(
            "MATCH (n)-[r]->(m) \
             WHERE toLower(n.domain) = $domain AND r.isacl = true \
             AND toLower(coalesce(m.domain, '')) <> $domain \
             RETURN n, r, m",
        )
        .param("domain", fold_domain(domain));

        let subgraph = self.run_cypher(&query).await.map_err(DomainError::from)?;
        Ok(EdgeReply::Graph(subgraph))
    }

    async fn list_entities(&self, query: &EntityQuery) -> DomainResult<Vec<Record>> {
        let subgraph = self
            .run_cypher(&listing_query(query))
            .await
            .map_err(DomainError::from)?;
        Ok(subgraph
            .nodes
            .into_values()
            .map(|entity| entity.properties)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adhound_domain::resolver::PropertyFilters;

    #[test]
    fn closure_query_matches_account_name_and_upn_prefix() {
        let cypher = CypherQuery::new(
            "MATCH (n) WHERE toLower(n.samaccountname) = $name \
             OR toLower(n.name) STARTS WITH $prefix RETURN n",
        )
        .param("name", "small council")
        .param("prefix", "small council@");

        let rendered = cypher.render_inline();
        assert!(rendered.contains("toLower(n.samaccountname) = 'small council'"));
        assert!(rendered.contains("STARTS WITH 'small council@'"));
    }

    #[test]
    fn high_value_listing_uses_the_admin_tier_tag() {
        let query = EntityQuery::new("essos.local", Kind::User).with_filters(PropertyFilters {
            high_value: true,
            ..PropertyFilters::default()
        });
        let cypher = listing_query(&query);
        assert!(cypher.text.contains("u.system_tags CONTAINS 'admin_tier_0'"));
        assert!(!cypher.text.contains("highvalue"));
    }

    #[test]
    fn node_keys_accept_numeric_edge_endpoints() {
        assert_eq!(node_key(&serde_json::json!("17")), "17");
        assert_eq!(node_key(&serde_json::json!(17)), "17");
    }
}
