//! Legacy BloodHound backend over the Neo4j HTTP transactional endpoint.
//!
//! Speaks `POST {uri}/db/{database}/tx/commit` with one auto-committed
//! statement per call and a real parameter map, so caller input never
//! touches query text. Replies come back as tabular rows; edge queries
//! return both endpoint entities pre-joined per row.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use adhound_domain::normalize::{fold_domain, normalize};
use adhound_domain::resolver::{EdgeReply, EdgeRow, EntityQuery, Record};
use adhound_domain::{DirectoryGraph, DomainError, DomainResult, Entity, Kind};

use crate::error::{StoreError, StoreResult};
use crate::query::CypherQuery;

/// Connection settings for a legacy Neo4j instance.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Base URI of the HTTP endpoint, e.g. `http://localhost:7474`.
    pub uri: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Directory graph backed by legacy BloodHound data in Neo4j.
pub struct Neo4jStore {
    client: Client,
    config: Neo4jConfig,
}

#[derive(Deserialize)]
struct TxReply {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Neo4jStore {
    pub fn new(config: Neo4jConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    /// Runs one statement through the auto-commit endpoint and returns
    /// its rows. Any reported statement error fails the whole call.
    #[instrument(skip(self, query), level = "debug")]
    async fn commit(&self, query: CypherQuery) -> StoreResult<Vec<Vec<Value>>> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        );
        let body = json!({
            "statements": [{
                "statement": query.text,
                "parameters": query.params_json(),
            }]
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::transport(e, self.config.timeout_secs))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::Auth {
                message: "neo4j rejected the credentials".to_string(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Connection {
                message: format!("neo4j returned {status}"),
            });
        }

        let reply: TxReply = response.json().await.map_err(|e| StoreError::Decode {
            message: format!("invalid transactional reply: {e}"),
        })?;
        if let Some(err) = reply.errors.first() {
            return Err(StoreError::Query {
                message: format!("{}: {}", err.code, err.message),
            });
        }

        let rows: Vec<Vec<Value>> = reply
            .results
            .into_iter()
            .next()
            .map(|result| result.data.into_iter().map(|item| item.row).collect())
            .unwrap_or_default();
        debug!(rows = rows.len(), "statement committed");
        Ok(rows)
    }

    async fn edge_rows(&self, query: CypherQuery) -> StoreResult<Vec<EdgeRow>> {
        let rows = self.commit(query).await?;
        let mut edges = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() < 5 {
                return Err(StoreError::Decode {
                    message: format!("edge row has {} columns, expected 5", row.len()),
                });
            }
            edges.push(EdgeRow {
                source: entity_from(&row[0], &row[1]),
                relation: row[2].as_str().unwrap_or_default().to_string(),
                target: entity_from(&row[3], &row[4]),
            });
        }
        Ok(edges)
    }
}

fn entity_from(kinds: &Value, props: &Value) -> Entity {
    let kinds = kinds
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let props = props.as_object().cloned().unwrap_or_default();
    Entity::new(kinds, props)
}

/// Builds the listing statement for one entity kind plus its filters.
fn listing_query(query: &EntityQuery) -> CypherQuery {
    let filters = &query.filters;
    let mut text = match (&filters.ou_dn, query.kind) {
        (Some(_), Kind::User) => String::from(
            "MATCH (ou:OU)-[:Contains*1..]->(u:User) \
             WHERE toLower(ou.distinguishedname) = $ou \
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
        text.push_str(" AND u.highvalue = true");
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
    text.push_str(" RETURN properties(u)");

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
impl DirectoryGraph for Neo4jStore {
    async fn membership_closure(&self, principal: &str) -> DomainResult<Vec<Entity>> {
        let name = normalize(principal).to_ascii_lowercase();
        let query = CypherQuery::new(
            "MATCH (n) WHERE toLower(n.samaccountname) = $name \
             RETURN labels(n), properties(n) \
             UNION \
             MATCH (n)-[:MemberOf*1..]->(g:Group) \
             WHERE toLower(n.samaccountname) = $name \
             RETURN labels(g), properties(g)",
        )
        .param("name", name);

        let rows = self.commit(query).await.map_err(DomainError::from)?;
        let entities = rows
            .iter()
            .filter(|row| row.len() >= 2)
            .map(|row| entity_from(&row[0], &row[1]))
            .collect();
        Ok(entities)
    }

    async fn edges_from_sources(&self, sources: &[String]) -> DomainResult<EdgeReply> {
        let names: Vec<String> = sources.iter().map(|s| s.to_ascii_lowercase()).collect();
        let query = CypherQuery::new(
            "MATCH (n)-[r]->(m) \
             WHERE toLower(n.samaccountname) IN $names AND r.isacl = true \
             RETURN labels(n), properties(n), type(r), labels(m), properties(m)",
        )
        .param("names", names);

        let edges = self.edge_rows(query).await.map_err(DomainError::from)?;
        Ok(EdgeReply::Rows(edges))
    }

    async fn edges_in_domain(&self, domain: &str) -> DomainResult<EdgeReply> {
        let query = CypherQuery::new(
            "MATCH (n)-[r]->(m) \
             WHERE toLower(n.domain) = $domain AND r.isacl = true \
             AND toLower(coalesce(m.domain, '')) <> $domain \
             RETURN labels(n), properties(n), type(r), labels(m), properties(m)",
        )
        .param("domain", fold_domain(domain));

        let edges = self.edge_rows(query).await.map_err(DomainError::from)?;
        Ok(EdgeReply::Rows(edges))
    }

    async fn list_entities(&self, query: &EntityQuery) -> DomainResult<Vec<Record>> {
        let rows = self
            .commit(listing_query(query))
            .await
            .map_err(DomainError::from)?;
        let records: Vec<Record> = rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(Value::as_object)
            .cloned()
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adhound_domain::resolver::PropertyFilters;

    #[test]
    fn user_listing_composes_filters() {
        let query = EntityQuery::new("ESSOS.LOCAL", Kind::User).with_filters(PropertyFilters {
            admin_count: true,
            password_never_expires: true,
            ..PropertyFilters::default()
        });

        let cypher = listing_query(&query);
        assert!(cypher.text.contains("u.enabled = true"));
        assert!(cypher.text.contains("u.admincount = true"));
        assert!(cypher.text.contains("u.pwdneverexpires = true"));
        assert!(!cypher.text.contains("u.highvalue"));
        assert!(cypher.params_json()["domain"] == serde_json::json!("essos.local"));
    }

    #[test]
    fn ou_listing_matches_through_the_ou_node() {
        let query = EntityQuery::new("essos.local", Kind::User).with_filters(PropertyFilters {
            ou_dn: Some("OU=Dragons,DC=essos,DC=local".to_string()),
            ..PropertyFilters::default()
        });

        let cypher = listing_query(&query);
        assert!(cypher.text.starts_with("MATCH (ou:OU)"));
        assert_eq!(
            cypher.params_json()["ou"],
            serde_json::json!("ou=dragons,dc=essos,dc=local")
        );
    }

    #[test]
    fn laps_filter_is_tri_state() {
        let without = listing_query(&EntityQuery::new("essos.local", Kind::Computer));
        assert!(!without.text.contains("haslaps"));

        let with = listing_query(
            &EntityQuery::new("essos.local", Kind::Computer).with_filters(PropertyFilters {
                has_laps: Some(false),
                ..PropertyFilters::default()
            }),
        );
        assert!(with.text.contains("u.haslaps = $laps"));
        assert_eq!(with.params_json()["laps"], serde_json::json!(false));
    }

    #[test]
    fn group_listing_skips_the_enabled_predicate() {
        let cypher = listing_query(&EntityQuery::new("essos.local", Kind::Group));
        assert!(!cypher.text.contains("enabled"));
    }
}
