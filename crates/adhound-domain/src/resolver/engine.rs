//! The ACE engine: public resolution operations over a backend collaborator.
//!
//! The engine is purely computational and holds no shared mutable state;
//! each call builds its working set from one backend reply and discards it.
//! The backend reference is passed in at construction — there is no
//! process-wide store handle.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::{AceResult, Kind};
use crate::normalize::normalize;

use super::extractor::{extract_aces, AceScope};
use super::filter::apply_filters;
use super::traits::{DirectoryGraph, EntityQuery};

/// ACE resolution engine, generic over the backing store.
pub struct AceEngine<S> {
    graph: Arc<S>,
}

impl<S> AceEngine<S>
where
    S: DirectoryGraph,
{
    pub fn new(graph: Arc<S>) -> Self {
        Self { graph }
    }

    /// Resolves every ACE whose source is the principal or any group in
    /// its transitive membership closure.
    ///
    /// Edges are attributed to their actual source entity: an edge held by
    /// a nested group appears sourced from that group, not from the
    /// queried principal.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_aces_for_principal(
        &self,
        principal: &str,
        high_value_only: bool,
    ) -> DomainResult<Vec<AceResult>> {
        let sources = self.source_set(principal).await?;
        debug!(count = sources.len(), "expanded membership closure");

        let reply = self.graph.edges_from_sources(&sources).await?;
        let edges = extract_aces(AceScope::Principal, &reply);
        Ok(apply_filters(edges, high_value_only, &[]))
    }

    /// Resolves cross-domain ACEs originating from the given domain,
    /// excluding any target domain on the blacklist.
    #[instrument(skip(self, blacklist), level = "debug")]
    pub async fn resolve_aces_for_domain(
        &self,
        domain: &str,
        blacklist: &[String],
        high_value_only: bool,
    ) -> DomainResult<Vec<AceResult>> {
        let domain = non_empty(domain, "domain")?;

        let reply = self.graph.edges_in_domain(domain).await?;
        let edges = extract_aces(AceScope::Domain(domain), &reply);
        Ok(apply_filters(edges, high_value_only, blacklist))
    }

    /// Lists entity names matching a kind/domain/property-filter query.
    ///
    /// Users are reported by account name with the backend's casing;
    /// computers by their lower-cased host name with any UPN suffix
    /// stripped, so both stores yield identical listings.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_entities(&self, query: &EntityQuery) -> DomainResult<Vec<String>> {
        non_empty(&query.domain, "domain")?;

        let records = self.graph.list_entities(query).await?;
        let mut names = Vec::with_capacity(records.len());
        for record in &records {
            let name = match query.kind {
                Kind::Computer => record
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .map(|name| normalize(name).to_ascii_lowercase()),
                _ => record
                    .get("samaccountname")
                    .and_then(serde_json::Value::as_str)
                    .map(|name| normalize(name).to_string()),
            };
            match name {
                Some(name) if !name.is_empty() => names.push(name),
                _ => warn!("listing record missing name field, skipping"),
            }
        }
        // Backends differ in reply ordering; sort for stable output.
        names.sort();
        Ok(names)
    }

    /// Lists the groups in a principal's transitive membership closure by
    /// their full display names, sorted and deduplicated.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_group_memberships(&self, principal: &str) -> DomainResult<Vec<String>> {
        let principal = non_empty(principal, "principal")?;

        let closure = self.graph.membership_closure(principal).await?;
        let groups: BTreeSet<String> = closure
            .iter()
            .filter(|entity| entity.classify() == Kind::Group)
            .map(|entity| {
                entity
                    .prop_str("name")
                    .filter(|name| !name.is_empty())
                    .unwrap_or(entity.display_name())
                    .to_string()
            })
            .filter(|name| !name.is_empty())
            .collect();
        Ok(groups.into_iter().collect())
    }

    /// Builds the candidate source-name set: the principal itself plus
    /// every group in its closure, normalized, as a set (a nesting cycle
    /// in the membership graph must not produce duplicates).
    async fn source_set(&self, principal: &str) -> DomainResult<Vec<String>> {
        let principal = non_empty(principal, "principal")?;

        let closure = self.graph.membership_closure(principal).await?;
        let mut sources: BTreeSet<String> = closure
            .iter()
            .map(|entity| normalize(entity.display_name()).to_string())
            .filter(|name| !name.is_empty())
            .collect();
        sources.insert(normalize(principal).to_string());
        Ok(sources.into_iter().collect())
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> DomainResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidScope {
            message: format!("{what} must not be empty"),
        });
    }
    Ok(trimmed)
}
