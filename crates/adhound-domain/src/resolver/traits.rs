//! Collaborator traits and reply shapes for the ACE engine.
//!
//! The engine never assembles query text. Backends expose a small semantic
//! surface — membership closure, outgoing ACL edges, entity listing — and
//! return results in one of two shapes: pre-joined rows (the legacy
//! tabular protocol) or a raw node/edge subgraph (the CE graph API).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::DomainResult;
use crate::model::{Entity, Kind};

/// One string-keyed record from a tabular listing query.
pub type Record = Map<String, Value>;

/// Property filters for entity listing queries.
///
/// Filters compose; the backend translates them into structured query
/// predicates (never string concatenation of caller input).
#[derive(Debug, Clone, Default)]
pub struct PropertyFilters {
    /// Direct `admincount` or membership in an admincount group.
    pub admin_count: bool,
    /// High-value / admin-tier marker on the object.
    pub high_value: bool,
    /// `passwordnotreqd` set.
    pub password_not_required: bool,
    /// `pwdneverexpires` set.
    pub password_never_expires: bool,
    /// Tri-state LAPS filter for computers: `None` means "don't care".
    pub has_laps: Option<bool>,
    /// Restrict users to an OU by distinguished name.
    pub ou_dn: Option<String>,
}

/// An entity listing query: kind + domain + property filters.
#[derive(Debug, Clone)]
pub struct EntityQuery {
    pub domain: String,
    pub kind: Kind,
    pub filters: PropertyFilters,
}

impl EntityQuery {
    pub fn new(domain: impl Into<String>, kind: Kind) -> Self {
        Self {
            domain: domain.into(),
            kind,
            filters: PropertyFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: PropertyFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// A pre-joined permission-edge row: both endpoint entities attached.
#[derive(Debug, Clone)]
pub struct EdgeRow {
    pub source: Entity,
    pub target: Entity,
    /// Raw permission-type name, passed through untouched.
    pub relation: String,
}

/// An edge in a raw subgraph reply, referencing nodes by opaque key.
#[derive(Debug, Clone)]
pub struct SubgraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// A raw node/edge subgraph as returned by the CE graph API.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    /// Nodes keyed by the backend's opaque node identifier.
    pub nodes: HashMap<String, Entity>,
    pub edges: Vec<SubgraphEdge>,
}

/// Tagged reply shape for permission-edge queries.
///
/// Modeled as one enum rather than two extractor implementations so that
/// classification, normalization and deduplication are written once.
#[derive(Debug, Clone)]
pub enum EdgeReply {
    /// Pre-joined tabular rows, one edge per record.
    Rows(Vec<EdgeRow>),
    /// Raw subgraph; edge endpoints must be resolved through the node map.
    Graph(Subgraph),
}

/// Backend collaborator surface consumed by the engine.
///
/// Implementations own transport, authentication and query assembly. They
/// must fail fast: a timeout or partial backend failure surfaces as a
/// single terminal error, never as silently truncated data. Calls are
/// independent and safe to issue concurrently.
#[async_trait]
pub trait DirectoryGraph: Send + Sync {
    /// Returns the principal plus every group transitively reachable from
    /// it via membership edges, any depth. The backend's traversal handles
    /// nesting cycles; the engine additionally treats the result as a set.
    async fn membership_closure(&self, principal: &str) -> DomainResult<Vec<Entity>>;

    /// Outgoing ACL edges whose source account name matches any of the
    /// given (already normalized) names.
    async fn edges_from_sources(&self, sources: &[String]) -> DomainResult<EdgeReply>;

    /// ACL edges originating from objects of the given domain.
    async fn edges_in_domain(&self, domain: &str) -> DomainResult<EdgeReply>;

    /// Entities of a kind within a domain, matching the property filters.
    async fn list_entities(&self, query: &EntityQuery) -> DomainResult<Vec<Record>>;
}
