//! ACE extraction: turns a backend edge reply into deduplicated,
//! deterministically ordered [`AceResult`] records.
//!
//! Both reply shapes funnel into one code path: the subgraph shape is
//! first resolved into `(source, target, relation)` triples against its
//! node map, then classification, normalization and deduplication are
//! shared with the tabular shape.

use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{AceResult, EdgeKey, Entity};
use crate::normalize::{domain_eq, normalize};

use super::traits::EdgeReply;

/// Scope under which edges were requested.
#[derive(Debug, Clone, Copy)]
pub enum AceScope<'a> {
    /// Single-principal query (principal plus membership closure).
    Principal,
    /// Whole-domain query: only cross-domain edges are kept, because
    /// the domain scope exists to surface cross-domain trust abuse.
    Domain(&'a str),
}

/// One extracted edge, carrying the target's high-value marker alongside
/// the result so the filter pipeline can act on it without re-resolving
/// entities.
#[derive(Debug, Clone)]
pub struct ResolvedEdge {
    pub ace: AceResult,
    pub target_high_value: bool,
}

/// Extracts ACE results from an edge reply.
///
/// Deduplication is keyed by the full `(source, target, relation,
/// sourceDomain, targetDomain)` tuple; output order is the key order, so
/// the result is independent of backend reply ordering.
///
/// Disabled targets are not dropped here: the edge is kept with
/// `target_enabled = false` and exclusion is left to the caller. An
/// absent enabled attribute reads as enabled.
pub fn extract_aces(scope: AceScope<'_>, reply: &EdgeReply) -> Vec<ResolvedEdge> {
    let mut out: BTreeMap<EdgeKey, ResolvedEdge> = BTreeMap::new();

    for (source, target, relation) in triples(reply) {
        let source_domain = source.domain();
        let target_domain = target.domain();

        if let AceScope::Domain(domain) = scope {
            if !domain_eq(source_domain, domain) {
                continue;
            }
            if domain_eq(source_domain, target_domain) {
                continue;
            }
        }

        let ace = AceResult {
            source: normalize(source.display_name()).to_string(),
            source_kind: source.classify(),
            target: normalize(target.display_name()).to_string(),
            target_kind: target.classify(),
            relation: relation.to_string(),
            source_domain: source_domain.to_string(),
            target_domain: target_domain.to_string(),
            target_enabled: target.enabled(),
        };

        let target_high_value = target.is_high_value();
        out.entry(ace.dedup_key()).or_insert(ResolvedEdge {
            ace,
            target_high_value,
        });
    }

    out.into_values().collect()
}

/// Resolves a reply into `(source, target, relation)` triples.
///
/// Subgraph edges referencing an unknown node key are skipped with a
/// warning; one dangling reference must not abort the extraction.
fn triples(reply: &EdgeReply) -> Vec<(&Entity, &Entity, &str)> {
    match reply {
        EdgeReply::Rows(rows) => rows
            .iter()
            .map(|row| (&row.source, &row.target, row.relation.as_str()))
            .collect(),
        EdgeReply::Graph(graph) => graph
            .edges
            .iter()
            .filter_map(|edge| {
                let source = graph.nodes.get(&edge.source);
                let target = graph.nodes.get(&edge.target);
                match (source, target) {
                    (Some(s), Some(t)) => Some((s, t, edge.label.as_str())),
                    _ => {
                        warn!(
                            source = %edge.source,
                            target = %edge.target,
                            label = %edge.label,
                            "subgraph edge references unknown node, skipping"
                        );
                        None
                    }
                }
            })
            .collect(),
    }
}
