//! Ordered filter pipeline over extracted edges.
//!
//! Stage order is fixed: high-value first, blacklist second. Each stage is
//! a pure, total function over the edge list; relative order of retained
//! edges is never changed.

use crate::model::AceResult;
use crate::normalize::domain_eq;

use super::extractor::ResolvedEdge;

/// Applies the filter pipeline and strips edges down to their results.
///
/// An empty blacklist is a no-op, not "match nothing". Blacklist matching
/// is case-insensitive on the target domain.
pub fn apply_filters(
    mut edges: Vec<ResolvedEdge>,
    high_value_only: bool,
    blacklist: &[String],
) -> Vec<AceResult> {
    if high_value_only {
        edges.retain(|edge| edge.target_high_value);
    }
    if !blacklist.is_empty() {
        edges.retain(|edge| {
            !blacklist
                .iter()
                .any(|domain| domain_eq(domain, &edge.ace.target_domain))
        });
    }
    edges.into_iter().map(|edge| edge.ace).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Kind;

    fn edge(target: &str, target_domain: &str, high_value: bool) -> ResolvedEdge {
        ResolvedEdge {
            ace: AceResult {
                source: "alice".into(),
                source_kind: Kind::User,
                target: target.into(),
                target_kind: Kind::Computer,
                relation: "GenericAll".into(),
                source_domain: "ESSOS.LOCAL".into(),
                target_domain: target_domain.into(),
                target_enabled: true,
            },
            target_high_value: high_value,
        }
    }

    #[test]
    fn high_value_filter_drops_unmarked_targets() {
        let edges = vec![
            edge("dc01$", "ESSOS.LOCAL", true),
            edge("ws01$", "ESSOS.LOCAL", false),
        ];
        let filtered = apply_filters(edges, true, &[]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].target, "dc01$");
    }

    #[test]
    fn high_value_output_is_subset_of_unfiltered() {
        let edges = vec![
            edge("a$", "ESSOS.LOCAL", true),
            edge("b$", "ESSOS.LOCAL", false),
            edge("c$", "ESSOS.LOCAL", true),
        ];
        let all = apply_filters(edges.clone(), false, &[]);
        let high_value = apply_filters(edges, true, &[]);
        assert!(high_value.iter().all(|ace| all.contains(ace)));
        assert!(high_value.len() <= all.len());
    }

    #[test]
    fn blacklist_matches_target_domain_case_insensitively() {
        let edges = vec![
            edge("kl01$", "SEVENKINGDOMS.LOCAL", false),
            edge("mee01$", "ESSOS.LOCAL", false),
        ];
        let filtered = apply_filters(edges, false, &["sevenkingdoms.local".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert!(filtered
            .iter()
            .all(|ace| !ace.target_domain.eq_ignore_ascii_case("sevenkingdoms.local")));
    }

    #[test]
    fn empty_blacklist_is_noop() {
        let edges = vec![
            edge("a$", "ESSOS.LOCAL", false),
            edge("b$", "SEVENKINGDOMS.LOCAL", false),
        ];
        assert_eq!(apply_filters(edges, false, &[]).len(), 2);
    }

    #[test]
    fn retained_edges_keep_relative_order() {
        let edges = vec![
            edge("a$", "ESSOS.LOCAL", true),
            edge("b$", "SEVENKINGDOMS.LOCAL", true),
            edge("c$", "ESSOS.LOCAL", true),
        ];
        let filtered = apply_filters(edges, true, &["sevenkingdoms.local".to_string()]);
        let targets: Vec<&str> = filtered.iter().map(|ace| ace.target.as_str()).collect();
        assert_eq!(targets, vec!["a$", "c$"]);
    }
}
