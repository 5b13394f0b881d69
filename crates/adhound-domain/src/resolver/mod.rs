//! ACE resolution engine.
//!
//! The engine expands effective permissions through group-membership
//! closure, classifies entities, normalizes identifiers across backend
//! response shapes, applies scope and target filters, and merges direct
//! and closure-derived edges into one deduplicated result set.
//!
//! # Architecture Decisions
//!
//! - **Dual reply shapes**: tabular rows and raw subgraphs enter the
//!   extractor through one tagged enum ([`EdgeReply`]), so the shared
//!   classify/normalize/dedup steps are written once.
//! - **Collaborator boundary**: membership traversal and query execution
//!   live behind [`DirectoryGraph`]; the engine never assembles query
//!   text and never performs I/O.
//! - **Determinism**: results are keyed and ordered by the full edge
//!   tuple, so output is independent of backend reply ordering.

mod engine;
mod extractor;
mod filter;
mod traits;

#[cfg(test)]
mod tests;

pub use engine::AceEngine;
pub use extractor::{extract_aces, AceScope, ResolvedEdge};
pub use filter::apply_filters;
pub use traits::{
    DirectoryGraph, EdgeReply, EdgeRow, EntityQuery, PropertyFilters, Record, Subgraph,
    SubgraphEdge,
};
