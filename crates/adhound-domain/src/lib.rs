//! adhound-domain: Core ACE resolution logic
//!
//! This crate contains the pure, I/O-free part of adhound:
//! - Entity model and kind classification
//! - Identifier normalization
//! - ACE extraction (direct + membership-closure edges) and deduplication
//! - The high-value / blacklist filter pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                adhound-domain                    │
//! ├─────────────────────────────────────────────────┤
//! │  model/      - Entity, Kind, AceResult          │
//! │  normalize   - Principal-name normalization     │
//! │  resolver/   - ACE engine, extractor, filters   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Backends (Neo4j, BloodHound CE) implement the [`resolver::DirectoryGraph`]
//! trait in a separate crate; the engine never builds query text and never
//! performs I/O of its own.

pub mod error;
pub mod model;
pub mod normalize;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use model::{AceResult, Entity, Kind};
pub use resolver::{AceEngine, DirectoryGraph, EdgeReply, EntityQuery};
