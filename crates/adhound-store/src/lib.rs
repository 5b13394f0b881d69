//! adhound-store: Directory graph backends
//!
//! Two implementations of [`adhound_domain::DirectoryGraph`]:
//! - [`Neo4jStore`]: legacy BloodHound data via the Neo4j HTTP
//!   transactional endpoint (tabular rows, real parameter maps)
//! - [`CeStore`]: the BloodHound CE API (token auth, graph-shaped
//!   replies, inline-rendered query literals)
//!
//! Backends own transport, authentication and query assembly; the engine
//! upstream only ever sees decoded entities and edges.

pub mod ce;
pub mod error;
pub mod neo4j;
pub mod query;

pub use ce::{CeConfig, CeStore};
pub use error::{StoreError, StoreResult};
pub use neo4j::{Neo4jConfig, Neo4jStore};
pub use query::{CypherQuery, Param};
