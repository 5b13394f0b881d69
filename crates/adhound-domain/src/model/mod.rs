//! Entity model for directory objects.
//!
//! Entities are ephemeral: each backend response is decoded into a fresh
//! set of [`Entity`] values, classified, turned into [`AceResult`] records
//! and dropped. The engine owns no persistent state.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::fold_domain;

/// Marker value the CE store attaches to admin-tier (high-value) objects.
const ADMIN_TIER_TAG: &str = "admin_tier_0";

/// Domain placeholder for entities without a domain attribute.
const NO_DOMAIN: &str = "N/A";

/// Canonical directory-object kinds.
///
/// Classification is total: every entity maps to exactly one kind,
/// defaulting to [`Kind::Other`] for unknown tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Kind {
    User,
    Group,
    Computer,
    Ou,
    Gpo,
    Domain,
    Other,
}

impl Kind {
    /// Kind-tag priority for classification, first match wins.
    ///
    /// The order is a design decision, not incidental: malformed ingested
    /// data occasionally tags one object as both Group and Computer, and
    /// such an object must classify as Group because group-membership
    /// semantics drive closure expansion.
    const PRIORITY: [(&'static str, Kind); 6] = [
        ("User", Kind::User),
        ("Group", Kind::Group),
        ("Computer", Kind::Computer),
        ("OU", Kind::Ou),
        ("GPO", Kind::Gpo),
        ("Domain", Kind::Domain),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::User => "User",
            Kind::Group => "Group",
            Kind::Computer => "Computer",
            Kind::Ou => "OU",
            Kind::Gpo => "GPO",
            Kind::Domain => "Domain",
            Kind::Other => "Other",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directory object as returned by a backend: raw kind tags plus a
/// property bag. Both backends decode into this shape before the engine
/// touches anything.
#[derive(Debug, Clone, Default)]
pub struct Entity {
    /// Raw kind tags (node labels). May legitimately hold more than one
    /// entry; the classifier picks exactly one canonical kind.
    pub kinds: Vec<String>,
    /// Raw properties as returned by the backend.
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn new(kinds: Vec<String>, properties: Map<String, Value>) -> Self {
        Self { kinds, properties }
    }

    /// String property accessor; non-string values read as absent.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Boolean property accessor; non-boolean values read as absent.
    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    /// Maps the raw kind tags to one canonical [`Kind`].
    ///
    /// Tags are matched case-insensitively in the fixed priority order;
    /// anything unrecognized classifies as [`Kind::Other`]. Never fails.
    pub fn classify(&self) -> Kind {
        for (tag, kind) in Kind::PRIORITY {
            if self.kinds.iter().any(|k| k.eq_ignore_ascii_case(tag)) {
                return kind;
            }
        }
        Kind::Other
    }

    /// Picks the display name field for the classified kind.
    ///
    /// User/Group/Computer use the account-name field, OUs their
    /// distinguished name, everything else the generic name field. An
    /// entity missing its name field yields an empty string rather than
    /// an error so one malformed object cannot abort a whole extraction.
    pub fn display_name(&self) -> &str {
        let field = match self.classify() {
            Kind::User | Kind::Group | Kind::Computer => "samaccountname",
            Kind::Ou => "distinguishedname",
            Kind::Gpo | Kind::Domain | Kind::Other => "name",
        };
        self.prop_str(field).or_else(|| self.prop_str("name")).unwrap_or("")
    }

    /// The entity's domain, or `"N/A"` when the attribute is absent.
    pub fn domain(&self) -> &str {
        self.prop_str("domain").unwrap_or(NO_DOMAIN)
    }

    /// Whether the entity is enabled. An absent attribute reads as enabled;
    /// only an explicit `enabled: false` marks the object disabled.
    pub fn enabled(&self) -> bool {
        self.prop_bool("enabled").unwrap_or(true)
    }

    /// Whether the entity carries the high-value / admin-tier marker.
    ///
    /// The legacy store uses a `highvalue` boolean, the CE store a
    /// `system_tags` string containing `admin_tier_0`; either counts.
    pub fn is_high_value(&self) -> bool {
        if self.prop_bool("highvalue") == Some(true) {
            return true;
        }
        self.prop_str("system_tags")
            .map(|tags| tags.split_whitespace().any(|t| t == ADMIN_TIER_TAG))
            .unwrap_or(false)
    }
}

/// The engine's output unit: one resolved access-control edge.
///
/// `relation` is the raw permission-type name exactly as the backend
/// returned it (`GenericAll`, `AddMember`, `ReadLAPSPassword`, ...) and is
/// never reinterpreted or renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AceResult {
    pub source: String,
    pub source_kind: Kind,
    pub target: String,
    pub target_kind: Kind,
    pub relation: String,
    pub source_domain: String,
    pub target_domain: String,
    pub target_enabled: bool,
}

/// Deduplication key: the full identifying tuple with domains case-folded.
///
/// At most one [`AceResult`] per key appears in engine output. Kinds and
/// the enabled flag are deliberately not part of the key.
pub type EdgeKey = (String, String, String, String, String);

impl AceResult {
    pub fn dedup_key(&self) -> EdgeKey {
        (
            self.source.clone(),
            self.target.clone(),
            self.relation.clone(),
            fold_domain(&self.source_domain),
            fold_domain(&self.target_domain),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(kinds: &[&str], props: Value) -> Entity {
        let Value::Object(map) = props else {
            panic!("props must be an object")
        };
        Entity::new(kinds.iter().map(|s| s.to_string()).collect(), map)
    }

    #[test]
    fn classify_follows_priority_order() {
        assert_eq!(entity(&["User"], json!({})).classify(), Kind::User);
        assert_eq!(entity(&["OU"], json!({})).classify(), Kind::Ou);
        assert_eq!(entity(&["Domain"], json!({})).classify(), Kind::Domain);
        // Malformed data: tagged both Group and Computer. Group must win,
        // whichever order the tags arrive in.
        assert_eq!(entity(&["Computer", "Group"], json!({})).classify(), Kind::Group);
        assert_eq!(entity(&["Group", "Computer"], json!({})).classify(), Kind::Group);
        // User outranks everything.
        assert_eq!(entity(&["Group", "User"], json!({})).classify(), Kind::User);
    }

    #[test]
    fn classify_is_total() {
        assert_eq!(entity(&[], json!({})).classify(), Kind::Other);
        assert_eq!(entity(&["Container"], json!({})).classify(), Kind::Other);
        assert_eq!(entity(&["AZTenant", "Base"], json!({})).classify(), Kind::Other);
    }

    #[test]
    fn classify_ignores_tag_case() {
        assert_eq!(entity(&["user"], json!({})).classify(), Kind::User);
        assert_eq!(entity(&["GROUP"], json!({})).classify(), Kind::Group);
    }

    #[test]
    fn display_name_field_depends_on_kind() {
        let user = entity(
            &["User"],
            json!({"samaccountname": "alice", "name": "ALICE@ESSOS.LOCAL"}),
        );
        assert_eq!(user.display_name(), "alice");

        let ou = entity(
            &["OU"],
            json!({"distinguishedname": "OU=Winterfell,DC=north", "name": "WINTERFELL"}),
        );
        assert_eq!(ou.display_name(), "OU=Winterfell,DC=north");

        let gpo = entity(&["GPO"], json!({"name": "DEFAULT DOMAIN POLICY"}));
        assert_eq!(gpo.display_name(), "DEFAULT DOMAIN POLICY");
    }

    #[test]
    fn display_name_falls_back_to_name_then_empty() {
        // Account-name field missing: fall back to the generic name field.
        let user = entity(&["User"], json!({"name": "ALICE@ESSOS.LOCAL"}));
        assert_eq!(user.display_name(), "ALICE@ESSOS.LOCAL");

        // Malformed entity with no name fields at all: empty, not a panic.
        let bare = entity(&["Computer"], json!({"enabled": true}));
        assert_eq!(bare.display_name(), "");
    }

    #[test]
    fn domain_defaults_to_na() {
        assert_eq!(entity(&["User"], json!({})).domain(), "N/A");
        assert_eq!(
            entity(&["User"], json!({"domain": "ESSOS.LOCAL"})).domain(),
            "ESSOS.LOCAL"
        );
    }

    #[test]
    fn absent_enabled_reads_as_enabled() {
        assert!(entity(&["User"], json!({})).enabled());
        assert!(entity(&["User"], json!({"enabled": true})).enabled());
        assert!(!entity(&["User"], json!({"enabled": false})).enabled());
        // Non-boolean garbage reads as absent.
        assert!(entity(&["User"], json!({"enabled": "yes"})).enabled());
    }

    #[test]
    fn high_value_marker_from_either_store() {
        assert!(entity(&["User"], json!({"highvalue": true})).is_high_value());
        assert!(entity(&["User"], json!({"system_tags": "admin_tier_0"})).is_high_value());
        assert!(
            entity(&["User"], json!({"system_tags": "owned admin_tier_0"})).is_high_value()
        );
        assert!(!entity(&["User"], json!({"system_tags": "owned"})).is_high_value());
        assert!(!entity(&["User"], json!({"highvalue": false})).is_high_value());
        assert!(!entity(&["User"], json!({})).is_high_value());
    }

    #[test]
    fn dedup_key_folds_domains_only() {
        let ace = AceResult {
            source: "Alice".into(),
            source_kind: Kind::User,
            target: "server$".into(),
            target_kind: Kind::Computer,
            relation: "GenericAll".into(),
            source_domain: "ESSOS.LOCAL".into(),
            target_domain: "Essos.Local".into(),
            target_enabled: true,
        };
        let key = ace.dedup_key();
        assert_eq!(key.0, "Alice"); // name case preserved
        assert_eq!(key.3, "essos.local");
        assert_eq!(key.4, "essos.local");
    }
}
