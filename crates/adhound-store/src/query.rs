//! Parameterized Cypher statements.
//!
//! Both backends speak Cypher but differ in how values travel: the Neo4j
//! transactional endpoint accepts a real parameter map, while the CE graph
//! API takes only query text. Queries are therefore always built with
//! named placeholders, and [`CypherQuery::render_inline`] substitutes
//! escaped literals for backends without parameter support. Caller input
//! is never concatenated into query text directly.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A parameter value for a Cypher statement.
#[derive(Debug, Clone)]
pub enum Param {
    Str(String),
    StrList(Vec<String>),
    Bool(bool),
}

/// A Cypher statement with named parameters (`$name` placeholders).
#[derive(Debug, Clone)]
pub struct CypherQuery {
    pub text: String,
    pub params: BTreeMap<String, Param>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Param>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// The parameter map as a JSON object, for backends that accept one.
    pub fn params_json(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Param::Str(s) => Value::String(s.clone()),
                    Param::StrList(items) => {
                        Value::Array(items.iter().cloned().map(Value::String).collect())
                    }
                    Param::Bool(b) => Value::Bool(*b),
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Renders the statement with every placeholder replaced by an escaped
    /// Cypher literal, for backends without a parameter map.
    ///
    /// Placeholders are substituted longest-name-first so that `$name`
    /// never clobbers a `$names` occurrence.
    pub fn render_inline(&self) -> String {
        let mut names: Vec<&String> = self.params.keys().collect();
        names.sort_by_key(|name| std::cmp::Reverse(name.len()));

        let mut text = self.text.clone();
        for name in names {
            let literal = render_literal(&self.params[name]);
            text = text.replace(&format!("${name}"), &literal);
        }
        text
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Str(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Str(value)
    }
}

impl From<Vec<String>> for Param {
    fn from(value: Vec<String>) -> Self {
        Param::StrList(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

fn render_literal(param: &Param) -> String {
    match param {
        Param::Str(s) => quote(s),
        Param::StrList(items) => {
            let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("[{}]", quoted.join(", "))
        }
        Param::Bool(b) => b.to_string(),
    }
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
