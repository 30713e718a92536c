//! Serialized forms of graphs and rules.
//!
//! Elements are written flat (`{"id", "label"}` for nodes, `{"id", "source", "target"}`
//! for edges). On the way in, the `{"data": {...}, "classes": ...}` wrapping used by
//! graph widgets is accepted as well, and unknown keys are ignored.

use crate::dpo::error::ValidationError;
use crate::dpo::graph::{Edge, NodeId};
use core::fmt::Formatter;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// One record of a graph element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Element {
    Node {
        id: NodeId,
        label: String,
    },
    Edge {
        id: String,
        source: NodeId,
        target: NodeId,
    },
}

impl Element {
    pub fn node(id: &str) -> Self {
        Element::Node {
            id: id.to_string(),
            label: id.to_string(),
        }
    }

    pub fn edge(source: &str, target: &str) -> Self {
        Element::Edge {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Element::Node { id, .. } | Element::Edge { id, .. } => id,
        }
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ElementVisitor)
    }
}

struct ElementVisitor;

impl<'de> Visitor<'de> for ElementVisitor {
    type Value = Element;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a node {id, label} or an edge {id, source, target}")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, <A as MapAccess<'de>>::Error>
    where
        A: MapAccess<'de>,
    {
        let mut id: Option<String> = None;
        let mut label: Option<String> = None;
        let mut source: Option<String> = None;
        let mut target: Option<String> = None;
        let mut wrapped: Option<Element> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" => wrapped = Some(map.next_value()?),
                "id" => id = Some(map.next_value()?),
                "label" => label = Some(map.next_value()?),
                "source" => source = Some(map.next_value()?),
                "target" => target = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        if let Some(element) = wrapped {
            return Ok(element);
        }

        match (source, target) {
            (Some(source), Some(target)) => {
                let id = id.unwrap_or_else(|| format!("{}-{}", source, target));
                Ok(Element::Edge { id, source, target })
            }
            (None, None) => {
                let id = id.ok_or_else(|| A::Error::missing_field("id"))?;
                let label = label.unwrap_or_else(|| id.clone());
                Ok(Element::Node { id, label })
            }
            (Some(_), None) => Err(A::Error::missing_field("target")),
            (None, Some(_)) => Err(A::Error::missing_field("source")),
        }
    }
}

/// The interface part of a rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDocument {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    /// Edges rendered as `"<u>-<v>"`.
    #[serde(default)]
    pub edges: Vec<String>,
}

impl InterfaceDocument {
    /// Resolve an edge id against the interface nodes. Ids may themselves contain `-`,
    /// so every split point is tried and exactly one must name two interface nodes.
    pub fn resolve_edge(&self, edge_id: &str) -> Result<Edge, ValidationError> {
        let nodes: BTreeSet<&str> = self.nodes.iter().map(String::as_str).collect();
        let mut candidates = edge_id
            .match_indices('-')
            .map(|(at, _)| (&edge_id[..at], &edge_id[at + 1..]))
            .filter(|(u, v)| nodes.contains(u) && nodes.contains(v));

        match (candidates.next(), candidates.next()) {
            (Some((u, v)), None) => Ok(Edge::new(u, v)),
            _ => Err(ValidationError::MalformedEdgeId(edge_id.to_string())),
        }
    }
}

/// The persisted and transmitted form of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub id: String,
    #[serde(default)]
    pub lhs: Vec<Element>,
    #[serde(default)]
    pub rhs: Vec<Element>,
    #[serde(default)]
    pub k: InterfaceDocument,
}

/// The persisted form of a host graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Serialization formats a document can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick a format from a file name. Anything that is not `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    pub fn parse<T: serde::de::DeserializeOwned>(self, text: &str) -> anyhow::Result<T> {
        Ok(match self {
            Format::Json => serde_json::from_str(text)?,
            Format::Yaml => serde_yaml::from_str(text)?,
        })
    }

    pub fn render<T: Serialize>(self, value: &T) -> anyhow::Result<String> {
        Ok(match self {
            Format::Json => serde_json::to_string_pretty(value)?,
            Format::Yaml => serde_yaml::to_string(value)?,
        })
    }
}
