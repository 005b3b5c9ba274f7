//! Graph element records in the shape the graph renderer consumes
//! (`{ group, data, classes }`).

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Nodes,
    Edges,
}

/// Ordered set of style classes.
///
/// Serialized as a single space-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `class` unless it is already present
    pub fn push(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !class.is_empty() && !self.0.contains(&class) {
            self.0.push(class);
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for ClassList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<S: Into<String>> Extend<S> for ClassList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for class in iter {
            self.push(class);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = ClassList::new();
        list.extend(iter);
        list
    }
}

impl Serialize for ClassList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClassList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(joined.split_whitespace().collect())
    }
}

/// Data payload of a node.
///
/// `attributes` holds `path`, `resource_url`, `content` and the merged
/// front matter. When serialized, attributes named `id` or `name` are skipped
/// so they cannot shadow the node identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: String,
    pub name: String,
    pub attributes: Map<String, Value>,
}

impl NodeData {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn path(&self) -> Option<&str> {
        self.attributes.get("path").and_then(Value::as_str)
    }
}

impl Serialize for NodeData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("name", &self.name)?;
        for (key, value) in &self.attributes {
            if key != "id" && key != "name" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NodeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            #[serde(default)]
            name: String,
            #[serde(flatten)]
            attributes: Map<String, Value>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(NodeData {
            id: raw.id,
            name: raw.name,
            attributes: raw.attributes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub group: Group,
    pub data: NodeData,
    pub classes: ClassList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub context: String,
    pub edge_count: u32,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub group: Group,
    pub data: EdgeData,
    pub classes: ClassList,
}

/// Either kind of element, serialized untagged for mixed element arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementDefinition {
    Node(NodeDefinition),
    Edge(EdgeDefinition),
}

impl From<NodeDefinition> for ElementDefinition {
    fn from(node: NodeDefinition) -> Self {
        ElementDefinition::Node(node)
    }
}

impl From<EdgeDefinition> for ElementDefinition {
    fn from(edge: EdgeDefinition) -> Self {
        ElementDefinition::Edge(edge)
    }
}
