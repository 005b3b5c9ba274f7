use crate::element::NodeDefinition;
use crate::model::{FileRecord, MARKDOWN_EXTENSION};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store prefix of nodes backed by vault files
pub const CORE_STORE_ID: &str = "core";

/// Graph node identifier: a local id scoped by the store that owns it.
///
/// Encoded as `"<store_id>:<id>"`. Decoding splits on the first `:` only, so
/// local ids may contain `:` while store ids may not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VizId {
    pub id: String,
    pub store_id: String,
}

impl VizId {
    pub fn new(id: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store_id: store_id.into(),
        }
    }

    pub fn core(id: impl Into<String>) -> Self {
        Self::new(id, CORE_STORE_ID)
    }

    pub fn to_id(&self) -> String {
        self.to_string()
    }

    pub fn to_id_string(id: &str, store_id: &str) -> String {
        format!("{store_id}:{id}")
    }

    pub fn from_id(encoded: &str) -> Self {
        match encoded.split_once(':') {
            Some((store_id, id)) => Self::new(id, store_id),
            None => Self::new("", encoded),
        }
    }

    /// Markdown files are named by basename, every other file by its full name.
    pub fn from_file(file: &FileRecord) -> Self {
        if file.is_markdown() {
            Self::core(file.basename())
        } else {
            Self::core(file.name())
        }
    }

    pub fn from_path(path: &str) -> Self {
        let segment = path.rsplit('/').next().unwrap_or(path);
        let suffix = format!(".{MARKDOWN_EXTENSION}");
        Self::core(segment.strip_suffix(suffix.as_str()).unwrap_or(segment))
    }

    pub fn from_node(node: &NodeDefinition) -> Self {
        Self::from_id(&node.data.id)
    }

    pub fn from_nodes(nodes: &[NodeDefinition]) -> Vec<Self> {
        nodes.iter().map(Self::from_node).collect()
    }
}

impl fmt::Display for VizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store_id, self.id)
    }
}

impl From<&str> for VizId {
    fn from(encoded: &str) -> Self {
        Self::from_id(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for (id, store) in [("Note", "core"), ("a:b:c", "core"), ("", "ext"), ("x y", "neo4j")] {
            let encoded = VizId::to_id_string(id, store);
            assert_eq!(VizId::from_id(&encoded), VizId::new(id, store));
        }
    }

    #[test]
    fn test_decode_splits_on_first_colon() {
        let id = VizId::from_id("core:http://example.com");
        assert_eq!(id.store_id, "core");
        assert_eq!(id.id, "http://example.com");
    }

    #[test]
    fn test_decode_without_colon() {
        let id = VizId::from_id("orphan");
        assert_eq!(id.store_id, "orphan");
        assert_eq!(id.id, "");
    }

    #[test]
    fn test_namespace_with_colon_is_misattributed() {
        let id = VizId::new("id", "a:b");
        assert_eq!(VizId::from_id(&id.to_id()), VizId::new("b:id", "a"));
    }

    #[test]
    fn test_from_file() {
        assert_eq!(VizId::from_file(&FileRecord::new("dir/Note.md")).to_id(), "core:Note");
        assert_eq!(VizId::from_file(&FileRecord::new("img/cat.png")).to_id(), "core:cat.png");
    }

    #[test]
    fn test_from_path() {
        assert_eq!(VizId::from_path("folder/Note.md"), VizId::core("Note"));
        assert_eq!(VizId::from_path("Note"), VizId::core("Note"));
        assert_eq!(VizId::from_path("pics/cat.png"), VizId::core("cat.png"));
    }
}
