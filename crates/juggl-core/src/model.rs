use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document coordinate (0-based line, UTF-16 column, byte offset)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Loc,
    pub end: Loc,
}

/// A file inside the vault, addressed by its vault-relative path.
///
/// Paths always use `/` as separator regardless of platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    path: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            path: path.replace('\\', "/").trim_start_matches('/').to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, extension included
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Name without its last extension
    pub fn basename(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }

    pub fn extension(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[pos + 1..],
            _ => "",
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.extension().eq_ignore_ascii_case(MARKDOWN_EXTENSION)
    }
}

pub const MARKDOWN_EXTENSION: &str = "md";

/// A link found inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Link target as written, anchor included (`Note#Heading`)
    pub link: String,
    /// Raw source text, e.g. `[[Note|Shown]]`
    pub original: String,
    pub display_text: Option<String>,
    pub position: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    pub tag: String,
    pub position: TextRange,
}

/// Metadata extracted from one markdown document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileCache {
    pub frontmatter: Option<Map<String, Value>>,
    pub tags: Vec<TagRef>,
    pub links: Vec<Reference>,
    pub embeds: Vec<Reference>,
}

impl FileCache {
    /// Links and embeds in document order
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs: Vec<&Reference> = self.links.iter().chain(self.embeds.iter()).collect();
        refs.sort_by_key(|r| r.position.start.offset);
        refs
    }
}
