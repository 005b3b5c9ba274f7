//! Style classes derived from a file's extension and metadata.

use crate::element::ClassList;
use crate::model::FileRecord;
use crate::vault::MetadataCache;
use serde_json::{Map, Value};

pub const CAT_DANGLING: &str = "dangling";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "tiff"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "webm", "wav", "m4a", "ogg", "3gp", "flac"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv"];
pub const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Image,
    Audio,
    Video,
    Pdf,
}

impl FileCategory {
    /// First match wins; audio is tested before video (`webm` is audio).
    pub fn of(file: &FileRecord) -> Option<Self> {
        let ext = file.extension().to_ascii_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Some(Self::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else if ext == PDF_EXTENSION {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Pdf => "pdf",
        }
    }
}

/// Classes of a file node. A missing file is `dangling`.
pub fn get_classes(file: Option<&FileRecord>, metadata: &dyn MetadataCache) -> ClassList {
    let Some(file) = file else {
        return ClassList::from_iter([CAT_DANGLING]);
    };

    let mut classes = ClassList::new();
    let category = FileCategory::of(file);
    if let Some(category) = category {
        classes.push(category.class());
    }

    if file.is_markdown() {
        classes.push("note");
        let cache = metadata.get_file_cache(file);
        if let Some(frontmatter) = cache.and_then(|c| c.frontmatter.as_ref()) {
            if frontmatter.contains_key("image") {
                classes.push("image");
            }
            if frontmatter.contains_key("tags") {
                if let Some(tags) = parse_front_matter_tags(frontmatter) {
                    classes.extend(expand_tags(&tags));
                }
            }
            if frontmatter.contains_key("cssclass") {
                if let Some(css) = parse_front_matter_string_array(frontmatter, "cssclass") {
                    classes.extend(css);
                }
            }
        }
        if let Some(cache) = cache {
            let tags: Vec<String> = cache.tags.iter().map(|t| t.tag.clone()).collect();
            classes.extend(expand_tags(&tags));
        }
    } else if category.is_none() {
        classes.push("file");
    }
    classes
}

/// `#a/b/c` -> `tag-a`, `tag-a-b`, `tag-a-b-c`
pub fn expand_tags(tags: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    for tag in tags {
        let tag = tag.strip_prefix('#').unwrap_or(tag);
        let segments: Vec<&str> = tag.split('/').collect();
        for depth in 1..=segments.len() {
            expanded.push(format!("tag-{}", segments[..depth].join("-")));
        }
    }
    expanded
}

/// Tags listed under the `tags` front-matter key, each prefixed with `#`.
///
/// Accepts a YAML list or a string separated by commas and/or whitespace.
pub fn parse_front_matter_tags(frontmatter: &Map<String, Value>) -> Option<Vec<String>> {
    let tags: Vec<String> = split_values(frontmatter.get("tags")?, |c| c == ',' || c.is_whitespace())
        .into_iter()
        .map(|t| if t.starts_with('#') { t } else { format!("#{t}") })
        .collect();
    (!tags.is_empty()).then_some(tags)
}

pub fn parse_front_matter_string_array(
    frontmatter: &Map<String, Value>,
    key: &str,
) -> Option<Vec<String>> {
    let values = split_values(frontmatter.get(key)?, |c| c == ',');
    (!values.is_empty()).then_some(values)
}

fn split_values(value: &Value, separator: fn(char) -> bool) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };
    match value {
        Value::String(s) => split(s),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultIndex;
    use serde_json::json;
    use std::path::PathBuf;

    fn index_with(path: &str, content: &str) -> VaultIndex {
        let mut index = VaultIndex::new(PathBuf::from("/vault"));
        index.update_content(path, content);
        index
    }

    fn classes_of(index: &VaultIndex, path: &str) -> Vec<String> {
        get_classes(Some(&FileRecord::new(path)), index)
            .as_slice()
            .to_vec()
    }

    #[test]
    fn test_missing_file_is_dangling() {
        let index = VaultIndex::default();
        assert_eq!(get_classes(None, &index).as_slice(), ["dangling"]);
    }

    #[test]
    fn test_extension_categories() {
        let index = VaultIndex::default();
        assert_eq!(classes_of(&index, "a.png"), ["image"]);
        assert_eq!(classes_of(&index, "a.PDF"), ["pdf"]);
        assert_eq!(classes_of(&index, "a.mp3"), ["audio"]);
        assert_eq!(classes_of(&index, "a.webm"), ["audio"]);
        assert_eq!(classes_of(&index, "a.ogv"), ["video"]);
        assert_eq!(classes_of(&index, "a.zip"), ["file"]);
    }

    #[test]
    fn test_note_with_frontmatter_and_inline_tags() {
        let index = index_with(
            "Note.md",
            "---\nimage: cover.png\ntags: [proj/sub]\ncssclass: wide, dark\n---\nBody #idea/x",
        );
        assert_eq!(
            classes_of(&index, "Note.md"),
            [
                "note",
                "image",
                "tag-proj",
                "tag-proj-sub",
                "wide",
                "dark",
                "tag-idea",
                "tag-idea-x"
            ]
        );
    }

    #[test]
    fn test_plain_note() {
        let index = index_with("Plain.md", "just text");
        assert_eq!(classes_of(&index, "Plain.md"), ["note"]);
    }

    #[test]
    fn test_expand_tags() {
        assert_eq!(
            expand_tags(&["#proj/sub/leaf".to_string()]),
            ["tag-proj", "tag-proj-sub", "tag-proj-sub-leaf"]
        );
        assert_eq!(expand_tags(&["#solo".to_string()]), ["tag-solo"]);
    }

    #[test]
    fn test_parse_front_matter_tags() {
        let fm = json!({"tags": "a, b  c"});
        let fm = fm.as_object().unwrap();
        assert_eq!(parse_front_matter_tags(fm), Some(vec!["#a".into(), "#b".into(), "#c".into()]));

        let fm = json!({"tags": ["#x", "y"]});
        assert_eq!(
            parse_front_matter_tags(fm.as_object().unwrap()),
            Some(vec!["#x".into(), "#y".into()])
        );

        let fm = json!({"tags": null});
        assert_eq!(parse_front_matter_tags(fm.as_object().unwrap()), None);
    }

    #[test]
    fn test_parse_front_matter_string_array() {
        let fm = json!({"cssclass": ["a", "b"], "other": "x, y"});
        let fm = fm.as_object().unwrap();
        assert_eq!(
            parse_front_matter_string_array(fm, "cssclass"),
            Some(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            parse_front_matter_string_array(fm, "other"),
            Some(vec!["x".into(), "y".into()])
        );
        assert_eq!(parse_front_matter_string_array(fm, "absent"), None);
    }
}
