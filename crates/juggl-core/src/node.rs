use crate::classify::{get_classes, FileCategory, CAT_DANGLING};
use crate::config::{JugglSettings, PluginSettings};
use crate::element::{ClassList, Group, NodeData, NodeDefinition};
use crate::error::Result;
use crate::id::VizId;
use crate::model::FileRecord;
use crate::vault::{MetadataCache, VaultReader};
use log::debug;
use serde_json::{Map, Value};
use url::Url;

/// Host collaborators needed to describe a file node.
pub struct NodeContext<'a> {
    pub metadata: &'a dyn MetadataCache,
    pub vault: &'a dyn VaultReader,
    pub settings: &'a PluginSettings,
}

/// URL under which the local resource server exposes `path`.
pub fn resource_url(port: u16, path: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("http://localhost:{port}/"))?;
    url.set_path(path);
    Ok(url)
}

/// Describe a vault file as a graph node.
///
/// Fails only when the note content is requested and cannot be read.
pub async fn node_from_file(
    file: &FileRecord,
    ctx: &NodeContext<'_>,
    settings: &JugglSettings,
    id: Option<VizId>,
) -> Result<NodeDefinition> {
    let id = id.unwrap_or_else(|| VizId::from_file(file));
    let name = if file.is_markdown() {
        file.basename()
    } else {
        file.name()
    };
    let classes = get_classes(Some(file), ctx.metadata);
    let port = ctx.settings.img_server_port;

    let mut attributes = Map::new();
    attributes.insert("path".to_string(), Value::from(file.path()));

    if FileCategory::of(file) == Some(FileCategory::Image) {
        match resource_url(port, file.path()) {
            Ok(url) => {
                attributes.insert("resource_url".to_string(), Value::from(url.to_string()));
            }
            Err(e) => debug!("no resource url for {}: {}", file.path(), e),
        }
    }

    if settings.read_content && file.is_markdown() {
        let content = ctx.vault.cached_read(file).await?;
        attributes.insert("content".to_string(), Value::from(content));
    }

    let frontmatter = ctx
        .metadata
        .get_file_cache(file)
        .and_then(|cache| cache.frontmatter.as_ref());
    if let Some(frontmatter) = frontmatter {
        for (key, value) in frontmatter {
            match key.as_str() {
                "position" => {}
                "image" => match image_attribute(value, port) {
                    Some(image) => {
                        attributes.insert(key.clone(), Value::from(image));
                    }
                    None => debug!("dropping image field of {}: {}", file.path(), value),
                },
                _ => {
                    attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(NodeDefinition {
        group: Group::Nodes,
        data: NodeData {
            id: id.to_id(),
            name: name.to_string(),
            attributes,
        },
        classes,
    })
}

/// Absolute URLs are kept, vault paths are served by the resource server.
fn image_attribute(value: &Value, port: u16) -> Option<String> {
    let field = value.as_str()?;
    if Url::parse(field).is_ok() {
        return Some(field.to_string());
    }
    resource_url(port, field).ok().map(|url| url.to_string())
}

/// Placeholder node for a link target that does not exist.
pub fn node_dangling(path: &str) -> NodeDefinition {
    NodeDefinition {
        group: Group::Nodes,
        data: NodeData {
            id: VizId::core(path).to_id(),
            name: path.to_string(),
            attributes: Map::new(),
        },
        classes: ClassList::from_iter([CAT_DANGLING]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JugglError;
    use crate::vault::VaultIndex;
    use serde_json::json;
    use std::path::PathBuf;

    fn vault() -> VaultIndex {
        let mut index = VaultIndex::new(PathBuf::from("/vault"));
        index.update_content(
            "notes/Paper.md",
            "---\ntitle: A Paper\nimage: figs/cover one.png\nyear: 1999\n---\nBody text",
        );
        index.update_content(
            "Remote.md",
            "---\nimage: https://example.com/pic.jpg\n---\n",
        );
        index.update_content("figs/cover one.png", "");
        index.update_content("data.csv", "");
        index
    }

    #[tokio::test]
    async fn test_node_from_note() {
        let index = vault();
        let settings = PluginSettings::default();
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };
        let file = FileRecord::new("notes/Paper.md");
        let node = node_from_file(&file, &ctx, &settings.graph_settings, None)
            .await
            .unwrap();

        assert_eq!(node.group, Group::Nodes);
        assert_eq!(node.data.id, "core:Paper");
        assert_eq!(node.data.name, "Paper");
        assert_eq!(node.data.path(), Some("notes/Paper.md"));
        assert_eq!(node.data.attribute("title"), Some(&json!("A Paper")));
        assert_eq!(node.data.attribute("year"), Some(&json!(1999)));
        assert_eq!(
            node.data.attribute("image"),
            Some(&json!("http://localhost:3837/figs/cover%20one.png"))
        );
        assert!(node.data.attribute("position").is_none());
        assert!(node
            .data
            .attribute("content")
            .and_then(Value::as_str)
            .is_some_and(|c| c.ends_with("Body text")));
        assert_eq!(node.classes.as_slice(), ["note", "image"]);
    }

    #[tokio::test]
    async fn test_absolute_image_url_is_kept() {
        let index = vault();
        let settings = PluginSettings::default();
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };
        let node = node_from_file(&FileRecord::new("Remote.md"), &ctx, &settings.graph_settings, None)
            .await
            .unwrap();
        assert_eq!(
            node.data.attribute("image"),
            Some(&json!("https://example.com/pic.jpg"))
        );
    }

    #[tokio::test]
    async fn test_non_string_image_is_dropped() {
        let mut index = vault();
        index.update_content("Numbered.md", "---\nimage: 5\nstatus: draft\n---\n");
        index.update_content(
            "Gallery.md",
            "---\nimage: [a.png, b.png]\naliases: [pics]\n---\n",
        );
        let settings = PluginSettings::default();
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };

        let numbered = node_from_file(&FileRecord::new("Numbered.md"), &ctx, &settings.graph_settings, None)
            .await
            .unwrap();
        assert!(numbered.data.attribute("image").is_none());
        assert_eq!(numbered.data.attribute("status"), Some(&json!("draft")));
        assert_eq!(numbered.data.path(), Some("Numbered.md"));

        let gallery = node_from_file(&FileRecord::new("Gallery.md"), &ctx, &settings.graph_settings, None)
            .await
            .unwrap();
        assert!(gallery.data.attribute("image").is_none());
        assert_eq!(gallery.data.attribute("aliases"), Some(&json!(["pics"])));
    }

    #[tokio::test]
    async fn test_image_file_gets_resource_url() {
        let index = vault();
        let mut settings = PluginSettings::default();
        settings.img_server_port = 9000;
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };
        let node = node_from_file(
            &FileRecord::new("figs/cover one.png"),
            &ctx,
            &settings.graph_settings,
            Some(VizId::new("cover", "custom")),
        )
        .await
        .unwrap();
        assert_eq!(node.data.id, "custom:cover");
        assert_eq!(node.data.name, "cover one.png");
        assert_eq!(
            node.data.attribute("resource_url"),
            Some(&json!("http://localhost:9000/figs/cover%20one.png"))
        );
        assert!(node.data.attribute("content").is_none());
        assert_eq!(node.classes.as_slice(), ["image"]);
    }

    #[tokio::test]
    async fn test_content_skipped_when_disabled() {
        let index = vault();
        let settings = PluginSettings::default();
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };
        let mut graph = settings.graph_settings.clone();
        graph.read_content = false;
        let node = node_from_file(&FileRecord::new("notes/Paper.md"), &ctx, &graph, None)
            .await
            .unwrap();
        assert!(node.data.attribute("content").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_note_fails() {
        let index = vault();
        let settings = PluginSettings::default();
        let ctx = NodeContext {
            metadata: &index,
            vault: &index,
            settings: &settings,
        };
        let result = node_from_file(
            &FileRecord::new("Missing.md"),
            &ctx,
            &settings.graph_settings,
            None,
        )
        .await;
        assert!(matches!(result, Err(JugglError::NotFound(_))));
    }

    #[test]
    fn test_node_dangling() {
        let node = node_dangling("Some/Path");
        assert_eq!(VizId::from_node(&node), VizId::new("Some/Path", "core"));
        assert_eq!(node.data.name, "Some/Path");
        assert!(node.data.attributes.is_empty());
        assert_eq!(node.classes.as_slice(), ["dangling"]);
    }

    #[test]
    fn test_resource_url() {
        let url = resource_url(3837, "a b/c#d.png").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3837/a%20b/c%23d.png");
    }
}
