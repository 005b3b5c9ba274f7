use serde::{Deserialize, Serialize};

/// Plugin-level settings shared with extensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettings {
    /// Port of the local server that serves vault resources (images)
    #[serde(default = "default_img_server_port")]
    pub img_server_port: u16,
    /// Prefix that introduces a typed link line, e.g. `- cites [[Paper]]`
    #[serde(default = "default_typed_link_prefix")]
    pub typed_link_prefix: String,
    #[serde(default)]
    pub graph_settings: JugglSettings,
}

/// Settings of one graph view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JugglSettings {
    pub animate_layout: bool,
    pub auto_add_nodes: bool,
    pub auto_expand: bool,
    pub auto_zoom: bool,
    pub core_store: String,
    pub expand_initial: bool,
    pub fdgd_layout: FdgdLayout,
    pub filter: String,
    pub height: Dimension,
    pub hover_edges: bool,
    pub layout: Layout,
    pub limit: usize,
    pub merge_edges: bool,
    pub mode: JugglMode,
    pub navigator: bool,
    pub open_with_shift: bool,
    pub read_content: bool,
    pub style_groups: Vec<StyleGroup>,
    pub toolbar: bool,
    pub width: Dimension,
    pub zoom_speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FdgdLayout {
    #[serde(rename = "cola")]
    Cola,
    #[serde(rename = "d3-force")]
    D3Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JugglLayout {
    ForceDirected,
    Circle,
    Grid,
    Hierarchy,
    Cola,
    #[serde(rename = "d3-force")]
    D3Force,
}

/// Named layout or raw renderer layout options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layout {
    Named(JugglLayout),
    Options(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JugglMode {
    Local,
    Workspace,
}

/// CSS length (`"100%"`) or pixel count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(f64),
    Css(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    Ellipse,
    Rectangle,
    Triangle,
    Diamond,
    Pentagon,
    Hexagon,
    Tag,
    Rhomboid,
    Star,
    Vee,
    RoundRectangle,
    RoundTriangle,
    RoundDiamond,
    RoundPentagon,
    RoundHexagon,
    RoundTag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub path: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleGroup {
    pub filter: String,
    pub color: String,
    pub shape: Shape,
    pub icon: Icon,
    pub show_in_pane: bool,
    pub show: bool,
    pub size: f64,
}

fn default_img_server_port() -> u16 {
    3837
}

fn default_typed_link_prefix() -> String {
    "-".to_string()
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            img_server_port: default_img_server_port(),
            typed_link_prefix: default_typed_link_prefix(),
            graph_settings: JugglSettings::default(),
        }
    }
}

impl Default for JugglSettings {
    fn default() -> Self {
        Self {
            animate_layout: true,
            auto_add_nodes: true,
            auto_expand: false,
            auto_zoom: false,
            core_store: "Obsidian".to_string(),
            expand_initial: true,
            fdgd_layout: FdgdLayout::Cola,
            filter: String::new(),
            height: Dimension::Css("100%".to_string()),
            hover_edges: false,
            layout: Layout::Named(JugglLayout::ForceDirected),
            limit: 10000,
            merge_edges: true,
            mode: JugglMode::Local,
            navigator: true,
            open_with_shift: false,
            read_content: true,
            style_groups: Vec::new(),
            toolbar: true,
            width: Dimension::Css("100%".to_string()),
            zoom_speed: 1.0,
        }
    }
}

impl PluginSettings {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings = PluginSettings::from_yaml(
            "imgServerPort: 4000\ngraphSettings:\n  readContent: false\n  layout: grid\n  height: 600\n",
        )
        .unwrap();
        assert_eq!(settings.img_server_port, 4000);
        assert_eq!(settings.typed_link_prefix, "-");
        assert!(!settings.graph_settings.read_content);
        assert_eq!(settings.graph_settings.layout, Layout::Named(JugglLayout::Grid));
        assert_eq!(settings.graph_settings.height, Dimension::Pixels(600.0));
        assert_eq!(settings.graph_settings.width, Dimension::Css("100%".into()));
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut settings = PluginSettings::default();
        settings.graph_settings.style_groups.push(StyleGroup {
            filter: "tag:#idea".into(),
            color: "#ff0000".into(),
            shape: Shape::RoundRectangle,
            icon: Icon::default(),
            show_in_pane: true,
            show: true,
            size: 1.0,
        });
        let yaml = settings.to_yaml().unwrap();
        assert!(yaml.contains("round-rectangle"));
        assert!(yaml.contains("fdgdLayout: cola"));
        assert_eq!(PluginSettings::from_yaml(&yaml).unwrap(), settings);
    }

    #[test]
    fn test_raw_layout_options() {
        let settings: JugglSettings =
            serde_yaml::from_str("layout:\n  name: dagre\n  rankDir: LR\n").unwrap();
        match settings.layout {
            Layout::Options(options) => assert_eq!(options["name"], "dagre"),
            other => panic!("unexpected layout {:?}", other),
        }
    }
}
