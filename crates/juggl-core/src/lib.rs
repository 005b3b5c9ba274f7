//! Juggl Core Library
//!
//! Graph model of a markdown vault: node ids, classes, node and edge
//! descriptions, typed links and the plugin contracts data stores implement.
//!

pub mod classify;
pub mod config;
pub mod edge;
pub mod element;
pub mod error;
pub mod graph;
pub mod id;
pub mod line_map;
pub mod model;
pub mod node;
pub mod parser;
pub mod plugin;
pub mod store;
pub mod typed_link;
pub mod vault;
pub mod vfs;

pub use classify::get_classes;
pub use config::{JugglSettings, PluginSettings};
pub use edge::{build_edge, parse_ref_cache};
pub use element::{ElementDefinition, EdgeDefinition, NodeDefinition};
pub use error::{JugglError, Result};
pub use graph::{Juggl, MergedToGraph};
pub use id::VizId;
pub use node::{node_dangling, node_from_file};
pub use plugin::{get_plugin, JugglPlugin, PluginHost, PluginRegistry};
pub use store::VaultStore;
pub use typed_link::{parse_typed_link, TypedLinkGrammar};
pub use vault::VaultIndex;
