//! Contracts shared between the graph plugin and the extensions built on it.

use crate::config::{JugglMode, JugglSettings, Layout, PluginSettings};
use crate::element::{EdgeDefinition, NodeDefinition};
use crate::error::{JugglError, Result};
use crate::graph::Juggl;
use crate::id::VizId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Registry key of the graph plugin
pub const JUGGL_PLUGIN_ID: &str = "juggl";

pub const JUGGL_VIEW_TYPE: &str = "juggl_view";
pub const JUGGL_NODES_VIEW_TYPE: &str = "juggl_nodes";
pub const JUGGL_STYLE_VIEW_TYPE: &str = "juggl_style";
pub const JUGGL_HELP_VIEW: &str = "juggl-help";
pub const MD_VIEW_TYPE: &str = "markdown";

/// Change notifications emitted by a data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DataStoreEvent {
    RenameNode { old_name: String, new_name: String },
    DeleteNode { node: String },
    ModifyNode { node: String },
    CreateNode { node: String },
}

impl DataStoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DataStoreEvent::RenameNode { .. } => "renameNode",
            DataStoreEvent::DeleteNode { .. } => "deleteNode",
            DataStoreEvent::ModifyNode { .. } => "modifyNode",
            DataStoreEvent::CreateNode { .. } => "createNode",
        }
    }
}

/// Events a graph view triggers for its listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum GraphEvent {
    Stylesheet { sheet: String },
    Expand { nodes: Vec<VizId> },
    Hide { nodes: Vec<VizId> },
    Pin { nodes: Vec<VizId> },
    Unpin { nodes: Vec<VizId> },
    SelectChange,
    ElementsChange,
    VizReady,
    Layout { layout: Layout, nodes: Vec<VizId> },
}

impl GraphEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GraphEvent::Stylesheet { .. } => "stylesheet",
            GraphEvent::Expand { .. } => "expand",
            GraphEvent::Hide { .. } => "hide",
            GraphEvent::Pin { .. } => "pin",
            GraphEvent::Unpin { .. } => "unpin",
            GraphEvent::SelectChange => "selectChange",
            GraphEvent::ElementsChange => "elementsChange",
            GraphEvent::VizReady => "vizReady",
            GraphEvent::Layout { .. } => "layout",
        }
    }
}

/// A source of graph nodes, addressed by its store id prefix.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Prefix of the ids of nodes from this store
    fn store_id(&self) -> &str;

    /// Nodes adjacent to any of `ids`
    async fn get_neighbourhood(&self, ids: &[VizId]) -> Result<Vec<NodeDefinition>>;

    /// Edges between `new_nodes` and the rest of `all_nodes`
    async fn connect_nodes(
        &self,
        all_nodes: &[VizId],
        new_nodes: &[VizId],
    ) -> Result<Vec<EdgeDefinition>>;

    async fn refresh_node(&self, id: &VizId) -> Result<()>;

    fn subscribe(&self) -> Option<broadcast::Receiver<DataStoreEvent>> {
        None
    }
}

/// The store that resolves node ids to their full description.
#[async_trait]
pub trait CoreDataStore: DataStore {
    async fn get(&self, id: &VizId) -> Result<NodeDefinition>;

    /// Every node the store holds; seeds workspace graphs
    async fn node_ids(&self) -> Result<Vec<VizId>>;
}

#[derive(Clone)]
pub struct JugglStores {
    pub core_store: Arc<dyn CoreDataStore>,
    pub data_stores: Vec<Arc<dyn DataStore>>,
}

/// Graph lifecycle hooks. Called before the graph is populated and when it
/// is dropped.
pub trait JugglEvents: Send + Sync {
    fn on_juggl_created(&self, juggl: &Juggl);

    fn on_juggl_destroyed(&self, juggl: &Juggl);
}

/// Lifecycle handlers shared between a host and the graphs it created, so
/// removing a handler also silences it for graphs already open.
pub type JugglEventHandlers = Arc<RwLock<Vec<Arc<dyn JugglEvents>>>>;

/// Surface the graph plugin exposes to extensions.
pub trait JugglPlugin: Send + Sync {
    fn settings(&self) -> &PluginSettings;

    fn register_store(&self, store: Arc<dyn DataStore>);

    fn remove_store(&self, store_id: &str);

    fn stores(&self) -> Vec<Arc<dyn DataStore>>;

    fn register_core_store(&self, store: Arc<dyn CoreDataStore>, name: &str);

    fn core_store(&self, name: &str) -> Option<Arc<dyn CoreDataStore>>;

    fn register_events(&self, handler: Arc<dyn JugglEvents>);

    fn remove_events(&self, handler: &Arc<dyn JugglEvents>);

    /// Core store named by the graph settings plus every registered store
    fn default_stores(&self) -> Option<JugglStores>;

    /// New graph over `datastores` (default stores when `None`), seeded with
    /// encoded node ids. Fails when no core store is available.
    fn create_juggl(
        &self,
        settings: Option<JugglSettings>,
        datastores: Option<JugglStores>,
        initial_nodes: Vec<String>,
    ) -> Result<Juggl>;

    /// Ids of the graphs created here and not yet dropped
    fn active_graphs(&self) -> Vec<u64>;

    /// Local graph around the note called `name`
    fn open_local_graph(&self, name: &str) -> Result<Juggl> {
        let mut settings = self.settings().graph_settings.clone();
        settings.mode = JugglMode::Local;
        self.create_juggl(Some(settings), None, vec![VizId::from_path(name).to_id()])
    }

    /// Graph of every node of the core store
    fn open_global_graph(&self) -> Result<Juggl> {
        let mut settings = self.settings().graph_settings.clone();
        settings.mode = JugglMode::Workspace;
        self.create_juggl(Some(settings), None, Vec::new())
    }
}

/// Keyed registry of loaded plugins, passed explicitly to whoever needs it.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any + Send + Sync>(&mut self, key: &str, plugin: T) {
        self.plugins.insert(key.to_string(), Arc::new(plugin));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.plugins.contains_key(key)
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.plugins.get(key)?.downcast_ref::<T>()
    }

    /// Register the graph plugin under its well-known key
    pub fn register_juggl(&mut self, plugin: Arc<dyn JugglPlugin>) {
        self.register(JUGGL_PLUGIN_ID, plugin);
    }
}

/// Locate the graph plugin, if loaded.
///
/// Only the key is checked; an unrelated plugin registered as `juggl` with the
/// right type would be returned as is.
pub fn get_plugin(registry: &PluginRegistry) -> Option<Arc<dyn JugglPlugin>> {
    registry
        .get::<Arc<dyn JugglPlugin>>(JUGGL_PLUGIN_ID)
        .cloned()
}

/// In-process implementation of [`JugglPlugin`].
pub struct PluginHost {
    settings: PluginSettings,
    core_stores: RwLock<HashMap<String, Arc<dyn CoreDataStore>>>,
    stores: RwLock<Vec<Arc<dyn DataStore>>>,
    event_handlers: JugglEventHandlers,
    active: Arc<ActiveGraphs>,
    next_graph: AtomicU64,
}

/// Tracks open graphs through the lifecycle hooks
#[derive(Default)]
struct ActiveGraphs(RwLock<Vec<u64>>);

impl JugglEvents for ActiveGraphs {
    fn on_juggl_created(&self, juggl: &Juggl) {
        write(&self.0).push(juggl.id());
    }

    fn on_juggl_destroyed(&self, juggl: &Juggl) {
        write(&self.0).retain(|id| *id != juggl.id());
    }
}

impl PluginHost {
    pub fn new(settings: PluginSettings) -> Self {
        let active = Arc::new(ActiveGraphs::default());
        let tracker: Arc<dyn JugglEvents> = active.clone();
        Self {
            settings,
            core_stores: RwLock::new(HashMap::new()),
            stores: RwLock::new(Vec::new()),
            event_handlers: Arc::new(RwLock::new(vec![tracker])),
            active,
            next_graph: AtomicU64::new(0),
        }
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl JugglPlugin for PluginHost {
    fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    fn register_store(&self, store: Arc<dyn DataStore>) {
        write(&self.stores).push(store);
    }

    fn remove_store(&self, store_id: &str) {
        write(&self.stores).retain(|s| s.store_id() != store_id);
    }

    fn stores(&self) -> Vec<Arc<dyn DataStore>> {
        read(&self.stores).clone()
    }

    fn register_core_store(&self, store: Arc<dyn CoreDataStore>, name: &str) {
        write(&self.core_stores).insert(name.to_string(), store);
    }

    fn core_store(&self, name: &str) -> Option<Arc<dyn CoreDataStore>> {
        read(&self.core_stores).get(name).cloned()
    }

    fn register_events(&self, handler: Arc<dyn JugglEvents>) {
        write(&self.event_handlers).push(handler);
    }

    fn remove_events(&self, handler: &Arc<dyn JugglEvents>) {
        write(&self.event_handlers).retain(|h| !Arc::ptr_eq(h, handler));
    }

    fn default_stores(&self) -> Option<JugglStores> {
        let core_store = self.core_store(&self.settings.graph_settings.core_store)?;
        Some(JugglStores {
            core_store,
            data_stores: self.stores(),
        })
    }

    fn create_juggl(
        &self,
        settings: Option<JugglSettings>,
        datastores: Option<JugglStores>,
        initial_nodes: Vec<String>,
    ) -> Result<Juggl> {
        let settings = settings.unwrap_or_else(|| self.settings.graph_settings.clone());
        let datastores = datastores
            .or_else(|| self.default_stores())
            .ok_or_else(|| JugglError::NotFound(format!("core store {}", settings.core_store)))?;
        let id = self.next_graph.fetch_add(1, Ordering::Relaxed);
        Ok(Juggl::new(
            id,
            settings,
            datastores,
            initial_nodes,
            self.event_handlers.clone(),
        ))
    }

    fn active_graphs(&self) -> Vec<u64> {
        read(&self.active.0).clone()
    }
}
