//! A graph view: the elements merged so far and the stores that feed them.
//!
//! Nodes enter the graph through [`Juggl::expand`] (neighbourhood of some
//! nodes) or [`Juggl::load`] (initial population). Every batch of new nodes is
//! followed by asking the stores for the edges that connect it to the rest of
//! the graph.

use crate::config::{JugglMode, JugglSettings};
use crate::element::{EdgeDefinition, ElementDefinition, NodeDefinition};
use crate::error::Result;
use crate::id::VizId;
use crate::plugin::{read, CoreDataStore, DataStore, GraphEvent, JugglEventHandlers, JugglStores};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Element ids touched by a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedToGraph {
    /// Already in the graph; their data was replaced
    pub merged: Vec<String>,
    pub added: Vec<String>,
}

impl MergedToGraph {
    fn absorb(&mut self, other: MergedToGraph) {
        self.merged.extend(other.merged);
        self.added.extend(other.added);
    }

    fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.added.is_empty()
    }
}

/// Insertion-ordered elements addressable by id
struct Keyed<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Keyed<T> {
    /// Returns `true` when `id` was not present yet
    fn upsert(&mut self, id: &str, item: T) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.items[i] = item;
                false
            }
            None => {
                self.index.insert(id.to_string(), self.items.len());
                self.items.push(item);
                true
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
}

pub struct Juggl {
    id: u64,
    settings: JugglSettings,
    datastores: JugglStores,
    initial_nodes: Vec<String>,
    nodes: Keyed<NodeDefinition>,
    edges: Keyed<EdgeDefinition>,
    expanded: HashSet<VizId>,
    lifecycle: JugglEventHandlers,
    events: broadcast::Sender<GraphEvent>,
}

impl Juggl {
    /// Create an empty graph and announce it to the `lifecycle` handlers.
    /// They are told again when the graph is dropped.
    pub fn new(
        id: u64,
        settings: JugglSettings,
        datastores: JugglStores,
        initial_nodes: Vec<String>,
        lifecycle: JugglEventHandlers,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let juggl = Self {
            id,
            settings,
            datastores,
            initial_nodes,
            nodes: Keyed::default(),
            edges: Keyed::default(),
            expanded: HashSet::new(),
            lifecycle,
            events,
        };
        let handlers = read(&juggl.lifecycle).clone();
        for handler in handlers {
            handler.on_juggl_created(&juggl);
        }
        juggl
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &JugglSettings {
        &self.settings
    }

    pub fn datastores(&self) -> &JugglStores {
        &self.datastores
    }

    pub fn initial_nodes(&self) -> &[String] {
        &self.initial_nodes
    }

    pub fn nodes(&self) -> &[NodeDefinition] {
        &self.nodes.items
    }

    pub fn edges(&self) -> &[EdgeDefinition] {
        &self.edges.items
    }

    pub fn node_ids(&self) -> Vec<VizId> {
        self.nodes.items.iter().map(VizId::from_node).collect()
    }

    pub fn is_expanded(&self, id: &VizId) -> bool {
        self.expanded.contains(id)
    }

    /// Nodes then edges, in the order they entered the graph
    pub fn elements(&self) -> Vec<ElementDefinition> {
        self.nodes
            .items
            .iter()
            .cloned()
            .map(ElementDefinition::from)
            .chain(self.edges.items.iter().cloned().map(ElementDefinition::from))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    /// Neighbours of `to_expand` according to every store, core store first
    pub async fn neighbourhood(&self, to_expand: &[VizId]) -> Result<Vec<NodeDefinition>> {
        let mut nodes = self.datastores.core_store.get_neighbourhood(to_expand).await?;
        for store in &self.datastores.data_stores {
            nodes.extend(store.get_neighbourhood(to_expand).await?);
        }
        Ok(nodes)
    }

    /// Edges between `new_nodes` and the nodes already in the graph
    pub async fn build_edges(&self, new_nodes: &[VizId]) -> Result<Vec<EdgeDefinition>> {
        let all = self.node_ids();
        let mut edges = self.datastores.core_store.connect_nodes(&all, new_nodes).await?;
        for store in &self.datastores.data_stores {
            edges.extend(store.connect_nodes(&all, new_nodes).await?);
        }
        Ok(edges)
    }

    /// Add or replace elements by id.
    pub fn merge_to_graph(&mut self, elements: Vec<ElementDefinition>) -> MergedToGraph {
        let mut result = MergedToGraph::default();
        for element in elements {
            let (id, added) = match element {
                ElementDefinition::Node(node) => {
                    let id = node.data.id.clone();
                    let added = self.nodes.upsert(&id, node);
                    (id, added)
                }
                ElementDefinition::Edge(edge) => {
                    let id = edge.data.id.clone();
                    let added = self.edges.upsert(&id, edge);
                    (id, added)
                }
            };
            if added {
                result.added.push(id);
            } else {
                result.merged.push(id);
            }
        }
        if !result.is_empty() {
            self.emit(GraphEvent::ElementsChange);
        }
        result
    }

    /// Merge the neighbourhood of `to_expand` and the edges of the nodes it
    /// added.
    pub async fn expand(&mut self, to_expand: &[VizId]) -> Result<MergedToGraph> {
        let nodes = self.neighbourhood(to_expand).await?;
        let mut result = self.merge_to_graph(nodes.into_iter().map(ElementDefinition::from).collect());

        let added: Vec<VizId> = result.added.iter().map(|id| VizId::from_id(id)).collect();
        if !added.is_empty() {
            let edges = self.build_edges(&added).await?;
            result.absorb(self.merge_edges(edges));
        }

        self.expanded.extend(to_expand.iter().cloned());
        self.emit(GraphEvent::Expand {
            nodes: to_expand.to_vec(),
        });
        Ok(result)
    }

    /// Populate the graph according to its mode.
    ///
    /// Local graphs start from the initial nodes and expand `depth` times
    /// from the nodes added by the previous step. Workspace graphs hold every
    /// node of the core store plus the unresolved link targets; `depth` is
    /// ignored.
    pub async fn load(&mut self, depth: usize) -> Result<MergedToGraph> {
        let result = match self.settings.mode {
            JugglMode::Local => self.load_local(depth).await?,
            JugglMode::Workspace => self.load_workspace().await?,
        };
        self.emit(GraphEvent::VizReady);
        Ok(result)
    }

    async fn load_local(&mut self, depth: usize) -> Result<MergedToGraph> {
        let initial: Vec<VizId> = self.initial_nodes.iter().map(|id| VizId::from_id(id)).collect();
        let mut result = self.merge_initial(&initial).await?;

        let mut frontier = initial;
        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let step = self.expand(&frontier).await?;
            frontier = step
                .added
                .iter()
                .filter(|id| self.nodes.contains(id))
                .map(|id| VizId::from_id(id))
                .collect();
            result.absorb(step);
        }
        Ok(result)
    }

    async fn load_workspace(&mut self) -> Result<MergedToGraph> {
        let ids = self.datastores.core_store.node_ids().await?;
        let mut result = self.merge_initial(&ids).await?;

        let unresolved: Vec<ElementDefinition> = self
            .neighbourhood(&ids)
            .await?
            .into_iter()
            .filter(|node| !self.nodes.contains(&node.data.id))
            .map(ElementDefinition::from)
            .collect();
        let added = self.merge_to_graph(unresolved);
        let new_ids: Vec<VizId> = added.added.iter().map(|id| VizId::from_id(id)).collect();
        result.absorb(added);
        if !new_ids.is_empty() {
            let edges = self.build_edges(&new_ids).await?;
            result.absorb(self.merge_edges(edges));
        }

        self.expanded.extend(ids);
        debug!(
            "workspace graph {}: {} nodes, {} edges",
            self.id,
            self.nodes.items.len(),
            self.edges.items.len()
        );
        Ok(result)
    }

    /// Fetch `ids` from the core store and connect them to each other
    async fn merge_initial(&mut self, ids: &[VizId]) -> Result<MergedToGraph> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            nodes.push(self.datastores.core_store.get(id).await?.into());
        }
        let mut result = self.merge_to_graph(nodes);
        let edges = self.build_edges(ids).await?;
        result.absorb(self.merge_edges(edges));
        Ok(result)
    }

    fn merge_edges(&mut self, edges: Vec<EdgeDefinition>) -> MergedToGraph {
        self.merge_to_graph(edges.into_iter().map(ElementDefinition::from).collect())
    }

    fn emit(&self, event: GraphEvent) {
        debug!("graph {} {}", self.id, event.name());
        self.events.send(event).ok();
    }
}

impl Drop for Juggl {
    fn drop(&mut self) {
        let handlers = read(&self.lifecycle).clone();
        for handler in handlers {
            handler.on_juggl_destroyed(self);
        }
    }
}
