use crate::config::PluginSettings;
use crate::edge::build_edge;
use crate::element::{EdgeDefinition, NodeDefinition};
use crate::error::{JugglError, Result};
use crate::id::{VizId, CORE_STORE_ID};
use crate::model::{FileRecord, Reference};
use crate::node::{node_dangling, node_from_file, NodeContext};
use crate::plugin::{CoreDataStore, DataStore, DataStoreEvent};
use crate::typed_link::TypedLinkGrammar;
use crate::vault::{VaultIndex, VaultReader};
use crate::vfs::FileSystem;
use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};


const EVENT_CAPACITY: usize = 64;

/// Core data store backed by a vault snapshot.
///
/// Reads (neighbourhood, edges) run concurrently; file updates take the
/// index exclusively and are announced to subscribers.
pub struct VaultStore {
    index: RwLock<VaultIndex>,
    fs: Arc<dyn FileSystem>,
    settings: PluginSettings,
    grammar: TypedLinkGrammar,
    events: broadcast::Sender<DataStoreEvent>,
}

impl VaultStore {
    pub fn new(index: VaultIndex, fs: Arc<dyn FileSystem>, settings: PluginSettings) -> Result<Self> {
        let grammar = TypedLinkGrammar::new(&settings.typed_link_prefix)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            index: RwLock::new(index),
            fs,
            settings,
            grammar,
            events,
        })
    }

    pub fn load(root: PathBuf, fs: Arc<dyn FileSystem>, settings: PluginSettings) -> Result<Self> {
        let index = VaultIndex::load(root, &*fs);
        Self::new(index, fs, settings)
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Id of the file at `path`, if indexed
    pub async fn id_of_path(&self, path: &str) -> Option<VizId> {
        let index = self.index.read().await;
        index
            .file(path)
            .or_else(|| index.file_by_id(&VizId::from_path(path)))
            .map(VizId::from_file)
    }

    pub async fn update_file(&self, path: &str, content: &str) {
        let created = self.index.write().await.update_content(path, content);
        let node = VizId::from_file(&FileRecord::new(path)).to_id();
        self.emit(if created {
            DataStoreEvent::CreateNode { node }
        } else {
            DataStoreEvent::ModifyNode { node }
        });
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let file = self
            .index
            .write()
            .await
            .delete_file(path)
            .ok_or_else(|| JugglError::NotFound(path.to_string()))?;
        self.emit(DataStoreEvent::DeleteNode {
            node: VizId::from_file(&file).to_id(),
        });
        Ok(())
    }

    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        let file = self.index.write().await.rename_file(old_path, new_path)?;
        self.emit(DataStoreEvent::RenameNode {
            old_name: VizId::from_file(&FileRecord::new(old_path)).to_id(),
            new_name: VizId::from_file(&file).to_id(),
        });
        Ok(())
    }

    fn emit(&self, event: DataStoreEvent) {
        debug!("{} {:?}", event.name(), event);
        // no subscribers is fine
        self.events.send(event).ok();
    }

    async fn node_for(&self, index: &VaultIndex, id: &VizId) -> Result<NodeDefinition> {
        if id.store_id != CORE_STORE_ID {
            return Err(JugglError::NotFound(id.to_id()));
        }
        match file_for(index, id) {
            Some(file) => {
                let ctx = NodeContext {
                    metadata: index,
                    vault: index,
                    settings: &self.settings,
                };
                node_from_file(&file, &ctx, &self.settings.graph_settings, None).await
            }
            None => Ok(node_dangling(&id.id)),
        }
    }
}

fn file_for(index: &VaultIndex, id: &VizId) -> Option<FileRecord> {
    index.file_by_id(id).cloned()
}

/// Resolved file id, or the id the link target will have once it exists
fn target_of(reference: &Reference, target: Option<&FileRecord>) -> VizId {
    match target {
        Some(file) => VizId::from_file(file),
        None => {
            let path = reference.link.split('#').next().unwrap_or(&reference.link);
            VizId::from_path(path.trim())
        }
    }
}

#[async_trait]
impl DataStore for VaultStore {
    fn store_id(&self) -> &str {
        CORE_STORE_ID
    }

    async fn get_neighbourhood(&self, ids: &[VizId]) -> Result<Vec<NodeDefinition>> {
        let index = self.index.read().await;
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        for id in ids {
            let Some(file) = file_for(&index, id) else {
                continue;
            };
            let mut neighbours: Vec<VizId> = index
                .resolved_references(&file)
                .into_iter()
                .map(|(reference, target)| target_of(reference, target))
                .collect();
            neighbours.extend(index.backlinks(&file).into_iter().map(VizId::from_file));

            for neighbour in neighbours {
                if seen.insert(neighbour.clone()) {
                    nodes.push(self.node_for(&index, &neighbour).await?);
                }
            }
        }
        Ok(nodes)
    }

    async fn connect_nodes(
        &self,
        all_nodes: &[VizId],
        new_nodes: &[VizId],
    ) -> Result<Vec<EdgeDefinition>> {
        let index = self.index.read().await;
        let all: HashSet<&VizId> = all_nodes.iter().collect();
        let new: HashSet<&VizId> = new_nodes.iter().collect();
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut edges = Vec::new();

        for source_id in all_nodes {
            let Some(file) = file_for(&index, source_id) else {
                continue;
            };
            let references = index.resolved_references(&file);
            if references.is_empty() {
                continue;
            }
            let content = index.cached_read(&file).await?;
            let lines: Vec<&str> = content.lines().collect();
            let source = source_id.to_id();

            for (reference, target) in references {
                let target_id = target_of(reference, target);
                if !all.contains(&target_id) {
                    continue;
                }
                if !new.contains(source_id) && !new.contains(&target_id) {
                    continue;
                }
                let target = target_id.to_id();
                let pair = format!("{source}->{target}");
                let count = counts.entry(pair.clone()).or_insert(0);
                let edge_id = format!("{pair}{count}");
                *count += 1;
                edges.push(build_edge(
                    reference,
                    &lines,
                    &edge_id,
                    &source,
                    &target,
                    &self.grammar,
                ));
            }
        }
        Ok(edges)
    }

    async fn refresh_node(&self, id: &VizId) -> Result<()> {
        let (file, path) = {
            let index = self.index.read().await;
            let file = file_for(&index, id).ok_or_else(|| JugglError::NotFound(id.to_id()))?;
            let path = index.absolute_path(&file);
            (file, path)
        };
        let content = self.fs.read_to_string(&path)?;
        self.index.write().await.update_content(file.path(), &content);
        self.emit(DataStoreEvent::ModifyNode { node: id.to_id() });
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<DataStoreEvent>> {
        Some(self.events.subscribe())
    }
}

#[async_trait]
impl CoreDataStore for VaultStore {
    async fn node_ids(&self) -> Result<Vec<VizId>> {
        let index = self.index.read().await;
        let mut seen = HashSet::new();
        Ok(index
            .files()
            .map(VizId::from_file)
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    async fn get(&self, id: &VizId) -> Result<NodeDefinition> {
        let index = self.index.read().await;
        self.node_for(&index, id).await
    }
}
