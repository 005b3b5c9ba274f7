use crate::error::{JugglError, Result};
use crate::id::VizId;
use crate::model::{FileCache, FileRecord, Reference, MARKDOWN_EXTENSION};
use crate::parser::parse_file_cache;
use crate::vfs::FileSystem;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Read access to the per-file metadata the host keeps for a vault.
pub trait MetadataCache: Send + Sync {
    fn get_file_cache(&self, file: &FileRecord) -> Option<&FileCache>;

    /// Resolve a link target as written in `source_path` to a vault file.
    fn get_first_link_path_dest(&self, link: &str, source_path: &str) -> Option<FileRecord>;
}

/// Content access for vault files.
#[async_trait]
pub trait VaultReader: Send + Sync {
    async fn cached_read(&self, file: &FileRecord) -> Result<String>;
}

/// In-memory snapshot of a vault directory.
///
/// Every file is recorded; markdown files are additionally parsed into a
/// [`FileCache`] and their content kept for [`VaultReader::cached_read`].
///
/// Links are resolved when files change, not when they are queried: `forward`
/// holds the target of every reference and `backward` the sources linking to
/// each path. Adding, deleting or renaming a file re-resolves every link,
/// since it can change which file a name refers to.
#[derive(Debug, Default)]
pub struct VaultIndex {
    root: PathBuf,
    files: BTreeMap<String, FileRecord>,
    caches: HashMap<String, FileCache>,
    contents: HashMap<String, String>,
    /// file name and markdown basename -> paths
    by_name: HashMap<String, BTreeSet<String>>,
    by_id: HashMap<VizId, BTreeSet<String>>,
    /// resolved target per reference, in [`FileCache::references`] order
    forward: HashMap<String, Vec<Option<String>>>,
    backward: HashMap<String, BTreeSet<String>>,
}

impl VaultIndex {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Scan `root` and index every file found.
    pub fn load(root: PathBuf, fs: &dyn FileSystem) -> Self {
        let mut index = Self::new(root);
        let paths = fs.list_files(&index.root);
        for path in &paths {
            let Some(relative) = index.relative_path(path) else {
                continue;
            };
            let file = FileRecord::new(relative);
            if file.is_markdown() {
                match fs.read_to_string(path) {
                    Ok(content) => {
                        index.set_content(file.path(), &content);
                    }
                    Err(e) => debug!("skipping unreadable note {:?}: {}", path, e),
                }
            } else {
                index.insert_file(file);
            }
        }
        index.relink_all();
        info!(
            "indexed {} files ({} notes, {} resolved links) under {:?}",
            index.files.len(),
            index.caches.len(),
            index.backward.values().map(BTreeSet::len).sum::<usize>(),
            index.root
        );
        index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(relative.to_string_lossy().replace('\\', "/"))
    }

    pub fn absolute_path(&self, file: &FileRecord) -> PathBuf {
        self.root.join(file.path())
    }

    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// File a node id refers to. Among files sharing a name the shortest
    /// path wins, as in link resolution.
    pub fn file_by_id(&self, id: &VizId) -> Option<&FileRecord> {
        self.by_id
            .get(id)?
            .iter()
            .min_by_key(|path| path.len())
            .and_then(|path| self.files.get(path))
    }

    /// Insert or replace a file. Returns `true` when the file is new.
    pub fn update_content(&mut self, path: &str, content: &str) -> bool {
        let created = self.set_content(path, content);
        if created {
            self.relink_all();
        } else {
            let key = FileRecord::new(path).path().to_string();
            self.unlink(&key);
            self.link(&key);
        }
        created
    }

    pub fn delete_file(&mut self, path: &str) -> Option<FileRecord> {
        let file = self.remove_file(FileRecord::new(path).path())?;
        self.relink_all();
        Some(file)
    }

    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> Result<FileRecord> {
        let old_key = FileRecord::new(old_path).path().to_string();
        let content = self.contents.get(&old_key).cloned();
        self.remove_file(&old_key)
            .ok_or_else(|| JugglError::NotFound(old_path.to_string()))?;

        let file = FileRecord::new(new_path);
        self.insert_file(file.clone());
        if let (true, Some(content)) = (file.is_markdown(), content) {
            self.caches
                .insert(file.path().to_string(), parse_file_cache(&content));
            self.contents.insert(file.path().to_string(), content);
        }
        self.relink_all();
        Ok(file)
    }

    /// Files whose references resolve to `target`
    pub fn backlinks(&self, target: &FileRecord) -> Vec<&FileRecord> {
        self.backward
            .get(target.path())
            .into_iter()
            .flatten()
            .filter_map(|source| self.files.get(source))
            .collect()
    }

    /// References of `file` in document order, each with the file it
    /// resolves to
    pub fn resolved_references(&self, file: &FileRecord) -> Vec<(&Reference, Option<&FileRecord>)> {
        let (Some(cache), Some(targets)) = (
            self.caches.get(file.path()),
            self.forward.get(file.path()),
        ) else {
            return Vec::new();
        };
        cache
            .references()
            .into_iter()
            .zip(targets)
            .map(|(reference, target)| {
                let target = target.as_deref().and_then(|path| self.files.get(path));
                (reference, target)
            })
            .collect()
    }

    fn set_content(&mut self, path: &str, content: &str) -> bool {
        let file = FileRecord::new(path);
        let key = file.path().to_string();
        let markdown = file.is_markdown();
        let created = self.insert_file(file);
        if markdown {
            self.caches.insert(key.clone(), parse_file_cache(content));
            self.contents.insert(key, content.to_string());
        }
        created
    }

    fn insert_file(&mut self, file: FileRecord) -> bool {
        let path = file.path().to_string();
        if self.files.contains_key(&path) {
            return false;
        }
        for key in name_keys(&file) {
            self.by_name.entry(key).or_default().insert(path.clone());
        }
        self.by_id
            .entry(VizId::from_file(&file))
            .or_default()
            .insert(path.clone());
        self.files.insert(path, file);
        true
    }

    fn remove_file(&mut self, path: &str) -> Option<FileRecord> {
        let file = self.files.remove(path)?;
        for key in name_keys(&file) {
            remove_path(&mut self.by_name, &key, path);
        }
        remove_path(&mut self.by_id, &VizId::from_file(&file), path);
        self.caches.remove(path);
        self.contents.remove(path);
        self.unlink(path);
        Some(file)
    }

    fn link(&mut self, path: &str) {
        let Some(cache) = self.caches.get(path) else {
            return;
        };
        let targets: Vec<Option<String>> = cache
            .references()
            .iter()
            .map(|r| self.resolve(&r.link, path).map(|f| f.path().to_string()))
            .collect();
        for target in targets.iter().flatten() {
            self.backward
                .entry(target.clone())
                .or_default()
                .insert(path.to_string());
        }
        self.forward.insert(path.to_string(), targets);
    }

    fn unlink(&mut self, path: &str) {
        let Some(targets) = self.forward.remove(path) else {
            return;
        };
        for target in targets.iter().flatten() {
            remove_path(&mut self.backward, target, path);
        }
    }

    fn relink_all(&mut self) {
        self.forward.clear();
        self.backward.clear();
        let sources: Vec<String> = self.caches.keys().cloned().collect();
        for source in &sources {
            self.link(source);
        }
    }

    fn resolve(&self, link: &str, source_path: &str) -> Option<&FileRecord> {
        let link_path = link.split('#').next().unwrap_or(link).trim();
        if link_path.is_empty() {
            return self.files.get(source_path);
        }
        let link_path = link_path.trim_start_matches('/');
        let with_ext = format!("{link_path}.{MARKDOWN_EXTENSION}");
        if let Some(file) = self.files.get(link_path).or_else(|| self.files.get(&with_ext)) {
            return Some(file);
        }

        let name = link_path.rsplit('/').next().unwrap_or(link_path);
        let suffix = format!("/{link_path}");
        let suffix_ext = format!("/{with_ext}");
        self.by_name
            .get(name)?
            .iter()
            .filter_map(|path| self.files.get(path))
            .filter(|f| {
                f.path().ends_with(&suffix)
                    || f.path().ends_with(&suffix_ext)
                    || (!link_path.contains('/') && f.is_markdown() && f.basename() == link_path)
            })
            .min_by_key(|f| f.path().len())
    }
}

/// Keys a link's last segment may use to name `file`
fn name_keys(file: &FileRecord) -> Vec<String> {
    let mut keys = vec![file.name().to_string()];
    if file.is_markdown() {
        keys.push(file.basename().to_string());
    }
    keys
}

fn remove_path<K: Hash + Eq>(map: &mut HashMap<K, BTreeSet<String>>, key: &K, path: &str) {
    if let Some(paths) = map.get_mut(key) {
        paths.remove(path);
        if paths.is_empty() {
            map.remove(key);
        }
    }
}

impl MetadataCache for VaultIndex {
    fn get_file_cache(&self, file: &FileRecord) -> Option<&FileCache> {
        self.caches.get(file.path())
    }

    fn get_first_link_path_dest(&self, link: &str, source_path: &str) -> Option<FileRecord> {
        self.resolve(link, source_path).cloned()
    }
}

#[async_trait]
impl VaultReader for VaultIndex {
    async fn cached_read(&self, file: &FileRecord) -> Result<String> {
        self.contents
            .get(file.path())
            .cloned()
            .ok_or_else(|| JugglError::NotFound(file.path().to_string()))
    }
}
