//! Filesystem and in-memory collaborators.
//!
//! These back the command line tool: file content lives in a store directory,
//! the item tree is loaded from (and saved to) a JSON manifest. Hosts embedding
//! the library plug their own implementations of the [`services`](crate::services)
//! traits instead.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::item::{Item, ItemExtra, Member};
use crate::services::{
    ByteStream, DownloadTask, EtherpadService, FileStorage, H5pService, ItemRepository, ItemTree,
    UploadRequest,
};

/// An item with its children, as stored in a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(item: Item) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    pub fn with_children(item: Item, children: Vec<TreeNode>) -> Self {
        Self { item, children }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Cannot read manifest {}", path.display()))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// File content stored under a root directory, keyed by relative locators.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf> {
        let relative = Path::new(locator);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("Invalid storage locator: {locator}");
        }
        Ok(self.root.join(relative))
    }

    async fn open(&self, locator: &str) -> Result<ByteStream> {
        let path = self.resolve(locator)?;
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Cannot open stored file {}", path.display()))?;
        Ok(Box::pin(file))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload_file(&self, request: UploadRequest) -> Result<String> {
        let filename = request
            .filepath
            .file_name()
            .ok_or_else(|| anyhow!("Cannot upload {}", request.filepath.display()))?
            .to_string_lossy()
            .to_string();
        let locator = format!("{}/{}", uuid::Uuid::new_v4(), filename);
        let target = self.resolve(&locator)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&request.filepath, &target).await?;
        Ok(locator)
    }

    async fn download_file(&self, task: DownloadTask) -> Result<ByteStream> {
        self.open(&task.path).await
    }
}

/// Serves H5P bundles from the same store as regular files.
pub struct LocalH5pService {
    storage: LocalFileStorage,
}

impl LocalH5pService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: LocalFileStorage::new(root),
        }
    }
}

#[async_trait]
impl H5pService for LocalH5pService {
    async fn download_bundle(
        &self,
        item: &Item,
        _scratch_root: &Path,
        _member: &Member,
    ) -> Result<ByteStream> {
        match &item.extra {
            ItemExtra::H5p(extra) => self.storage.open(&extra.h5p_file_path).await,
            _ => bail!("Item {} is not an H5P item", item.name),
        }
    }
}

/// Stand-in when no collaborative-document service is configured.
pub struct UnavailableEtherpad;

#[async_trait]
impl EtherpadService for UnavailableEtherpad {
    async fn create_document(
        &self,
        name: &str,
        _member: &Member,
        _parent_id: Option<&str>,
        _content: &str,
    ) -> Result<()> {
        bail!("Etherpad service unavailable, cannot create {name}")
    }

    async fn render_html(&self, pad_id: &str) -> Result<String> {
        bail!("Etherpad service unavailable, cannot render pad {pad_id}")
    }
}

#[derive(Default)]
struct TreeState {
    items: HashMap<String, Item>,
    parents: HashMap<String, Option<String>>,
    // Insertion order, which is also children display order.
    order: Vec<String>,
}

/// In-memory item tree, readable for export and writable for import.
#[derive(Default)]
pub struct MemoryItemTree {
    state: Mutex<TreeState>,
}

impl MemoryItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest, assigning ids to items without one. Returns the root item.
    pub fn from_manifest(root: TreeNode) -> (Self, Item) {
        let tree = Self::new();
        let root = {
            let mut state = tree.lock();
            state.insert_node(None, root)
        };
        (tree, root)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TreeState> {
        // A panic while holding the lock leaves plain maps behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.lock().items.get(id).cloned()
    }

    /// Items created without a known parent, in creation order.
    pub fn roots(&self) -> Vec<Item> {
        let state = self.lock();
        state
            .order
            .iter()
            .filter(|id| match state.parents.get(*id) {
                Some(Some(parent)) => !state.items.contains_key(parent),
                _ => true,
            })
            .filter_map(|id| state.items.get(id).cloned())
            .collect()
    }

    /// Rebuild the manifest rooted at `id`.
    pub fn to_manifest(&self, id: &str) -> Option<TreeNode> {
        let state = self.lock();
        state.node(id)
    }
}

impl TreeState {
    fn insert(&mut self, parent: Option<String>, mut item: Item) -> Item {
        let id = item
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        self.items.insert(id.clone(), item.clone());
        self.parents.insert(id.clone(), parent);
        self.order.push(id);
        item
    }

    fn insert_node(&mut self, parent: Option<String>, node: TreeNode) -> Item {
        let item = self.insert(parent, node.item);
        for child in node.children {
            self.insert_node(item.id.clone(), child);
        }
        item
    }

    fn children_of(&self, id: &str) -> Vec<&Item> {
        self.order
            .iter()
            .filter(|child| matches!(self.parents.get(*child), Some(Some(p)) if p == id))
            .filter_map(|child| self.items.get(child))
            .collect()
    }

    fn node(&self, id: &str) -> Option<TreeNode> {
        let item = self.items.get(id)?.clone();
        let children = self
            .children_of(id)
            .into_iter()
            .filter_map(|child| child.id.as_deref().and_then(|cid| self.node(cid)))
            .collect();
        Some(TreeNode { item, children })
    }
}

#[async_trait]
impl ItemTree for MemoryItemTree {
    async fn children(&self, item: &Item) -> Result<Vec<Item>> {
        let Some(id) = item.id.as_deref() else {
            return Ok(Vec::new());
        };
        let state = self.lock();
        Ok(state.children_of(id).into_iter().cloned().collect())
    }
}

#[async_trait]
impl ItemRepository for MemoryItemTree {
    async fn create_item(&self, parent_id: Option<&str>, item: Item) -> Result<Item> {
        let mut state = self.lock();
        Ok(state.insert(parent_id.map(str::to_string), item))
    }

    async fn update_description(&self, item_id: &str, content: &str) -> Result<()> {
        let mut state = self.lock();
        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| anyhow!("Item {item_id} not found"))?;
        item.description = Some(content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn sample_manifest() -> TreeNode {
        TreeNode::with_children(
            Item::folder("root").with_id("root-id"),
            vec![
                TreeNode::leaf(Item::document("notes", "<p>hi</p>")),
                TreeNode::with_children(
                    Item::folder("sub"),
                    vec![TreeNode::leaf(Item::link("site", "https://graasp.org"))],
                ),
            ],
        )
    }

    #[tokio::test]
    async fn manifest_children_keep_order() {
        let (tree, root) = MemoryItemTree::from_manifest(sample_manifest());
        assert_eq!(root.id.as_deref(), Some("root-id"));

        let children = tree.children(&root).await.unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["notes", "sub"]);
        assert!(children.iter().all(|c| c.id.is_some()));

        let grandchildren = tree.children(&children[1]).await.unwrap();
        assert_eq!(grandchildren[0].name, "site");
    }

    #[tokio::test]
    async fn manifest_survives_json() {
        let manifest = sample_manifest();
        let json = serde_json::to_string(&manifest).unwrap();
        let back: TreeNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);

        let (tree, root) = MemoryItemTree::from_manifest(back);
        let rebuilt = tree.to_manifest(root.id.as_deref().unwrap()).unwrap();
        assert_eq!(rebuilt.children.len(), 2);
        assert_eq!(rebuilt.children[1].children[0].item.name, "site");
    }

    #[tokio::test]
    async fn created_items_become_roots() {
        let tree = MemoryItemTree::new();
        let created = tree.create_item(None, Item::folder("imported")).await.unwrap();
        tree.create_item(created.id.as_deref(), Item::document("d", ""))
            .await
            .unwrap();
        tree.update_description(created.id.as_deref().unwrap(), "about")
            .await
            .unwrap();

        let roots = tree.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].description.as_deref(), Some("about"));
    }

    #[tokio::test]
    async fn storage_round_trips_files() {
        let store = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let path = source.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();

        let storage = LocalFileStorage::new(store.path());
        let locator = storage
            .upload_file(UploadRequest {
                filepath: path,
                mimetype: "text/plain".into(),
            })
            .await
            .unwrap();
        assert!(locator.ends_with("/a.txt"));

        let mut stream = storage
            .download_file(DownloadTask {
                item_id: None,
                path: locator,
                mimetype: "text/plain".into(),
                scratch_root: source.path().to_path_buf(),
            })
            .await
            .unwrap();
        let mut content = String::new();
        stream.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn storage_rejects_escaping_locators() {
        let storage = LocalFileStorage::new("/srv/files");
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("abc/file.txt").is_ok());
    }
}
