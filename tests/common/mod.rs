#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use itemzip::item::{FileExtra, ItemExtra};
use itemzip::local::{LocalFileStorage, LocalH5pService, MemoryItemTree, TreeNode};
use itemzip::{
    EtherpadService, ExportContext, ExportServices, FileItemType, Item, Member, MemoryReader,
    ZipConfig, ZipExtractor, ZipFileEntry,
};

pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

/// Pad service rendering every pad as a fixed paragraph.
pub struct StaticEtherpad;

#[async_trait]
impl EtherpadService for StaticEtherpad {
    async fn create_document(
        &self,
        _name: &str,
        _member: &Member,
        _parent_id: Option<&str>,
        _content: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn render_html(&self, pad_id: &str) -> anyhow::Result<String> {
        Ok(format!("<p>pad {pad_id}</p>"))
    }
}

pub fn member() -> Member {
    Member {
        id: "member-id".into(),
        name: "tester".into(),
    }
}

/// Load `manifest` into an in-memory tree and wire an export context to `store`.
pub fn export_ctx(manifest: TreeNode, store: &Path) -> (ExportContext, Item) {
    let (tree, root) = MemoryItemTree::from_manifest(manifest);
    let ctx = ExportContext {
        services: ExportServices {
            tree: Arc::new(tree),
            storage: Arc::new(LocalFileStorage::new(store)),
            etherpad: Arc::new(StaticEtherpad),
            h5p: Arc::new(LocalH5pService::new(store)),
        },
        config: ZipConfig::default(),
        member: member(),
    };
    (ctx, root)
}

/// Put `content` into the store under `locator`.
pub fn store_file(store: &Path, locator: &str, content: &[u8]) {
    let path = store.join(locator);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn local_file(name: &str, locator: Option<&str>, mimetype: Option<&str>) -> Item {
    Item::new(
        name,
        ItemExtra::file(
            FileItemType::Local,
            FileExtra {
                name: name.to_string(),
                path: locator.map(str::to_string),
                size: 0,
                mimetype: mimetype.map(str::to_string),
            },
        ),
    )
}

pub async fn entries(bytes: &[u8]) -> Vec<ZipFileEntry> {
    ZipExtractor::new(Arc::new(MemoryReader::new(bytes.to_vec())))
        .list_files()
        .await
        .unwrap()
}

pub async fn entry_names(bytes: &[u8]) -> Vec<String> {
    entries(bytes)
        .await
        .into_iter()
        .map(|e| e.file_name)
        .collect()
}

pub async fn read_entry(bytes: &[u8], name: &str) -> String {
    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes.to_vec())));
    let entries = extractor.list_files().await.unwrap();
    let entry = entries
        .iter()
        .find(|e| e.file_name == name)
        .unwrap_or_else(|| panic!("no entry {name}"));
    String::from_utf8(extractor.extract_to_memory(entry).await.unwrap()).unwrap()
}
