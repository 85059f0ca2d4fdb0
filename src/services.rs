//! Collaborators the import and export pipelines depend on.
//!
//! Storage backends, the item store, the collaborative-document service and
//! the interactive-content service live outside this crate. They are passed in
//! as trait objects so hosts can plug their own.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::item::{Item, Member};
use crate::mime::{MagicMimeDetector, MimeDetector};
use crate::sanitize::{BasicSanitizer, HtmlSanitizer};

/// Readable byte stream handed back by download collaborators.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A file on local disk waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub filepath: PathBuf,
    pub mimetype: String,
}

/// What a file download should produce. The backend decides how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub item_id: Option<String>,
    pub path: String,
    pub mimetype: String,
    /// Scratch directory owned by the running export.
    pub scratch_root: PathBuf,
}

/// Storage backend for uploaded file content (local disk, object storage...).
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store the file and return its backend locator.
    async fn upload_file(&self, request: UploadRequest) -> Result<String>;

    async fn download_file(&self, task: DownloadTask) -> Result<ByteStream>;
}

/// Read access to an existing item tree.
#[async_trait]
pub trait ItemTree: Send + Sync {
    /// Children of a folder, in display order.
    async fn children(&self, item: &Item) -> Result<Vec<Item>>;
}

/// Persistence for imported items.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Persist `item` under `parent_id` and return it with its new id.
    async fn create_item(&self, parent_id: Option<&str>, item: Item) -> Result<Item>;

    /// Replace the description of an already persisted folder.
    async fn update_description(&self, item_id: &str, content: &str) -> Result<()>;
}

/// Collaborative-document service backing etherpad items.
#[async_trait]
pub trait EtherpadService: Send + Sync {
    async fn create_document(
        &self,
        name: &str,
        member: &Member,
        parent_id: Option<&str>,
        content: &str,
    ) -> Result<()>;

    /// Rendered HTML of a pad.
    async fn render_html(&self, pad_id: &str) -> Result<String>;
}

/// Interactive-content package service backing H5P items.
#[async_trait]
pub trait H5pService: Send + Sync {
    async fn download_bundle(
        &self,
        item: &Item,
        scratch_root: &Path,
        member: &Member,
    ) -> Result<ByteStream>;
}

/// Collaborators used while exporting a tree.
#[derive(Clone)]
pub struct ExportServices {
    pub tree: Arc<dyn ItemTree>,
    pub storage: Arc<dyn FileStorage>,
    pub etherpad: Arc<dyn EtherpadService>,
    pub h5p: Arc<dyn H5pService>,
}

/// Collaborators used while importing an archive.
#[derive(Clone)]
pub struct ImportServices {
    pub repository: Arc<dyn ItemRepository>,
    pub storage: Arc<dyn FileStorage>,
    pub etherpad: Arc<dyn EtherpadService>,
    pub mime: Arc<dyn MimeDetector>,
    pub sanitizer: Arc<dyn HtmlSanitizer>,
}

impl ImportServices {
    /// Services with the bundled mimetype detector and sanitizer.
    pub fn new(
        repository: Arc<dyn ItemRepository>,
        storage: Arc<dyn FileStorage>,
        etherpad: Arc<dyn EtherpadService>,
    ) -> Self {
        Self {
            repository,
            storage,
            etherpad,
            mime: Arc::new(MagicMimeDetector),
            sanitizer: Arc::new(BasicSanitizer::new()),
        }
    }
}
