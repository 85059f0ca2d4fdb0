use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt, stream};
use std::path::Path;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::ExportContext;
use crate::error::{ItemZipError, Result};
use crate::item::{Item, ItemExtra};
use crate::naming::{self, LinkKind};
use crate::services::{ByteStream, DownloadTask};
use crate::zip::ArchiveWriter;

/// Depth-first writer of one item tree into a shared archive.
///
/// Children of a folder are exported concurrently, at most
/// `max_concurrency` at a time per folder, and the number of downloads in
/// flight across the whole tree is capped by the same limit. The first
/// failure anywhere cancels the remaining siblings and aborts the walk.
pub struct ExportWalker<'a> {
    ctx: &'a ExportContext,
    archive: &'a ArchiveWriter,
    scratch_root: &'a Path,
    downloads: Semaphore,
}

impl<'a> ExportWalker<'a> {
    pub fn new(ctx: &'a ExportContext, archive: &'a ArchiveWriter, scratch_root: &'a Path) -> Self {
        Self {
            ctx,
            archive,
            scratch_root,
            downloads: Semaphore::new(ctx.config.concurrency()),
        }
    }

    /// Write `item` (and, for folders, its whole subtree) under `folder_path`.
    ///
    /// Errors are tagged with the innermost item that failed.
    pub fn add_item_to_zip<'b>(
        &'b self,
        item: &'b Item,
        folder_path: &'b str,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            self.write_item(item, folder_path)
                .await
                .map_err(|e| ItemZipError::unexpected_export(&item.name, e))
        }
        .boxed()
    }

    async fn write_item(&self, item: &Item, folder_path: &str) -> Result<()> {
        let entry_name = match &item.extra {
            ItemExtra::LocalFile(_) | ItemExtra::S3File(_) => {
                match self.write_file(item, folder_path).await? {
                    Some(entry_name) => entry_name,
                    None => return Ok(()),
                }
            }
            ItemExtra::H5p(_) => {
                let _permit = self.download_permit().await?;
                let bundle = self
                    .ctx
                    .services
                    .h5p
                    .download_bundle(item, self.scratch_root, &self.ctx.member)
                    .await?;
                match self.append_stream(folder_path, &item.name, bundle).await? {
                    Some(entry_name) => entry_name,
                    None => return Ok(()),
                }
            }
            ItemExtra::Etherpad(extra) => {
                let html = self.ctx.services.etherpad.render_html(&extra.pad_id).await?;
                let entry_name = naming::etherpad_filename(&item.name);
                self.append_bytes(folder_path, &entry_name, html).await?;
                // pads are re-created from their HTML on import, descriptions would be lost
                return Ok(());
            }
            ItemExtra::Document(extra) => {
                let entry_name = naming::document_filename(&item.name);
                self.append_bytes(folder_path, &entry_name, &extra.content)
                    .await?;
                entry_name
            }
            ItemExtra::Link(extra) => {
                let entry_name = naming::link_filename(&item.name);
                let content = naming::build_text_content(&extra.url, LinkKind::Link);
                self.append_bytes(folder_path, &entry_name, content).await?;
                entry_name
            }
            ItemExtra::App(extra) => {
                let entry_name = naming::link_filename(&item.name);
                let content = naming::build_text_content(&extra.url, LinkKind::App);
                self.append_bytes(folder_path, &entry_name, content).await?;
                entry_name
            }
            ItemExtra::Folder => return self.write_folder(item, folder_path).await,
        };

        if let Some(description) = &item.description {
            let sidecar = naming::description_filename(&entry_name);
            self.append_bytes(folder_path, &sidecar, description).await?;
        }
        Ok(())
    }

    /// Stream a stored file into the archive, returning its entry name.
    async fn write_file(&self, item: &Item, folder_path: &str) -> Result<Option<String>> {
        let file_item_type = self.ctx.config.file_item_type;
        let Some(extra) = item.file_extra(file_item_type) else {
            warn!(
                item = %item.name,
                kind = %item.item_type(),
                active = %file_item_type.item_type(),
                "file item does not match the active storage backend, skipping"
            );
            return Ok(None);
        };

        let (Some(path), Some(mimetype)) = (
            extra.path.as_deref().filter(|p| !p.is_empty()),
            extra.mimetype.as_deref().filter(|m| !m.is_empty()),
        ) else {
            return Err(ItemZipError::InvalidFileItem {
                item_id: item.id.clone(),
                name: item.name.clone(),
            });
        };

        let filename = naming::file_name_with_extension(&item.name, mimetype);
        let _permit = self.download_permit().await?;
        let stream = self
            .ctx
            .services
            .storage
            .download_file(DownloadTask {
                item_id: item.id.clone(),
                path: path.to_string(),
                mimetype: mimetype.to_string(),
                scratch_root: self.scratch_root.to_path_buf(),
            })
            .await?;
        self.append_stream(folder_path, &filename, stream).await
    }

    async fn write_folder(&self, item: &Item, folder_path: &str) -> Result<()> {
        let child_folder_path = naming::join_archive_path(folder_path, &item.name);
        self.archive
            .append_directory(&child_folder_path)
            .await
            .map_err(archive_error)?;

        if let Some(description) = &item.description {
            let sidecar = naming::description_filename(&item.name);
            self.append_bytes(&child_folder_path, &sidecar, description)
                .await?;
        }

        let children = self.ctx.services.tree.children(item).await?;
        debug!(folder = %child_folder_path, children = children.len(), "exporting folder");

        stream::iter(children.iter().map(Ok::<_, ItemZipError>))
            .try_for_each_concurrent(self.ctx.config.concurrency(), |child| {
                self.add_item_to_zip(child, &child_folder_path)
            })
            .await
    }

    async fn download_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.downloads
            .acquire()
            .await
            .map_err(|e| ItemZipError::Archive(e.to_string()))
    }

    async fn append_bytes(
        &self,
        folder_path: &str,
        entry_name: &str,
        data: impl AsRef<[u8]>,
    ) -> Result<()> {
        let path = naming::join_archive_path(folder_path, entry_name);
        self.archive
            .append_bytes(&path, data)
            .await
            .map_err(archive_error)
    }

    async fn append_stream(
        &self,
        folder_path: &str,
        entry_name: &str,
        stream: ByteStream,
    ) -> Result<Option<String>> {
        let path = naming::join_archive_path(folder_path, entry_name);
        let written = self
            .archive
            .append_stream(&path, stream)
            .await
            .map_err(archive_error)?;
        Ok(written.then(|| entry_name.to_string()))
    }
}

fn archive_error(e: anyhow::Error) -> ItemZipError {
    ItemZipError::Archive(format!("{e:#}"))
}
