//! Archive import: extracted directories back into item trees.
//!
//! Each directory is handled in two explicit phases. [`classify_directory`]
//! turns every regular entry into an item and sets description sidecars
//! aside; [`attach_descriptions`] then applies those sidecars to the
//! classified siblings. Only after both phases are the items persisted and
//! folders recursed into.

mod classifier;
mod description;
mod structure;

pub use classifier::generate_item_from_filename;
pub use description::handle_item_description;
pub use structure::check_has_zip_structure;

use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ZipConfig;
use crate::error::{ItemZipError, Result};
use crate::io::ReadAt;
use crate::item::{Item, Member};
use crate::naming;
use crate::services::ImportServices;
use crate::zip::ZipExtractor;

/// Mimetypes accepted for uploaded archives.
pub const ZIP_FILE_MIME_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "multipart/x-zip",
];

/// Everything an import needs besides the archive itself.
#[derive(Clone)]
pub struct ImportContext {
    pub services: ImportServices,
    pub config: ZipConfig,
    pub member: Member,
}

/// Result of the first phase over one directory.
#[derive(Debug, Default)]
pub struct ClassifiedDirectory {
    /// Items produced by classification, in filename order.
    pub items: Vec<Item>,
    /// Entry path each item was classified from, parallel to `items`.
    pub sources: Vec<PathBuf>,
    /// Description sidecars waiting for the second phase.
    pub sidecars: Vec<PathBuf>,
    /// Entries that produced no item.
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
}

/// Reject uploads whose declared mimetype is not a ZIP archive.
pub fn check_archive_mime_type(mimetype: &str) -> Result<()> {
    if ZIP_FILE_MIME_TYPES.contains(&mimetype) {
        Ok(())
    } else {
        Err(ItemZipError::InvalidArchiveMimeType(mimetype.to_string()))
    }
}

/// Phase one: classify every non-sidecar entry of `dir`.
pub async fn classify_directory(
    ctx: &ImportContext,
    dir: &Path,
    parent_id: Option<&str>,
) -> Result<ClassifiedDirectory> {
    let mut filenames = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        filenames.push(entry.file_name().to_string_lossy().to_string());
    }
    filenames.sort();

    let mut classified = ClassifiedDirectory::default();
    for filename in filenames {
        let path = dir.join(&filename);
        // symlinks fall through to the classifier, which skips them
        let is_sidecar = naming::is_description_file(&filename)
            && !filename.starts_with('.')
            && tokio::fs::symlink_metadata(&path).await?.is_file();
        if is_sidecar {
            classified.sidecars.push(path);
            continue;
        }
        match generate_item_from_filename(ctx, dir, &filename, parent_id).await? {
            Some(item) => {
                classified.items.push(item);
                classified.sources.push(path);
            }
            None => classified.skipped += 1,
        }
    }

    Ok(classified)
}

/// Phase two: apply the sidecars found by [`classify_directory`].
pub async fn attach_descriptions(
    ctx: &ImportContext,
    classified: &mut ClassifiedDirectory,
    folder_name: &str,
    parent_id: Option<&str>,
) -> Result<()> {
    let sidecars = std::mem::take(&mut classified.sidecars);
    for path in sidecars {
        let Some(filename) = path.file_name().map(|f| f.to_string_lossy().to_string()) else {
            continue;
        };
        handle_item_description(
            ctx,
            &filename,
            &path,
            folder_name,
            parent_id,
            &mut classified.items,
        )
        .await?;
    }
    Ok(())
}

/// Import a whole archive under `parent_id`.
///
/// The archive is extracted into scratch storage, checked for a single root
/// entry, then walked directory by directory. Every item is persisted through
/// the repository before its children are visited.
pub async fn import_archive<R: ReadAt + 'static>(
    ctx: &ImportContext,
    reader: Arc<R>,
    parent_id: Option<&str>,
) -> Result<ImportReport> {
    let size = reader.size();
    if size > ctx.config.max_file_size {
        return Err(ItemZipError::FileTooLarge {
            size,
            max: ctx.config.max_file_size,
        });
    }

    let scratch = ctx.config.scratch("itemzip-import-")?;
    let extracted = ZipExtractor::new(reader)
        .with_size_limit(ctx.config.max_file_size)
        .extract_all(scratch.path())
        .await
        .map_err(|e| ItemZipError::Archive(format!("{e:#}")))?;
    debug!(files = extracted, dir = %scratch.path().display(), "archive extracted");

    check_has_zip_structure(scratch.path()).await?;

    let mut report = ImportReport::default();
    import_directory(
        ctx,
        scratch.path().to_path_buf(),
        parent_id.map(str::to_string),
        &mut report,
    )
    .await?;

    info!(created = report.created, skipped = report.skipped, "archive imported");
    Ok(report)
}

fn import_directory<'a>(
    ctx: &'a ImportContext,
    dir: PathBuf,
    parent_id: Option<String>,
    report: &'a mut ImportReport,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let folder_name = dir
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut classified = classify_directory(ctx, &dir, parent_id.as_deref()).await?;
        attach_descriptions(ctx, &mut classified, &folder_name, parent_id.as_deref()).await?;
        report.skipped += classified.skipped;

        for (item, source) in classified.items.into_iter().zip(classified.sources) {
            let is_folder = item.is_folder();
            let created = ctx
                .services
                .repository
                .create_item(parent_id.as_deref(), item)
                .await?;
            report.created += 1;

            if is_folder {
                let id = created.id.clone().ok_or_else(|| {
                    ItemZipError::Archive(format!("folder {} was created without an id", created.name))
                })?;
                import_directory(ctx, source, Some(id), report).await?;
            }
        }
        Ok(())
    }
    .boxed()
}
