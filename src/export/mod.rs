//! Archive export: item trees into ZIP archives.
//!
//! [`prepare_archive_from_item`] drives an [`ExportWalker`] over the tree and
//! returns the finished archive. Export is all-or-nothing: a single failing
//! item aborts the whole archive with [`ItemZipError::UnexpectedExport`].

mod walker;

pub use walker::ExportWalker;

use tracing::info;

use crate::config::ZipConfig;
use crate::error::{ItemZipError, Result};
use crate::item::{Item, Member};
use crate::naming;
use crate::services::ExportServices;
use crate::zip::ArchiveWriter;

/// Everything an export needs besides the root item.
#[derive(Clone)]
pub struct ExportContext {
    pub services: ExportServices,
    pub config: ZipConfig,
    pub member: Member,
}

/// A finished archive and what a caller needs to send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedArchive {
    pub bytes: Vec<u8>,
    /// Suggested download name, the root item name plus `.zip`.
    pub file_name: String,
    pub byte_length: usize,
}

/// Export `root` and its subtree into an in-memory ZIP archive.
pub async fn prepare_archive_from_item(ctx: &ExportContext, root: &Item) -> Result<PreparedArchive> {
    let scratch = ctx
        .config
        .scratch(&format!("itemzip-{}-", scratch_key(root.id_or_name())))?;
    let archive = ArchiveWriter::new();

    ExportWalker::new(ctx, &archive, scratch.path())
        .add_item_to_zip(root, "")
        .await
        .map_err(|e| ItemZipError::unexpected_export(&root.name, e))?;

    let bytes = archive
        .finish()
        .map_err(|e| ItemZipError::Archive(format!("{e:#}")))?;
    let byte_length = bytes.len();
    info!(item = %root.name, bytes = byte_length, "archive ready");

    Ok(PreparedArchive {
        bytes,
        file_name: naming::archive_filename(&root.name),
        byte_length,
    })
}

fn scratch_key(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_key_is_path_safe() {
        assert_eq!(
            scratch_key("ecafbd2a-5688-11eb-ae93-0242ac130002"),
            "ecafbd2a-5688-11eb-ae93-0242ac130002"
        );
        assert_eq!(scratch_key("../a b"), "___a_b");
    }
}
