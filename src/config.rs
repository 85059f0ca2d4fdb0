use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::item::FileItemType;

/// Default upper bound for imported archives (250 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 250;
/// Default truncation limit for names of imported file items.
pub const DEFAULT_NAME_MAX_LENGTH: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Runtime settings shared by import and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZipConfig {
    /// Active storage backend for file items.
    pub file_item_type: FileItemType,
    /// Maximum number of children exported, and downloads in flight, at once.
    pub max_concurrency: usize,
    /// Maximum accepted size of an imported archive, in bytes.
    pub max_file_size: u64,
    /// Maximum length of an imported item name, in characters.
    pub name_max_length: usize,
    /// Parent directory for scratch storage; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ZipConfig {
    fn default() -> Self {
        Self {
            file_item_type: FileItemType::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            name_max_length: DEFAULT_NAME_MAX_LENGTH,
            scratch_dir: None,
        }
    }
}

impl ZipConfig {
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Create a scratch directory that is removed when the guard drops.
    pub fn scratch(&self, prefix: &str) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }
}
