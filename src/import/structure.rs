use std::path::{Path, PathBuf};

use crate::error::{ItemZipError, Result};

/// Check that an extracted archive holds exactly one top-level entry and
/// return its path.
pub async fn check_has_zip_structure(dir: &Path) -> Result<PathBuf> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }

    match entries.len() {
        1 => Ok(entries.remove(0)),
        n => Err(ItemZipError::InvalidArchiveStructure { entries: n }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_root_passes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("root")).unwrap();

        let root = check_has_zip_structure(dir.path()).await.unwrap();
        assert_eq!(root, dir.path().join("root"));
    }

    #[tokio::test]
    async fn two_roots_fail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("root")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let err = check_has_zip_structure(dir.path()).await.unwrap_err();
        assert!(matches!(err, ItemZipError::InvalidArchiveStructure { entries: 2 }));
    }

    #[tokio::test]
    async fn empty_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_has_zip_structure(dir.path()).await.unwrap_err();
        assert!(matches!(err, ItemZipError::InvalidArchiveStructure { entries: 0 }));
    }
}
