use thiserror::Error;

/// Errors surfaced by the import and export pipelines.
#[derive(Error, Debug)]
pub enum ItemZipError {
    /// A file item has no storage path or mimetype to download from.
    #[error("Invalid file item '{name}' ({}): missing path or mimetype", item_id.as_deref().unwrap_or("unsaved"))]
    InvalidFileItem {
        item_id: Option<String>,
        name: String,
    },

    /// The extracted archive does not hold exactly one top-level entry.
    #[error("Invalid archive structure: expected exactly one root entry, found {entries}")]
    InvalidArchiveStructure { entries: usize },

    /// Anything that failed while walking the tree during export.
    #[error("Unexpected error while exporting '{item_name}': {source}")]
    UnexpectedExport {
        item_name: String,
        #[source]
        source: Box<ItemZipError>,
    },

    #[error("Archive of {size} bytes exceeds the maximum of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported archive mimetype: {0}")]
    InvalidArchiveMimeType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl ItemZipError {
    /// Wrap a walker failure, keeping the innermost item that broke the tree.
    pub fn unexpected_export(item_name: &str, source: ItemZipError) -> Self {
        match source {
            ItemZipError::UnexpectedExport { .. } => source,
            other => ItemZipError::UnexpectedExport {
                item_name: item_name.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ItemZipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_export_keeps_innermost_item() {
        let inner = ItemZipError::InvalidFileItem {
            item_id: Some("abc".into()),
            name: "broken.txt".into(),
        };
        let wrapped = ItemZipError::unexpected_export("broken.txt", inner);
        let rewrapped = ItemZipError::unexpected_export("root", wrapped);

        match rewrapped {
            ItemZipError::UnexpectedExport { item_name, source } => {
                assert_eq!(item_name, "broken.txt");
                assert!(matches!(*source, ItemZipError::InvalidFileItem { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_file_item_message_mentions_unsaved_items() {
        let err = ItemZipError::InvalidFileItem {
            item_id: None,
            name: "a.png".into(),
        };
        assert!(err.to_string().contains("unsaved"));
    }
}
