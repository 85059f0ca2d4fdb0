//! Item tree data model.
//!
//! An [`Item`] is one node of the content tree. Its payload lives in
//! [`ItemExtra`], a closed sum type with one variant per item type, so the
//! type of an item is always derived from the payload it carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which storage backend file items are persisted with.
///
/// A deployment runs with exactly one active file item type; files of the
/// other kind are treated as foreign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileItemType {
    #[default]
    #[serde(rename = "file")]
    Local,
    #[serde(rename = "s3File")]
    S3,
}

impl FileItemType {
    pub fn item_type(&self) -> ItemType {
        match self {
            FileItemType::Local => ItemType::LocalFile,
            FileItemType::S3 => ItemType::S3File,
        }
    }
}

impl std::str::FromStr for FileItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "local" => Ok(FileItemType::Local),
            "s3File" | "s3" => Ok(FileItemType::S3),
            other => Err(format!("unknown file item type: {other}")),
        }
    }
}

/// Item type tags, named the way they appear in serialized trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Folder,
    Document,
    Link,
    App,
    LocalFile,
    S3File,
    H5p,
    Etherpad,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Folder => "folder",
            ItemType::Document => "document",
            ItemType::Link => "embeddedLink",
            ItemType::App => "app",
            ItemType::LocalFile => "file",
            ItemType::S3File => "s3File",
            ItemType::H5p => "h5p",
            ItemType::Etherpad => "etherpad",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentExtra {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UrlExtra {
    pub url: String,
}

/// Stored file metadata. `path` is a backend locator, not a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileExtra {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct H5pExtra {
    pub content_id: String,
    pub h5p_file_path: String,
    pub content_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EtherpadExtra {
    #[serde(rename = "padID")]
    pub pad_id: String,
}

/// Type-tagged item payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemExtra {
    #[serde(rename = "folder")]
    Folder,
    #[serde(rename = "document")]
    Document(DocumentExtra),
    #[serde(rename = "embeddedLink")]
    Link(UrlExtra),
    #[serde(rename = "app")]
    App(UrlExtra),
    #[serde(rename = "file")]
    LocalFile(FileExtra),
    #[serde(rename = "s3File")]
    S3File(FileExtra),
    #[serde(rename = "h5p")]
    H5p(H5pExtra),
    #[serde(rename = "etherpad")]
    Etherpad(EtherpadExtra),
}

impl ItemExtra {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemExtra::Folder => ItemType::Folder,
            ItemExtra::Document(_) => ItemType::Document,
            ItemExtra::Link(_) => ItemType::Link,
            ItemExtra::App(_) => ItemType::App,
            ItemExtra::LocalFile(_) => ItemType::LocalFile,
            ItemExtra::S3File(_) => ItemType::S3File,
            ItemExtra::H5p(_) => ItemType::H5p,
            ItemExtra::Etherpad(_) => ItemType::Etherpad,
        }
    }

    /// Wrap file metadata in the variant matching the active file item type.
    pub fn file(kind: FileItemType, extra: FileExtra) -> Self {
        match kind {
            FileItemType::Local => ItemExtra::LocalFile(extra),
            FileItemType::S3 => ItemExtra::S3File(extra),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_thumbnail: Option<bool>,
}

impl ItemSettings {
    pub fn with_thumbnail(has_thumbnail: bool) -> Self {
        Self {
            has_thumbnail: Some(has_thumbnail),
        }
    }
}

/// A node of the content tree.
///
/// `id` is `None` for items produced by import that have not been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub extra: ItemExtra,
    #[serde(default)]
    pub settings: ItemSettings,
}

impl Item {
    pub fn new(name: impl Into<String>, extra: ItemExtra) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            extra,
            settings: ItemSettings::default(),
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self::new(name, ItemExtra::Folder)
    }

    pub fn document(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            name,
            ItemExtra::Document(DocumentExtra {
                content: content.into(),
            }),
        )
    }

    pub fn link(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, ItemExtra::Link(UrlExtra { url: url.into() }))
    }

    pub fn app(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, ItemExtra::App(UrlExtra { url: url.into() }))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.extra.item_type()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.extra, ItemExtra::Folder)
    }

    /// File metadata, if this item is a file of the given backend kind.
    pub fn file_extra(&self, kind: FileItemType) -> Option<&FileExtra> {
        match (&self.extra, kind) {
            (ItemExtra::LocalFile(extra), FileItemType::Local) => Some(extra),
            (ItemExtra::S3File(extra), FileItemType::S3) => Some(extra),
            _ => None,
        }
    }

    /// Id used to key scratch storage and logs.
    pub fn id_or_name(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// Acting member for collaborator calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}
