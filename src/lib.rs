//! # itemzip
//!
//! Converts item trees (folders, documents, links, apps, files, collaborative
//! pads, H5P packages) to and from portable ZIP archives.
//!
//! Hierarchy is expressed as directory nesting and item semantics as filename
//! suffixes (see [`naming`]). Export walks a tree through an [`ItemTree`]
//! collaborator and writes a STORED archive; import extracts an archive,
//! classifies every entry back into an item and persists it through an
//! [`ItemRepository`].
//!
//! ## Features
//!
//! - Recursive export with bounded concurrency and all-or-nothing failure
//! - Two-phase import per directory: classify entries, then attach descriptions
//! - ZIP reader for local files, memory and HTTP URLs (Range requests)
//! - STORED and DEFLATE extraction, ZIP64 archives on read
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use itemzip::local::{LocalFileStorage, LocalH5pService, MemoryItemTree, TreeNode, UnavailableEtherpad};
//! use itemzip::{ExportContext, ExportServices, Item, Member, ZipConfig, prepare_archive_from_item};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest = TreeNode::with_children(
//!         Item::folder("course"),
//!         vec![TreeNode::leaf(Item::link("graasp", "https://graasp.org"))],
//!     );
//!     let (tree, root) = MemoryItemTree::from_manifest(manifest);
//!
//!     let ctx = ExportContext {
//!         services: ExportServices {
//!             tree: Arc::new(tree),
//!             storage: Arc::new(LocalFileStorage::new("./files")),
//!             etherpad: Arc::new(UnavailableEtherpad),
//!             h5p: Arc::new(LocalH5pService::new("./files")),
//!         },
//!         config: ZipConfig::default(),
//!         member: Member::default(),
//!     };
//!
//!     let archive = prepare_archive_from_item(&ctx, &root).await?;
//!     tokio::fs::write(&archive.file_name, &archive.bytes).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod io;
pub mod item;
pub mod local;
pub mod mime;
pub mod naming;
pub mod sanitize;
pub mod services;
pub mod zip;

pub use cli::Cli;
pub use config::ZipConfig;
pub use error::{ItemZipError, Result};
pub use export::{ExportContext, ExportWalker, PreparedArchive, prepare_archive_from_item};
pub use import::{
    ClassifiedDirectory, ImportContext, ImportReport, attach_descriptions,
    check_archive_mime_type, check_has_zip_structure, classify_directory,
    generate_item_from_filename, handle_item_description, import_archive,
};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use item::{FileItemType, Item, ItemExtra, ItemType, Member};
pub use services::{
    ByteStream, DownloadTask, EtherpadService, ExportServices, FileStorage, H5pService,
    ImportServices, ItemRepository, ItemTree, UploadRequest,
};
pub use zip::{ArchiveWriter, ZipExtractor, ZipFileEntry};
