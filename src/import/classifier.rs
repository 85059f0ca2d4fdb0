use std::path::Path;
use tracing::{error, warn};

use super::ImportContext;
use crate::error::Result;
use crate::item::{DocumentExtra, FileExtra, Item, ItemExtra, ItemSettings, UrlExtra};
use crate::naming::{self, EntryName, LinkKind};
use crate::services::UploadRequest;

/// Turn one entry of an extracted directory into an item.
///
/// Returns `None` for entries that never become items: hidden files,
/// etherpad exports (created through the etherpad service instead) and
/// unreadable shortcuts. Description sidecars are not handled here.
pub async fn generate_item_from_filename(
    ctx: &ImportContext,
    folder_path: &Path,
    filename: &str,
    parent_id: Option<&str>,
) -> Result<Option<Item>> {
    // ignore hidden files such as .DS_Store
    if filename.starts_with('.') {
        return Ok(None);
    }

    let filepath = folder_path.join(filename);
    let metadata = tokio::fs::symlink_metadata(&filepath).await?;

    if metadata.is_symlink() {
        warn!(path = %filepath.display(), "skipping symbolic link");
        return Ok(None);
    }
    if metadata.is_dir() {
        return Ok(Some(Item::folder(filename)));
    }

    match EntryName::classify(filename) {
        EntryName::Hidden | EntryName::Description(_) => Ok(None),
        EntryName::Link(name) => {
            let content = read_text(&filepath).await?;
            let Some((kind, url)) = naming::parse_text_content(&content) else {
                warn!(path = %filepath.display(), "malformed shortcut file, skipping");
                return Ok(None);
            };
            let extra = match kind {
                LinkKind::Link => ItemExtra::Link(UrlExtra { url }),
                LinkKind::App => ItemExtra::App(UrlExtra { url }),
            };
            Ok(Some(Item::new(name, extra)))
        }
        EntryName::Document(name) => {
            let content = read_text(&filepath).await?;
            Ok(Some(Item::new(
                name,
                ItemExtra::Document(DocumentExtra {
                    content: ctx.services.sanitizer.sanitize(&content),
                }),
            )))
        }
        EntryName::Etherpad(name) => {
            let content = read_text(&filepath).await?;
            // a broken pad must not abort the surrounding import
            if let Err(e) = ctx
                .services
                .etherpad
                .create_document(name, &ctx.member, parent_id, &content)
                .await
            {
                error!(file = %filename, error = %e, "failed to import etherpad");
            }
            Ok(None)
        }
        EntryName::File(_) => {
            let mimetype = ctx.services.mime.detect(&filepath).await?;
            let locator = ctx
                .services
                .storage
                .upload_file(UploadRequest {
                    filepath: filepath.clone(),
                    mimetype: mimetype.clone(),
                })
                .await?;

            let has_thumbnail = mimetype.starts_with("image/");
            let extra = FileExtra {
                name: filename.to_string(),
                path: Some(locator),
                size: metadata.len(),
                mimetype: Some(mimetype),
            };
            let mut item = Item::new(
                naming::truncate_name(filename, ctx.config.name_max_length),
                ItemExtra::file(ctx.config.file_item_type, extra),
            );
            item.settings = ItemSettings::with_thumbnail(has_thumbnail);
            Ok(Some(item))
        }
    }
}

async fn read_text(path: &Path) -> Result<String> {
    let raw = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
