use std::path::Path;
use tracing::error;

use super::ImportContext;
use crate::error::Result;
use crate::item::Item;
use crate::naming::{self, DescriptionTarget};

/// Attach the content of a description sidecar to the item it describes.
///
/// `<folder_name>.description.html` describes the enclosing folder itself and
/// is forwarded to the repository; any other sidecar is matched by name
/// against `items`, the siblings already classified in the same directory.
/// A sidecar matching nothing is logged and dropped.
pub async fn handle_item_description(
    ctx: &ImportContext,
    filename: &str,
    filepath: &Path,
    folder_name: &str,
    parent_id: Option<&str>,
    items: &mut [Item],
) -> Result<()> {
    let raw = tokio::fs::read(filepath).await?;
    let content = ctx
        .services
        .sanitizer
        .sanitize(&String::from_utf8_lossy(&raw));

    if filename == naming::description_filename(folder_name) {
        match parent_id {
            Some(parent_id) => {
                ctx.services
                    .repository
                    .update_description(parent_id, &content)
                    .await?;
            }
            None => error!(file = %filename, "no parent to attach folder description to"),
        }
        return Ok(());
    }

    let Some(target) = naming::description_target(filename) else {
        error!(path = %filepath.display(), "not a description file");
        return Ok(());
    };
    set_description_in_item(items, target, content);
    Ok(())
}

fn set_description_in_item(items: &mut [Item], target: DescriptionTarget<'_>, content: String) {
    let name = target.item_name();
    match items.iter_mut().find(|item| item.name == name) {
        Some(item) => item.description = Some(content),
        None => error!(name, "cannot find item for description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::tests::Fixture;
    use crate::item::{FileExtra, FileItemType, ItemExtra};

    fn file_item(name: &str) -> Item {
        Item::new(
            name,
            ItemExtra::file(
                FileItemType::Local,
                FileExtra {
                    name: name.to_string(),
                    ..FileExtra::default()
                },
            ),
        )
    }

    async fn attach(fx: &Fixture, filename: &str, items: &mut [Item]) {
        handle_item_description(
            &fx.ctx,
            filename,
            &fx.dir().join(filename),
            "parent",
            Some("parent-id"),
            items,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn parent_description_goes_to_repository() {
        let fx = Fixture::new();
        let parent = fx.create_parent("parent-id").await;
        fx.write("parent.description.html", "about the parent");
        let mut items = vec![Item::folder("parent")];

        attach(&fx, "parent.description.html", &mut items).await;

        assert_eq!(items[0].description, None);
        assert_eq!(
            fx.tree.get(parent.id.as_deref().unwrap()).unwrap().description.as_deref(),
            Some("about the parent")
        );
    }

    #[tokio::test]
    async fn folder_description() {
        let fx = Fixture::new();
        fx.write("folder.description.html", "folder");
        let mut items = vec![Item::folder("folder")];

        attach(&fx, "folder.description.html", &mut items).await;
        assert!(items[0].description.as_deref().unwrap().contains("folder"));
    }

    #[tokio::test]
    async fn image_description() {
        let fx = Fixture::new();
        fx.write("pic.png.description.html", "caption");
        let mut items = vec![file_item("pic.png")];

        attach(&fx, "pic.png.description.html", &mut items).await;
        assert!(items[0].description.as_deref().unwrap().contains("caption"));
    }

    #[tokio::test]
    async fn document_and_link_descriptions() {
        let fx = Fixture::new();
        fx.write("document.graasp.description.html", "doc <script>x()</script>");
        fx.write("site.url.description.html", "site");
        let mut items = vec![
            Item::document("document", ""),
            Item::link("site", "https://graasp.org"),
        ];

        attach(&fx, "document.graasp.description.html", &mut items).await;
        attach(&fx, "site.url.description.html", &mut items).await;

        assert_eq!(items[0].description.as_deref(), Some("doc "));
        assert_eq!(items[1].description.as_deref(), Some("site"));
    }

    #[tokio::test]
    async fn unmatched_sidecar_changes_nothing() {
        let fx = Fixture::new();
        fx.write("ghost.description.html", "boo");
        let mut items = vec![file_item("pic.png"), Item::folder("folder")];
        let before = items.clone();

        attach(&fx, "ghost.description.html", &mut items).await;
        assert_eq!(items, before);
    }
}
