//! Filename and content conventions of the archive format.
//!
//! Directory nesting carries the hierarchy; suffixes carry item semantics:
//!
//! | Item         | Entry name                     | Content                         |
//! |--------------|--------------------------------|---------------------------------|
//! | folder       | `name/`                        | -                               |
//! | document     | `name.graasp`                  | document HTML                   |
//! | link         | `name.url`                     | `[InternetShortcut]`, `URL=...` |
//! | app          | `name.url`                     | as link, plus `AppURL=1`        |
//! | etherpad     | `name.etherpad.html`           | rendered pad HTML               |
//! | file         | `name.ext`                     | raw bytes                       |
//! | description  | `<entry>.description.html`     | description HTML                |
//!
//! These suffixes are an on-disk contract and must stay byte-identical.

use std::path::Path;

pub const DESCRIPTION_EXTENSION: &str = ".description.html";
pub const GRAASP_DOCUMENT_EXTENSION: &str = ".graasp";
pub const LINK_EXTENSION: &str = ".url";
pub const ETHERPAD_EXTENSION: &str = ".etherpad.html";
pub const ARCHIVE_EXTENSION: &str = ".zip";

pub const LINK_HEADER: &str = "[InternetShortcut]";
pub const URL_PREFIX: &str = "URL=";
pub const APP_URL_PREFIX: &str = "AppURL=";

/// Whether a `.url` entry is a plain link or an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Link,
    App,
}

/// Classification of a non-directory entry by its name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName<'a> {
    /// Dot-files such as `.DS_Store`.
    Hidden,
    /// A `.url` shortcut; holds the name without suffix.
    Link(&'a str),
    Document(&'a str),
    Etherpad(&'a str),
    /// A description sidecar, see [`DescriptionTarget`].
    Description(DescriptionTarget<'a>),
    File(&'a str),
}

/// Which sibling a description sidecar belongs to, most specific suffix first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionTarget<'a> {
    /// Sidecar of a `.url` entry; holds the link/app item name.
    Link(&'a str),
    /// Sidecar of a `.graasp` entry; holds the document item name.
    Document(&'a str),
    /// Sidecar of any other entry (file or folder); holds its name.
    Other(&'a str),
}

impl<'a> DescriptionTarget<'a> {
    pub fn item_name(&self) -> &'a str {
        match self {
            DescriptionTarget::Link(name)
            | DescriptionTarget::Document(name)
            | DescriptionTarget::Other(name) => name,
        }
    }
}

impl<'a> EntryName<'a> {
    pub fn classify(filename: &'a str) -> Self {
        if filename.starts_with('.') {
            return EntryName::Hidden;
        }
        if let Some(target) = description_target(filename) {
            return EntryName::Description(target);
        }
        if let Some(name) = filename.strip_suffix(LINK_EXTENSION) {
            EntryName::Link(name)
        } else if let Some(name) = filename.strip_suffix(GRAASP_DOCUMENT_EXTENSION) {
            EntryName::Document(name)
        } else if let Some(name) = filename.strip_suffix(ETHERPAD_EXTENSION) {
            EntryName::Etherpad(name)
        } else {
            EntryName::File(filename)
        }
    }
}

/// Resolve the sibling a sidecar filename describes, or `None` if it is not a sidecar.
pub fn description_target(filename: &str) -> Option<DescriptionTarget<'_>> {
    let base = filename.strip_suffix(DESCRIPTION_EXTENSION)?;
    if let Some(name) = base.strip_suffix(LINK_EXTENSION) {
        Some(DescriptionTarget::Link(name))
    } else if let Some(name) = base.strip_suffix(GRAASP_DOCUMENT_EXTENSION) {
        Some(DescriptionTarget::Document(name))
    } else {
        Some(DescriptionTarget::Other(base))
    }
}

pub fn is_description_file(filename: &str) -> bool {
    filename.ends_with(DESCRIPTION_EXTENSION)
}

/// Build the shortcut text for a link or app.
pub fn build_text_content(url: &str, kind: LinkKind) -> String {
    match kind {
        LinkKind::Link => format!("{LINK_HEADER}\n{URL_PREFIX}{url}\n"),
        LinkKind::App => format!("{LINK_HEADER}\n{URL_PREFIX}{url}\n{APP_URL_PREFIX}1\n"),
    }
}

/// Decode shortcut text written by [`build_text_content`].
///
/// The URL is the second line minus the `URL=` prefix; a third line holding
/// the app marker turns the shortcut into an app.
pub fn parse_text_content(content: &str) -> Option<(LinkKind, String)> {
    let mut lines = content.lines();
    let _header = lines.next()?;
    let link = lines.next()?.trim_end_matches('\r');
    let url = link.strip_prefix(URL_PREFIX)?;
    let kind = match lines.next() {
        Some(marker) if marker.starts_with(APP_URL_PREFIX) && marker.contains('1') => LinkKind::App,
        _ => LinkKind::Link,
    };
    Some((kind, url.to_string()))
}

pub fn document_filename(name: &str) -> String {
    format!("{name}{GRAASP_DOCUMENT_EXTENSION}")
}

pub fn link_filename(name: &str) -> String {
    format!("{name}{LINK_EXTENSION}")
}

pub fn etherpad_filename(name: &str) -> String {
    format!("{name}{ETHERPAD_EXTENSION}")
}

pub fn description_filename(name: &str) -> String {
    format!("{name}{DESCRIPTION_EXTENSION}")
}

pub fn archive_filename(name: &str) -> String {
    format!("{name}{ARCHIVE_EXTENSION}")
}

/// Filename for a stored file: the item name if it has an extension,
/// otherwise the name plus an extension derived from the mimetype.
pub fn file_name_with_extension(name: &str, mimetype: &str) -> String {
    let has_extension = Path::new(name)
        .extension()
        .is_some_and(|ext| !ext.is_empty());
    if has_extension {
        return name.to_string();
    }
    match extension_for_mimetype(mimetype) {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_string(),
    }
}

fn extension_for_mimetype(mimetype: &str) -> Option<&'static str> {
    let essence = mimetype.split(';').next().unwrap_or_default().trim();
    let extensions = mime_guess::get_mime_extensions_str(essence)?;
    // Prefer an extension that maps back to the same mimetype first.
    extensions
        .iter()
        .copied()
        .find(|ext| {
            mime_guess::from_ext(ext)
                .first_raw()
                .is_some_and(|m| m.eq_ignore_ascii_case(essence))
        })
        .or_else(|| extensions.first().copied())
}

/// Join an archive-relative folder path and an entry name with `/`.
pub fn join_archive_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() || folder == "." {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

/// Truncate a display name to at most `max_chars` characters.
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_text_round_trip() {
        let text = build_text_content("https://example.com", LinkKind::Link);
        assert_eq!(text, "[InternetShortcut]\nURL=https://example.com\n");
        assert_eq!(
            parse_text_content(&text),
            Some((LinkKind::Link, "https://example.com".to_string()))
        );
    }

    #[test]
    fn app_text_has_marker() {
        let text = build_text_content("https://app.example.com", LinkKind::App);
        assert_eq!(
            text,
            "[InternetShortcut]\nURL=https://app.example.com\nAppURL=1\n"
        );
        assert_eq!(
            parse_text_content(&text),
            Some((LinkKind::App, "https://app.example.com".to_string()))
        );
    }

    #[test]
    fn parse_handles_crlf_and_garbage() {
        assert_eq!(
            parse_text_content("[InternetShortcut]\r\nURL=https://a.b\r\n"),
            Some((LinkKind::Link, "https://a.b".to_string()))
        );
        assert_eq!(parse_text_content("just one line"), None);
        assert_eq!(parse_text_content("header\nnot a url\n"), None);
    }

    #[test]
    fn classify_entry_names() {
        assert_eq!(EntryName::classify(".DS_Store"), EntryName::Hidden);
        assert_eq!(EntryName::classify(".hidden.url"), EntryName::Hidden);
        assert_eq!(EntryName::classify("site.url"), EntryName::Link("site"));
        assert_eq!(EntryName::classify("notes.graasp"), EntryName::Document("notes"));
        assert_eq!(EntryName::classify("pad.etherpad.html"), EntryName::Etherpad("pad"));
        assert_eq!(EntryName::classify("page.html"), EntryName::File("page.html"));
        assert_eq!(
            EntryName::classify("pic.png.description.html"),
            EntryName::Description(DescriptionTarget::Other("pic.png"))
        );
    }

    #[test]
    fn description_targets_prefer_specific_suffix() {
        assert_eq!(
            description_target("site.url.description.html"),
            Some(DescriptionTarget::Link("site"))
        );
        assert_eq!(
            description_target("notes.graasp.description.html"),
            Some(DescriptionTarget::Document("notes"))
        );
        assert_eq!(
            description_target("folder.description.html"),
            Some(DescriptionTarget::Other("folder"))
        );
        assert_eq!(description_target("folder.html"), None);
    }

    #[test]
    fn file_names_gain_extension_from_mimetype() {
        assert_eq!(file_name_with_extension("photo.jpg", "image/png"), "photo.jpg");
        assert_eq!(file_name_with_extension("photo", "image/png"), "photo.png");
        assert_eq!(file_name_with_extension("blob", "x-unknown/none"), "blob");
    }

    #[test]
    fn join_paths() {
        assert_eq!(join_archive_path("", "a"), "a");
        assert_eq!(join_archive_path(".", "a"), "a");
        assert_eq!(join_archive_path("root/", "a"), "root/a");
        assert_eq!(join_archive_path("root/sub", "a.url"), "root/sub/a.url");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_name("héllo", 2), "hé");
        assert_eq!(truncate_name("short", 100), "short");
    }
}
