//! HTML sanitization for imported documents and descriptions.

/// Turns untrusted HTML into HTML safe to store.
///
/// Implementations must be idempotent: sanitizing already-sanitized HTML
/// returns it unchanged.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

/// Allow-list sanitizer backed by `ammonia`.
///
/// Input is parsed as an HTML fragment and re-serialized, so markup spliced
/// together by removing inner tags can never come back as a live element.
/// `script` and `style` are dropped with their content, other unknown
/// elements are unwrapped, event handler attributes and non-web URL schemes
/// (`javascript:` included) are removed. Links are left without an added
/// `rel` so clean input round-trips byte for byte.
pub struct BasicSanitizer {
    cleaner: ammonia::Builder<'static>,
}

impl BasicSanitizer {
    pub fn new() -> Self {
        let mut cleaner = ammonia::Builder::default();
        cleaner.link_rel(None);
        Self { cleaner }
    }
}

impl Default for BasicSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSanitizer for BasicSanitizer {
    fn sanitize(&self, html: &str) -> String {
        self.cleaner.clean(html).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_active_content() {
        let sanitizer = BasicSanitizer::new();
        let dirty = r#"<p onclick="steal()">hi</p><script>alert(1)</script><a href="javascript:x()">l</a>"#;
        assert_eq!(sanitizer.sanitize(dirty), "<p>hi</p><a>l</a>");
    }

    #[test]
    fn idempotent_on_clean_html() {
        let sanitizer = BasicSanitizer::new();
        let clean = "<p>hi</p><a href=\"https://graasp.org\">link</a>";
        assert_eq!(sanitizer.sanitize(clean), clean);
        assert_eq!(sanitizer.sanitize(&sanitizer.sanitize(clean)), clean);
    }

    #[test]
    fn drops_unclosed_script_tags() {
        let sanitizer = BasicSanitizer::new();
        let once = sanitizer.sanitize("a<script src=x.js>b");
        assert!(once.starts_with('a'));
        assert!(!once.contains("<script"));
    }

    #[test]
    fn spliced_script_tags_stay_dead() {
        let sanitizer = BasicSanitizer::new();
        let once = sanitizer.sanitize("<scri<script>pt>alert(1)</scri<script>pt>");
        assert!(!once.to_ascii_lowercase().contains("<script"), "{once}");
        assert_eq!(sanitizer.sanitize(&once), once);
    }

    #[test]
    fn handlers_after_slash_are_removed() {
        let sanitizer = BasicSanitizer::new();
        let once = sanitizer.sanitize("<img/onerror=alert(1) src=x>");
        assert!(!once.contains("onerror"), "{once}");
        assert!(once.contains("<img"));
        assert_eq!(sanitizer.sanitize(&once), once);
    }
}
