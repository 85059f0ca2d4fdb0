//! Content-based mimetype detection.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncReadExt;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// Number of leading bytes inspected when sniffing.
const SNIFF_LEN: usize = 8192;

/// Detects the mimetype of a file from its bytes, never from its name.
#[async_trait]
pub trait MimeDetector: Send + Sync {
    async fn detect(&self, path: &Path) -> Result<String>;
}

/// Magic-number detector backed by `infer`, falling back to
/// `text/plain` for UTF-8 content and `application/octet-stream` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicMimeDetector;

impl MagicMimeDetector {
    pub fn detect_buffer(buf: &[u8]) -> String {
        if let Some(kind) = infer::get(buf) {
            return kind.mime_type().to_string();
        }
        if buf.is_empty() || looks_like_text(buf) {
            TEXT_PLAIN.to_string()
        } else {
            OCTET_STREAM.to_string()
        }
    }
}

#[async_trait]
impl MimeDetector for MagicMimeDetector {
    async fn detect(&self, path: &Path) -> Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut buf = Vec::with_capacity(SNIFF_LEN);
        (&mut file).take(SNIFF_LEN as u64).read_to_end(&mut buf).await?;
        Ok(Self::detect_buffer(&buf))
    }
}

fn looks_like_text(buf: &[u8]) -> bool {
    if buf.contains(&0) {
        return false;
    }
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        // The sniff window may cut a multi-byte character in half.
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > buf.len(),
    }
}
