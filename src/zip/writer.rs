//! ZIP archive writer.
//!
//! Entries are STORED (no compression): exported content is mostly media that
//! would not shrink anyway. The archive is assembled in memory; concurrent
//! appends are serialized by an internal lock so the export walker can share
//! one writer across parallel branches.

use anyhow::{Result, bail};
use std::collections::HashSet;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::structures::{CompressionMethod, EndOfCentralDirectory, ZipFileEntry};

#[derive(Default)]
struct WriterState {
    buf: Vec<u8>,
    entries: Vec<ZipFileEntry>,
    names: HashSet<String>,
}

/// Append-only ZIP writer shared by reference between tasks.
#[derive(Default)]
pub struct ArchiveWriter {
    state: Mutex<WriterState>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry from in-memory content.
    pub async fn append_bytes(&self, name: &str, data: impl AsRef<[u8]>) -> Result<()> {
        let name = normalize_entry_name(name, false)?;
        let mut state = self.state.lock().await;
        state.write_entry(name, data.as_ref(), false)
    }

    /// Append an entry by draining a stream.
    ///
    /// A stream failing with `NotFound` is a warning rather than an error:
    /// the entry is skipped and `false` returned.
    pub async fn append_stream<S>(&self, name: &str, mut stream: S) -> Result<bool>
    where
        S: AsyncRead + Unpin,
    {
        let name = normalize_entry_name(name, false)?;
        let mut data = Vec::new();
        match stream.read_to_end(&mut data).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(entry = %name, error = %e, "skipping missing archive entry");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        let mut state = self.state.lock().await;
        state.write_entry(name, &data, false)?;
        Ok(true)
    }

    /// Append a directory entry (`name/`), once per path.
    pub async fn append_directory(&self, name: &str) -> Result<()> {
        let name = normalize_entry_name(name, true)?;
        let mut state = self.state.lock().await;
        if state.names.contains(&name) {
            return Ok(());
        }
        state.write_entry(name, &[], true)
    }

    /// Names of entries written so far, in write order.
    pub async fn entry_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.entries.iter().map(|e| e.file_name.clone()).collect()
    }

    /// Write the Central Directory and return the complete archive.
    pub fn finish(self) -> Result<Vec<u8>> {
        let WriterState {
            mut buf, entries, ..
        } = self.state.into_inner();

        let cd_offset = buf.len() as u64;
        for entry in &entries {
            entry.write_central_header(&mut buf)?;
        }
        let cd_size = buf.len() as u64 - cd_offset;

        EndOfCentralDirectory::single_disk(entries.len(), cd_size, cd_offset)?.write_to(&mut buf)?;
        Ok(buf)
    }
}

impl WriterState {
    fn write_entry(&mut self, name: String, data: &[u8], is_directory: bool) -> Result<()> {
        if !self.names.insert(name.clone()) {
            warn!(entry = %name, "duplicate archive entry name");
        }

        let mut crc = flate2::Crc::new();
        crc.update(data);

        let entry = ZipFileEntry {
            file_name: name,
            compression_method: CompressionMethod::Stored,
            compressed_size: data.len() as u64,
            uncompressed_size: data.len() as u64,
            crc32: crc.sum(),
            lfh_offset: self.buf.len() as u64,
            is_directory,
        };
        entry.write_local_header(&mut self.buf)?;
        self.buf.extend_from_slice(data);
        self.entries.push(entry);
        Ok(())
    }
}

/// Normalize an archive-relative path to forward slashes without a leading `/`.
fn normalize_entry_name(name: &str, is_directory: bool) -> Result<String> {
    let parts: Vec<&str> = name
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    if parts.is_empty() {
        bail!("Empty archive entry name: {name:?}");
    }
    if parts.contains(&"..") {
        bail!("Archive entry name escapes the archive root: {name:?}");
    }
    let mut normalized = parts.join("/");
    if is_directory {
        normalized.push('/');
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_entry_name("./root/a.url", false).unwrap(), "root/a.url");
        assert_eq!(normalize_entry_name("root", true).unwrap(), "root/");
        assert!(normalize_entry_name("../evil", false).is_err());
        assert!(normalize_entry_name("", false).is_err());
    }

    #[tokio::test]
    async fn missing_stream_is_skipped() {
        struct Missing;
        impl AsyncRead for Missing {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::ErrorKind::NotFound.into()))
            }
        }

        let writer = ArchiveWriter::new();
        let written = writer.append_stream("gone.txt", Missing).await.unwrap();
        assert!(!written);
        assert!(writer.entry_names().await.is_empty());
    }

    #[tokio::test]
    async fn directories_are_written_once() {
        let writer = ArchiveWriter::new();
        writer.append_directory("root").await.unwrap();
        writer.append_directory("root/").await.unwrap();
        writer.append_bytes("root/a.graasp", "<p>a</p>").await.unwrap();

        assert_eq!(writer.entry_names().await, vec!["root/", "root/a.graasp"]);
    }
}
