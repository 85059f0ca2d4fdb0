use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::io::ReadAt;
use anyhow::{Result, bail};
use tracing::debug;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
    max_extracted_size: Option<u64>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
            max_extracted_size: None,
        }
    }

    /// Refuse to produce more than `limit` bytes of entry data, per entry and
    /// across [`extract_all`](Self::extract_all).
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.max_extracted_size = Some(limit);
        self
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract file data to memory, inflating and checking the CRC
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        // header sizes are untrusted until they fit the archive
        if data_offset
            .checked_add(entry.compressed_size)
            .is_none_or(|end| end > self.parser.size())
        {
            bail!(
                "Entry {} claims {} bytes past the end of the archive",
                entry.file_name,
                entry.compressed_size
            );
        }
        let limit = self.max_extracted_size.unwrap_or(u64::MAX);
        if entry.uncompressed_size > limit {
            bail!(
                "Entry {} expands to {} bytes, over the limit of {}",
                entry.file_name,
                entry.uncompressed_size,
                limit
            );
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.read_exact_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::new();
                flate2::read::DeflateDecoder::new(raw.as_slice())
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut out)?;
                if out.len() as u64 > limit {
                    bail!("Entry {} inflates past the limit of {} bytes", entry.file_name, limit);
                }
                out
            }
            CompressionMethod::Unknown(method) => bail!(
                "Unsupported compression method {} for {}",
                method,
                entry.file_name
            ),
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!("Size mismatch for {}", entry.file_name);
        }
        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.extract_to_memory(entry).await?;
        fs::write(output_path, data).await?;
        Ok(())
    }

    /// Extract every entry under `dest`, recreating the directory layout.
    ///
    /// Entries whose path would land outside `dest` abort the extraction.
    pub async fn extract_all(&self, dest: &Path) -> Result<usize> {
        let entries = self.list_files().await?;
        let mut written = 0;

        if let Some(limit) = self.max_extracted_size {
            let total = entries
                .iter()
                .fold(0u64, |sum, e| sum.saturating_add(e.uncompressed_size));
            if total > limit {
                bail!("Archive expands to {total} bytes, over the limit of {limit}");
            }
        }

        for entry in &entries {
            let output_path = dest.join(safe_relative_path(&entry.file_name)?);
            if entry.is_directory {
                fs::create_dir_all(&output_path).await?;
                continue;
            }
            debug!(entry = %entry.file_name, "extracting");
            self.extract_to_file(entry, &output_path).await?;
            written += 1;
        }

        Ok(written)
    }
}

/// Map an entry name onto a relative path, rejecting traversal and absolute paths.
fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(&name.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => bail!("Refusing to extract entry outside destination: {name}"),
        }
    }
    if path.as_os_str().is_empty() {
        bail!("Empty entry name in archive");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::ArchiveWriter;

    #[tokio::test]
    async fn writer_output_lists_and_extracts() {
        let writer = ArchiveWriter::new();
        writer.append_directory("root").await.unwrap();
        writer.append_bytes("root/a.url", "[InternetShortcut]\nURL=x\n").await.unwrap();
        let bytes = writer.finish().unwrap();

        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let entries = extractor.list_files().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_directory);

        let data = extractor.extract_to_memory(&entries[1]).await.unwrap();
        assert_eq!(data, b"[InternetShortcut]\nURL=x\n");

        let dest = tempfile::tempdir().unwrap();
        assert_eq!(extractor.extract_all(dest.path()).await.unwrap(), 1);
        assert!(dest.path().join("root/a.url").is_file());
    }

    /// Single DEFLATE entry whose headers declare `declared_size` bytes.
    fn deflated_archive(data: &[u8], declared_size: u64) -> Vec<u8> {
        use std::io::Write;

        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut crc = flate2::Crc::new();
        crc.update(data);

        let entry = ZipFileEntry {
            file_name: "big.bin".into(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: compressed.len() as u64,
            uncompressed_size: declared_size,
            crc32: crc.sum(),
            lfh_offset: 0,
            is_directory: false,
        };
        let mut buf = Vec::new();
        entry.write_local_header(&mut buf).unwrap();
        buf.extend_from_slice(&compressed);
        let cd_offset = buf.len() as u64;
        entry.write_central_header(&mut buf).unwrap();
        let cd_size = buf.len() as u64 - cd_offset;
        crate::zip::EndOfCentralDirectory::single_disk(1, cd_size, cd_offset)
            .unwrap()
            .write_to(&mut buf)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn inflates_deflate_entries() {
        let data = vec![7u8; 4096];
        let bytes = deflated_archive(&data, data.len() as u64);
        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let entries = extractor.list_files().await.unwrap();
        assert_eq!(extractor.extract_to_memory(&entries[0]).await.unwrap(), data);
    }

    #[tokio::test]
    async fn oversized_compressed_size_is_rejected_before_reading() {
        let writer = ArchiveWriter::new();
        writer.append_bytes("a.txt", "hello").await.unwrap();
        let bytes = writer.finish().unwrap();

        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let mut entry = extractor.list_files().await.unwrap().remove(0);
        entry.compressed_size = 0xFFFF_FFF0;

        let err = extractor.extract_to_memory(&entry).await.unwrap_err();
        assert!(err.to_string().contains("past the end"), "{err}");
    }

    #[tokio::test]
    async fn declared_size_over_limit_is_rejected() {
        let data = vec![0u8; 1 << 20];
        let bytes = deflated_archive(&data, data.len() as u64);
        let extractor =
            ZipExtractor::new(Arc::new(MemoryReader::new(bytes))).with_size_limit(1024);

        let dest = tempfile::tempdir().unwrap();
        assert!(extractor.extract_all(dest.path()).await.is_err());
        let entries = extractor.list_files().await.unwrap();
        assert!(extractor.extract_to_memory(&entries[0]).await.is_err());
    }

    #[tokio::test]
    async fn lying_header_cannot_inflate_past_limit() {
        let data = vec![0u8; 1 << 20];
        // headers claim a tiny entry, the stream holds a megabyte of zeros
        let bytes = deflated_archive(&data, 10);
        let extractor =
            ZipExtractor::new(Arc::new(MemoryReader::new(bytes))).with_size_limit(1024);

        let entries = extractor.list_files().await.unwrap();
        let err = extractor.extract_to_memory(&entries[0]).await.unwrap_err();
        assert!(err.to_string().contains("inflates past"), "{err}");
    }

    #[test]
    fn rejects_traversal() {
        assert!(safe_relative_path("../etc/passwd").is_err());
        assert!(safe_relative_path("/abs/path").is_err());
        assert_eq!(
            safe_relative_path("./root/a.txt").unwrap(),
            PathBuf::from("root/a.txt")
        );
    }
}
