use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Version 2.0: deflate, directories.
pub const VERSION_NEEDED: u16 = 20;
/// Upper byte 3 = UNIX, lower byte = ZIP format version 2.0.
pub const VERSION_MADE_BY: u16 = (3 << 8) | 20;
/// General purpose flag bit 11: file names are UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;
/// 1980-01-01 00:00:00 in MS-DOS format, keeps archives reproducible.
pub const DOS_EPOCH_DATE: u16 = (1 << 5) | 1;
pub const DOS_EPOCH_TIME: u16 = 0;

/// External attributes for UNIX regular files (0644) and directories (0755).
pub const UNIX_FILE_ATTRS: u32 = 0o100644 << 16;
pub const UNIX_DIR_ATTRS: u32 = (0o040755 << 16) | 0x10;

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Single-disk EOCD for an archive whose central directory fits 32-bit fields.
    pub fn single_disk(entries: usize, cd_size: u64, cd_offset: u64) -> Result<Self> {
        if entries >= 0xFFFF || cd_size >= 0xFFFFFFFF || cd_offset >= 0xFFFFFFFF {
            bail!("Archive too large: ZIP64 output is not supported");
        }
        Ok(Self {
            disk_entries: entries as u16,
            total_entries: entries as u16,
            cd_size: cd_size as u32,
            cd_offset: cd_offset as u32,
            ..Self::default()
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.disk_with_cd)?;
        out.write_u16::<LittleEndian>(self.disk_entries)?;
        out.write_u16::<LittleEndian>(self.total_entries)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 locator");
        }

        // Skip the disk number holding the ZIP64 EOCD.
        let mut cursor = Cursor::new(&data[8..]);
        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 End of Central Directory");
        }

        // Record size, versions and disk numbers precede the counts.
        let mut cursor = Cursor::new(&data[32..]);
        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Parsed or pending ZIP file entry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

impl ZipFileEntry {
    fn external_attrs(&self) -> u32 {
        if self.is_directory {
            UNIX_DIR_ATTRS
        } else {
            UNIX_FILE_ATTRS
        }
    }

    fn sizes_u32(&self) -> Result<(u32, u32, u32)> {
        if self.compressed_size >= 0xFFFFFFFF
            || self.uncompressed_size >= 0xFFFFFFFF
            || self.lfh_offset >= 0xFFFFFFFF
        {
            bail!(
                "Entry {} too large: ZIP64 output is not supported",
                self.file_name
            );
        }
        Ok((
            self.compressed_size as u32,
            self.uncompressed_size as u32,
            self.lfh_offset as u32,
        ))
    }

    fn name_len(&self) -> Result<u16> {
        u16::try_from(self.file_name.len())
            .map_err(|_| anyhow::anyhow!("Entry name too long: {}", self.file_name))
    }

    /// Write the Local File Header preceding the entry data.
    pub fn write_local_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let (compressed, uncompressed, _) = self.sizes_u32()?;
        out.write_all(LFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(FLAG_UTF8)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(DOS_EPOCH_TIME)?;
        out.write_u16::<LittleEndian>(DOS_EPOCH_DATE)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(compressed)?;
        out.write_u32::<LittleEndian>(uncompressed)?;
        out.write_u16::<LittleEndian>(self.name_len()?)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_all(self.file_name.as_bytes())?;
        Ok(())
    }

    /// Write this entry's Central Directory File Header.
    pub fn write_central_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let (compressed, uncompressed, offset) = self.sizes_u32()?;
        out.write_all(CDFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(FLAG_UTF8)?;
        out.write_u16::<LittleEndian>(self.compression_method.as_u16())?;
        out.write_u16::<LittleEndian>(DOS_EPOCH_TIME)?;
        out.write_u16::<LittleEndian>(DOS_EPOCH_DATE)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(compressed)?;
        out.write_u32::<LittleEndian>(uncompressed)?;
        out.write_u16::<LittleEndian>(self.name_len()?)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_u16::<LittleEndian>(0)?; // comment length
        out.write_u16::<LittleEndian>(0)?; // disk number start
        out.write_u16::<LittleEndian>(0)?; // internal attributes
        out.write_u32::<LittleEndian>(self.external_attrs())?;
        out.write_u32::<LittleEndian>(offset)?;
        out.write_all(self.file_name.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eocd_write_then_parse() {
        let eocd = EndOfCentralDirectory::single_disk(3, 120, 4096).unwrap();
        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);
        let parsed = EndOfCentralDirectory::from_bytes(&buf).unwrap();
        assert_eq!(parsed, eocd);
        assert!(!parsed.is_zip64());
    }

    #[test]
    fn local_header_layout() {
        let entry = ZipFileEntry {
            file_name: "root/a.url".to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 5,
            uncompressed_size: 5,
            crc32: 0xDEADBEEF,
            lfh_offset: 0,
            is_directory: false,
        };
        let mut buf = Vec::new();
        entry.write_local_header(&mut buf).unwrap();

        assert_eq!(buf.len(), LFH_SIZE + entry.file_name.len());
        assert_eq!(&buf[0..4], LFH_SIGNATURE);
        assert_eq!(u16::from_le_bytes([buf[26], buf[27]]), 10);
        assert_eq!(&buf[LFH_SIZE..], b"root/a.url");
    }

    #[test]
    fn oversized_eocd_is_rejected() {
        assert!(EndOfCentralDirectory::single_disk(70_000, 0, 0).is_err());
    }
}
