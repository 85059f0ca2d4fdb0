//! ZIP container codec.
//!
//! - [`structures`]: ZIP format records (EOCD, local and central headers)
//! - [`parser`]: reads the Central Directory from any [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: pulls entry data out, STORED or DEFLATE, with CRC checks
//! - [`writer`]: appends STORED entries and finalizes the Central Directory
//!
//! ## Limitations
//!
//! - No encryption, no multi-disk archives
//! - ZIP64 is read but never written

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::ArchiveWriter;
