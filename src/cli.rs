use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_FILE_SIZE, DEFAULT_NAME_MAX_LENGTH, ZipConfig,
};
use crate::item::FileItemType;

#[derive(Parser, Debug)]
#[command(name = "itemzip")]
#[command(version)]
#[command(about = "Export item trees to ZIP archives and import them back", long_about = None)]
#[command(after_help = "Examples:\n  \
  itemzip export --tree course.json --store files -o course.zip\n  \
  itemzip import course.zip --store files -o imported.json\n  \
  itemzip list https://example.com/course.zip")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub settings: Settings,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export an item tree manifest to a ZIP archive
    Export {
        /// JSON manifest of the tree to export
        #[arg(long, value_name = "FILE")]
        tree: PathBuf,

        /// Directory holding stored file content
        #[arg(long, value_name = "DIR", env = "ITEMZIP_STORE")]
        store: PathBuf,

        /// Output archive (default: <root name>.zip)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Import a ZIP archive into an item tree manifest
    Import {
        /// ZIP file path or HTTP URL
        #[arg(value_name = "FILE")]
        file: String,

        /// Directory receiving uploaded file content
        #[arg(long, value_name = "DIR", env = "ITEMZIP_STORE")]
        store: PathBuf,

        /// Where to write the resulting manifest
        #[arg(short = 'o', long, value_name = "FILE")]
        output: PathBuf,

        /// Id of the folder to import into
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
    },

    /// List entries of a ZIP archive
    List {
        /// ZIP file path or HTTP URL
        #[arg(value_name = "FILE")]
        file: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Storage backend of file items (file or s3File)
    #[arg(long, global = true, default_value = "file", env = "ITEMZIP_FILE_ITEM_TYPE")]
    pub file_item_type: FileItemType,

    /// Maximum concurrent child exports and downloads
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CONCURRENCY, env = "ITEMZIP_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// Maximum size of an imported archive in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FILE_SIZE, env = "ITEMZIP_MAX_FILE_SIZE")]
    pub max_file_size: u64,

    /// Maximum length of imported item names
    #[arg(long, global = true, default_value_t = DEFAULT_NAME_MAX_LENGTH, env = "ITEMZIP_NAME_MAX_LENGTH")]
    pub name_max_length: usize,

    /// Parent directory for scratch files
    #[arg(long, global = true, value_name = "DIR", env = "ITEMZIP_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,
}

impl Settings {
    pub fn config(&self) -> ZipConfig {
        ZipConfig {
            file_item_type: self.file_item_type,
            max_concurrency: self.max_concurrency,
            max_file_size: self.max_file_size,
            name_max_length: self.name_max_length,
            scratch_dir: self.scratch_dir.clone(),
        }
    }
}

pub fn is_http_url(file: &str) -> bool {
    file.starts_with("http://") || file.starts_with("https://")
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => "info",
            1 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_with_settings() {
        let cli = Cli::try_parse_from([
            "itemzip",
            "export",
            "--tree",
            "t.json",
            "--store",
            "files",
            "--file-item-type",
            "s3File",
            "--max-concurrency",
            "2",
        ])
        .unwrap();

        let config = cli.settings.config();
        assert_eq!(config.file_item_type, FileItemType::S3);
        assert_eq!(config.max_concurrency, 2);
        assert!(matches!(cli.command, Command::Export { output: None, .. }));
    }

    #[test]
    fn quiet_levels() {
        let cli = Cli::try_parse_from(["itemzip", "-qq", "list", "a.zip"]).unwrap();
        assert!(cli.is_very_quiet());
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn detects_urls() {
        assert!(is_http_url("https://example.com/a.zip"));
        assert!(!is_http_url("a.zip"));
    }
}
