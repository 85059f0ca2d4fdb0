//! Command line entry point for itemzip.
//!
//! Exports JSON tree manifests to archives and imports archives (local or
//! remote over HTTP Range requests) back into manifests, with file content
//! kept in a local store directory.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use itemzip::cli::{Command, is_http_url};
use itemzip::local::{LocalFileStorage, LocalH5pService, MemoryItemTree, TreeNode, UnavailableEtherpad};
use itemzip::{
    Cli, ExportContext, ExportServices, HttpRangeReader, ImportContext, ImportServices,
    LocalFileReader, Member, ReadAt, ZipConfig, ZipExtractor, check_archive_mime_type,
    import_archive, prepare_archive_from_item,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.settings.config();
    let member = local_member();

    match &cli.command {
        Command::Export {
            tree,
            store,
            output,
        } => export(tree, store, output.as_deref(), config, member, &cli).await,
        Command::Import {
            file,
            store,
            output,
            parent,
        } => {
            if is_http_url(file) {
                let reader = HttpRangeReader::new(file.clone()).await?;
                if let Some(content_type) = reader.content_type() {
                    check_archive_mime_type(content_type)?;
                }
                let reader = Arc::new(reader);
                import(reader.clone(), store, output, parent.as_deref(), config, member).await?;
                if !cli.is_quiet() {
                    eprintln!("Total bytes transferred: {}", format_size(reader.transferred_bytes()));
                }
                Ok(())
            } else {
                let reader = Arc::new(LocalFileReader::new(Path::new(file))?);
                import(reader, store, output, parent.as_deref(), config, member).await
            }
        }
        Command::List { file } => {
            if is_http_url(file) {
                let reader = Arc::new(HttpRangeReader::new(file.clone()).await?);
                list(reader, &cli).await
            } else {
                list(Arc::new(LocalFileReader::new(Path::new(file))?), &cli).await
            }
        }
    }
}

/// Identity recorded on collaborator calls made by the command line tool.
fn local_member() -> Member {
    let name = std::env::var("USER").unwrap_or_else(|_| "itemzip".to_string());
    Member {
        id: name.clone(),
        name,
    }
}

async fn export(
    tree_path: &Path,
    store: &Path,
    output: Option<&Path>,
    config: ZipConfig,
    member: Member,
    cli: &Cli,
) -> Result<()> {
    let manifest = TreeNode::load(tree_path).await?;
    let (tree, root) = MemoryItemTree::from_manifest(manifest);

    let ctx = ExportContext {
        services: ExportServices {
            tree: Arc::new(tree),
            storage: Arc::new(LocalFileStorage::new(store)),
            etherpad: Arc::new(UnavailableEtherpad),
            h5p: Arc::new(LocalH5pService::new(store)),
        },
        config,
        member,
    };

    let archive = prepare_archive_from_item(&ctx, &root).await?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&archive.file_name));
    tokio::fs::write(&output, &archive.bytes)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;

    if !cli.is_quiet() {
        println!(
            "  exported: {} ({})",
            output.display(),
            format_size(archive.byte_length as u64)
        );
    }
    Ok(())
}

async fn import<R: ReadAt + 'static>(
    reader: Arc<R>,
    store: &Path,
    output: &Path,
    parent: Option<&str>,
    config: ZipConfig,
    member: Member,
) -> Result<()> {
    let tree = Arc::new(MemoryItemTree::new());
    let ctx = ImportContext {
        services: ImportServices::new(
            tree.clone(),
            Arc::new(LocalFileStorage::new(store)),
            Arc::new(UnavailableEtherpad),
        ),
        config,
        member,
    };

    let report = import_archive(&ctx, reader, parent).await?;

    let roots = tree.roots();
    let [root] = roots.as_slice() else {
        bail!("Import produced {} root items, expected one", roots.len());
    };
    let manifest = root
        .id
        .as_deref()
        .and_then(|id| tree.to_manifest(id))
        .context("Imported root item is missing")?;
    manifest.save(output).await?;

    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        manifest = %output.display(),
        "import finished"
    );
    Ok(())
}

async fn list<R: ReadAt + 'static>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await?;

    // -qq: bare names, one per line
    if cli.is_very_quiet() {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return Ok(());
    }

    println!("{:>10}  Name", "Length");
    println!("{}", "-".repeat(40));
    let mut total = 0u64;
    for entry in &entries {
        println!("{:>10}  {}", entry.uncompressed_size, entry.file_name);
        total += entry.uncompressed_size;
    }
    println!("{}", "-".repeat(40));
    println!("{:>10}  {} entries", total, entries.len());
    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
