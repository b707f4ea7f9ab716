use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Only TrueType files are installed from a release archive.
pub const FONT_EXTENSION: &str = "ttf";

/// Extracts `archive` into `dest` on the blocking pool. Whatever a previous
/// run left in `dest` is removed first. Returns the number of files written.
pub async fn extract(archive: &Path, dest: &Path) -> Result<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
        .await
        .context("Extraction task panicked")?
}

fn extract_blocking(archive: &Path, dest: &Path) -> Result<usize> {
    if dest.exists() {
        debug!(dest = %dest.display(), "removing stale extraction directory");
        fs::remove_dir_all(dest)
            .with_context(|| format!("Failed to clear directory: {}", dest.display()))?;
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create extraction directory: {}", dest.display()))?;

    let file = File::open(archive)
        .with_context(|| format!("Failed to open zip file: {}", archive.display()))?;
    let mut zip = ZipArchive::new(file).context("Failed to read zip archive")?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .with_context(|| format!("Failed to access zip entry {}", i))?;

        // Entries like `../x` would escape the scratch directory.
        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "skipping zip entry outside the extraction root");
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .with_context(|| format!("Failed to create directory: {}", outpath.display()))?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut outfile = File::create(&outpath)
            .with_context(|| format!("Failed to create extracted file: {}", outpath.display()))?;
        io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract file: {}", outpath.display()))?;
        written += 1;
    }

    debug!(archive = %archive.display(), files = written, "archive extracted");
    Ok(written)
}

/// Every font file below `root`, recursively, in a stable order.
pub fn font_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut fonts = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && is_font_file(entry.path()) {
            fonts.push(entry.into_path());
        }
    }
    Ok(fonts)
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FONT_EXTENSION))
}
