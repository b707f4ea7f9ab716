use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::archive;
use super::{FontCatalog, FontRegistrar, FontRequest, InstallError};
use crate::config::{FontConfig, NERD_FONTS_RELEASES};
use crate::download::Downloader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The family was already in the catalog; nothing was touched.
    AlreadyPresent,
    /// `registered` files went through the registrar, `skipped` were already
    /// in the system font directory.
    Installed { registered: usize, skipped: usize },
}

pub struct FontInstaller {
    catalog: Arc<dyn FontCatalog>,
    downloader: Arc<dyn Downloader>,
    registrar: Arc<dyn FontRegistrar>,
    release_base: String,
    temp_dir: PathBuf,
}

impl FontInstaller {
    pub fn new(
        catalog: Arc<dyn FontCatalog>,
        downloader: Arc<dyn Downloader>,
        registrar: Arc<dyn FontRegistrar>,
    ) -> Self {
        Self {
            catalog,
            downloader,
            registrar,
            release_base: NERD_FONTS_RELEASES.to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Applies `release_base` and `temp_dir` from the config.
    pub fn configured(mut self, config: &FontConfig) -> Self {
        self.release_base = config.release_base.clone();
        if let Some(dir) = &config.temp_dir {
            self.temp_dir = dir.clone();
        }
        self
    }

    pub fn with_release_base(mut self, release_base: &str) -> Self {
        self.release_base = release_base.to_string();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: &Path) -> Self {
        self.temp_dir = temp_dir.to_path_buf();
        self
    }

    /// `<temp>/<font_name>.zip`
    pub fn archive_path(&self, request: &FontRequest) -> PathBuf {
        self.temp_dir.join(format!("{}.zip", request.font_name))
    }

    /// `<temp>/<font_name>/`
    pub fn extract_dir(&self, request: &FontRequest) -> PathBuf {
        self.temp_dir.join(&request.font_name)
    }

    /// Exact, case-sensitive lookup of a family name in the catalog.
    pub fn is_installed(&self, display_name: &str) -> Result<bool, InstallError> {
        let families = self
            .catalog
            .installed_families()
            .map_err(|e| InstallError::Query(e.into()))?;
        Ok(families.contains(display_name))
    }

    #[instrument(skip_all, fields(font = %request.font_name, version = %request.version))]
    pub async fn install(&self, request: &FontRequest) -> Result<InstallOutcome, InstallError> {
        if self.is_installed(&request.display_name)? {
            info!(display_name = %request.display_name, "font already installed");
            return Ok(InstallOutcome::AlreadyPresent);
        }

        let url = request.download_url(&self.release_base);
        let scratch = Scratch::new(self.archive_path(request), self.extract_dir(request));

        info!(%url, "downloading font archive");
        self.downloader
            .download(&url, &scratch.archive)
            .await
            .map_err(|e| InstallError::Network {
                url: url.clone(),
                source: e.into(),
            })?;

        let extraction_error = |e: anyhow::Error| InstallError::Extraction {
            archive: scratch.archive.clone(),
            source: e.into(),
        };
        archive::extract(&scratch.archive, &scratch.dir)
            .await
            .map_err(extraction_error)?;
        let fonts = archive::font_files(&scratch.dir).map_err(extraction_error)?;
        if fonts.is_empty() {
            return Err(extraction_error(anyhow::anyhow!(
                "archive contains no .{} files",
                archive::FONT_EXTENSION
            )));
        }

        let font_dir = self.registrar.font_dir();
        let mut registered = 0;
        let mut skipped = 0;
        for font in &fonts {
            let Some(file_name) = font.file_name() else {
                continue;
            };
            if font_dir.join(file_name).exists() {
                debug!(font = %font.display(), "already in the font directory, skipping");
                skipped += 1;
                continue;
            }
            self.registrar
                .register(font)
                .map_err(|e| InstallError::Registration {
                    font: font.clone(),
                    registered,
                    source: e.into(),
                })?;
            registered += 1;
        }
        if registered > 0 {
            self.registrar
                .refresh()
                .map_err(|e| InstallError::Registration {
                    font: font_dir.to_path_buf(),
                    registered,
                    source: e.into(),
                })?;
        }

        scratch.remove()?;
        info!(registered, skipped, "font installed");
        Ok(InstallOutcome::Installed {
            registered,
            skipped,
        })
    }
}

/// The download archive and extraction directory of one install. Dropping
/// it without `remove` (any error path) deletes both, best effort.
struct Scratch {
    archive: PathBuf,
    dir: PathBuf,
    armed: bool,
}

impl Scratch {
    fn new(archive: PathBuf, dir: PathBuf) -> Self {
        Self {
            archive,
            dir,
            armed: true,
        }
    }

    fn remove(mut self) -> Result<(), InstallError> {
        self.armed = false;
        remove_if_present(&self.dir, |p| fs::remove_dir_all(p))?;
        remove_if_present(&self.archive, |p| fs::remove_file(p))?;
        Ok(())
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_dir_all(&self.dir);
            let _ = fs::remove_file(&self.archive);
        }
    }
}

fn remove_if_present(
    path: &Path,
    remove: fn(&Path) -> io::Result<()>,
) -> Result<(), InstallError> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InstallError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
