use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{PowerShellEdition, ProfileConfig};
use crate::download::Downloader;

pub const PROFILE_FILE_NAME: &str = "Microsoft.PowerShell_profile.ps1";
/// Name of the backup kept next to the profile it replaced.
pub const BACKUP_FILE_NAME: &str = "oldprofile.ps1";

/// `$PROFILE` for the given edition under `documents`.
pub fn profile_path(edition: PowerShellEdition, documents: &Path) -> PathBuf {
    let dir = match edition {
        PowerShellEdition::Core => "PowerShell",
        PowerShellEdition::Desktop => "WindowsPowerShell",
    };
    documents.join(dir).join(PROFILE_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Created,
    Replaced { backup: PathBuf },
}

pub struct ProfileManager {
    downloader: Arc<dyn Downloader>,
    url: String,
    path: PathBuf,
}

impl ProfileManager {
    pub fn new(downloader: Arc<dyn Downloader>, url: &str, path: PathBuf) -> Self {
        Self {
            downloader,
            url: url.to_string(),
            path,
        }
    }

    /// Resolves `$PROFILE` from the config, falling back to the Documents folder.
    pub fn from_config(downloader: Arc<dyn Downloader>, config: &ProfileConfig) -> Result<Self> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => {
                let documents = dirs::document_dir().context("Could not find Documents directory")?;
                profile_path(config.edition, &documents)
            }
        };
        Ok(Self::new(downloader, &config.url, path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_file_name(BACKUP_FILE_NAME)
    }

    /// Where the replacement is written until it is complete.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".download");
        self.path.with_file_name(name)
    }

    /// Downloads the replacement next to `$PROFILE`, then moves an existing
    /// profile to the backup and the download into place. A failed download
    /// leaves `$PROFILE` untouched.
    pub async fn apply(&self) -> Result<ProfileOutcome> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create profile directory: {}", dir.display()))?;
        }

        let staging = self.staging_path();
        if let Err(e) = self.fetch(&staging).await {
            discard(&staging);
            return Err(e);
        }

        let outcome = if self.path.is_file() {
            let backup = self.backup_path();
            if let Err(e) = fs::rename(&self.path, &backup) {
                discard(&staging);
                return Err(e).with_context(|| format!("Failed to back up {}", self.path.display()));
            }
            info!(backup = %backup.display(), "existing profile backed up");
            ProfileOutcome::Replaced { backup }
        } else {
            ProfileOutcome::Created
        };

        if let Err(e) = fs::rename(&staging, &self.path) {
            if let ProfileOutcome::Replaced { backup } = &outcome {
                if let Err(restore) = fs::rename(backup, &self.path) {
                    warn!(error = %restore, "could not restore the previous profile");
                }
            }
            discard(&staging);
            return Err(e).with_context(|| format!("Failed to install {}", self.path.display()));
        }
        Ok(outcome)
    }

    async fn fetch(&self, dest: &Path) -> Result<()> {
        self.downloader
            .download(&self.url, dest)
            .await
            .with_context(|| format!("Failed to fetch profile from {}", self.url))?;
        Ok(())
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial download"),
    }
}
