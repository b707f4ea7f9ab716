//! Nerd Font installation.
//!
//! `FontInstaller` checks the OS font catalog for a family, and only when it
//! is missing downloads the release archive, extracts it to a scratch
//! directory, registers every `.ttf` inside, and removes the scratch files.
//! The catalog, the downloader and the registrar are injected so the
//! workflow can run against fakes.

pub mod archive;
pub mod catalog;
mod error;
mod installer;
pub mod registrar;

pub use catalog::{FontCatalog, SystemCatalog};
pub use error::{InstallError, InstallErrorKind};
pub use installer::{FontInstaller, InstallOutcome};
pub use registrar::{FontRegistrar, SystemRegistrar};

use crate::config::FontConfig;

/// One font to ensure is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRequest {
    pub font_name: String,
    pub display_name: String,
    pub version: String,
}

impl FontRequest {
    pub fn new(font_name: &str, display_name: &str, version: &str) -> Self {
        Self {
            font_name: font_name.to_string(),
            display_name: display_name.to_string(),
            version: version.to_string(),
        }
    }

    /// `{base}/v{version}/{font_name}.zip`, the upstream release asset naming.
    pub fn download_url(&self, release_base: &str) -> String {
        format!(
            "{}/v{}/{}.zip",
            release_base.trim_end_matches('/'),
            self.version,
            self.font_name
        )
    }
}

impl From<&FontConfig> for FontRequest {
    fn from(config: &FontConfig) -> Self {
        Self::new(&config.name, &config.display_name, &config.version)
    }
}
