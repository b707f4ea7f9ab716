use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Release download root of the Nerd Fonts project.
pub const NERD_FONTS_RELEASES: &str = "https://github.com/ryanoasis/nerd-fonts/releases/download";
/// The profile that replaces the user's `$PROFILE`.
pub const PROFILE_URL: &str =
    "https://github.com/ChrisTitusTech/powershell-profile/raw/main/Microsoft.PowerShell_profile.ps1";

// --- Config Models ---

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FontConfig {
    pub name: String,         // Release artifact name, e.g. "CascadiaCode"
    pub display_name: String, // Family name as the OS reports it
    pub version: String,      // Release tag without the leading 'v'
    pub release_base: String,
    pub temp_dir: Option<PathBuf>, // Defaults to the OS temp dir
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            name: "CascadiaCode".to_string(),
            display_name: "CaskaydiaCove NF".to_string(),
            version: "3.2.1".to_string(),
            release_base: NERD_FONTS_RELEASES.to_string(),
            temp_dir: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PowerShellEdition {
    #[default]
    Core,
    Desktop,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProfileConfig {
    pub url: String,
    pub edition: PowerShellEdition,
    pub path: Option<PathBuf>, // Overrides the $PROFILE location
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            url: PROFILE_URL.to_string(),
            edition: PowerShellEdition::default(),
            path: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub probe_host: String,
    pub probe_port: u16,
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_host: "www.google.com".to_string(),
            probe_port: 443,
            timeout_secs: 5,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Winget,
    Psgallery,
    Chocolatey,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub manager: PackageManager,
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl Package {
    pub fn new(manager: PackageManager, id: &str, label: &str) -> Self {
        Self {
            manager,
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    /// Name used in console output.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() { &self.id } else { &self.label }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct VerifyConfig {
    /// Package looked up with `winget list --name <..> -e`. Empty skips the lookup.
    pub winget_name: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            winget_name: "OhMyPosh".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SetupConfig {
    pub font: FontConfig,
    pub profile: ProfileConfig,
    pub network: NetworkConfig,
    pub verify: VerifyConfig,
    pub packages: Vec<Package>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            font: FontConfig::default(),
            profile: ProfileConfig::default(),
            network: NetworkConfig::default(),
            verify: VerifyConfig::default(),
            packages: default_packages(),
        }
    }
}

fn default_packages() -> Vec<Package> {
    vec![
        Package::new(PackageManager::Winget, "JanDeDobbeleer.OhMyPosh", "Oh My Posh"),
        Package::new(PackageManager::Chocolatey, "chocolatey", "Chocolatey"),
        Package::new(PackageManager::Psgallery, "Terminal-Icons", "Terminal Icons"),
        Package::new(PackageManager::Winget, "ajeetdsouza.zoxide", "zoxide"),
    ]
}

// --- Config Loader ---

pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not find config directory")?;
    Ok(config_dir.join("shell-setup/config.toml"))
}

/// Reads the TOML config. A missing file means "all defaults".
pub fn load_config(path: &Path) -> Result<SetupConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(SetupConfig::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<SetupConfig> {
    toml::from_str(config_str).context("Failed to parse config.toml. Check for syntax errors.")
}
