use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Installs font files into the OS font store.
pub trait FontRegistrar: Send + Sync {
    /// Directory whose file names show what is already installed.
    fn font_dir(&self) -> &Path;

    /// Registers one font file with the OS.
    fn register(&self, font: &Path) -> Result<()>;

    /// Called once after a batch of registrations.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

pub struct SystemRegistrar {
    font_dir: PathBuf,
}

impl SystemRegistrar {
    pub fn new() -> Result<Self> {
        Ok(Self {
            font_dir: system_font_dir()?,
        })
    }
}

#[cfg(windows)]
fn system_font_dir() -> Result<PathBuf> {
    let windir = std::env::var_os("WINDIR").context("WINDIR is not set")?;
    Ok(PathBuf::from(windir).join("Fonts"))
}

#[cfg(not(windows))]
fn system_font_dir() -> Result<PathBuf> {
    dirs::font_dir().context("Could not determine the user font directory")
}

#[cfg(windows)]
impl FontRegistrar for SystemRegistrar {
    fn font_dir(&self) -> &Path {
        &self.font_dir
    }

    /// Copies through the shell's Fonts folder (namespace 0x14), which
    /// registers the face and notifies running applications. 0x10 answers
    /// "yes to all" to any overwrite prompt.
    fn register(&self, font: &Path) -> Result<()> {
        let script = format!(
            "(New-Object -ComObject Shell.Application).Namespace(0x14).CopyHere({}, 0x10)",
            crate::powershell::quote(&font.to_string_lossy())
        );
        crate::powershell::output(&script)
            .with_context(|| format!("Shell.Application refused {}", font.display()))?;
        Ok(())
    }
}

#[cfg(not(windows))]
impl FontRegistrar for SystemRegistrar {
    fn font_dir(&self) -> &Path {
        &self.font_dir
    }

    fn register(&self, font: &Path) -> Result<()> {
        let file_name = font
            .file_name()
            .with_context(|| format!("Not a file: {}", font.display()))?;
        std::fs::create_dir_all(&self.font_dir)
            .with_context(|| format!("Failed to create {}", self.font_dir.display()))?;
        std::fs::copy(font, self.font_dir.join(file_name))
            .with_context(|| format!("Failed to copy {}", font.display()))?;
        Ok(())
    }

    /// fontconfig only sees new files after a cache rebuild.
    fn refresh(&self) -> Result<()> {
        let status = std::process::Command::new("fc-cache")
            .arg("-f")
            .arg(&self.font_dir)
            .status()
            .context("Failed to run 'fc-cache', is fontconfig installed?")?;
        anyhow::ensure!(status.success(), "'fc-cache' exited with {}", status);
        Ok(())
    }
}
