use std::collections::HashSet;

use anyhow::Result;

/// Source of the family names the OS already knows about.
pub trait FontCatalog: Send + Sync {
    fn installed_families(&self) -> Result<HashSet<String>>;
}

/// The host font catalog: `InstalledFontCollection` on Windows, fontconfig elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCatalog;

#[cfg(windows)]
impl FontCatalog for SystemCatalog {
    fn installed_families(&self) -> Result<HashSet<String>> {
        const SCRIPT: &str = "[void][System.Reflection.Assembly]::LoadWithPartialName('System.Drawing'); \
            (New-Object System.Drawing.Text.InstalledFontCollection).Families | ForEach-Object { $_.Name }";
        let stdout = crate::powershell::output(SCRIPT)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(not(windows))]
impl FontCatalog for SystemCatalog {
    fn installed_families(&self) -> Result<HashSet<String>> {
        use anyhow::Context;
        use std::process::Command;

        let output = Command::new("fc-list")
            .args([":", "family"])
            .output()
            .context("Failed to run 'fc-list', is fontconfig installed?")?;
        if !output.status.success() {
            anyhow::bail!("'fc-list' failed: {}", String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(parse_fc_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses `fc-list : family`. One line per face; a line lists every
/// localized family name of that face, comma separated, with `-` escaped.
pub fn parse_fc_list(stdout: &str) -> HashSet<String> {
    stdout
        .lines()
        .flat_map(|line| line.split(','))
        .map(|name| name.trim().replace("\\-", "-"))
        .filter(|name| !name.is_empty())
        .collect()
}
