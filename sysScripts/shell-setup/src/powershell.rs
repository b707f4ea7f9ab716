//! Thin helpers for running PowerShell snippets. The Windows-side pieces of
//! the setup (font catalog, font registration, elevation check, module
//! installs) are all one-liners against .NET/COM objects.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};

#[cfg(windows)]
pub const POWERSHELL: &str = "powershell";
#[cfg(not(windows))]
pub const POWERSHELL: &str = "pwsh";

/// Arguments that run `script` non-interactively without loading `$PROFILE`.
pub fn args(script: &str) -> Vec<String> {
    vec![
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-Command".to_string(),
        script.to_string(),
    ]
}

/// Runs `script` and returns its stdout. A non-zero exit is an error carrying stderr.
pub fn output(script: &str) -> Result<String> {
    let output = Command::new(POWERSHELL)
        .args(args(script))
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", POWERSHELL))?;
    if !output.status.success() {
        anyhow::bail!(
            "PowerShell exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Quotes `value` as a single-quoted PowerShell literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
