use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::{Package, PackageManager};
use crate::powershell;

/// winget's APPINSTALLER_CLI_ERROR_UPDATE_NOT_APPLICABLE: the package is
/// already installed and up to date.
pub const WINGET_ALREADY_INSTALLED: i32 = 0x8A15_002B_u32 as i32;

const CHOCOLATEY_BOOTSTRAP: &str = "Set-ExecutionPolicy Bypass -Scope Process -Force; \
    [System.Net.ServicePointManager]::SecurityProtocol = [System.Net.ServicePointManager]::SecurityProtocol -bor 3072; \
    iex ((New-Object System.Net.WebClient).DownloadString('https://community.chocolatey.org/install.ps1'))";

/// Runs an external program and reports its exit code (`None` when it was
/// killed by a signal).
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<Option<i32>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<Option<i32>> {
        debug!(program, ?args, "running");
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run '{}', is it installed?", program))?;
        Ok(status.code())
    }
}

/// A fully resolved package-manager command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub success_codes: Vec<i32>,
}

impl Invocation {
    fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            success_codes: vec![0],
        }
    }
}

pub fn invocation(package: &Package) -> Invocation {
    match package.manager {
        PackageManager::Winget => {
            let mut inv = Invocation::new(
                "winget",
                [
                    "install",
                    "-e",
                    "--accept-source-agreements",
                    "--accept-package-agreements",
                    "--id",
                    package.id.as_str(),
                ]
                .map(str::to_string)
                .to_vec(),
            );
            inv.success_codes.push(WINGET_ALREADY_INSTALLED);
            inv
        }
        PackageManager::Psgallery => Invocation::new(
            powershell::POWERSHELL,
            powershell::args(&format!(
                "Install-Module -Name {} -Repository PSGallery -Force",
                powershell::quote(&package.id)
            )),
        ),
        PackageManager::Chocolatey => {
            Invocation::new(powershell::POWERSHELL, powershell::args(CHOCOLATEY_BOOTSTRAP))
        }
    }
}

pub struct PackageInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl PackageInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn install(&self, package: &Package) -> Result<()> {
        let inv = invocation(package);
        let code = self.runner.run(&inv.program, &inv.args)?;
        match code {
            Some(code) if inv.success_codes.contains(&code) => Ok(()),
            Some(code) => anyhow::bail!("{} exited with code {}", inv.program, code),
            None => anyhow::bail!("{} was terminated", inv.program),
        }
    }

    /// `winget list --name <name> -e` succeeds only when the package is present.
    pub fn winget_has(&self, name: &str) -> Result<bool> {
        let args = ["list", "--name", name, "-e"].map(str::to_string);
        Ok(self.runner.run("winget", &args)? == Some(0))
    }
}
