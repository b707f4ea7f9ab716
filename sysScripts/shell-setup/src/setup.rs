//! The full setup sequence.
//!
//! 1. Precondition gates: elevated process, then network. Either failing
//!    aborts the run before anything is changed.
//! 2. Profile backup/replace, font install, package installs. Each failure
//!    is recorded and the sequence moves on.
//! 3. A final verification of profile, prompt tool and font.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::checks::{ConnectivityChecker, PrivilegeChecker, SystemPrivileges, TcpProbe};
use crate::config::{FontConfig, Package, SetupConfig};
use crate::download::{Downloader, HttpDownloader};
use crate::fonts::{FontInstaller, FontRequest, InstallOutcome, SystemCatalog, SystemRegistrar};
use crate::packages::{PackageInstaller, SystemRunner};
use crate::profile::{ProfileManager, ProfileOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Privileges,
    Connectivity,
    Profile,
    Font,
    Package(String),
    Verify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Privileges => write!(f, "privileges"),
            Step::Connectivity => write!(f, "connectivity"),
            Step::Profile => write!(f, "profile"),
            Step::Font => write!(f, "font"),
            Step::Package(name) => write!(f, "package {}", name),
            Step::Verify => write!(f, "verification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: Step,
    pub status: StepStatus,
}

impl StepResult {
    fn done(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Done(message.into()),
        }
    }

    fn failed(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

#[derive(Debug, Default)]
pub struct SetupReport {
    pub steps: Vec<StepResult>,
    /// A precondition failed and nothing was changed.
    pub aborted: bool,
}

impl SetupReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failure()).count()
    }

    /// 0 = success, 1 = aborted by a precondition, 2 = finished with errors.
    pub fn exit_code(&self) -> u8 {
        if self.aborted {
            1
        } else if self.failures() > 0 {
            2
        } else {
            0
        }
    }
}

/// Builds the font installer against the real OS catalog and font store.
pub fn system_font_installer(
    config: &FontConfig,
    downloader: Arc<dyn Downloader>,
) -> Result<FontInstaller> {
    let installer = FontInstaller::new(
        Arc::new(SystemCatalog),
        downloader,
        Arc::new(SystemRegistrar::new()?),
    );
    Ok(installer.configured(config))
}

pub struct Setup {
    privileges: Arc<dyn PrivilegeChecker>,
    connectivity: Arc<dyn ConnectivityChecker>,
    profile: ProfileManager,
    fonts: FontInstaller,
    packages: PackageInstaller,
    font_request: FontRequest,
    package_list: Vec<Package>,
    verify_winget_name: String,
    skip_checks: bool,
}

impl Setup {
    pub fn new(
        config: &SetupConfig,
        privileges: Arc<dyn PrivilegeChecker>,
        connectivity: Arc<dyn ConnectivityChecker>,
        profile: ProfileManager,
        fonts: FontInstaller,
        packages: PackageInstaller,
    ) -> Self {
        Self {
            privileges,
            connectivity,
            profile,
            fonts,
            packages,
            font_request: FontRequest::from(&config.font),
            package_list: config.packages.clone(),
            verify_winget_name: config.verify.winget_name.clone(),
            skip_checks: false,
        }
    }

    /// Wires every collaborator to its system implementation.
    pub fn from_config(config: &SetupConfig) -> Result<Self> {
        let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::new()?);
        let profile = ProfileManager::from_config(downloader.clone(), &config.profile)?;
        let fonts = system_font_installer(&config.font, downloader)?;
        Ok(Self::new(
            config,
            Arc::new(SystemPrivileges),
            Arc::new(TcpProbe::from(&config.network)),
            profile,
            fonts,
            PackageInstaller::new(Arc::new(SystemRunner)),
        ))
    }

    pub fn skip_checks(mut self, skip: bool) -> Self {
        self.skip_checks = skip;
        self
    }

    /// Runs every step, handing each result to `observer` as soon as it is known.
    pub async fn run(&self, mut observer: impl FnMut(&StepResult)) -> SetupReport {
        let mut report = SetupReport::default();
        let mut record = |result: StepResult| {
            match &result.status {
                StepStatus::Done(msg) => info!(step = %result.step, "{}", msg),
                StepStatus::Failed(msg) => error!(step = %result.step, "{}", msg),
            }
            observer(&result);
            report.steps.push(result);
        };

        if !self.skip_checks {
            if let Some(failure) = self.check_privileges() {
                record(failure);
                report.aborted = true;
                return report;
            }
            if !self.connectivity.is_online().await {
                record(StepResult::failed(
                    Step::Connectivity,
                    "Internet connection is required but not available. Please check your connection.",
                ));
                report.aborted = true;
                return report;
            }
        }

        record(self.apply_profile().await);
        record(self.install_font().await);
        for package in &self.package_list {
            record(self.install_package(package));
        }
        record(self.verify());
        report
    }

    fn check_privileges(&self) -> Option<StepResult> {
        match self.privileges.is_elevated() {
            Ok(true) => None,
            Ok(false) => Some(StepResult::failed(
                Step::Privileges,
                "Please run this script as an Administrator!",
            )),
            Err(e) => Some(StepResult::failed(
                Step::Privileges,
                format!("Could not determine privileges: {:#}", e),
            )),
        }
    }

    async fn apply_profile(&self) -> StepResult {
        let path = self.profile.path().display().to_string();
        match self.profile.apply().await {
            Ok(ProfileOutcome::Created) => StepResult::done(
                Step::Profile,
                format!("The profile @ [{}] has been created.", path),
            ),
            Ok(ProfileOutcome::Replaced { backup }) => StepResult::done(
                Step::Profile,
                format!(
                    "The profile @ [{}] has been replaced, the old one is at [{}].",
                    path,
                    backup.display()
                ),
            ),
            Err(e) => StepResult::failed(
                Step::Profile,
                format!("Failed to create or update the profile: {:#}", e),
            ),
        }
    }

    async fn install_font(&self) -> StepResult {
        let name = &self.font_request.display_name;
        match self.fonts.install(&self.font_request).await {
            Ok(InstallOutcome::AlreadyPresent) => {
                StepResult::done(Step::Font, format!("Font {} already installed", name))
            }
            Ok(InstallOutcome::Installed { registered, skipped }) => StepResult::done(
                Step::Font,
                format!(
                    "Font {} installed ({} new file(s), {} already present)",
                    name, registered, skipped
                ),
            ),
            Err(e) => StepResult::failed(
                Step::Font,
                format!(
                    "Failed to download or install {} font: {:#}",
                    name,
                    anyhow::Error::from(e)
                ),
            ),
        }
    }

    fn install_package(&self, package: &Package) -> StepResult {
        let step = Step::Package(package.display_name().to_string());
        match self.packages.install(package) {
            Ok(()) => StepResult::done(
                step,
                format!("{} installed successfully.", package.display_name()),
            ),
            Err(e) => StepResult::failed(
                step,
                format!("Failed to install {}: {:#}", package.display_name(), e),
            ),
        }
    }

    fn verify(&self) -> StepResult {
        let mut missing = Vec::new();
        if !self.profile.path().is_file() {
            missing.push("profile".to_string());
        }
        if !self.verify_winget_name.is_empty()
            && !self
                .packages
                .winget_has(&self.verify_winget_name)
                .unwrap_or(false)
        {
            missing.push(self.verify_winget_name.clone());
        }
        if !self.fonts.is_installed(&self.font_request.display_name).unwrap_or(false) {
            missing.push(self.font_request.display_name.clone());
        }

        if missing.is_empty() {
            StepResult::done(
                Step::Verify,
                "Setup completed successfully. Please restart your PowerShell session to apply changes.",
            )
        } else {
            StepResult::failed(
                Step::Verify,
                format!(
                    "Setup completed with errors ({} missing). Please check the error messages above.",
                    missing.join(", ")
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::fonts::archive::tests::write_zip;
    use crate::fonts::{FontCatalog, FontRegistrar};
    use crate::packages::tests::RecordingRunner;

    struct Elevated(bool);

    impl PrivilegeChecker for Elevated {
        fn is_elevated(&self) -> Result<bool> {
            Ok(self.0)
        }
    }

    struct Online(bool);

    #[async_trait]
    impl ConnectivityChecker for Online {
        async fn is_online(&self) -> bool {
            self.0
        }
    }

    /// Serves canned bodies by URL suffix and remembers whether it was used.
    struct CannedDownloader {
        bodies: Vec<(&'static str, Vec<u8>)>,
        used: AtomicBool,
    }

    #[async_trait]
    impl Downloader for CannedDownloader {
        async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
            self.used.store(true, Ordering::SeqCst);
            let (_, body) = self
                .bodies
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix))
                .ok_or_else(|| anyhow::anyhow!("404 for {}", url))?;
            fs::write(dest, body)?;
            Ok(body.len() as u64)
        }
    }

    #[derive(Default)]
    struct Families(Mutex<HashSet<String>>);

    impl FontCatalog for Families {
        fn installed_families(&self) -> Result<HashSet<String>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct Registrar {
        dir: PathBuf,
        families: Arc<Families>,
    }

    impl FontRegistrar for Registrar {
        fn font_dir(&self) -> &Path {
            &self.dir
        }

        fn register(&self, font: &Path) -> Result<()> {
            fs::copy(font, self.dir.join(font.file_name().unwrap()))?;
            self.families.0.lock().unwrap().insert("CaskaydiaCove NF".to_string());
            Ok(())
        }
    }

    struct Fixture {
        _root: TempDir,
        profile: PathBuf,
        runner: Arc<RecordingRunner>,
        downloader: Arc<CannedDownloader>,
        setup: Setup,
    }

    fn fixture(elevated: bool, online: bool, font_zip: bool) -> Fixture {
        let root = tempdir().unwrap();
        let temp = root.path().join("tmp");
        let fonts_dir = root.path().join("Fonts");
        fs::create_dir_all(&temp).unwrap();
        fs::create_dir_all(&fonts_dir).unwrap();

        let mut bodies = vec![("Microsoft.PowerShell_profile.ps1", b"# profile\n".to_vec())];
        if font_zip {
            let zip = root.path().join("fixture.zip");
            write_zip(&zip, &[("CaskaydiaCoveNerdFont-Regular.ttf", b"ttf")]);
            bodies.push(("v3.2.1/CascadiaCode.zip", fs::read(&zip).unwrap()));
        }
        let downloader = Arc::new(CannedDownloader {
            bodies,
            used: AtomicBool::new(false),
        });

        let config = SetupConfig::default();
        let profile = root.path().join("PowerShell").join("Microsoft.PowerShell_profile.ps1");
        let families = Arc::new(Families::default());
        let fonts = FontInstaller::new(
            families.clone(),
            downloader.clone(),
            Arc::new(Registrar {
                dir: fonts_dir,
                families,
            }),
        )
        .with_temp_dir(&temp);
        let runner = Arc::new(RecordingRunner::default());

        let setup = Setup::new(
            &config,
            Arc::new(Elevated(elevated)),
            Arc::new(Online(online)),
            ProfileManager::new(downloader.clone(), &config.profile.url, profile.clone()),
            fonts,
            PackageInstaller::new(runner.clone()),
        );
        Fixture {
            _root: root,
            profile,
            runner,
            downloader,
            setup,
        }
    }

    #[tokio::test]
    async fn full_run_succeeds() {
        let f = fixture(true, true, true);
        let mut seen = Vec::new();
        let report = f.setup.run(|r| seen.push(r.step.clone())).await;

        assert_eq!(report.exit_code(), 0, "{:?}", report.steps);
        assert_eq!(
            seen,
            [
                Step::Profile,
                Step::Font,
                Step::Package("Oh My Posh".to_string()),
                Step::Package("Chocolatey".to_string()),
                Step::Package("Terminal Icons".to_string()),
                Step::Package("zoxide".to_string()),
                Step::Verify,
            ]
        );
        assert_eq!(fs::read_to_string(&f.profile).unwrap(), "# profile\n");
        let calls = f.runner.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap().1, ["list", "--name", "OhMyPosh", "-e"]);
    }

    #[tokio::test]
    async fn not_elevated_aborts_before_any_change() {
        let f = fixture(false, true, true);
        let report = f.setup.run(|_| {}).await;

        assert!(report.aborted);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].step, Step::Privileges);
        assert!(!f.downloader.used.load(Ordering::SeqCst));
        assert!(f.runner.calls.lock().unwrap().is_empty());
        assert!(!f.profile.exists());
    }

    #[tokio::test]
    async fn offline_aborts() {
        let f = fixture(true, false, true);
        let report = f.setup.run(|_| {}).await;

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.steps[0].step, Step::Connectivity);
        assert!(!f.downloader.used.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn skip_checks_bypasses_the_gates() {
        let f = fixture(false, false, true);
        let setup = f.setup.skip_checks(true);
        let report = setup.run(|_| {}).await;

        assert!(!report.aborted);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn font_failure_is_not_fatal() {
        let f = fixture(true, true, false);
        let report = f.setup.run(|_| {}).await;

        assert!(!report.aborted);
        assert_eq!(report.exit_code(), 2);
        let font = report.steps.iter().find(|s| s.step == Step::Font).unwrap();
        match &font.status {
            StepStatus::Failed(msg) => {
                assert!(msg.starts_with("Failed to download or install CaskaydiaCove NF font"))
            }
            other => panic!("unexpected status: {other:?}"),
        }
        // Packages still ran; verification reports the missing font.
        assert_eq!(f.runner.calls.lock().unwrap().len(), 5);
        let verify = report.steps.last().unwrap();
        assert_eq!(verify.step, Step::Verify);
        assert!(verify.is_failure());
    }

    #[tokio::test]
    async fn package_failure_is_recorded_and_run_continues() {
        let f = fixture(true, true, true);
        f.runner.answer("Terminal-Icons", Some(1));
        let report = f.setup.run(|_| {}).await;

        assert_eq!(report.failures(), 1);
        assert_eq!(report.exit_code(), 2);
        let failed = report.steps.iter().find(|s| s.is_failure()).unwrap();
        assert_eq!(failed.step, Step::Package("Terminal Icons".to_string()));
        assert!(report.steps.iter().any(|s| s.step == Step::Package("zoxide".to_string())));
    }

    #[test]
    fn exit_codes() {
        let ok = SetupReport::default();
        assert_eq!(ok.exit_code(), 0);

        let errors = SetupReport {
            steps: vec![StepResult::failed(Step::Font, "boom")],
            aborted: false,
        };
        assert_eq!(errors.exit_code(), 2);

        let aborted = SetupReport {
            steps: vec![StepResult::failed(Step::Privileges, "no")],
            aborted: true,
        };
        assert_eq!(aborted.exit_code(), 1);
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::Package("zoxide".to_string()).to_string(), "package zoxide");
        assert_eq!(Step::Verify.to_string(), "verification");
    }
}
