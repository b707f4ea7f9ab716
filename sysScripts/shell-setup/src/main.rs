use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

use shell_setup::config::{self, SetupConfig};
use shell_setup::download::HttpDownloader;
use shell_setup::fonts::{FontRequest, InstallOutcome};
use shell_setup::logging;
use shell_setup::setup::{self, Setup, StepResult, StepStatus};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Sets up a PowerShell environment: profile, Nerd Font, prompt tooling"
)]
struct Cli {
    /// Config file (default: <config dir>/shell-setup/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every setup step (the default)
    Setup {
        /// Skip the administrator and connectivity checks
        #[arg(long)]
        skip_checks: bool,
    },
    /// Install only the Nerd Font
    Font {
        /// Release artifact name, e.g. CascadiaCode
        #[arg(long)]
        name: Option<String>,
        /// Family name as the OS reports it, e.g. "CaskaydiaCove NF"
        #[arg(long)]
        display_name: Option<String>,
        /// Release version without the leading 'v'
        #[arg(long = "release")]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut config = config::load_config(&config_path)?;

    let code = match cli.command.unwrap_or(Commands::Setup { skip_checks: false }) {
        Commands::Setup { skip_checks } => run_setup(&config, skip_checks).await?,
        Commands::Font { name, display_name, version } => {
            if let Some(name) = name {
                config.font.name = name;
            }
            if let Some(display_name) = display_name {
                config.font.display_name = display_name;
            }
            if let Some(version) = version {
                config.font.version = version;
            }
            run_font(&config).await?
        }
    };
    Ok(ExitCode::from(code))
}

async fn run_setup(config: &SetupConfig, skip_checks: bool) -> Result<u8> {
    println!("{}", "🚀 Starting PowerShell environment setup...".green().bold());
    let setup = Setup::from_config(config)?.skip_checks(skip_checks);
    let report = setup.run(print_step).await;

    match report.exit_code() {
        0 => println!(
            "\n{}",
            "✅ Setup complete! Restart your PowerShell session.".green().bold()
        ),
        1 => eprintln!("\n{}", "❌ Setup aborted, nothing was changed.".red().bold()),
        _ => eprintln!(
            "\n{}",
            format!("⚠️  Setup finished with {} error(s).", report.failures()).yellow().bold()
        ),
    }
    Ok(report.exit_code())
}

fn print_step(result: &StepResult) {
    match &result.status {
        StepStatus::Done(msg) => println!("   ✅ [{}] {}", result.step, msg),
        StepStatus::Failed(msg) => eprintln!("   {} [{}] {}", "❌".red(), result.step, msg.red()),
    }
}

async fn run_font(config: &SetupConfig) -> Result<u8> {
    let request = FontRequest::from(&config.font);
    println!("{}", format!("🔤 Installing {}...", request.display_name).blue().bold());

    let installer = setup::system_font_installer(&config.font, Arc::new(HttpDownloader::new()?))?;
    match installer.install(&request).await {
        Ok(InstallOutcome::AlreadyPresent) => {
            println!("{}", format!("✅ Font {} already installed", request.display_name).green());
            Ok(0)
        }
        Ok(InstallOutcome::Installed { registered, skipped }) => {
            println!(
                "{}",
                format!(
                    "✅ Font {} installed ({} new file(s), {} already present)",
                    request.display_name, registered, skipped
                )
                .green()
            );
            Ok(0)
        }
        Err(e) => {
            eprintln!(
                "{}",
                format!(
                    "❌ Failed to download or install {} font: {:#}",
                    request.display_name,
                    anyhow::Error::from(e)
                )
                .red()
            );
            Ok(1)
        }
    }
}
