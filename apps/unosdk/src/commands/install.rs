//! Install command for the unosdk CLI.
//!
//! Downloads a toolchain from its provider, unpacks it under the sdks
//! directory, records it in the inventory and makes it the active install
//! of its kind.
//!
//! ## Usage
//!
//! ```bash
//! unosdk install java openjdk 17.0.9          # Install and activate
//! unosdk install node nodejs latest           # Newest catalog version
//! unosdk install go golang 1.22.0 --arch arm64
//! unosdk install java graalvm 21.0.2 --skip-env
//! ```
//!
//! Pressing Ctrl-C during the download aborts it and leaves nothing behind.

use anyhow::Result;
use clap::Args;
use tokio::sync::watch;

use crate::commands::{Session, print_environment_report};
use crate::lifecycle::InstallOptions;
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::Arch;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Toolchain kind (e.g., "java", "node", "python").
    pub kind: ToolchainKind,

    /// Provider of the kind (e.g., "openjdk", "nodejs").
    pub provider: String,

    /// Version to install, or "latest".
    pub version: String,

    /// Target architecture (x64, x86, arm64). Defaults to the host or
    /// `default_arch` from config.toml.
    #[arg(long)]
    pub arch: Option<Arch>,

    /// Do not touch PATH or home variables.
    #[arg(long)]
    pub skip_env: bool,

    /// Leave the kind's home variable (e.g. `JAVA_HOME`) unchanged.
    #[arg(long)]
    pub no_home: bool,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the provider or version is unknown, the download or
/// extraction fails, the user cancels, or the inventory cannot be saved.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let mut session = Session::load()?;
    session.paths.ensure_directories()?;
    let arch = match args.arch {
        Some(arch) => arch,
        None => session.settings.arch()?,
    };
    let options = InstallOptions {
        arch,
        skip_env: args.skip_env,
        set_home: !args.no_home,
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    println!(
        "Installing {} {} {} ({arch})...",
        args.kind, args.provider, args.version
    );
    let result = session
        .orchestrator(Some(cancel_rx))
        .install(&args.kind, &args.provider, &args.version, &options)
        .await;
    interrupt.abort();
    let outcome = result?;

    let record = &outcome.record;
    if outcome.already_installed {
        println!("{} is already installed.", record.label());
    } else {
        println!("Installed {}.", record.label());
    }
    println!("  Location: {}", record.install_path.display());
    if let Some(checksum) = &record.checksum {
        println!("  SHA-256:  {checksum}");
    }

    match &outcome.environment {
        Some(report) => {
            println!();
            println!("Environment:");
            print_environment_report(report);
        }
        None => {
            println!();
            println!(
                "Environment unchanged. Run 'unosdk switch {} {} {}' to activate it.",
                record.kind, record.provider, record.version
            );
        }
    }

    Ok(())
}
