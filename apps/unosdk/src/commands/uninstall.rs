//! Uninstall command for the unosdk CLI.
//!
//! Removes an installed toolchain from disk and from the inventory. When the
//! removed install was the active one, the newest remaining install of the
//! same kind takes its place.
//!
//! ## Usage
//!
//! ```bash
//! unosdk uninstall java openjdk 17.0.9
//! unosdk uninstall node nodejs 20.10.0 --cleanup-env
//! ```

use anyhow::Result;
use clap::Args;

use crate::commands::{Session, print_environment_report};
use crate::toolchain::kind::ToolchainKind;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Toolchain kind (e.g., "java").
    pub kind: ToolchainKind,

    /// Provider of the installed toolchain.
    pub provider: String,

    /// Installed version to remove.
    pub version: String,

    /// Clean PATH entries and home variables in every writable scope even
    /// when the install looks inactive.
    #[arg(long)]
    pub cleanup_env: bool,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if the toolchain is not installed, its directory cannot
/// be deleted, or the inventory cannot be saved.
pub fn execute(args: &UninstallArgs) -> Result<()> {
    let mut session = Session::load()?;
    let outcome = session.orchestrator(None).uninstall(
        &args.kind,
        &args.provider,
        &args.version,
        args.cleanup_env,
    )?;

    println!("Uninstalled {}.", outcome.removed.label());
    if outcome.was_active {
        println!("It was the active {}.", outcome.removed.kind);
    }
    if let Some(next) = &outcome.promoted {
        println!("{} is now the active {}.", next.label(), next.kind);
    }
    if let Some(report) = &outcome.environment {
        print_environment_report(report);
    }
    Ok(())
}
