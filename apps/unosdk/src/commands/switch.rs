//! Switch command for the unosdk CLI.
//!
//! Makes an installed toolchain the active one of its kind: other installs
//! of the kind are taken off PATH, this one goes first, and the kind's home
//! variable is pointed at it.
//!
//! ## Usage
//!
//! ```bash
//! unosdk switch java openjdk 21.0.1
//! ```

use anyhow::Result;
use clap::Args;

use crate::commands::{Session, print_environment_report};
use crate::toolchain::kind::ToolchainKind;

/// Arguments for the switch command.
#[derive(Args)]
pub struct SwitchArgs {
    /// Toolchain kind (e.g., "java").
    pub kind: ToolchainKind,

    /// Provider of the installed toolchain.
    pub provider: String,

    /// Installed version to activate.
    pub version: String,
}

/// Executes the switch command.
///
/// # Errors
///
/// Returns an error if the toolchain is not installed.
pub fn execute(args: &SwitchArgs) -> Result<()> {
    let mut session = Session::load()?;
    let outcome = session
        .orchestrator(None)
        .switch(&args.kind, &args.provider, &args.version)?;

    println!("Switched to {}.", outcome.record.label());
    print_environment_report(&outcome.environment);
    Ok(())
}
