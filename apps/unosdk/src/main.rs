#![warn(clippy::pedantic)]

//! # unosdk
//!
//! The `unosdk` command installs several versions of developer toolchains
//! (JDKs, Node.js, Python, Go, Maven, Gradle, Flutter, MinGW) side by side
//! and keeps exactly one of each kind active on PATH.
//!
//! ## Subcommands
//!
//! - `install` - Download, unpack and activate a toolchain
//! - `switch` - Make an installed toolchain the active one
//! - `uninstall` - Remove an installed toolchain
//! - `list` - List installed toolchains or available providers
//! - `versions` - List the versions a provider offers
//! - `doctor` - Check inventory, disk and environment consistency
//!
//! ## Examples
//!
//! Install and activate a JDK:
//! ```bash
//! unosdk install java openjdk 17.0.9
//! ```
//!
//! Switch to another installed JDK:
//! ```bash
//! unosdk switch java openjdk 21.0.1
//! ```
//!
//! Show what is installed:
//! ```bash
//! unosdk list
//! ```

mod commands;
mod config;
mod environment;
mod errors;
mod inventory;
mod lifecycle;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{doctor, install, list, switch, uninstall, versions};
use errors::SdkError;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "UNOSDK_LOG";

/// Exit code for a run interrupted with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// Multi-SDK version manager.
#[derive(Parser)]
#[command(
    name = "unosdk",
    author,
    version,
    about = "Install, switch and remove developer toolchains",
    long_about = "The 'unosdk' command installs several versions of developer toolchains \
    side by side and keeps one of each kind active on PATH.",
    after_help = "\
ENVIRONMENT VARIABLES:
    UNOSDK_HOME             Root directory (default: ~/.unosdk)
    UNOSDK_MACHINE_DIR      Machine-scope environment directory on Unix (default: /etc/unosdk)
    UNOSDK_LOG              Log filter, e.g. 'debug' or 'unosdk=info' (default: warn)"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the unosdk CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install a toolchain.
    ///
    /// Downloads the archive from the provider, unpacks it under the sdks
    /// directory, records it, and makes it the active install of its kind
    /// unless --skip-env is given.
    Install(install::InstallArgs),

    /// Switch the active toolchain of a kind.
    ///
    /// Puts an installed toolchain first on PATH, removes other installs of
    /// the same kind from PATH and updates the kind's home variable.
    Switch(switch::SwitchArgs),

    /// Uninstall a toolchain.
    ///
    /// Deletes the install directory and forgets the record. If it was the
    /// active install, another install of the same kind takes its place.
    Uninstall(uninstall::UninstallArgs),

    /// List installed toolchains or available providers.
    List(list::ListArgs),

    /// List the versions a provider offers.
    Versions(versions::VersionsArgs),

    /// Check installation health.
    ///
    /// Verifies that the inventory, the install directories and the
    /// environment agree, and suggests a fix for each problem found.
    Doctor,
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Diagnostics go to stderr, filtered by `UNOSDK_LOG`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Handles an error and returns the appropriate exit code.
///
/// An interrupted download exits with 130 after a short notice. All other
/// errors are printed and exit with 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(SdkError::Cancelled) = e.downcast_ref::<SdkError>() {
        eprintln!("Cancelled.");
        return EXIT_INTERRUPTED;
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::Switch(args) => switch::execute(&args),
        Commands::Uninstall(args) => uninstall::execute(&args),
        Commands::List(args) => list::execute(&args),
        Commands::Versions(args) => versions::execute(&args),
        Commands::Doctor => doctor::execute(),
    }
}
