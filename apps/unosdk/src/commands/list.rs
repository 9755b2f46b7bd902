//! List command for the unosdk CLI.
//!
//! Shows installed toolchains (the default) or the providers unosdk can
//! install from.
//!
//! ## Usage
//!
//! ```bash
//! unosdk list              # Installed toolchains
//! unosdk list --available  # Registered providers
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Installed toolchains:
//!
//!   KIND     PROVIDER         VERSION     LOCATION
//! * java     openjdk          17.0.9      /home/u/.unosdk/sdks/java/openjdk/17.0.9/jdk-17.0.9+9
//!   java     openjdk          21.0.1      /home/u/.unosdk/sdks/java/openjdk/21.0.1/jdk-21.0.1+12
//! ```

use anyhow::Result;
use clap::Args;

use crate::commands::Session;
use crate::lifecycle::is_active;
use crate::toolchain::platform::Os;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Show installed toolchains.
    #[arg(short, long)]
    pub installed: bool,

    /// Show registered providers and their latest versions.
    #[arg(short, long)]
    pub available: bool,
}

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the configuration or inventory cannot be loaded.
pub fn execute(args: &ListArgs) -> Result<()> {
    let session = Session::load()?;
    let show_installed = args.installed || !args.available;

    if show_installed {
        print_installed(&session);
    }
    if args.available {
        if show_installed {
            println!();
        }
        print_available(&session);
    }
    Ok(())
}

fn print_installed(session: &Session) {
    let records = session.inventory.list();
    if records.is_empty() {
        println!("No toolchains installed.");
        println!();
        println!("Run 'unosdk list --available' to see what can be installed.");
        return;
    }

    println!("Installed toolchains:");
    println!();
    println!(
        "  {:<8} {:<16} {:<11} LOCATION",
        "KIND", "PROVIDER", "VERSION"
    );
    let os = Os::current();
    for record in &records {
        let marker = if is_active(&session.environment, record, os) {
            "*"
        } else {
            " "
        };
        let location = if record.install_path.is_dir() {
            record.install_path.display().to_string()
        } else {
            format!("{} (missing)", record.install_path.display())
        };
        println!(
            "{marker} {:<8} {:<16} {:<11} {location}",
            record.kind.as_str(),
            record.provider,
            record.version
        );
    }
}

fn print_available(session: &Session) {
    println!("Available providers:");
    println!();
    println!(
        "  {:<8} {:<16} {:<11} DESCRIPTION",
        "KIND", "PROVIDER", "LATEST"
    );
    for provider in session.providers.list_all() {
        let latest = provider.latest_version().unwrap_or_else(|e| {
            tracing::debug!(provider = provider.name(), error = %e, "no latest version");
            "-".to_string()
        });
        println!(
            "  {:<8} {:<16} {:<11} {}",
            provider.kind().as_str(),
            provider.name(),
            latest,
            provider.display_name()
        );
    }
    println!();
    println!("Run 'unosdk versions <kind> <provider>' to see every version.");
}
