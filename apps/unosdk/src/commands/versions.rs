//! Versions command for the unosdk CLI.
//!
//! Lists every version a provider offers and marks the ones already
//! installed.
//!
//! ## Usage
//!
//! ```bash
//! unosdk versions java openjdk
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Available versions of java openjdk (Eclipse Temurin):
//!
//!   25.0.0     (latest)
//! * 21.0.1     (installed, active)
//!   17.0.9     (installed)
//! ```

use anyhow::Result;
use clap::Args;

use crate::commands::Session;
use crate::lifecycle::is_active;
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::Os;

/// Arguments for the versions command.
#[derive(Args)]
pub struct VersionsArgs {
    /// Toolchain kind (e.g., "java").
    pub kind: ToolchainKind,

    /// Provider to query (e.g., "openjdk").
    pub provider: String,
}

/// Executes the versions command.
///
/// # Errors
///
/// Returns an error if the provider is unknown or cannot list versions.
pub fn execute(args: &VersionsArgs) -> Result<()> {
    let session = Session::load()?;
    let provider = match session.providers.get(&args.kind, &args.provider) {
        Ok(provider) => provider,
        Err(e) => {
            let known: Vec<&str> = session
                .providers
                .list_by_kind(&args.kind)
                .map(|p| p.name())
                .collect();
            if !known.is_empty() {
                eprintln!("Providers for {}: {}", args.kind, known.join(", "));
            }
            return Err(e.into());
        }
    };

    let versions = provider.list_versions()?;
    let latest = provider.latest_version().ok();
    let os = Os::current();

    println!(
        "Available versions of {} {} ({}):",
        args.kind,
        provider.name(),
        provider.display_name()
    );
    println!();

    for version in &versions {
        let record = session.inventory.get(&args.kind, provider.name(), version);
        let active = record
            .as_ref()
            .is_some_and(|r| is_active(&session.environment, r, os));

        let mut info_parts = Vec::new();
        if latest.as_deref() == Some(version.as_str()) {
            info_parts.push("latest");
        }
        if record.is_some() {
            info_parts.push("installed");
        }
        if active {
            info_parts.push("active");
        }

        let marker = if active { "*" } else { " " };
        if info_parts.is_empty() {
            println!("{marker} {version}");
        } else {
            println!("{marker} {version:<10} ({})", info_parts.join(", "));
        }
    }
    Ok(())
}
