//! Doctor command for the unosdk CLI.
//!
//! Cross-checks the inventory, the install directories and the environment
//! and reports drift between them with the command that fixes it.
//!
//! ## Usage
//!
//! ```bash
//! unosdk doctor
//! ```
//!
//! ## Checks Performed
//!
//! - Inventory records whose install directory is gone
//! - More than one managed PATH entry for a toolchain kind
//! - Home variables pointing at paths no record owns
//! - Foreign installations in the system PATH
//! - Managed binaries shadowed by other PATH entries

use anyhow::Result;

use crate::commands::Session;
use crate::lifecycle::health::{CheckStatus, run_all_checks};
use crate::toolchain::platform::Os;

/// Executes the doctor command.
///
/// Runs all health checks and displays the results.
///
/// # Errors
///
/// Returns an error if the configuration or inventory cannot be loaded (not
/// if checks report problems).
pub fn execute() -> Result<()> {
    let session = Session::load()?;
    println!("Checking unosdk installation...");
    println!("  Root:      {}", session.paths.root.display());
    println!("  Inventory: {}", session.inventory.path().display());
    println!();

    let checks = run_all_checks(&session.inventory, &session.environment, Os::current());

    let mut has_errors = false;
    let mut has_warnings = false;

    for check in &checks {
        let prefix = check.prefix();
        println!("  {prefix} {}: {}", check.name, check.message);
        for detail in &check.details {
            println!("         {detail}");
        }
        match check.status {
            CheckStatus::Ok => {}
            CheckStatus::Warning => has_warnings = true,
            CheckStatus::Error => has_errors = true,
        }
    }

    println!();

    if has_errors {
        println!("Some checks failed. Follow the suggestions above to repair the installation.");
    } else if has_warnings {
        println!("Some warnings were found. Toolchains may work but could resolve unexpectedly.");
    } else {
        println!("All checks passed.");
    }

    Ok(())
}
