//! Read-only consistency checks across inventory, disk and environment.
//!
//! Used by `unosdk doctor`. Nothing here mutates state; every finding
//! carries the command that fixes it.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::environment::conflict::{detect_shadowed_binaries, format_shadow_warning};
use crate::environment::{EnvironmentController, EnvironmentStore, Scope, same_entry};
use crate::inventory::{InstalledToolchain, InventoryStore};
use crate::lifecycle::layout::{home_variable, layout_for};
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::Os;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    /// One line per offending item.
    pub details: Vec<String>,
}

impl DoctorCheck {
    #[must_use]
    pub fn ok(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Ok, message)
    }

    #[must_use]
    pub fn warning(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, message)
    }

    #[must_use]
    pub fn error(name: &'static str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Error, message)
    }

    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// CLI prefix for this check's status.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "[OK]",
            CheckStatus::Warning => "[WARN]",
            CheckStatus::Error => "[FAIL]",
        }
    }
}

/// Runs every check in display order.
pub fn run_all_checks<S: EnvironmentStore>(
    inventory: &InventoryStore,
    env: &EnvironmentController<S>,
    os: Os,
) -> Vec<DoctorCheck> {
    let records = inventory.list();
    vec![
        check_install_paths(&records),
        check_single_active_entry(&records, env, os),
        check_home_variables(&records, env),
        check_machine_conflicts(&records, env),
        check_shadowed_binaries(&records, env, os),
    ]
}

fn kinds(records: &[InstalledToolchain]) -> BTreeSet<ToolchainKind> {
    records.iter().map(|r| r.kind.clone()).collect()
}

/// Records of `kind` whose primary directory is on the user PATH.
fn on_user_path<'r>(
    records: &'r [InstalledToolchain],
    kind: &ToolchainKind,
    user_path: &[String],
    os: Os,
) -> Vec<&'r InstalledToolchain> {
    records
        .iter()
        .filter(|r| &r.kind == kind)
        .filter(|r| {
            layout_for(&r.kind, &r.install_path, os)
                .primary_dir()
                .is_some_and(|dir| {
                    let dir = dir.to_string_lossy();
                    user_path.iter().any(|entry| same_entry(entry, &dir))
                })
        })
        .collect()
}

fn user_path<S: EnvironmentStore>(env: &EnvironmentController<S>) -> Vec<String> {
    env.path_entries(Scope::User).unwrap_or_default()
}

#[must_use]
pub fn check_install_paths(records: &[InstalledToolchain]) -> DoctorCheck {
    const NAME: &str = "Install directories";
    if records.is_empty() {
        return DoctorCheck::ok(NAME, "No toolchains installed");
    }
    let missing: Vec<String> = records
        .iter()
        .filter(|r| !r.install_path.is_dir())
        .map(|r| {
            format!(
                "{} at {} (run 'unosdk uninstall {} {} {}' to forget it)",
                r.label(),
                r.install_path.display(),
                r.kind,
                r.provider,
                r.version
            )
        })
        .collect();
    if missing.is_empty() {
        DoctorCheck::ok(NAME, format!("{} installs present on disk", records.len()))
    } else {
        DoctorCheck::error(NAME, format!("{} installs are missing on disk", missing.len()))
            .with_details(missing)
    }
}

pub fn check_single_active_entry<S: EnvironmentStore>(
    records: &[InstalledToolchain],
    env: &EnvironmentController<S>,
    os: Os,
) -> DoctorCheck {
    const NAME: &str = "User PATH";
    let path = user_path(env);
    let mut details = Vec::new();
    for kind in kinds(records) {
        let active = on_user_path(records, &kind, &path, os);
        if active.len() > 1 {
            let labels: Vec<String> = active.iter().map(|r| r.label()).collect();
            details.push(format!(
                "{kind}: {} (run 'unosdk switch' to pick one)",
                labels.join(", ")
            ));
        }
    }
    if details.is_empty() {
        DoctorCheck::ok(NAME, "At most one managed entry per toolchain kind")
    } else {
        DoctorCheck::warning(NAME, "Several installs of the same kind are on PATH")
            .with_details(details)
    }
}

pub fn check_home_variables<S: EnvironmentStore>(
    records: &[InstalledToolchain],
    env: &EnvironmentController<S>,
) -> DoctorCheck {
    const NAME: &str = "Home variables";
    let mut details = Vec::new();
    for kind in kinds(records) {
        let Some(name) = home_variable(&kind) else {
            continue;
        };
        let Ok(Some(value)) = env.home_variable(Scope::User, name) else {
            continue;
        };
        let owned = records
            .iter()
            .filter(|r| r.kind == kind)
            .any(|r| same_entry(&value, &r.install_path.to_string_lossy()));
        if !owned {
            details.push(format!(
                "{name}={value} does not belong to any installed {kind} (run 'unosdk switch {kind} <provider> <version>')"
            ));
        }
    }
    if details.is_empty() {
        DoctorCheck::ok(NAME, "Home variables point at installed toolchains")
    } else {
        DoctorCheck::warning(NAME, "Home variables point at unmanaged paths").with_details(details)
    }
}

pub fn check_machine_conflicts<S: EnvironmentStore>(
    records: &[InstalledToolchain],
    env: &EnvironmentController<S>,
) -> DoctorCheck {
    const NAME: &str = "System PATH conflicts";
    let mut details = Vec::new();
    for kind in kinds(records) {
        match env.detect_conflicts(&kind) {
            Ok(conflicts) => details.extend(conflicts.iter().map(|c| format!("{kind}: {c}"))),
            Err(e) => {
                return DoctorCheck::warning(NAME, format!("Could not read the system PATH: {e}"));
            }
        }
    }
    if details.is_empty() {
        DoctorCheck::ok(NAME, "No foreign toolchains found in the system PATH")
    } else {
        details.push(
            "Remove them from the system PATH, or re-run 'unosdk switch' from an elevated shell"
                .to_string(),
        );
        DoctorCheck::warning(NAME, "Other installations take precedence in the system PATH")
            .with_details(details)
    }
}

pub fn check_shadowed_binaries<S: EnvironmentStore>(
    records: &[InstalledToolchain],
    env: &EnvironmentController<S>,
    os: Os,
) -> DoctorCheck {
    const NAME: &str = "Shell resolution";
    let path = user_path(env);
    let mut details = Vec::new();
    for kind in kinds(records) {
        let dirs: Vec<PathBuf> = on_user_path(records, &kind, &path, os)
            .into_iter()
            .flat_map(|r| layout_for(&r.kind, &r.install_path, os).path_dirs)
            .collect();
        if dirs.is_empty() {
            continue;
        }
        details.extend(format_shadow_warning(&detect_shadowed_binaries(&kind, &dirs)));
    }
    if details.is_empty() {
        DoctorCheck::ok(NAME, "Managed binaries resolve to the active installs")
    } else {
        DoctorCheck::warning(NAME, "Some binaries resolve outside the active installs")
            .with_details(details)
    }
}
