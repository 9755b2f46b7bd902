//! Conflict detection: foreign PATH entries that would win over a managed install.
//!
//! Two complementary checks live here:
//!
//! - [`matches_kind`] is a name heuristic over raw PATH strings, used on the
//!   machine PATH where other installers put their toolchains.
//! - [`detect_shadowed_binaries`] asks `which` what a new process would
//!   actually run, and reports binaries that resolve outside the managed
//!   directories.

use std::path::{Path, PathBuf};

use crate::environment::same_entry;
use crate::toolchain::kind::ToolchainKind;

/// Whether a PATH entry looks like an installation of `kind`.
///
/// Needs a product keyword AND a layout marker, so unrelated directories that
/// merely mention a product name are not reported.
#[must_use]
pub fn matches_kind(kind: &ToolchainKind, entry: &str) -> bool {
    let entry = entry.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| entry.contains(n));
    let segments: Vec<&str> = entry
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    let has_bin = segments.contains(&"bin");
    let program_files = has(&["program files", "programfiles"]);

    match kind {
        ToolchainKind::Java => {
            has(&["java", "jdk", "jre"]) && has(&["bin", "javapath", "corretto", "openjdk"])
        }
        ToolchainKind::Node => has(&["nodejs"]) || (has(&["node"]) && program_files),
        ToolchainKind::Python => {
            has(&["python"]) && (program_files || has(&["appdata", "scripts"]))
        }
        ToolchainKind::Go => {
            (has(&["golang"]) || segments.iter().any(|s| *s == "go" || s.starts_with("go1.")))
                && has_bin
        }
        ToolchainKind::Maven => has(&["maven"]) && has_bin,
        ToolchainKind::Gradle => has(&["gradle"]) && has_bin,
        ToolchainKind::Flutter => has(&["flutter"]) && has_bin,
        ToolchainKind::C | ToolchainKind::Cpp => {
            has(&["mingw", "msys64", "cygwin", "tdm-gcc", "winlibs"]) && has_bin
        }
        ToolchainKind::Other(_) => false,
    }
}

/// Manual-fix instructions for machine conflicts that could not be removed.
#[must_use]
pub fn conflict_guidance(kind: &ToolchainKind, conflicts: &[String]) -> Vec<String> {
    if conflicts.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "The system PATH contains other {kind} installations that take precedence:"
    )];
    lines.extend(conflicts.iter().map(|c| format!("  {c}")));
    lines.push("To fix:".to_string());
    lines.push("  - Re-run this command from an elevated shell to remove them automatically, or".to_string());
    lines.push("  - Remove them from the system PATH manually (System Properties > Environment Variables)".to_string());
    lines
}

/// Warning lines for foreign installs found only in the inherited PATH.
#[must_use]
pub fn inherited_guidance(kind: &ToolchainKind, conflicts: &[String]) -> Vec<String> {
    if conflicts.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "Your current PATH also contains other {kind} installations not managed by unosdk:"
    )];
    lines.extend(conflicts.iter().map(|c| format!("  {c}")));
    lines.push(
        "  Make sure unosdk's entries come first, or remove these from your shell profile or system settings"
            .to_string(),
    );
    lines
}

/// A binary that resolves somewhere other than the managed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConflict {
    pub binary: String,
    /// Where the current PATH resolves it.
    pub found: PathBuf,
    /// The managed copy that is being shadowed.
    pub expected: PathBuf,
}

/// Entry points whose resolution decides which toolchain a shell uses.
#[must_use]
pub fn managed_binaries(kind: &ToolchainKind) -> &'static [&'static str] {
    match kind {
        ToolchainKind::Java => &["java", "javac"],
        ToolchainKind::Node => &["node", "npm"],
        ToolchainKind::Python => &["python"],
        ToolchainKind::Go => &["go"],
        ToolchainKind::Maven => &["mvn"],
        ToolchainKind::Gradle => &["gradle"],
        ToolchainKind::Flutter => &["flutter", "dart"],
        ToolchainKind::C => &["gcc"],
        ToolchainKind::Cpp => &["g++"],
        ToolchainKind::Other(_) => &[],
    }
}

/// Managed binaries of `kind` that the process PATH resolves elsewhere.
///
/// Only binaries that actually exist in one of `managed_dirs` are checked.
#[must_use]
pub fn detect_shadowed_binaries(kind: &ToolchainKind, managed_dirs: &[PathBuf]) -> Vec<PathConflict> {
    let Some(search_path) = std::env::var_os("PATH") else {
        return Vec::new();
    };
    detect_shadowed_in(kind, managed_dirs, &search_path)
}

fn detect_shadowed_in(
    kind: &ToolchainKind,
    managed_dirs: &[PathBuf],
    search_path: &std::ffi::OsStr,
) -> Vec<PathConflict> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut conflicts = Vec::new();

    for name in managed_binaries(kind) {
        let Some(expected) = managed_dirs
            .iter()
            .find_map(|dir| which::which_in(name, Some(dir), &cwd).ok())
        else {
            continue;
        };
        if let Ok(found) = which::which_in(name, Some(search_path), &cwd)
            && !in_any(&found, managed_dirs)
        {
            conflicts.push(PathConflict {
                binary: (*name).to_string(),
                found,
                expected,
            });
        }
    }

    conflicts
}

fn in_any(binary: &Path, dirs: &[PathBuf]) -> bool {
    let Some(parent) = binary.parent() else {
        return false;
    };
    let parent = parent.to_string_lossy();
    dirs.iter()
        .any(|dir| same_entry(&parent, &dir.to_string_lossy()))
}

/// Compact report lines for `doctor`.
#[must_use]
pub fn format_shadow_warning(conflicts: &[PathConflict]) -> Vec<String> {
    let mut lines = Vec::new();

    for conflict in conflicts {
        lines.push(format!(
            "'{}' resolves to {}",
            conflict.binary,
            conflict.found.display()
        ));
        lines.push(format!(
            "  but the active install provides {}",
            conflict.expected.display()
        ));
    }

    if let Some(first) = conflicts.first()
        && let Some(parent) = first.expected.parent()
    {
        lines.push(format!(
            "  Fix: ensure {} comes before other entries in PATH (open a new shell after switching)",
            parent.display()
        ));
    }

    lines
}
