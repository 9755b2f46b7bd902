//! PATH and home-variable management on top of an [`EnvironmentStore`].

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::environment::conflict::matches_kind;
use crate::environment::{EnvironmentStore, PATH_VARIABLE, Scope};
use crate::errors::SdkError;
use crate::toolchain::kind::ToolchainKind;

/// Marker that identifies entries owned by this tool regardless of root.
const MANAGED_MARKER: &str = "unosdk";

/// Single authority for reading and mutating PATH-like and home variables.
pub struct EnvironmentController<S> {
    store: S,
    managed_roots: Vec<String>,
    inherited_path: Option<String>,
    elevated: OnceCell<bool>,
}

impl<S: EnvironmentStore> EnvironmentController<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            managed_roots: Vec::new(),
            inherited_path: None,
            elevated: OnceCell::new(),
        }
    }

    /// Treats entries below `root` as managed, in addition to any entry
    /// containing `unosdk`.
    #[must_use]
    pub fn with_managed_root(mut self, root: &Path) -> Self {
        self.managed_roots
            .push(normalize(&root.to_string_lossy()).to_ascii_lowercase());
        self
    }

    /// PATH of the running process, scanned for foreign entries that the
    /// stored scopes do not show.
    #[must_use]
    pub fn with_inherited_path(mut self, path: Option<String>) -> Self {
        self.inherited_path = path;
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.store.separator()
    }

    /// Whether machine scope is writable. Probed once per controller.
    pub fn is_elevated(&self) -> bool {
        *self.elevated.get_or_init(|| {
            let elevated = self.store.can_write_machine();
            tracing::debug!(elevated, "machine scope write probe");
            elevated
        })
    }

    fn require_scope(&self, scope: Scope, operation: &str) -> Result<(), SdkError> {
        if scope == Scope::Machine && !self.is_elevated() {
            return Err(SdkError::elevation_required(format!(
                "{operation} at machine scope"
            )));
        }
        Ok(())
    }

    /// Non-empty, trimmed entries of the scoped PATH, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable cannot be read.
    pub fn path_entries(&self, scope: Scope) -> Result<Vec<String>, SdkError> {
        let value = self.store.read(scope, PATH_VARIABLE)?.unwrap_or_default();
        Ok(split_entries(&value, self.separator()))
    }

    /// # Errors
    ///
    /// Returns an error if the variable cannot be read.
    pub fn path_contains(&self, scope: Scope, dir: &Path) -> Result<bool, SdkError> {
        let dir = dir.to_string_lossy();
        Ok(self
            .path_entries(scope)?
            .iter()
            .any(|entry| same_entry(entry, &dir)))
    }

    /// Moves or inserts `dir` to the front of the scoped PATH.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ElevationRequired`] for machine scope without
    /// elevation, or the store's error if the write fails.
    pub fn add_to_path(&self, scope: Scope, dir: &Path) -> Result<(), SdkError> {
        self.require_scope(scope, "adding to PATH")?;
        let dir = dir.to_string_lossy();
        let current = self.path_entries(scope)?;
        if current.first().is_some_and(|first| same_entry(first, &dir))
            && current.iter().filter(|e| same_entry(e, &dir)).count() == 1
        {
            return Ok(());
        }

        let mut updated = Vec::with_capacity(current.len() + 1);
        updated.push(dir.to_string());
        updated.extend(current.into_iter().filter(|e| !same_entry(e, &dir)));

        tracing::info!(%scope, dir = %dir, "prepending to PATH");
        self.write_path(scope, &updated)
    }

    /// Removes every entry matching `dir`. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ElevationRequired`] for machine scope without
    /// elevation, or the store's error if the write fails.
    pub fn remove_from_path(&self, scope: Scope, dir: &Path) -> Result<bool, SdkError> {
        Ok(self.remove_all_from_path(scope, &[dir.to_path_buf()])? > 0)
    }

    /// Removes every entry matching any of `dirs` in one write.
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ElevationRequired`] for machine scope without
    /// elevation, or the store's error if the write fails.
    pub fn remove_all_from_path(&self, scope: Scope, dirs: &[PathBuf]) -> Result<usize, SdkError> {
        self.require_scope(scope, "removing from PATH")?;
        if dirs.is_empty() {
            return Ok(0);
        }
        let targets: Vec<String> = dirs
            .iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect();
        let current = self.path_entries(scope)?;
        let before = current.len();
        let kept: Vec<String> = current
            .into_iter()
            .filter(|entry| !targets.iter().any(|t| same_entry(entry, t)))
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        tracing::info!(%scope, removed, "removing entries from PATH");
        self.write_path(scope, &kept)?;
        Ok(removed)
    }

    fn write_path(&self, scope: Scope, entries: &[String]) -> Result<(), SdkError> {
        let value = entries.join(&self.separator().to_string());
        if value.is_empty() {
            self.store.delete(scope, PATH_VARIABLE)
        } else {
            self.store.write(scope, PATH_VARIABLE, &value)
        }
    }

    /// # Errors
    ///
    /// Returns an error if the variable cannot be read.
    pub fn home_variable(&self, scope: Scope, name: &str) -> Result<Option<String>, SdkError> {
        Ok(self
            .store
            .read(scope, name)?
            .filter(|value| !value.trim().is_empty()))
    }

    /// # Errors
    ///
    /// Returns [`SdkError::ElevationRequired`] for machine scope without
    /// elevation, or the store's error if the write fails.
    pub fn set_home_variable(&self, scope: Scope, name: &str, value: &Path) -> Result<(), SdkError> {
        self.require_scope(scope, &format!("setting {name}"))?;
        tracing::info!(%scope, name, value = %value.display(), "setting home variable");
        self.store.write(scope, name, &value.to_string_lossy())
    }

    /// # Errors
    ///
    /// Returns [`SdkError::ElevationRequired`] for machine scope without
    /// elevation, or the store's error if the delete fails.
    pub fn delete_home_variable(&self, scope: Scope, name: &str) -> Result<(), SdkError> {
        self.require_scope(scope, &format!("removing {name}"))?;
        tracing::info!(%scope, name, "deleting home variable");
        self.store.delete(scope, name)
    }

    /// Whether a PATH entry belongs to an install this tool manages.
    #[must_use]
    pub fn is_managed(&self, entry: &str) -> bool {
        let entry = normalize(entry).to_ascii_lowercase();
        entry.contains(MANAGED_MARKER)
            || self
                .managed_roots
                .iter()
                .any(|root| !root.is_empty() && entry.starts_with(root.as_str()))
    }

    /// Foreign machine PATH entries that look like a `kind` toolchain.
    ///
    /// Name matching only; callers review the result before removing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the machine PATH cannot be read.
    pub fn detect_conflicts(&self, kind: &ToolchainKind) -> Result<Vec<String>, SdkError> {
        let conflicts: Vec<String> = self
            .path_entries(Scope::Machine)?
            .into_iter()
            .filter(|entry| !self.is_managed(entry) && matches_kind(kind, entry))
            .collect();
        if !conflicts.is_empty() {
            tracing::debug!(%kind, ?conflicts, "machine PATH conflicts");
        }
        Ok(conflicts)
    }

    /// Foreign entries of the inherited PATH that look like a `kind`
    /// toolchain and are not already reported for the machine PATH.
    ///
    /// On Unix the machine scope only holds managed entries, so this is where
    /// system installs such as `/usr/lib/jvm/*/bin` show up. They can be
    /// reported but not removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the machine PATH cannot be read.
    pub fn detect_inherited_conflicts(&self, kind: &ToolchainKind) -> Result<Vec<String>, SdkError> {
        let Some(inherited) = &self.inherited_path else {
            return Ok(Vec::new());
        };
        let machine = self.path_entries(Scope::Machine)?;
        let mut conflicts: Vec<String> = Vec::new();
        for entry in split_entries(inherited, self.separator()) {
            if self.is_managed(&entry) || !matches_kind(kind, &entry) {
                continue;
            }
            if machine.iter().chain(&conflicts).any(|e| same_entry(e, &entry)) {
                continue;
            }
            conflicts.push(entry);
        }
        if !conflicts.is_empty() {
            tracing::debug!(%kind, ?conflicts, "inherited PATH conflicts");
        }
        Ok(conflicts)
    }

    /// Best-effort change broadcast; failures are logged, never returned.
    pub fn notify_environment_changed(&self) {
        if let Err(e) = self.store.broadcast_change() {
            tracing::warn!(error = %e, "environment change notification failed");
        }
    }

    #[must_use]
    pub fn activation_hint(&self) -> Option<String> {
        self.store.activation_hint()
    }
}

fn split_entries(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Trims whitespace and trailing separators, keeping a bare root intact.
fn normalize(entry: &str) -> &str {
    let trimmed = entry.trim();
    let stripped = trimmed.trim_end_matches(['/', '\\']);
    if stripped.is_empty() { trimmed } else { stripped }
}

/// Case-insensitive PATH entry equality after trimming.
#[must_use]
pub fn same_entry(a: &str, b: &str) -> bool {
    normalize(a).eq_ignore_ascii_case(normalize(b))
}
