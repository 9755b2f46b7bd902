//! Install, switch and uninstall as multi-step operations over the inventory,
//! the filesystem and the environment.
//!
//! Ordering rules:
//!
//! - Nothing is committed to the inventory until extraction succeeds.
//! - Environment wiring runs after the commit and never fails the operation;
//!   its problems are collected in an [`EnvironmentReport`].
//! - A populated canonical directory counts as installed even when the
//!   inventory lost track of it; an empty one is a leftover and is replaced.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::watch;

use crate::environment::conflict::{conflict_guidance, inherited_guidance};
use crate::environment::{EnvironmentController, EnvironmentStore, Scope, same_entry};
use crate::errors::SdkError;
use crate::inventory::{InstalledToolchain, InventoryStore};
use crate::lifecycle::layout::{KindLayout, layout_for};
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::{Arch, Os};
use crate::toolchain::provider::{ProviderRegistry, resolve_version};
use crate::toolchain::verify::{compute_sha256, verify_checksum};
use crate::toolchain::{Downloader, Extractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub arch: Arch,
    /// Leave PATH and home variables untouched.
    pub skip_env: bool,
    /// Point the kind's home variable at the new install.
    pub set_home: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            arch: Arch::current(),
            skip_env: false,
            set_home: true,
        }
    }
}

/// What environment wiring did, and what it could not do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentReport {
    /// Changes that were applied.
    pub actions: Vec<String>,
    /// Expected degradations (machine scope, conflicts left in place).
    pub warnings: Vec<String>,
    /// User-scope failures the user has to fix by hand.
    pub errors: Vec<String>,
    /// Foreign machine PATH entries found for the kind.
    pub conflicts: Vec<String>,
    /// How to make the change visible in the current shell.
    pub hint: Option<String>,
}

impl EnvironmentReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record_failure(&mut self, scope: Scope, what: &str, error: &SdkError) {
        let line = format!("{what}: {error}");
        tracing::warn!(%scope, %error, "{what}");
        if scope == Scope::Machine || error.is_elevation_required() {
            self.warnings.push(line);
        } else {
            self.errors.push(line);
        }
    }

    fn merge(&mut self, other: Self) {
        self.actions.extend(other.actions);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        self.conflicts.extend(other.conflicts);
        if other.hint.is_some() {
            self.hint = other.hint;
        }
    }
}

#[derive(Debug)]
pub struct InstallOutcome {
    pub record: InstalledToolchain,
    /// The install was found on disk and no download happened.
    pub already_installed: bool,
    /// `None` when environment wiring was skipped.
    pub environment: Option<EnvironmentReport>,
}

#[derive(Debug)]
pub struct SwitchOutcome {
    pub record: InstalledToolchain,
    pub environment: EnvironmentReport,
}

#[derive(Debug)]
pub struct UninstallOutcome {
    pub removed: InstalledToolchain,
    pub was_active: bool,
    /// Same-kind install made active in place of the removed one.
    pub promoted: Option<InstalledToolchain>,
    /// `None` when the environment was not touched.
    pub environment: Option<EnvironmentReport>,
}

/// Drives lifecycle operations over injected collaborators.
pub struct Orchestrator<'a, S, D, X> {
    providers: &'a ProviderRegistry,
    inventory: &'a mut InventoryStore,
    environment: &'a EnvironmentController<S>,
    downloader: D,
    extractor: X,
    scratch_root: PathBuf,
    os: Os,
    auto_remediate: bool,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, S, D, X> Orchestrator<'a, S, D, X>
where
    S: EnvironmentStore,
    D: Downloader,
    X: Extractor,
{
    /// `scratch_root` receives a throwaway directory per download.
    pub fn new(
        providers: &'a ProviderRegistry,
        inventory: &'a mut InventoryStore,
        environment: &'a EnvironmentController<S>,
        downloader: D,
        extractor: X,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            providers,
            inventory,
            environment,
            downloader,
            extractor,
            scratch_root,
            os: Os::current(),
            auto_remediate: true,
            cancel: None,
        }
    }

    /// Aborts downloads once the channel reads `true`.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Layout rules to apply (defaults to the host).
    #[cfg(test)]
    #[must_use]
    pub fn with_os(mut self, os: Os) -> Self {
        self.os = os;
        self
    }

    /// Whether elevated runs remove conflicting machine PATH entries.
    #[must_use]
    pub fn with_auto_remediate(mut self, enabled: bool) -> Self {
        self.auto_remediate = enabled;
        self
    }

    /// Installs a toolchain and, unless skipped, makes it the active one.
    ///
    /// # Errors
    ///
    /// Returns provider, download, checksum, extraction and persistence
    /// errors; the inventory is untouched when any of them happen before the
    /// commit. Environment problems are reported in the outcome instead.
    pub async fn install(
        &mut self,
        kind: &ToolchainKind,
        provider_name: &str,
        version: &str,
        options: &InstallOptions,
    ) -> Result<InstallOutcome, SdkError> {
        let providers = self.providers;
        let provider = providers.get(kind, provider_name)?;
        let version = resolve_version(provider, version)?;
        let provider_name = provider.name().to_string();
        let url = provider.download_url(&version, options.arch)?;
        let canonical = provider.default_install_path(&version);
        tracing::info!(%kind, provider = %provider_name, %version, dir = %canonical.display(), "install");

        let existing = self.existing_install(kind, &provider_name, &version, &canonical, &url)?;
        let (record, already_installed) = if let Some(record) = existing {
            (record, true)
        } else {
            let expected = provider.checksum(&version, options.arch);
            let (install_path, checksum) = self
                .fetch_and_unpack(&url, expected.as_deref(), &canonical)
                .await?;
            let record = InstalledToolchain {
                kind: kind.clone(),
                provider: provider_name,
                version,
                install_path,
                download_url: url,
                checksum: Some(checksum),
                installed: true,
                installed_at: Utc::now(),
            };
            self.inventory.upsert(record.clone())?;
            (record, false)
        };

        let environment =
            (!options.skip_env).then(|| self.apply_environment(&record, options.set_home));

        Ok(InstallOutcome {
            record,
            already_installed,
            environment,
        })
    }

    /// Makes an installed toolchain the active one, home variable included.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::NotInstalled`] if the inventory has no such record.
    pub fn switch(
        &self,
        kind: &ToolchainKind,
        provider_name: &str,
        version: &str,
    ) -> Result<SwitchOutcome, SdkError> {
        let record = self.lookup(kind, provider_name, version)?;
        tracing::info!(key = %record.key(), "switch");
        let environment = self.apply_environment(&record, true);
        Ok(SwitchOutcome {
            record,
            environment,
        })
    }

    /// Deletes an install and forgets it. Its PATH entries are always
    /// stripped; if it was active, another install of the kind takes over.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::NotInstalled`] for unknown records,
    /// [`SdkError::Io`] if the directory cannot be deleted (nothing else is
    /// changed then) and [`SdkError::Persistence`] if the inventory cannot be
    /// saved.
    pub fn uninstall(
        &mut self,
        kind: &ToolchainKind,
        provider_name: &str,
        version: &str,
        cleanup_env: bool,
    ) -> Result<UninstallOutcome, SdkError> {
        let record = self.lookup(kind, provider_name, version)?;
        let layout = layout_for(kind, &record.install_path, self.os);
        let was_active = self.is_active(&record, &layout);
        let on_path = self.on_any_path(&layout);
        tracing::info!(key = %record.key(), was_active, on_path, "uninstall");

        remove_install_dir(&record.install_path)?;
        if let Some(parent) = record.install_path.parent()
            && std::fs::remove_dir(parent).is_ok()
        {
            tracing::debug!(dir = %parent.display(), "removed empty parent directory");
        }
        self.inventory
            .remove(kind, &record.provider, &record.version)?;

        if !cleanup_env && !was_active && !on_path {
            return Ok(UninstallOutcome {
                removed: record,
                was_active,
                promoted: None,
                environment: None,
            });
        }

        let mut report = self.clear_environment(&record, &layout);
        let promoted = if was_active {
            let replacement = self.replacement_for(&record);
            match &replacement {
                Some(next) => report.merge(self.apply_environment(next, true)),
                None => report.warnings.push(format!(
                    "No other {kind} installation to switch to; {kind} is no longer on PATH"
                )),
            }
            replacement
        } else {
            self.environment.notify_environment_changed();
            None
        };

        Ok(UninstallOutcome {
            removed: record,
            was_active,
            promoted,
            environment: Some(report),
        })
    }

    fn lookup(
        &self,
        kind: &ToolchainKind,
        provider_name: &str,
        version: &str,
    ) -> Result<InstalledToolchain, SdkError> {
        let provider = provider_name.trim().to_ascii_lowercase();
        let version = version.trim();
        self.inventory
            .get(kind, &provider, version)
            .ok_or_else(|| SdkError::not_installed(kind.as_str(), provider, version))
    }

    /// Returns the record for a populated canonical directory, back-filling
    /// the inventory when needed, and clears out an empty one.
    fn existing_install(
        &mut self,
        kind: &ToolchainKind,
        provider: &str,
        version: &str,
        canonical: &Path,
        url: &str,
    ) -> Result<Option<InstalledToolchain>, SdkError> {
        match dir_state(canonical)? {
            DirState::Missing => Ok(None),
            DirState::Empty => {
                tracing::info!(dir = %canonical.display(), "removing empty install directory");
                std::fs::remove_dir(canonical).map_err(|e| {
                    SdkError::io(format!("failed to remove {}", canonical.display()), e)
                })?;
                Ok(None)
            }
            DirState::Populated => {
                if let Some(record) = self.inventory.get(kind, provider, version) {
                    tracing::info!(key = %record.key(), "already installed");
                    return Ok(Some(record));
                }
                let record = InstalledToolchain {
                    kind: kind.clone(),
                    provider: provider.to_string(),
                    version: version.to_string(),
                    install_path: effective_install_path(canonical)?,
                    download_url: url.to_string(),
                    checksum: None,
                    installed: true,
                    installed_at: Utc::now(),
                };
                tracing::info!(key = %record.key(), "found on disk, back-filling inventory");
                self.inventory.upsert(record.clone())?;
                Ok(Some(record))
            }
        }
    }

    /// Downloads into a scratch directory and unpacks into `canonical`.
    /// Returns the effective install path and the archive checksum.
    async fn fetch_and_unpack(
        &self,
        url: &str,
        expected_checksum: Option<&str>,
        canonical: &Path,
    ) -> Result<(PathBuf, String), SdkError> {
        std::fs::create_dir_all(&self.scratch_root).map_err(|e| {
            SdkError::io(format!("failed to create {}", self.scratch_root.display()), e)
        })?;
        let scratch = tempfile::Builder::new()
            .prefix("unosdk-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| SdkError::io("failed to create download scratch directory", e))?;
        let archive = scratch.path().join(archive_file_name(url));

        self.download(url, &archive).await?;

        let checksum = match expected_checksum {
            Some(expected) => verify_checksum(&archive, expected)?,
            None => compute_sha256(&archive)?,
        };
        tracing::debug!(%checksum, "archive checksum");

        if self.is_cancelled() {
            return Err(SdkError::Cancelled);
        }

        if let Err(e) = self.extractor.extract(&archive, canonical) {
            if canonical.exists()
                && let Err(cleanup) = std::fs::remove_dir_all(canonical)
            {
                tracing::warn!(dir = %canonical.display(), error = %cleanup, "failed to remove partial install");
            }
            return Err(e);
        }

        Ok((effective_install_path(canonical)?, checksum))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), SdkError> {
        let Some(mut cancel) = self.cancel.clone() else {
            return self.downloader.download(url, dest).await;
        };
        if *cancel.borrow() {
            return Err(SdkError::Cancelled);
        }
        tokio::select! {
            result = self.downloader.download(url, dest) => result,
            () = cancelled(&mut cancel) => {
                tracing::info!(url, "download cancelled");
                Err(SdkError::Cancelled)
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| *c.borrow())
    }

    fn scopes(&self) -> &'static [Scope] {
        if self.environment.is_elevated() {
            &[Scope::User, Scope::Machine]
        } else {
            &[Scope::User]
        }
    }

    /// Cleans other same-kind entries, then puts `record` first on PATH.
    fn apply_environment(&self, record: &InstalledToolchain, set_home: bool) -> EnvironmentReport {
        let env = self.environment;
        let mut report = EnvironmentReport::default();
        let layout = layout_for(&record.kind, &record.install_path, self.os);
        let stale: Vec<PathBuf> = self
            .inventory
            .list_by_kind(&record.kind)
            .into_iter()
            .filter(|other| other.key() != record.key())
            .flat_map(|other| layout_for(&other.kind, &other.install_path, self.os).path_dirs)
            .filter(|dir| !layout.path_dirs.contains(dir))
            .collect();

        for &scope in self.scopes() {
            match env.remove_all_from_path(scope, &stale) {
                Ok(0) => {}
                Ok(removed) => report.actions.push(format!(
                    "Removed {removed} other {} entries from {scope} PATH",
                    record.kind
                )),
                Err(e) => report.record_failure(scope, "Failed to clean up PATH", &e),
            }

            if set_home && let Some(name) = layout.home_variable {
                match env.set_home_variable(scope, name, &record.install_path) {
                    Ok(()) => report.actions.push(format!(
                        "Set {scope} {name}={}",
                        record.install_path.display()
                    )),
                    Err(e) => report.record_failure(scope, &format!("Failed to set {name}"), &e),
                }
            }

            // Reverse so the primary directory ends up first.
            for dir in layout.path_dirs.iter().rev() {
                match env.add_to_path(scope, dir) {
                    Ok(()) => report
                        .actions
                        .push(format!("Added to {scope} PATH: {}", dir.display())),
                    Err(e) => report.record_failure(scope, "Failed to update PATH", &e),
                }
            }
        }

        self.handle_conflicts(&record.kind, &mut report);
        env.notify_environment_changed();
        report.hint = env.activation_hint();
        report
    }

    fn handle_conflicts(&self, kind: &ToolchainKind, report: &mut EnvironmentReport) {
        let env = self.environment;
        match env.detect_inherited_conflicts(kind) {
            Ok(inherited) => report.warnings.extend(inherited_guidance(kind, &inherited)),
            Err(e) => tracing::debug!(error = %e, "inherited PATH scan skipped"),
        }

        let conflicts = match env.detect_conflicts(kind) {
            Ok(conflicts) => conflicts,
            Err(e) => {
                report
                    .warnings
                    .push(format!("Could not scan the system PATH for conflicts: {e}"));
                return;
            }
        };
        if conflicts.is_empty() {
            return;
        }
        report.conflicts.clone_from(&conflicts);

        if env.is_elevated() && self.auto_remediate {
            let dirs: Vec<PathBuf> = conflicts.iter().map(PathBuf::from).collect();
            match env.remove_all_from_path(Scope::Machine, &dirs) {
                Ok(removed) => report.actions.push(format!(
                    "Removed {removed} conflicting {kind} entries from machine PATH"
                )),
                Err(e) => {
                    report.record_failure(Scope::Machine, "Failed to remove conflicts", &e);
                    report.warnings.extend(conflict_guidance(kind, &conflicts));
                }
            }
        } else {
            report.warnings.extend(conflict_guidance(kind, &conflicts));
        }
    }

    /// Removes the record's PATH entries, and its home variable where it
    /// still points at the record.
    fn clear_environment(&self, record: &InstalledToolchain, layout: &KindLayout) -> EnvironmentReport {
        let env = self.environment;
        let mut report = EnvironmentReport::default();
        let install_path = record.install_path.to_string_lossy();

        for &scope in self.scopes() {
            for dir in &layout.path_dirs {
                match env.remove_from_path(scope, dir) {
                    Ok(false) => {}
                    Ok(true) => report
                        .actions
                        .push(format!("Removed from {scope} PATH: {}", dir.display())),
                    Err(e) => report.record_failure(scope, "Failed to clean up PATH", &e),
                }
            }

            if let Some(name) = layout.home_variable
                && env
                    .home_variable(scope, name)
                    .ok()
                    .flatten()
                    .is_some_and(|value| same_entry(&value, &install_path))
            {
                match env.delete_home_variable(scope, name) {
                    Ok(()) => report.actions.push(format!("Removed {scope} {name}")),
                    Err(e) => report.record_failure(scope, &format!("Failed to remove {name}"), &e),
                }
            }
        }
        report
    }

    fn is_active(&self, record: &InstalledToolchain, layout: &KindLayout) -> bool {
        active_with_layout(self.environment, record, layout)
    }

    /// Whether any of the layout's directories is on a PATH this process may edit.
    fn on_any_path(&self, layout: &KindLayout) -> bool {
        self.scopes().iter().any(|&scope| {
            layout
                .path_dirs
                .iter()
                .any(|dir| self.environment.path_contains(scope, dir).unwrap_or(false))
        })
    }

    /// Newest remaining install of the same kind that still exists on disk,
    /// preferring the removed record's provider.
    fn replacement_for(&self, removed: &InstalledToolchain) -> Option<InstalledToolchain> {
        let candidates: Vec<InstalledToolchain> = self
            .inventory
            .list_by_kind(&removed.kind)
            .into_iter()
            .filter(|r| r.install_path.is_dir())
            .collect();
        let newest = |same_provider: bool| {
            candidates
                .iter()
                .filter(|r| (r.provider == removed.provider) == same_provider)
                .max_by_key(|r| r.installed_at)
                .cloned()
        };
        newest(true).or_else(|| newest(false))
    }
}

/// Whether `record` is the active install of its kind in user scope.
pub fn is_active<S: EnvironmentStore>(
    env: &EnvironmentController<S>,
    record: &InstalledToolchain,
    os: Os,
) -> bool {
    active_with_layout(env, record, &layout_for(&record.kind, &record.install_path, os))
}

/// The kind's home variable points at the install, or its primary
/// directory is on the user PATH.
fn active_with_layout<S: EnvironmentStore>(
    env: &EnvironmentController<S>,
    record: &InstalledToolchain,
    layout: &KindLayout,
) -> bool {
    let install_path = record.install_path.to_string_lossy();
    let home_matches = layout.home_variable.is_some_and(|name| {
        env.home_variable(Scope::User, name)
            .ok()
            .flatten()
            .is_some_and(|value| same_entry(&value, &install_path))
    });
    home_matches
        || layout
            .primary_dir()
            .is_some_and(|dir| env.path_contains(Scope::User, dir).unwrap_or(false))
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        // Sender gone: cancellation can no longer happen.
        std::future::pending::<()>().await;
    }
}

enum DirState {
    Missing,
    Empty,
    Populated,
}

fn dir_state(dir: &Path) -> Result<DirState, SdkError> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => Ok(if entries.next().is_some() {
            DirState::Populated
        } else {
            DirState::Empty
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DirState::Missing),
        Err(e) => Err(SdkError::io(format!("failed to read {}", dir.display()), e)),
    }
}

/// The single top-level directory of an unpacked archive, or `canonical`.
fn effective_install_path(canonical: &Path) -> Result<PathBuf, SdkError> {
    let read_failed = |e| SdkError::io(format!("failed to read {}", canonical.display()), e);
    let entries = std::fs::read_dir(canonical)
        .map_err(read_failed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_failed)?;
    if let [only] = entries.as_slice()
        && only.file_type().map_err(read_failed)?.is_dir()
    {
        return Ok(only.path());
    }
    Ok(canonical.to_path_buf())
}

fn remove_install_dir(dir: &Path) -> Result<(), SdkError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "install directory already gone");
            Ok(())
        }
        Err(e) => Err(SdkError::io(format!("failed to delete {}", dir.display()), e)),
    }
}

/// Last path segment of `url` without query or fragment.
fn archive_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "download".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::environment::memory::MemoryEnvironment;
    use crate::toolchain::provider::{LATEST, Provider};

    const JDK_ROOT: &str = "jdk-17.0.9+9";

    struct StubProvider {
        name: &'static str,
        kind: ToolchainKind,
        versions: Vec<&'static str>,
        sdks: PathBuf,
        checksum: Option<String>,
    }

    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn display_name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> ToolchainKind {
            self.kind.clone()
        }

        fn list_versions(&self) -> Result<Vec<String>, SdkError> {
            Ok(self.versions.iter().map(ToString::to_string).collect())
        }

        fn latest_version(&self) -> Result<String, SdkError> {
            Ok(self.versions[0].to_string())
        }

        fn download_url(&self, version: &str, arch: Arch) -> Result<String, SdkError> {
            Ok(format!(
                "https://downloads.test/{}/{version}/{}-{arch}.tar.gz?token=1",
                self.name, self.name
            ))
        }

        fn checksum(&self, _version: &str, _arch: Arch) -> Option<String> {
            self.checksum.clone()
        }

        fn default_install_path(&self, version: &str) -> PathBuf {
            self.sdks
                .join(self.kind.as_str())
                .join(self.name)
                .join(version)
        }

        fn validate(&self, version: &str) -> Result<(), SdkError> {
            if version == LATEST || self.versions.contains(&version) {
                Ok(())
            } else {
                Err(SdkError::invalid_version(version, "not offered"))
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Fetch {
        Ok,
        Fail,
        Hang,
    }

    struct FakeDownloader {
        calls: Arc<AtomicUsize>,
        mode: Fetch,
    }

    impl Downloader for FakeDownloader {
        async fn download(&self, url: &str, dest: &Path) -> Result<(), SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Fetch::Ok => std::fs::write(dest, format!("archive from {url}"))
                    .map_err(|e| SdkError::io("write", e)),
                Fetch::Fail => Err(SdkError::download("connection reset")),
                Fetch::Hang => {
                    std::fs::write(dest.with_extension("part"), "partial")
                        .map_err(|e| SdkError::io("write", e))?;
                    std::future::pending().await
                }
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Unpack {
        /// Everything inside one folder named after the release.
        Wrapped(&'static str),
        /// `bin/` and a loose file at the top level.
        Flat,
        /// Writes one file, then fails.
        Corrupt,
    }

    impl Extractor for Unpack {
        fn extract(&self, _archive: &Path, dest: &Path) -> Result<(), SdkError> {
            let io = |e: std::io::Error| SdkError::extraction_with_source("fake extract", Box::new(e));
            match self {
                Unpack::Wrapped(root) => {
                    std::fs::create_dir_all(dest.join(root).join("bin")).map_err(io)?;
                    std::fs::write(dest.join(root).join("bin").join("tool"), "").map_err(io)
                }
                Unpack::Flat => {
                    std::fs::create_dir_all(dest.join("bin")).map_err(io)?;
                    std::fs::write(dest.join("release"), "").map_err(io)
                }
                Unpack::Corrupt => {
                    std::fs::create_dir_all(dest).map_err(io)?;
                    std::fs::write(dest.join("half-written"), "").map_err(io)?;
                    Err(SdkError::extraction("unexpected end of archive"))
                }
            }
        }
    }

    struct Harness {
        temp: tempfile::TempDir,
        providers: ProviderRegistry,
        inventory: InventoryStore,
        env: EnvironmentController<MemoryEnvironment>,
        downloads: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_elevation(false)
        }

        fn with_elevation(elevated: bool) -> Self {
            let temp = tempfile::tempdir().unwrap();
            let sdks = temp.path().join("sdks");
            let mut providers = ProviderRegistry::new();
            for (name, kind, versions) in [
                ("openjdk", ToolchainKind::Java, vec!["21.0.1", "17.0.9"]),
                ("graalvm", ToolchainKind::Java, vec!["21.0.2"]),
                ("nodejs", ToolchainKind::Node, vec!["20.10.0"]),
            ] {
                providers.register(Box::new(StubProvider {
                    name,
                    kind,
                    versions,
                    sdks: sdks.clone(),
                    checksum: None,
                }));
            }
            let inventory = InventoryStore::open(temp.path().join("registry.json")).unwrap();
            let store = MemoryEnvironment::new(':');
            store.set_elevated(elevated);
            let env = EnvironmentController::new(store).with_managed_root(&sdks);
            Self {
                temp,
                providers,
                inventory,
                env,
                downloads: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_inherited_path(path: &str) -> Self {
            let mut h = Self::new();
            let sdks = h.temp.path().join("sdks");
            h.env = EnvironmentController::new(MemoryEnvironment::new(':'))
                .with_managed_root(&sdks)
                .with_inherited_path(Some(path.to_string()));
            h
        }

        fn canonical(&self, kind: &str, provider: &str, version: &str) -> PathBuf {
            self.temp.path().join("sdks").join(kind).join(provider).join(version)
        }

        fn orchestrator(
            &mut self,
            fetch: Fetch,
            unpack: Unpack,
        ) -> Orchestrator<'_, MemoryEnvironment, FakeDownloader, Unpack> {
            let downloader = FakeDownloader {
                calls: Arc::clone(&self.downloads),
                mode: fetch,
            };
            Orchestrator::new(
                &self.providers,
                &mut self.inventory,
                &self.env,
                downloader,
                unpack,
                self.temp.path().join("cache"),
            )
            .with_os(Os::Linux)
        }

        async fn install(&mut self, kind: ToolchainKind, provider: &str, version: &str) -> InstallOutcome {
            self.orchestrator(Fetch::Ok, Unpack::Wrapped(JDK_ROOT))
                .install(&kind, provider, version, &InstallOptions::default())
                .await
                .unwrap()
        }

        fn user_path(&self) -> Vec<String> {
            self.env.path_entries(Scope::User).unwrap()
        }

        fn user_var(&self, name: &str) -> Option<String> {
            self.env.store().value(Scope::User, name)
        }

        fn download_count(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    fn bin(record: &InstalledToolchain) -> String {
        record.install_path.join("bin").to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn install_records_unwrapped_install() {
        let mut h = Harness::new();

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        let records = h.inventory.list();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.key(), "java:openjdk:17.0.9");
        assert!(record.installed);
        assert_eq!(
            record.install_path,
            h.canonical("java", "openjdk", "17.0.9").join(JDK_ROOT)
        );
        assert_eq!(
            record.download_url,
            format!(
                "https://downloads.test/openjdk/17.0.9/openjdk-{}.tar.gz?token=1",
                Arch::current()
            )
        );
        assert!(record.checksum.is_some());
        assert!(!outcome.already_installed);

        assert_eq!(h.user_path().first(), Some(&bin(record)));
        assert_eq!(
            h.user_var("JAVA_HOME").as_deref(),
            Some(record.install_path.to_string_lossy().as_ref())
        );
        assert!(outcome.environment.unwrap().is_clean());
    }

    #[tokio::test]
    async fn latest_resolves_to_concrete_version() {
        let mut h = Harness::new();
        let outcome = h.install(ToolchainKind::Java, "openjdk", "latest").await;
        assert_eq!(outcome.record.version, "21.0.1");
    }

    #[tokio::test]
    async fn second_install_is_idempotent() {
        let mut h = Harness::new();

        let first = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;
        let second = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        assert_eq!(h.download_count(), 1);
        assert!(second.already_installed);
        assert_eq!(first.record, second.record);
        assert_eq!(h.inventory.list().len(), 1);
    }

    #[tokio::test]
    async fn flat_archive_keeps_canonical_dir() {
        let mut h = Harness::new();

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .install(&ToolchainKind::Node, "nodejs", "20.10.0", &InstallOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.record.install_path,
            h.canonical("node", "nodejs", "20.10.0")
        );
    }

    #[tokio::test]
    async fn empty_leftover_dir_is_replaced() {
        let mut h = Harness::new();
        std::fs::create_dir_all(h.canonical("java", "openjdk", "17.0.9")).unwrap();

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        assert_eq!(h.download_count(), 1);
        assert!(!outcome.already_installed);
    }

    #[tokio::test]
    async fn populated_dir_without_record_is_backfilled() {
        let mut h = Harness::new();
        let canonical = h.canonical("java", "openjdk", "17.0.9");
        std::fs::create_dir_all(canonical.join(JDK_ROOT).join("bin")).unwrap();

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        assert_eq!(h.download_count(), 0);
        assert!(outcome.already_installed);
        assert_eq!(outcome.record.install_path, canonical.join(JDK_ROOT));
        assert!(
            h.inventory
                .get(&ToolchainKind::Java, "openjdk", "17.0.9")
                .is_some()
        );
    }

    #[tokio::test]
    async fn extraction_failure_removes_partial_install() {
        let mut h = Harness::new();

        let err = h
            .orchestrator(Fetch::Ok, Unpack::Corrupt)
            .install(&ToolchainKind::Java, "openjdk", "17.0.9", &InstallOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Extraction { .. }));
        assert!(!h.canonical("java", "openjdk", "17.0.9").exists());
        assert!(h.inventory.list().is_empty());

        h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;
        assert_eq!(h.download_count(), 2);
    }

    #[tokio::test]
    async fn download_failure_commits_nothing() {
        let mut h = Harness::new();

        let err = h
            .orchestrator(Fetch::Fail, Unpack::Flat)
            .install(&ToolchainKind::Java, "openjdk", "17.0.9", &InstallOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Download { .. }));
        assert!(h.inventory.list().is_empty());
        assert!(!h.canonical("java", "openjdk", "17.0.9").exists());
        let leftovers = std::fs::read_dir(h.temp.path().join("cache")).unwrap().count();
        assert_eq!(leftovers, 0);
        assert!(h.user_path().is_empty());
    }

    #[tokio::test]
    async fn checksum_mismatch_commits_nothing() {
        let mut h = Harness::new();
        h.providers.register(Box::new(StubProvider {
            name: "openjdk",
            kind: ToolchainKind::Java,
            versions: vec!["17.0.9"],
            sdks: h.temp.path().join("sdks"),
            checksum: Some("00".repeat(32)),
        }));

        let err = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .install(&ToolchainKind::Java, "openjdk", "17.0.9", &InstallOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::ChecksumMismatch { .. }));
        assert!(h.inventory.list().is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_and_version_are_rejected() {
        let mut h = Harness::new();
        let mut orchestrator = h.orchestrator(Fetch::Ok, Unpack::Flat);
        let options = InstallOptions::default();

        let err = orchestrator
            .install(&ToolchainKind::Java, "acme", "17", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::ProviderNotFound { .. }));

        let err = orchestrator
            .install(&ToolchainKind::Java, "openjdk", "8", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidVersion { .. }));
    }

    #[tokio::test]
    async fn installing_new_version_removes_previous_from_path() {
        let mut h = Harness::new();
        let old = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        let new = h.install(ToolchainKind::Java, "openjdk", "21.0.1").await.record;

        let path = h.user_path();
        assert_eq!(path.first(), Some(&bin(&new)));
        assert!(!path.contains(&bin(&old)));
        assert_eq!(path.iter().filter(|e| **e == bin(&new)).count(), 1);
    }

    #[tokio::test]
    async fn skip_env_and_no_home_are_honoured() {
        let mut h = Harness::new();

        let skipped = h
            .orchestrator(Fetch::Ok, Unpack::Wrapped(JDK_ROOT))
            .install(
                &ToolchainKind::Java,
                "openjdk",
                "17.0.9",
                &InstallOptions {
                    skip_env: true,
                    ..InstallOptions::default()
                },
            )
            .await
            .unwrap();
        assert!(skipped.environment.is_none());
        assert!(h.user_path().is_empty());

        h.orchestrator(Fetch::Ok, Unpack::Wrapped(JDK_ROOT))
            .install(
                &ToolchainKind::Java,
                "openjdk",
                "21.0.1",
                &InstallOptions {
                    set_home: false,
                    ..InstallOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(h.user_path().len(), 1);
        assert!(h.user_var("JAVA_HOME").is_none());
    }

    #[test]
    fn switch_requires_installed_record() {
        let mut h = Harness::new();
        let err = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .switch(&ToolchainKind::Java, "openjdk", "17.0.9")
            .unwrap_err();
        assert!(matches!(err, SdkError::NotInstalled { .. }));
        assert_eq!(h.env.store().write_count(), 0);
    }

    #[tokio::test]
    async fn switch_restores_precedence_and_home() {
        let mut h = Harness::new();
        let old = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        let new = h.install(ToolchainKind::Java, "openjdk", "21.0.1").await.record;

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .switch(&ToolchainKind::Java, "OpenJDK", "17.0.9")
            .unwrap();

        assert_eq!(outcome.record, old);
        let path = h.user_path();
        assert_eq!(path.first(), Some(&bin(&old)));
        assert!(!path.contains(&bin(&new)));
        assert_eq!(
            h.user_var("JAVA_HOME").as_deref(),
            Some(old.install_path.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn uninstall_active_promotes_other_provider() {
        let mut h = Harness::new();
        let openjdk = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        let graal = h.install(ToolchainKind::Java, "graalvm", "21.0.2").await.record;

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "graalvm", "21.0.2", false)
            .unwrap();

        assert!(outcome.was_active);
        assert_eq!(outcome.promoted, Some(openjdk.clone()));
        assert!(!graal.install_path.exists());
        assert!(!h.canonical("java", "graalvm", "21.0.2").exists());
        assert_eq!(h.user_path(), [bin(&openjdk)]);
        assert_eq!(
            h.user_var("JAVA_HOME").as_deref(),
            Some(openjdk.install_path.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn promotion_prefers_same_provider() {
        let mut h = Harness::new();
        let jdk17 = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        h.install(ToolchainKind::Java, "openjdk", "21.0.1").await;
        h.install(ToolchainKind::Java, "graalvm", "21.0.2").await;
        h.orchestrator(Fetch::Ok, Unpack::Flat)
            .switch(&ToolchainKind::Java, "openjdk", "21.0.1")
            .unwrap();

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "21.0.1", false)
            .unwrap();

        assert_eq!(outcome.promoted, Some(jdk17.clone()));
        assert_eq!(h.user_path().first(), Some(&bin(&jdk17)));
    }

    #[tokio::test]
    async fn uninstall_last_install_clears_environment() {
        let mut h = Harness::new();
        h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "17.0.9", false)
            .unwrap();

        assert!(outcome.was_active);
        assert!(outcome.promoted.is_none());
        let report = outcome.environment.unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("No other java")));
        assert!(h.user_path().is_empty());
        assert!(h.user_var("JAVA_HOME").is_none());
        assert!(h.inventory.list().is_empty());
    }

    #[tokio::test]
    async fn uninstall_inactive_leaves_environment_alone() {
        let mut h = Harness::new();
        h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;
        let active = h.install(ToolchainKind::Java, "openjdk", "21.0.1").await.record;
        let writes = h.env.store().write_count();

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "17.0.9", false)
            .unwrap();

        assert!(!outcome.was_active);
        assert!(outcome.environment.is_none());
        assert_eq!(h.env.store().write_count(), writes);
        assert_eq!(h.user_path(), [bin(&active)]);
    }

    #[tokio::test]
    async fn uninstall_path_only_install_promotes_home_install() {
        let mut h = Harness::new();
        let jdk17 = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        let jdk21 = h
            .orchestrator(Fetch::Ok, Unpack::Wrapped(JDK_ROOT))
            .install(
                &ToolchainKind::Java,
                "openjdk",
                "21.0.1",
                &InstallOptions {
                    set_home: false,
                    ..InstallOptions::default()
                },
            )
            .await
            .unwrap()
            .record;
        assert_eq!(h.user_path(), [bin(&jdk21)]);

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "21.0.1", false)
            .unwrap();

        assert!(outcome.was_active);
        assert_eq!(outcome.promoted, Some(jdk17.clone()));
        assert!(!jdk21.install_path.exists());
        assert_eq!(h.user_path(), [bin(&jdk17)]);
        assert_eq!(
            h.user_var("JAVA_HOME").as_deref(),
            Some(jdk17.install_path.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn uninstall_home_only_install_hands_home_to_path_install() {
        let mut h = Harness::new();
        h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;
        let jdk21 = h
            .orchestrator(Fetch::Ok, Unpack::Wrapped(JDK_ROOT))
            .install(
                &ToolchainKind::Java,
                "openjdk",
                "21.0.1",
                &InstallOptions {
                    set_home: false,
                    ..InstallOptions::default()
                },
            )
            .await
            .unwrap()
            .record;

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "17.0.9", false)
            .unwrap();

        assert!(outcome.was_active);
        assert_eq!(outcome.promoted, Some(jdk21.clone()));
        assert_eq!(h.user_path(), [bin(&jdk21)]);
        assert_eq!(
            h.user_var("JAVA_HOME").as_deref(),
            Some(jdk21.install_path.to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn uninstall_strips_stale_entries_of_inactive_install() {
        let mut h = Harness::with_elevation(true);
        let jdk17 = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await.record;
        let jdk21 = h.install(ToolchainKind::Java, "openjdk", "21.0.1").await.record;
        // Left behind in machine scope by an earlier run.
        h.env
            .store()
            .seed(Scope::Machine, "PATH", &format!("{}:{}", bin(&jdk21), bin(&jdk17)));

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Java, "openjdk", "17.0.9", false)
            .unwrap();

        assert!(!outcome.was_active);
        assert!(outcome.promoted.is_none());
        assert!(outcome.environment.is_some());
        assert_eq!(h.env.path_entries(Scope::Machine).unwrap(), [bin(&jdk21)]);
        assert_eq!(h.user_path(), [bin(&jdk21)]);
    }

    #[tokio::test]
    async fn node_activity_is_detected_from_path() {
        let mut h = Harness::new();
        h.orchestrator(Fetch::Ok, Unpack::Wrapped("node-v20.10.0-linux-x64"))
            .install(&ToolchainKind::Node, "nodejs", "20.10.0", &InstallOptions::default())
            .await
            .unwrap();

        let outcome = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Node, "nodejs", "20.10.0", false)
            .unwrap();

        assert!(outcome.was_active);
        assert!(h.user_path().is_empty());
    }

    #[test]
    fn uninstall_unknown_is_not_installed() {
        let mut h = Harness::new();
        let err = h
            .orchestrator(Fetch::Ok, Unpack::Flat)
            .uninstall(&ToolchainKind::Go, "golang", "1.23.5", true)
            .unwrap_err();
        assert!(matches!(err, SdkError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_download() {
        let mut h = Harness::new();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let err = h
            .orchestrator(Fetch::Hang, Unpack::Flat)
            .with_cancellation(rx)
            .install(&ToolchainKind::Java, "openjdk", "17.0.9", &InstallOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SdkError::Cancelled));
        assert!(h.inventory.list().is_empty());
        let leftovers = std::fs::read_dir(h.temp.path().join("cache")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn environment_failure_is_not_fatal() {
        let mut h = Harness::new();
        h.env.store().fail_writes(Scope::User);

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        assert!(
            h.inventory
                .get(&ToolchainKind::Java, "openjdk", "17.0.9")
                .is_some()
        );
        let report = outcome.environment.unwrap();
        assert!(!report.is_clean());
        assert!(report.errors.iter().any(|e| e.contains("JAVA_HOME")));
    }

    #[tokio::test]
    async fn elevated_install_mirrors_and_removes_conflicts() {
        let mut h = Harness::with_elevation(true);
        h.env
            .store()
            .seed(Scope::Machine, "PATH", "/opt/other/java/bin:/usr/bin");

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        let report = outcome.environment.unwrap();
        assert_eq!(report.conflicts, ["/opt/other/java/bin"]);
        let machine = h.env.path_entries(Scope::Machine).unwrap();
        assert_eq!(machine, [bin(&outcome.record), "/usr/bin".to_string()]);
        assert!(h.env.store().value(Scope::Machine, "JAVA_HOME").is_some());
    }

    #[tokio::test]
    async fn install_warns_about_inherited_system_installs() {
        let mut h = Harness::with_inherited_path("/usr/lib/jvm/java-17-openjdk/bin:/usr/bin");

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        let report = outcome.environment.unwrap();
        assert!(report.is_clean());
        assert!(report.conflicts.is_empty());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("/usr/lib/jvm/java-17-openjdk/bin"))
        );
        assert_eq!(h.user_path(), [bin(&outcome.record)]);
        assert!(h.env.path_entries(Scope::Machine).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unelevated_install_leaves_conflicts_with_guidance() {
        let mut h = Harness::new();
        h.env
            .store()
            .seed(Scope::Machine, "PATH", "/opt/other/java/bin:/usr/bin");

        let outcome = h.install(ToolchainKind::Java, "openjdk", "17.0.9").await;

        let report = outcome.environment.unwrap();
        assert!(report.is_clean());
        assert!(report.warnings.iter().any(|w| w.contains("/opt/other/java/bin")));
        assert_eq!(
            h.env.store().value(Scope::Machine, "PATH").as_deref(),
            Some("/opt/other/java/bin:/usr/bin")
        );
    }

    #[test]
    fn archive_file_name_strips_query() {
        assert_eq!(
            archive_file_name("https://x.test/a/jdk-17.tar.gz?token=1#frag"),
            "jdk-17.tar.gz"
        );
        assert_eq!(archive_file_name("https://x.test/"), "download");
    }
}
