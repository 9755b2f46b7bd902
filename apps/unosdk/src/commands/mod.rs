//! Command implementations for the unosdk CLI.
//!
//! Each submodule implements a specific command:
//!
//! - [`install`] - Download, unpack and activate a toolchain
//! - [`switch`] - Make an installed toolchain the active one
//! - [`uninstall`] - Remove an installed toolchain
//! - [`list`] - List installed or available toolchains
//! - [`versions`] - List the versions a provider offers
//! - [`doctor`] - Check inventory, disk and environment consistency
//!
//! All commands share a [`Session`] that wires the core layers together.

pub mod doctor;
pub mod install;
pub mod list;
pub mod switch;
pub mod uninstall;
pub mod versions;

use anyhow::Result;
use tokio::sync::watch;

use crate::config::Settings;
use crate::environment::{EnvironmentController, HostEnvironment, host_environment};
use crate::inventory::InventoryStore;
use crate::lifecycle::{EnvironmentReport, Orchestrator};
use crate::toolchain::download::terminal_progress;
use crate::toolchain::platform::Os;
use crate::toolchain::{ArchiveExtractor, HttpDownloader, ProviderRegistry, UnosdkPaths};

/// Collaborators every command works against, built from the host.
pub struct Session {
    pub paths: UnosdkPaths,
    pub settings: Settings,
    pub providers: ProviderRegistry,
    pub inventory: InventoryStore,
    pub environment: EnvironmentController<HostEnvironment>,
}

impl Session {
    /// Resolves the root directory, reads `config.toml` and opens the
    /// inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, the
    /// configuration is malformed, or the inventory file is corrupt.
    pub fn load() -> Result<Self> {
        let base = UnosdkPaths::new()?;
        let settings = Settings::load(&base.config_file())?;
        let paths = base.with_settings(&settings);
        let inventory = InventoryStore::open(paths.registry_file())?;
        let providers = ProviderRegistry::builtin(&paths.sdks, Os::current());
        let environment = EnvironmentController::new(host_environment(&paths, &settings))
            .with_managed_root(&paths.sdks)
            .with_inherited_path(std::env::var("PATH").ok());
        tracing::debug!(root = %paths.root.display(), "session loaded");
        Ok(Self {
            paths,
            settings,
            providers,
            inventory,
            environment,
        })
    }

    /// Orchestrator over the real downloader and extractor.
    pub fn orchestrator(
        &mut self,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Orchestrator<'_, HostEnvironment, HttpDownloader, ArchiveExtractor> {
        let downloader =
            HttpDownloader::new(self.settings.download_retries()).with_progress(terminal_progress());
        let orchestrator = Orchestrator::new(
            &self.providers,
            &mut self.inventory,
            &self.environment,
            downloader,
            ArchiveExtractor,
            self.paths.cache.clone(),
        )
        .with_auto_remediate(self.settings.environment.auto_remediate_conflicts);
        match cancel {
            Some(cancel) => orchestrator.with_cancellation(cancel),
            None => orchestrator,
        }
    }
}

/// Prints what environment wiring did. Problems go to stderr.
pub(crate) fn print_environment_report(report: &EnvironmentReport) {
    for action in &report.actions {
        println!("  {action}");
    }
    for warning in &report.warnings {
        eprintln!("Warning: {warning}");
    }
    if !report.errors.is_empty() {
        for error in &report.errors {
            eprintln!("Error: {error}");
        }
        eprintln!("The toolchain is installed, but the environment could not be fully updated.");
    }
    if let Some(hint) = &report.hint {
        println!();
        println!("{hint}");
    }
}
