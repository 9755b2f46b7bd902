//! User and machine environment: PATH ordering and toolchain home variables.
//!
//! [`EnvironmentStore`] is the raw key-value surface of one host backend;
//! [`EnvironmentController`] layers PATH semantics, elevation checks and
//! conflict detection on top of it.
//!
//! ## Backends
//!
//! - Windows: [`registry::RegistryEnvironment`] (`HKCU` / `HKLM` via winreg)
//! - Unix: [`profile::ProfileEnvironment`] (TOML state rendered to shell scripts)
//! - Tests: `memory::MemoryEnvironment`

pub mod conflict;
pub mod controller;
#[cfg(test)]
pub mod memory;
#[cfg(unix)]
pub mod profile;
#[cfg(windows)]
pub mod registry;
#[cfg(unix)]
pub mod shell;

pub use controller::{EnvironmentController, same_entry};

pub use crate::errors::Scope;
use crate::errors::SdkError;

/// Name of the PATH-like variable managed at both scopes.
pub const PATH_VARIABLE: &str = "PATH";

/// Raw variable storage for one host.
///
/// Implementations do not check elevation; [`EnvironmentController`] does.
pub trait EnvironmentStore {
    /// Separator of PATH-like values (`;` on Windows, `:` elsewhere).
    fn separator(&self) -> char;

    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, SdkError>;

    /// # Errors
    ///
    /// Returns [`SdkError::PathMutation`] if the value cannot be stored.
    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), SdkError>;

    /// Removes a variable; absent variables are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::PathMutation`] if the storage cannot be updated.
    fn delete(&self, scope: Scope, name: &str) -> Result<(), SdkError>;

    /// Write-capability probe for machine scope.
    fn can_write_machine(&self) -> bool;

    /// Tells running processes that the environment changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    fn broadcast_change(&self) -> Result<(), SdkError>;

    /// What the user must do before new values take effect in their shell.
    fn activation_hint(&self) -> Option<String> {
        None
    }
}

#[cfg(windows)]
pub type HostEnvironment = registry::RegistryEnvironment;

#[cfg(unix)]
pub type HostEnvironment = profile::ProfileEnvironment;

/// Environment backend for the current host.
#[cfg(windows)]
#[must_use]
pub fn host_environment(
    _paths: &crate::toolchain::UnosdkPaths,
    _settings: &crate::config::Settings,
) -> HostEnvironment {
    registry::RegistryEnvironment::new()
}

/// Environment backend for the current host.
#[cfg(unix)]
#[must_use]
pub fn host_environment(
    paths: &crate::toolchain::UnosdkPaths,
    settings: &crate::config::Settings,
) -> HostEnvironment {
    profile::ProfileEnvironment::new(
        paths.env.clone(),
        settings.machine_dir(),
        settings.machine_script(),
        dirs::home_dir(),
    )
}
