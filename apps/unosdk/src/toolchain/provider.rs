//! Provider contract and the registry that dispatches on `(kind, name)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::SdkError;
use crate::toolchain::catalog;
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::{Arch, Os};

/// Literal accepted in place of a concrete version.
pub const LATEST: &str = "latest";

/// A source of one toolchain family (e.g. Temurin builds of Java).
pub trait Provider: Send + Sync {
    /// Registry key, e.g. `openjdk`.
    fn name(&self) -> &str;

    /// Human-readable name, e.g. `Eclipse Temurin (OpenJDK)`.
    fn display_name(&self) -> &str;

    fn kind(&self) -> ToolchainKind;

    /// Versions on offer, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the version list cannot be produced.
    fn list_versions(&self) -> Result<Vec<String>, SdkError>;

    /// # Errors
    ///
    /// Returns an error if the provider offers no versions.
    fn latest_version(&self) -> Result<String, SdkError>;

    /// Artifact URL for a concrete version.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::InvalidVersion`] for versions not on offer and
    /// [`SdkError::UnsupportedPlatform`] when the host os/arch has no artifact.
    fn download_url(&self, version: &str, arch: Arch) -> Result<String, SdkError>;

    /// Published SHA-256 of the artifact, when the vendor provides one.
    fn checksum(&self, version: &str, arch: Arch) -> Option<String>;

    /// Canonical install directory for `version`.
    fn default_install_path(&self, version: &str) -> PathBuf;

    /// # Errors
    ///
    /// Returns [`SdkError::InvalidVersion`] if `version` is malformed or not offered.
    fn validate(&self, version: &str) -> Result<(), SdkError>;
}

/// Validates `requested` and maps `latest` to a concrete version.
///
/// # Errors
///
/// Propagates validation failures from the provider.
pub fn resolve_version(provider: &dyn Provider, requested: &str) -> Result<String, SdkError> {
    let requested = requested.trim();
    provider.validate(requested)?;
    if requested.eq_ignore_ascii_case(LATEST) {
        provider.latest_version()
    } else {
        Ok(requested.to_string())
    }
}

/// Rejects strings that cannot safely become a directory name.
///
/// # Errors
///
/// Returns [`SdkError::InvalidVersion`] describing the first problem found.
pub fn check_version_syntax(version: &str) -> Result<(), SdkError> {
    if version.is_empty() {
        return Err(SdkError::invalid_version(version, "version cannot be empty"));
    }
    if version.contains(['/', '\\']) || version.contains("..") {
        return Err(SdkError::invalid_version(
            version,
            "version must not contain path separators or '..'",
        ));
    }
    if version.chars().any(char::is_whitespace) {
        return Err(SdkError::invalid_version(
            version,
            "version must not contain whitespace",
        ));
    }
    Ok(())
}

/// Providers keyed by `(kind, name)`.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<(ToolchainKind, String), Box<dyn Provider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in catalog for `os`.
    #[must_use]
    pub fn builtin(sdks: &Path, os: Os) -> Self {
        let mut registry = Self::new();
        for provider in catalog::builtin_providers(sdks, os) {
            registry.register(Box::new(provider));
        }
        registry
    }

    /// Adds a provider, replacing any previous one with the same key.
    pub fn register(&mut self, provider: Box<dyn Provider>) {
        let key = (provider.kind(), provider.name().to_ascii_lowercase());
        self.providers.insert(key, provider);
    }

    /// Looks up a provider; names compare case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ProviderNotFound`] for unknown pairs.
    pub fn get(&self, kind: &ToolchainKind, name: &str) -> Result<&dyn Provider, SdkError> {
        self.providers
            .get(&(kind.clone(), name.trim().to_ascii_lowercase()))
            .map(|p| p.as_ref())
            .ok_or_else(|| SdkError::provider_not_found(kind.as_str(), name))
    }

    pub fn list_by_kind<'a>(
        &'a self,
        kind: &'a ToolchainKind,
    ) -> impl Iterator<Item = &'a dyn Provider> + 'a {
        self.providers
            .iter()
            .filter(move |((k, _), _)| k == kind)
            .map(|(_, p)| p.as_ref())
    }

    pub fn list_all(&self) -> impl Iterator<Item = &dyn Provider> {
        self.providers.values().map(|p| p.as_ref())
    }
}
