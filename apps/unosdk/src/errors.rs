//! Error types for unosdk.
//!
//! `SdkError` is the error type of the core layers (inventory, environment,
//! lifecycle, toolchain). The command layer wraps it in `anyhow::Error` so
//! that `main` can print one readable message and pick the exit code.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Environment scope a variable lives in.
///
/// Defined here rather than in `environment` because several error variants
/// carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Per-user variables, always writable.
    User,
    /// Machine-wide variables, writable only with elevation.
    Machine,
}

impl Scope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Machine => "machine",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Consolidated error type for unosdk operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No provider is registered for the `(kind, provider)` pair.
    #[error("provider not found: {kind}:{provider}\nRun 'unosdk list --available' to see registered providers.")]
    ProviderNotFound { kind: String, provider: String },

    /// The version string was rejected by the provider.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// The provider has no artifact for this os/arch combination.
    #[error("unsupported platform: {message}")]
    UnsupportedPlatform { message: String },

    /// Network or transfer failure.
    #[error("download error: {message}")]
    Download {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The downloaded archive does not match the published checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Archive could not be unpacked.
    #[error("extraction error: {message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The inventory file could not be written.
    #[error("failed to persist inventory to {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The inventory file exists but cannot be parsed.
    #[error(
        "inventory file {} is corrupt; fix or move it aside before retrying",
        path.display()
    )]
    CorruptInventory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The requested toolchain is not in the inventory.
    #[error(
        "{kind} {provider} {version} is not installed\nRun 'unosdk install {kind} {provider} {version}' to install it first."
    )]
    NotInstalled {
        kind: String,
        provider: String,
        version: String,
    },

    /// A machine-scope change was attempted without elevation.
    #[error(
        "{operation} requires administrator privileges; re-run from an elevated shell or apply the change manually"
    )]
    ElevationRequired { operation: String },

    /// A PATH-like or home variable could not be updated.
    #[error("failed to update {scope} environment: {message}")]
    PathMutation {
        scope: Scope,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// `config.toml` exists but is malformed.
    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Filesystem failure outside the inventory file.
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The operation was interrupted by the user.
    #[error("operation cancelled")]
    Cancelled,
}

impl SdkError {
    #[must_use]
    pub fn provider_not_found(kind: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            kind: kind.into(),
            provider: provider.into(),
        }
    }

    #[must_use]
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn download_with_source(message: impl Into<String>, source: BoxedSource) -> Self {
        Self::Download {
            message: message.into(),
            source: Some(source),
        }
    }

    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn extraction_with_source(message: impl Into<String>, source: BoxedSource) -> Self {
        Self::Extraction {
            message: message.into(),
            source: Some(source),
        }
    }

    #[must_use]
    pub fn not_installed(
        kind: impl Into<String>,
        provider: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::NotInstalled {
            kind: kind.into(),
            provider: provider.into(),
            version: version.into(),
        }
    }

    #[must_use]
    pub fn elevation_required(operation: impl Into<String>) -> Self {
        Self::ElevationRequired {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn path_mutation(scope: Scope, message: impl Into<String>) -> Self {
        Self::PathMutation {
            scope,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn path_mutation_with_source(
        scope: Scope,
        message: impl Into<String>,
        source: BoxedSource,
    ) -> Self {
        Self::PathMutation {
            scope,
            message: message.into(),
            source: Some(source),
        }
    }

    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns true for the expected, non-fatal "not elevated" condition.
    #[must_use]
    pub fn is_elevation_required(&self) -> bool {
        matches!(self, Self::ElevationRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_installed_tells_user_how_to_install() {
        let err = SdkError::not_installed("java", "openjdk", "17.0.9");
        let message = err.to_string();
        assert!(message.contains("java openjdk 17.0.9 is not installed"));
        assert!(message.contains("unosdk install java openjdk 17.0.9"));
    }

    #[test]
    fn provider_not_found_displays_key() {
        let err = SdkError::provider_not_found("java", "acme");
        assert!(err.to_string().starts_with("provider not found: java:acme"));
    }

    #[test]
    fn checksum_mismatch_displays_both_values() {
        let err = SdkError::checksum_mismatch("abc123", "def456");
        assert_eq!(
            err.to_string(),
            "checksum mismatch: expected abc123, got def456"
        );
    }

    #[test]
    fn path_mutation_names_scope() {
        let err = SdkError::path_mutation(Scope::Machine, "registry key is read-only");
        assert_eq!(
            err.to_string(),
            "failed to update machine environment: registry key is read-only"
        );
    }

    #[test]
    fn elevation_required_is_recognised() {
        let err = SdkError::elevation_required("updating machine PATH");
        assert!(err.is_elevation_required());
        assert!(!SdkError::Cancelled.is_elevation_required());
    }

    #[test]
    fn corrupt_inventory_points_at_file() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SdkError::CorruptInventory {
            path: PathBuf::from("/tmp/registry.json"),
            source,
        };
        assert!(err.to_string().contains("/tmp/registry.json is corrupt"));
    }
}
