//! Path management for unosdk.
//!
//! The default root directory is `~/.unosdk/`, which can be overridden by
//! setting the `UNOSDK_HOME` environment variable.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.unosdk/                  # Root directory (or UNOSDK_HOME)
//!   sdks/                     # Canonical install directories
//!     java/openjdk/17.0.9/    # <kind>/<provider>/<version>
//!       jdk-17.0.9+9/         # Archive root, unwrapped as the install path
//!   cache/                    # Scratch space for downloads
//!   env/                      # User-scope environment files (Unix)
//!   registry.json             # Inventory of installed toolchains
//!   config.toml               # Optional settings
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::toolchain::kind::ToolchainKind;

/// Environment variable to override the default root directory.
pub const UNOSDK_HOME_ENV: &str = "UNOSDK_HOME";

const REGISTRY_FILE: &str = "registry.json";
const CONFIG_FILE: &str = "config.toml";

/// Resolved locations of everything unosdk keeps on disk.
#[derive(Debug, Clone)]
pub struct UnosdkPaths {
    /// Root directory (`~/.unosdk` or `UNOSDK_HOME`).
    pub root: PathBuf,
    /// Parent of all canonical install directories.
    pub sdks: PathBuf,
    /// Scratch area for downloads.
    pub cache: PathBuf,
    /// User-scope environment files on Unix.
    pub env: PathBuf,
}

impl UnosdkPaths {
    /// Resolves the root from `UNOSDK_HOME` or the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let root = if let Ok(home) = std::env::var(UNOSDK_HOME_ENV) {
            PathBuf::from(home)
        } else {
            dirs::home_dir()
                .context("Cannot determine home directory. Set UNOSDK_HOME environment variable.")?
                .join(".unosdk")
        };
        Ok(Self::with_root(root))
    }

    /// Creates paths under a known root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            sdks: root.join("sdks"),
            cache: root.join("cache"),
            env: root.join("env"),
            root,
        }
    }

    /// Applies directory overrides from `config.toml`.
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(dir) = &settings.install_dir {
            self.sdks = dir.clone();
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache = dir.clone();
        }
        self
    }

    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Creates the root, sdks and cache directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root, &self.sdks, &self.cache] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Joins `<sdks>/<kind>/<provider>/<version>`.
#[must_use]
pub fn canonical_install_dir(
    sdks: &Path,
    kind: &ToolchainKind,
    provider: &str,
    version: &str,
) -> PathBuf {
    sdks.join(kind.as_str()).join(provider).join(version)
}
