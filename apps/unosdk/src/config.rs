//! Optional user settings read from `<root>/config.toml`.
//!
//! Every key is optional; a missing file yields the defaults.
//!
//! ```toml
//! install_dir = "D:/sdks"
//! default_arch = "x64"
//! download_retries = 5
//!
//! [environment]
//! machine_dir = "/etc/unosdk"
//! auto_remediate_conflicts = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::SdkError;
use crate::toolchain::platform::Arch;

/// Overrides the machine-scope directory on Unix hosts.
pub const MACHINE_DIR_ENV: &str = "UNOSDK_MACHINE_DIR";

const DEFAULT_MACHINE_DIR: &str = "/etc/unosdk";
const DEFAULT_MACHINE_SCRIPT: &str = "/etc/profile.d/unosdk.sh";
const DEFAULT_DOWNLOAD_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Replaces `<root>/sdks` as the parent of install directories.
    pub install_dir: Option<PathBuf>,
    /// Replaces `<root>/cache` as the download scratch area.
    pub cache_dir: Option<PathBuf>,
    /// Architecture used when `--arch` is not given.
    pub default_arch: Option<String>,
    pub download_retries: Option<u32>,
    pub environment: EnvironmentSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSettings {
    /// Where machine-scope variables are stored on Unix.
    pub machine_dir: Option<PathBuf>,
    /// Login script that exports machine-scope variables on Unix.
    pub machine_script: Option<PathBuf>,
    /// Remove conflicting machine PATH entries automatically when elevated.
    pub auto_remediate_conflicts: bool,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            machine_dir: None,
            machine_script: None,
            auto_remediate_conflicts: true,
        }
    }
}

impl Settings {
    /// Reads settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, SdkError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SdkError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };
        toml::from_str(&content).map_err(|e| SdkError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Architecture from `default_arch`, or the host architecture.
    ///
    /// # Errors
    ///
    /// Returns an error if `default_arch` names an unknown architecture.
    pub fn arch(&self) -> Result<Arch, SdkError> {
        match &self.default_arch {
            Some(arch) => arch.parse(),
            None => Ok(Arch::current()),
        }
    }

    #[must_use]
    pub fn download_retries(&self) -> u32 {
        self.download_retries
            .unwrap_or(DEFAULT_DOWNLOAD_RETRIES)
            .max(1)
    }

    /// Machine-scope directory: `UNOSDK_MACHINE_DIR`, then config, then `/etc/unosdk`.
    #[must_use]
    pub fn machine_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(MACHINE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        self.environment
            .machine_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MACHINE_DIR))
    }

    /// Machine login script. Lives next to a relocated machine directory.
    #[must_use]
    pub fn machine_script(&self) -> PathBuf {
        if let Some(script) = &self.environment.machine_script {
            return script.clone();
        }
        let dir = self.machine_dir();
        if dir == Path::new(DEFAULT_MACHINE_DIR) {
            PathBuf::from(DEFAULT_MACHINE_SCRIPT)
        } else {
            dir.join("unosdk.sh")
        }
    }
}
