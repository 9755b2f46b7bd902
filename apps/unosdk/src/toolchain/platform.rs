//! Host OS and CPU architecture.
//!
//! Providers name their artifacts with vendor-specific spellings; the
//! canonical forms here are translated by each provider.

use std::fmt;
use std::str::FromStr;

use crate::errors::SdkError;

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Linux,
    Macos,
}

impl Os {
    /// Detects the OS this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else {
            Self::Linux
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Macos => "macos",
        }
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Preferred archive extension for vendors that publish both.
    #[must_use]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    X86,
    Arm64,
}

impl Arch {
    /// Detects the architecture this binary was compiled for, defaulting to x64.
    #[must_use]
    pub fn current() -> Self {
        std::env::consts::ARCH.parse().unwrap_or(Self::X64)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
        }
    }
}

impl FromStr for Arch {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x64" | "amd64" | "x86_64" => Ok(Self::X64),
            "x86" | "386" | "i386" | "i686" | "x86-32" => Ok(Self::X86),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(SdkError::unsupported_platform(format!(
                "unknown architecture '{other}' (expected x64, x86 or arm64)"
            ))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
