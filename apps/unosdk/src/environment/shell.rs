//! Shell profile hook for the rendered environment scripts.
//!
//! The user's profile gets one marked line that sources the script
//! [`super::profile::ProfileEnvironment`] regenerates on every change:
//!
//! ```bash
//! # unosdk environment
//! [ -f '/home/u/.unosdk/env/unosdk.sh' ] && . '/home/u/.unosdk/env/unosdk.sh'
//! ```
//!
//! For fish:
//! ```fish
//! # unosdk environment
//! test -f '/home/u/.unosdk/env/unosdk.fish'; and source '/home/u/.unosdk/env/unosdk.fish'
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Scope, SdkError};

/// Marker comment that identifies the hook in a profile.
const MARKER: &str = "# unosdk environment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl Shell {
    /// Detects the user's shell from `SHELL`.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let shell_path = std::env::var("SHELL").ok()?;
        Self::from_path(&shell_path)
    }

    /// Parses a shell from a path such as `/bin/bash`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let shell_name = Path::new(path).file_name()?.to_str()?;
        match shell_name {
            "bash" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    #[must_use]
    pub fn profile_candidates(self, home_dir: &Path) -> Vec<PathBuf> {
        match self {
            Self::Bash => vec![home_dir.join(".bashrc"), home_dir.join(".bash_profile")],
            Self::Zsh => vec![home_dir.join(".zshrc")],
            Self::Fish => vec![home_dir.join(".config").join("fish").join("config.fish")],
        }
    }

    /// The profile snippet that sources the environment script for this shell.
    #[must_use]
    pub fn hook_snippet(self, sh_script: &Path, fish_script: &Path) -> String {
        format!("\n{MARKER}\n{}\n", self.source_line(sh_script, fish_script))
    }

    /// The command that loads the environment into the current shell.
    #[must_use]
    pub fn source_line(self, sh_script: &Path, fish_script: &Path) -> String {
        match self {
            Self::Bash | Self::Zsh => {
                let script = sh_quote(&sh_script.to_string_lossy());
                format!("[ -f {script} ] && . {script}")
            }
            Self::Fish => {
                let script = fish_quote(&fish_script.to_string_lossy());
                format!("test -f {script}; and source {script}")
            }
        }
    }
}

/// Outcome of hooking the environment script into a shell profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
    Added { profile: PathBuf, shell: Shell },
    AlreadyConfigured { profile: PathBuf, shell: Shell },
    NoProfileFound { shell: Shell },
    ShellNotDetected,
}

/// Hooks the scripts into the detected shell's profile, at most once.
///
/// # Errors
///
/// Returns [`SdkError::PathMutation`] if an existing profile cannot be read
/// or appended to. An undetected shell or a missing profile is not an error.
pub fn hook_profile(
    home: &Path,
    sh_script: &Path,
    fish_script: &Path,
) -> Result<HookResult, SdkError> {
    let Some(shell) = Shell::detect() else {
        return Ok(HookResult::ShellNotDetected);
    };
    hook_profile_for(shell, home, sh_script, fish_script)
}

pub(crate) fn hook_profile_for(
    shell: Shell,
    home: &Path,
    sh_script: &Path,
    fish_script: &Path,
) -> Result<HookResult, SdkError> {
    let candidates = shell.profile_candidates(home);
    let Some(profile) = candidates.iter().find(|p| p.exists()).cloned() else {
        return Ok(HookResult::NoProfileFound { shell });
    };

    let content = std::fs::read_to_string(&profile).map_err(|e| {
        SdkError::path_mutation_with_source(
            Scope::User,
            format!("failed to read profile {}", profile.display()),
            Box::new(e),
        )
    })?;
    if content.contains(MARKER) {
        return Ok(HookResult::AlreadyConfigured { profile, shell });
    }

    append_to_file(&profile, &shell.hook_snippet(sh_script, fish_script))?;
    tracing::info!(profile = %profile.display(), "hooked environment script into shell profile");
    Ok(HookResult::Added { profile, shell })
}

fn append_to_file(path: &Path, content: &str) -> Result<(), SdkError> {
    let failed = |e: std::io::Error| {
        SdkError::path_mutation_with_source(
            Scope::User,
            format!("failed to update profile {}", path.display()),
            Box::new(e),
        )
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(failed)?;
    file.write_all(content.as_bytes()).map_err(failed)
}

/// POSIX single-quoted literal.
#[must_use]
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Fish single-quoted literal.
#[must_use]
pub fn fish_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
}
