//! Unix environment backend: TOML state rendered into shell scripts.
//!
//! Unix has no persistent per-user or machine environment store, so each
//! scope keeps its variables in a small TOML file and every change re-renders
//! a script that login shells source:
//!
//! | scope   | state                     | script                              |
//! |---------|---------------------------|-------------------------------------|
//! | user    | `<root>/env/user.toml`    | `<root>/env/unosdk.sh`, `unosdk.fish` |
//! | machine | `<machine_dir>/machine.toml` | `machine_script` (POSIX only)    |
//!
//! The stored PATH holds only the managed directories; the script prepends
//! them to whatever PATH the shell already has.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::shell::{self, HookResult, Shell, fish_quote, sh_quote};
use crate::environment::{EnvironmentStore, PATH_VARIABLE, Scope};
use crate::errors::SdkError;

const SCRIPT_HEADER: &str = "# Generated by unosdk. Changes are overwritten on the next install or switch.";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScopeState {
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

pub struct ProfileEnvironment {
    env_dir: PathBuf,
    machine_dir: PathBuf,
    machine_script: PathBuf,
    home: Option<PathBuf>,
    hook: OnceCell<HookResult>,
}

impl ProfileEnvironment {
    /// `home` is the directory whose shell profile gets hooked; `None` skips
    /// profile hooking entirely.
    #[must_use]
    pub fn new(
        env_dir: PathBuf,
        machine_dir: PathBuf,
        machine_script: PathBuf,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            env_dir,
            machine_dir,
            machine_script,
            home,
            hook: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn user_script(&self) -> PathBuf {
        self.env_dir.join("unosdk.sh")
    }

    #[must_use]
    pub fn user_fish_script(&self) -> PathBuf {
        self.env_dir.join("unosdk.fish")
    }

    fn state_file(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::User => self.env_dir.join("user.toml"),
            Scope::Machine => self.machine_dir.join("machine.toml"),
        }
    }

    fn load(&self, scope: Scope) -> Result<ScopeState, SdkError> {
        let path = self.state_file(scope);
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| SdkError::Config {
                path,
                message: e.message().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ScopeState::default()),
            Err(e) => Err(SdkError::io(
                format!("failed to read {}", path.display()),
                e,
            )),
        }
    }

    fn save(&self, scope: Scope, state: &ScopeState) -> Result<(), SdkError> {
        let serialized = toml::to_string_pretty(state).map_err(|e| {
            SdkError::path_mutation_with_source(scope, "failed to serialize variables", Box::new(e))
        })?;
        write_atomic(scope, &self.state_file(scope), &serialized)?;

        match scope {
            Scope::User => {
                write_atomic(scope, &self.user_script(), &render_sh(&state.variables))?;
                write_atomic(scope, &self.user_fish_script(), &render_fish(&state.variables))?;
                self.ensure_hooked();
            }
            Scope::Machine => {
                write_atomic(scope, &self.machine_script, &render_sh(&state.variables))?;
            }
        }
        Ok(())
    }

    fn ensure_hooked(&self) {
        if self.hook.get().is_some() {
            return;
        }
        let Some(home) = &self.home else {
            return;
        };
        match shell::hook_profile(home, &self.user_script(), &self.user_fish_script()) {
            Ok(result) => {
                let _ = self.hook.set(result);
            }
            Err(e) => tracing::warn!(error = %e, "could not hook shell profile"),
        }
    }
}

impl EnvironmentStore for ProfileEnvironment {
    fn separator(&self) -> char {
        ':'
    }

    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, SdkError> {
        Ok(self.load(scope)?.variables.get(name).cloned())
    }

    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), SdkError> {
        let mut state = self.load(scope)?;
        state.variables.insert(name.to_string(), value.to_string());
        self.save(scope, &state)
    }

    fn delete(&self, scope: Scope, name: &str) -> Result<(), SdkError> {
        let mut state = self.load(scope)?;
        if state.variables.remove(name).is_none() {
            return Ok(());
        }
        self.save(scope, &state)
    }

    fn can_write_machine(&self) -> bool {
        let mut dirs = vec![self.machine_dir.as_path()];
        if let Some(parent) = self.machine_script.parent() {
            dirs.push(parent);
        }
        dirs.into_iter().all(|dir| {
            std::fs::create_dir_all(dir).is_ok() && tempfile::NamedTempFile::new_in(dir).is_ok()
        })
    }

    fn broadcast_change(&self) -> Result<(), SdkError> {
        Ok(())
    }

    fn activation_hint(&self) -> Option<String> {
        let sh_script = self.user_script();
        let fish_script = self.user_fish_script();
        let hint = match self.hook.get() {
            Some(HookResult::Added { shell, .. } | HookResult::AlreadyConfigured { shell, .. }) => {
                format!(
                    "Open a new shell, or run this to update the current one:\n  {}",
                    shell.source_line(&sh_script, &fish_script)
                )
            }
            Some(HookResult::NoProfileFound { shell }) => format!(
                "Could not find a shell profile. To load the environment in every shell, add to your profile:\n  {}",
                shell.source_line(&sh_script, &fish_script)
            ),
            Some(HookResult::ShellNotDetected) | None => format!(
                "To load the environment, add to your shell profile:\n  {}",
                Shell::Bash.source_line(&sh_script, &fish_script)
            ),
        };
        Some(hint)
    }
}

fn render_sh(variables: &BTreeMap<String, String>) -> String {
    let mut lines = vec![SCRIPT_HEADER.to_string()];
    for (name, value) in variables {
        if name == PATH_VARIABLE {
            lines.push(format!("export PATH={}:\"$PATH\"", sh_quote(value)));
        } else {
            lines.push(format!("export {name}={}", sh_quote(value)));
        }
    }
    lines.join("\n") + "\n"
}

fn render_fish(variables: &BTreeMap<String, String>) -> String {
    let mut lines = vec![SCRIPT_HEADER.to_string()];
    for (name, value) in variables {
        if name == PATH_VARIABLE {
            let entries: Vec<String> = value
                .split(':')
                .filter(|e| !e.is_empty())
                .map(fish_quote)
                .collect();
            lines.push(format!("set -gx PATH {} $PATH", entries.join(" ")));
        } else {
            lines.push(format!("set -gx {name} {}", fish_quote(value)));
        }
    }
    lines.join("\n") + "\n"
}

/// Replaces `path` through a sibling temp file; the result is world-readable
/// so machine scripts work for every user.
fn write_atomic(scope: Scope, path: &Path, contents: &str) -> Result<(), SdkError> {
    let failed = |e: std::io::Error| {
        SdkError::path_mutation_with_source(
            scope,
            format!("failed to write {}", path.display()),
            Box::new(e),
        )
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(failed)?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(failed)?;
    file.write_all(contents.as_bytes()).map_err(failed)?;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(failed)?;
    file.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}
