//! Which directories of an install go on PATH, and which home variable
//! points at it, per toolchain kind.

use std::path::{Path, PathBuf};

use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::platform::Os;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindLayout {
    /// PATH directories, most important first.
    pub path_dirs: Vec<PathBuf>,
    /// Home variable set to the install root, if the kind has one.
    pub home_variable: Option<&'static str>,
}

impl KindLayout {
    /// The directory whose presence in PATH marks the install as active.
    #[must_use]
    pub fn primary_dir(&self) -> Option<&Path> {
        self.path_dirs.first().map(PathBuf::as_path)
    }
}

#[must_use]
pub fn home_variable(kind: &ToolchainKind) -> Option<&'static str> {
    match kind {
        ToolchainKind::Java => Some("JAVA_HOME"),
        ToolchainKind::Go => Some("GOROOT"),
        ToolchainKind::Maven => Some("MAVEN_HOME"),
        ToolchainKind::Gradle => Some("GRADLE_HOME"),
        ToolchainKind::Flutter => Some("FLUTTER_ROOT"),
        _ => None,
    }
}

#[must_use]
pub fn layout_for(kind: &ToolchainKind, install_path: &Path, os: Os) -> KindLayout {
    let bin = install_path.join("bin");
    let path_dirs = match kind {
        ToolchainKind::Node if os.is_windows() => vec![install_path.to_path_buf()],
        ToolchainKind::Python if os.is_windows() => {
            vec![install_path.to_path_buf(), install_path.join("Scripts")]
        }
        _ => vec![bin],
    };
    KindLayout {
        path_dirs,
        home_variable: home_variable(kind),
    }
}
