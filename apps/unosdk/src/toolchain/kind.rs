//! Toolchain families.
//!
//! The known families are enumerated so the rest of the code can match on
//! them, but any other key is preserved as [`ToolchainKind::Other`] so an
//! inventory written by a newer build still loads.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A family of developer tools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolchainKind {
    Java,
    Node,
    Python,
    Go,
    Maven,
    Gradle,
    Flutter,
    C,
    Cpp,
    Other(String),
}

impl ToolchainKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Java => "java",
            Self::Node => "node",
            Self::Python => "python",
            Self::Go => "go",
            Self::Maven => "maven",
            Self::Gradle => "gradle",
            Self::Flutter => "flutter",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Other(key) => key,
        }
    }
}

impl FromStr for ToolchainKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Ok(match key.as_str() {
            "java" => Self::Java,
            "node" | "nodejs" => Self::Node,
            "python" => Self::Python,
            "go" | "golang" => Self::Go,
            "maven" => Self::Maven,
            "gradle" => Self::Gradle,
            "flutter" => Self::Flutter,
            "c" => Self::C,
            "cpp" | "c++" => Self::Cpp,
            _ => Self::Other(key),
        })
    }
}

impl From<&str> for ToolchainKind {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ToolchainKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ToolchainKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}
