//! Persisted inventory of installed toolchains.
//!
//! The inventory is a single JSON object keyed by `kind:provider:version`:
//!
//! ```json
//! {
//!   "java:openjdk:17.0.9": {
//!     "kind": "java",
//!     "provider": "openjdk",
//!     "version": "17.0.9",
//!     "install_path": "/home/u/.unosdk/sdks/java/openjdk/17.0.9/jdk-17.0.9+9",
//!     "download_url": "https://github.com/adoptium/...",
//!     "checksum": "4c2f...",
//!     "installed": true,
//!     "installed_at": "2026-01-05T10:12:44Z"
//!   }
//! }
//! ```
//!
//! Every mutation rewrites the whole file through a temporary sibling and a
//! rename, so a crash never leaves a half-written document behind.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SdkError;
use crate::toolchain::kind::ToolchainKind;

/// One installed toolchain. Identity is `(kind, provider, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledToolchain {
    pub kind: ToolchainKind,
    pub provider: String,
    pub version: String,
    /// Effective root of the toolchain (after single-folder unwrap).
    pub install_path: PathBuf,
    #[serde(default)]
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default = "default_installed")]
    pub installed: bool,
    pub installed_at: DateTime<Utc>,
}

fn default_installed() -> bool {
    true
}

impl InstalledToolchain {
    #[must_use]
    pub fn key(&self) -> String {
        identity_key(&self.kind, &self.provider, &self.version)
    }

    /// `java openjdk 17.0.9` style label for messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {} {}", self.kind, self.provider, self.version)
    }
}

/// `kind:provider:version`, the inventory's identity key.
#[must_use]
pub fn identity_key(kind: &ToolchainKind, provider: &str, version: &str) -> String {
    format!("{}:{}:{}", kind.as_str(), provider, version)
}

/// Owner of the inventory file and its in-memory mirror.
#[derive(Debug)]
pub struct InventoryStore {
    path: PathBuf,
    records: BTreeMap<String, InstalledToolchain>,
}

impl InventoryStore {
    /// Loads the inventory at `path`. A missing file is an empty inventory.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::CorruptInventory`] if the file cannot be parsed and
    /// [`SdkError::Io`] if it exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SdkError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| SdkError::CorruptInventory {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                BTreeMap::new()
            }
            Err(e) => {
                return Err(SdkError::io(
                    format!("failed to read inventory {}", path.display()),
                    e,
                ));
            }
        };
        tracing::debug!(path = %path.display(), records = records.len(), "inventory loaded");
        Ok(Self { path, records })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or overwrites `record` by identity and persists.
    ///
    /// The in-memory view is updated even when persisting fails.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Persistence`] if the file cannot be written.
    pub fn upsert(&mut self, record: InstalledToolchain) -> Result<(), SdkError> {
        let key = record.key();
        tracing::debug!(%key, "inventory upsert");
        self.records.insert(key, record);
        self.persist()
    }

    /// Removes a record by identity and persists. Absent records are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Persistence`] if the file cannot be written.
    pub fn remove(
        &mut self,
        kind: &ToolchainKind,
        provider: &str,
        version: &str,
    ) -> Result<(), SdkError> {
        let key = identity_key(kind, provider, version);
        if self.records.remove(&key).is_none() {
            return Ok(());
        }
        tracing::debug!(%key, "inventory remove");
        self.persist()
    }

    #[must_use]
    pub fn get(
        &self,
        kind: &ToolchainKind,
        provider: &str,
        version: &str,
    ) -> Option<InstalledToolchain> {
        self.records
            .get(&identity_key(kind, provider, version))
            .cloned()
    }

    /// Snapshot of every record, ordered by key.
    #[must_use]
    pub fn list(&self) -> Vec<InstalledToolchain> {
        self.records.values().cloned().collect()
    }

    #[must_use]
    pub fn list_by_kind(&self, kind: &ToolchainKind) -> Vec<InstalledToolchain> {
        self.records
            .values()
            .filter(|r| &r.kind == kind)
            .cloned()
            .collect()
    }

    fn persist(&self) -> Result<(), SdkError> {
        write_json_atomic(&self.path, &self.records).map_err(|source| SdkError::Persistence {
            path: self.path.clone(),
            source,
        })
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ToolchainKind, provider: &str, version: &str) -> InstalledToolchain {
        InstalledToolchain {
            kind,
            provider: provider.to_string(),
            version: version.to_string(),
            install_path: PathBuf::from(format!("/sdks/{provider}/{version}")),
            download_url: format!("https://example.com/{provider}-{version}.zip"),
            checksum: Some("abc123".to_string()),
            installed: true,
            installed_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_then_get_round_trips_through_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.json");
        let jdk = record(ToolchainKind::Java, "openjdk", "17.0.9");

        let mut store = InventoryStore::open(&path).unwrap();
        store.upsert(jdk.clone()).unwrap();
        assert_eq!(
            store.get(&ToolchainKind::Java, "openjdk", "17.0.9"),
            Some(jdk.clone())
        );

        let reopened = InventoryStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(&ToolchainKind::Java, "openjdk", "17.0.9"),
            Some(jdk)
        );
    }

    #[test]
    fn file_is_keyed_by_identity() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.json");
        let mut store = InventoryStore::open(&path).unwrap();
        store
            .upsert(record(ToolchainKind::Java, "openjdk", "17.0.9"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["java:openjdk:17.0.9"]["kind"], "java");
        assert_eq!(raw["java:openjdk:17.0.9"]["installed"], true);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = InventoryStore::open(temp.path().join("registry.json")).unwrap();
        store
            .upsert(record(ToolchainKind::Node, "nodejs", "20.10.0"))
            .unwrap();

        store
            .remove(&ToolchainKind::Node, "nodejs", "20.10.0")
            .unwrap();

        assert!(store.get(&ToolchainKind::Node, "nodejs", "20.10.0").is_none());
        store
            .remove(&ToolchainKind::Node, "nodejs", "20.10.0")
            .unwrap();
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = InventoryStore::open(temp.path().join("registry.json")).unwrap();
        store
            .upsert(record(ToolchainKind::Go, "golang", "1.23.5"))
            .unwrap();

        let mut updated = record(ToolchainKind::Go, "golang", "1.23.5");
        updated.install_path = PathBuf::from("/elsewhere");
        store.upsert(updated).unwrap();

        let all = store.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].install_path, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn list_by_kind_filters() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = InventoryStore::open(temp.path().join("registry.json")).unwrap();
        store
            .upsert(record(ToolchainKind::Java, "openjdk", "17.0.9"))
            .unwrap();
        store
            .upsert(record(ToolchainKind::Java, "graalvm", "21.0.2"))
            .unwrap();
        store
            .upsert(record(ToolchainKind::Maven, "apache", "3.9.9"))
            .unwrap();

        assert_eq!(store.list_by_kind(&ToolchainKind::Java).len(), 2);
        assert_eq!(store.list_by_kind(&ToolchainKind::Flutter).len(), 0);
    }

    #[test]
    fn missing_file_is_empty_inventory() {
        let temp = tempfile::tempdir().unwrap();
        let store = InventoryStore::open(temp.path().join("registry.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = InventoryStore::open(&path).unwrap_err();

        assert!(matches!(err, SdkError::CorruptInventory { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn persistence_failure_still_updates_memory() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let mut store = InventoryStore::open(blocker.join("registry.json")).unwrap();

        let err = store
            .upsert(record(ToolchainKind::Flutter, "flutter", "3.27.2"))
            .unwrap_err();

        assert!(matches!(err, SdkError::Persistence { .. }));
        assert!(
            store
                .get(&ToolchainKind::Flutter, "flutter", "3.27.2")
                .is_some()
        );
    }

    #[test]
    fn unknown_kind_survives_reload() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.json");
        let zig = ToolchainKind::from("zig");
        let mut store = InventoryStore::open(&path).unwrap();
        store.upsert(record(zig.clone(), "ziglang", "0.13.0")).unwrap();

        let reopened = InventoryStore::open(&path).unwrap();
        assert!(reopened.get(&zig, "ziglang", "0.13.0").is_some());
    }
}
