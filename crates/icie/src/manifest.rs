//! Per-project record persisted as `.icie` in the project root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = ".icie";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub task_url: String,
}

impl Manifest {
    pub fn new(task_url: impl Into<String>) -> Self {
        Self {
            task_url: task_url.into(),
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    pub async fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::io("failed to serialize manifest", std::io::Error::other(e)))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))?;
        tracing::debug!(path = %path.display(), "Manifest saved");
        Ok(())
    }

    /// Read the manifest from disk. Never cached.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ManifestMissing(root.to_path_buf()));
            }
            Err(e) => {
                return Err(Error::io(format!("failed to read {}", path.display()), e));
            }
        };
        serde_json::from_slice(&raw).map_err(|e| Error::ManifestCorrupt {
            path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new("https://codeforces.com/contest/1350/problem/B");
        manifest.save(dir.path()).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(".icie")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"task_url": "https://codeforces.com/contest/1350/problem/B"})
        );
        assert_eq!(Manifest::load(dir.path()).await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn load_rereads_disk() {
        let dir = tempfile::tempdir().unwrap();
        Manifest::new("https://a").save(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(".icie"), r#"{"task_url":"https://b"}"#).unwrap();
        assert_eq!(Manifest::load(dir.path()).await.unwrap().task_url, "https://b");
    }

    #[tokio::test]
    async fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ManifestMissing(_)));
    }

    #[tokio::test]
    async fn corrupt_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".icie"), "{\"task_url\": 42}").unwrap();
        let err = Manifest::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ManifestCorrupt { .. }));
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails_with_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::new("https://a")
            .save(&dir.path().join("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
