//! File-backed key-value store
//!
//! Each key maps to one file under the store directory. Writes go to a
//! temporary sibling first, are synced, then renamed over the target so that
//! a crash mid-write leaves the previous value intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use waypoint_core::KeyValueStore;
use waypoint_domain::{StorageError, StorageResult};

/// Durable [`KeyValueStore`] rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path backing `key`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so that keys can
    /// never escape the store directory.
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.chars().all(|c| c == '.') {
            return Err(StorageError::Unavailable(format!("invalid storage key: {key:?}")));
        }

        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.dir.join(format!("{file_name}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir).await?;

        let mut file =
            fs::OpenOptions::new().write(true).create(true).truncate(true).open(&temp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await?;
        debug!(path = %path.display(), "Value persisted");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Value removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        assert_eq!(store.get("absent").await.unwrap(), None);
        store.remove("absent").await.unwrap();
    }

    #[tokio::test]
    async fn set_get_remove_cycle() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        store.set("waypoint.offline_queue", r#"{"operations":[]}"#).await.unwrap();
        assert_eq!(
            store.get("waypoint.offline_queue").await.unwrap().as_deref(),
            Some(r#"{"operations":[]}"#)
        );

        store.set("waypoint.offline_queue", "second").await.unwrap();
        assert_eq!(store.get("waypoint.offline_queue").await.unwrap().as_deref(), Some("second"));

        store.remove("waypoint.offline_queue").await.unwrap();
        assert_eq!(store.get("waypoint.offline_queue").await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set("queue", "value").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["queue.json".to_string()]);
    }

    #[test]
    fn keys_cannot_escape_directory() {
        let store = FileKeyValueStore::new("/var/lib/waypoint");

        let path = store.path_for("../../etc/passwd").unwrap();
        assert_eq!(path.parent(), Some(Path::new("/var/lib/waypoint")));
        assert!(store.path_for("..").is_err());
        assert!(store.path_for("").is_err());
    }
}
