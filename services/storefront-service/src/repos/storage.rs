// =============================================================================
// STORAGE USAGE
// =============================================================================
// File mode:     sum of regular file sizes under the data and uploads dirs
// Database mode: pg_database_size, falling back to the file figure
// =============================================================================

use std::path::{Path, PathBuf};

use crate::models::StorageUsage;
use crate::store::Backend;

use super::Repositories;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

impl Repositories {
    pub async fn storage_usage(&self) -> StorageUsage {
        let mode = self.selector.active_backend();
        let quota_mb = self.settings.get().await.storage.quota_mb;

        let used_bytes = match (mode, &self.database) {
            (Backend::Database, Some(database)) => match database.storage_size().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "Database size unavailable, reporting file usage");
                    self.file_usage().await
                }
            },
            _ => self.file_usage().await,
        };

        StorageUsage {
            mode,
            used_bytes,
            used_mb: round_mb(used_bytes),
            quota_mb,
        }
    }

    async fn file_usage(&self) -> u64 {
        directory_size(&self.data_dir).await + directory_size(&self.uploads_dir).await
    }
}

fn round_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Total size of regular files below `root`. Missing directories count as
/// zero and unreadable entries are skipped.
pub async fn directory_size(root: &Path) -> u64 {
    let mut total = 0;
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    break;
                }
            };
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(meta) = entry.metadata().await {
                    total += meta.len();
                }
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendSelector;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_directory_size_recurses() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.jpg"), vec![0u8; 50]).unwrap();

        assert_eq!(directory_size(dir.path()).await, 150);
        assert_eq!(directory_size(&dir.path().join("missing")).await, 0);
    }

    #[test]
    fn test_round_mb() {
        assert_eq!(round_mb(0), 0.0);
        assert_eq!(round_mb(1024 * 1024), 1.0);
        assert_eq!(round_mb(1_572_864), 1.5);
        assert_eq!(round_mb(1_234_567), 1.18);
    }

    #[tokio::test]
    async fn test_file_mode_usage_includes_uploads_and_quota() {
        let data = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        std::fs::write(uploads.path().join("img.jpg"), vec![0u8; 2048]).unwrap();

        let repos = Repositories::new(data.path(), uploads.path(), None, BackendSelector::new());
        repos
            .settings
            .update(serde_json::json!({ "storage": { "quotaMB": 500 } }))
            .await
            .unwrap();

        let usage = repos.storage_usage().await;
        assert_eq!(usage.mode, Backend::File);
        let settings_len = std::fs::metadata(data.path().join("settings.json")).unwrap().len();
        assert_eq!(usage.used_bytes, 2048 + settings_len);
        assert_eq!(usage.quota_mb, Some(500.0));
    }
}
