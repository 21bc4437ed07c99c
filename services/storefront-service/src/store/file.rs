// =============================================================================
// FILE-BACKED RECORD STORE
// =============================================================================
// One JSON array per collection: <data_dir>/<collection>.json
//
// Every mutating call reads the whole array, changes it in memory and
// writes the complete snapshot back. Writes go to a temp file in the same
// directory which is then renamed over the target, so a crash mid-write
// never leaves a truncated file behind.
//
// NOTE: there is no locking. Two mutations racing on the same collection
// can lose an update (last snapshot written wins). This is accepted for a
// single-admin, low-concurrency deployment.
// =============================================================================

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{
    apply_patch, document_id, generate_id, overlay_document, Backend, Filter, Patch, Record,
    RecordStore, StoreError, StoreResult,
};

pub struct FileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> FileStore<T> {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", T::COLLECTION)),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the collection file with an empty array if it is missing.
    pub async fn ensure_exists(&self) -> StoreResult<()> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.save(&[]).await
    }

    /// Read the raw documents. A missing or corrupt file is an empty
    /// collection.
    async fn load(&self) -> Vec<Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read collection file, treating as empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Collection file is not a JSON array, treating as empty"
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, docs: &[Value]) -> StoreResult<()> {
        write_json_atomic(&self.path, &docs).await.map_err(|e| {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to write collection file"
            );
            StoreError::unavailable(Backend::File, e)
        })
    }

    fn decode(doc: &Value) -> Option<T> {
        match serde_json::from_value::<T>(doc.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    id = document_id(doc).unwrap_or("?"),
                    error = %e,
                    "Skipping malformed record"
                );
                None
            }
        }
    }

    fn position(docs: &[Value], id: &str) -> Option<usize> {
        docs.iter().position(|doc| document_id(doc) == Some(id))
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for FileStore<T> {
    fn backend(&self) -> Backend {
        Backend::File
    }

    async fn list(&self, filter: &Filter) -> Vec<T> {
        self.load()
            .await
            .iter()
            .filter(|doc| filter.matches(doc))
            .filter_map(Self::decode)
            .collect()
    }

    async fn get(&self, id: &str) -> Option<T> {
        let docs = self.load().await;
        Self::position(&docs, id).and_then(|index| Self::decode(&docs[index]))
    }

    async fn create(&self, mut record: T) -> StoreResult<T> {
        record.assign_identity(generate_id(), Utc::now());
        record.validate().map_err(StoreError::Validation)?;

        let doc = serde_json::to_value(&record)
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        let mut docs = self.load().await;
        docs.push(doc);
        self.save(&docs).await?;

        Ok(record)
    }

    async fn update(&self, id: &str, patch: Patch) -> StoreResult<Option<T>> {
        let mut docs = self.load().await;
        let Some(index) = Self::position(&docs, id) else {
            return Ok(None);
        };

        let current: T = serde_json::from_value(docs[index].clone())
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let updated = apply_patch(&current, &patch, Utc::now())?;

        overlay_document(&mut docs[index], &updated)?;
        self.save(&docs).await?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut docs = self.load().await;
        let Some(index) = Self::position(&docs, id) else {
            return Ok(false);
        };

        docs.remove(index);
        self.save(&docs).await?;
        Ok(true)
    }

    async fn count(&self, filter: &Filter) -> usize {
        self.load()
            .await
            .iter()
            .filter(|doc| filter.matches(doc))
            .count()
    }
}

// -----------------------------------------------------------------------------
// ATOMIC WRITES
// -----------------------------------------------------------------------------
/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub async fn write_json_atomic<V: Serialize + ?Sized>(path: &Path, value: &V) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(value)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir).await?;

    let stem = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let tmp = dir.join(format!(".{}-{}.tmp", stem, Uuid::new_v4()));

    tokio::fs::write(&tmp, &body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProduct, Product, ProductPatch};
    use crate::store::to_patch;
    use tempfile::TempDir;

    fn shirt() -> Product {
        NewProduct {
            name: "Classic shirt".into(),
            description: "Cotton shirt".into(),
            price: 89.99,
            images: vec!["/images/shirt.jpg".into()],
            category: "shirts".into(),
            stock: 25,
            featured: true,
            ..Default::default()
        }
        .into_product()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());

        let created = store.create(shirt()).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Classic shirt");
        assert_eq!(fetched.stock, 25);
    }

    #[tokio::test]
    async fn test_update_patches_only_present_fields() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        let created = store.create(shirt()).await.unwrap();

        let patch = to_patch(&ProductPatch {
            stock: Some(3),
            featured: Some(false),
            ..Default::default()
        })
        .unwrap();
        let updated = store.update(&created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.stock, 3);
        assert!(!updated.featured);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.price, created.price);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_result() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        let created = store.create(shirt()).await.unwrap();

        let patch = to_patch(&ProductPatch {
            images: Some(vec![]),
            ..Default::default()
        })
        .unwrap();
        let result = store.update(&created.id, patch).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        // Nothing was written
        assert_eq!(store.get(&created.id).await.unwrap().images.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());

        assert!(store.get("nope").await.is_none());
        assert!(store.update("nope", Patch::new()).await.unwrap().is_none());
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        let a = store.create(shirt()).await.unwrap();
        let b = store.create(shirt()).await.unwrap();

        assert!(store.delete(&a.id).await.unwrap());
        assert!(store.get(&a.id).await.is_none());
        assert_eq!(store.count(&Filter::all()).await, 1);
        assert_eq!(store.list(&Filter::all()).await[0].id, b.id);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order_and_filters() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());

        let mut pants = shirt();
        pants.category = "pants".into();
        pants.stock = 4;
        pants.featured = false;

        let first = store.create(shirt()).await.unwrap();
        let second = store.create(pants).await.unwrap();

        let all = store.list(&Filter::all()).await;
        assert_eq!(
            all.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec![first.id.as_str(), second.id.as_str()]
        );

        let pants_only = store.list(&Filter::all().eq("category", "pants")).await;
        assert_eq!(pants_only.len(), 1);
        assert_eq!(pants_only[0].id, second.id);

        assert_eq!(store.count(&Filter::all().eq("featured", true)).await, 1);
        assert_eq!(store.count(&Filter::all().below("stock", 15.0)).await, 1);
        assert_eq!(store.count(&Filter::all().at_least("stock", 5.0)).await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        tokio::fs::write(store.path(), "{ not json").await.unwrap();

        assert!(store.list(&Filter::all()).await.is_empty());
        assert_eq!(store.count(&Filter::all()).await, 0);
        assert!(store.get("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_resolves_plain_id_key_and_keeps_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        let mut doc = serde_json::to_value(shirt()).unwrap();
        let fields = doc.as_object_mut().unwrap();
        fields.remove("_id");
        fields.insert("id".into(), "legacy-1".into());
        fields.insert("supplier".into(), "acme".into());
        tokio::fs::write(store.path(), serde_json::to_string(&vec![doc]).unwrap())
            .await
            .unwrap();

        let fetched = store.get("legacy-1").await.unwrap();
        assert_eq!(fetched.id, "legacy-1");

        let patch = to_patch(&ProductPatch {
            stock: Some(1),
            ..Default::default()
        })
        .unwrap();
        store.update("legacy-1", patch).await.unwrap().unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&tokio::fs::read_to_string(store.path()).await.unwrap()).unwrap();
        assert_eq!(raw[0]["_id"], "legacy-1");
        assert_eq!(raw[0]["supplier"], "acme");
        assert_eq!(raw[0]["stock"], 1);
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Product>::new(dir.path());
        store.ensure_exists().await.unwrap();
        store.create(shirt()).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["products.json".to_string()]);
    }
}
