// =============================================================================
// RECORD STORE MODULE
// =============================================================================
// Keyed CRUD storage for one record collection (products, orders, admins).
//
// Two interchangeable implementations sit behind the `RecordStore` trait:
// - `file::FileStore`      - one JSON array per collection on local disk
// - `postgres::PgStore`    - one JSONB document per row in PostgreSQL
//
// Callers never talk to either directly; `backend::StoreRouter` picks one
// per operation based on the database connection state.
//
// ERROR CONTRACT:
// - Reads (list/get/count) never fail. Physical read errors are logged and
//   degrade to an empty result.
// - Writes (create/update/delete) report `StoreError` and never panic.
// - "Not found" is not an error: `get`/`update` return `None`, `delete`
//   returns `false`.
// =============================================================================

pub mod file;
#[cfg(test)]
pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

// -----------------------------------------------------------------------------
// BACKEND IDENTITY
// -----------------------------------------------------------------------------
/// Which physical storage engine served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    File,
    Database,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::File => "file",
            Backend::Database => "database",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// STORE ERRORS
// -----------------------------------------------------------------------------
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record (or the patched result) violates the collection schema.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The underlying file or connection failed during a physical write.
    #[error("{backend} store unavailable: {reason}")]
    Unavailable { backend: Backend, reason: String },
}

impl StoreError {
    pub fn unavailable(backend: Backend, reason: impl fmt::Display) -> Self {
        StoreError::Unavailable {
            backend,
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// -----------------------------------------------------------------------------
// RECORD TRAIT
// -----------------------------------------------------------------------------
/// A document that can live in a record store.
///
/// Records are serialized with their ID under `_id`; both stores also
/// resolve documents that use a plain `id` key.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name. Used as the file stem and as the table name.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Timestamp the database store sorts by (newest first).
    fn created_at(&self) -> DateTime<Utc>;

    /// Stamp a freshly created record with its ID and creation time.
    fn assign_identity(&mut self, id: String, now: DateTime<Utc>);

    /// Refresh modification timestamps after a patch was merged in.
    fn touch(&mut self, _now: DateTime<Utc>) {}

    /// Field constraints checked before every write.
    fn validate(&self) -> Result<(), String>;
}

/// A partial update: only the keys present are written.
pub type Patch = Map<String, Value>;

/// Serialize a typed patch struct into a `Patch`.
///
/// Patch structs skip `None` fields, so absent fields stay untouched while
/// explicit `false`/`0` values are carried through.
pub fn to_patch<P: Serialize>(patch: &P) -> StoreResult<Patch> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Validation(format!(
            "patch must be an object, got {other}"
        ))),
        Err(e) => Err(StoreError::Validation(e.to_string())),
    }
}

/// Merge `patch` into `current` and return the validated result.
///
/// The ID keys are ignored: identity is immutable once assigned.
pub fn apply_patch<T: Record>(current: &T, patch: &Patch, now: DateTime<Utc>) -> StoreResult<T> {
    let mut doc = serde_json::to_value(current)
        .map_err(|e| StoreError::Validation(e.to_string()))?;

    if let Value::Object(fields) = &mut doc {
        for (key, value) in patch {
            if key == "_id" || key == "id" {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
    }

    let mut updated: T =
        serde_json::from_value(doc).map_err(|e| StoreError::Validation(e.to_string()))?;
    updated.touch(now);
    updated.validate().map_err(StoreError::Validation)?;
    Ok(updated)
}

/// Overlay the typed fields of `record` onto a stored document, keeping any
/// extra keys the typed model does not know about.
pub fn overlay_document<T: Record>(stored: &mut Value, record: &T) -> StoreResult<()> {
    let typed = serde_json::to_value(record).map_err(|e| StoreError::Validation(e.to_string()))?;
    match (stored, typed) {
        (Value::Object(stored), Value::Object(typed)) => {
            stored.remove("id");
            stored.extend(typed);
        }
        (stored, typed) => *stored = typed,
    }
    Ok(())
}

/// ID of a stored document under either naming convention.
pub fn document_id(doc: &Value) -> Option<&str> {
    doc.get("_id")
        .or_else(|| doc.get("id"))
        .and_then(Value::as_str)
}

// -----------------------------------------------------------------------------
// FILTERS
// -----------------------------------------------------------------------------
// Only predicates both backends can evaluate: equality and simple numeric
// thresholds. Field names are document keys (camelCase).

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(&'static str, Value),
    AtLeast(&'static str, f64),
    Below(&'static str, f64),
}

impl Predicate {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Predicate::Eq(field, expected) => doc.get(*field).is_some_and(|v| same_value(v, expected)),
            Predicate::AtLeast(field, bound) => number(doc, field).is_some_and(|n| n >= *bound),
            Predicate::Below(field, bound) => number(doc, field).is_some_and(|n| n < *bound),
        }
    }
}

// Numbers compare by value (12 == 12.0), as jsonb equality does.
fn same_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

fn number(doc: &Value, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}

/// Conjunction of predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq(field, value.into()));
        self
    }

    pub fn at_least(mut self, field: &'static str, bound: f64) -> Self {
        self.predicates.push(Predicate::AtLeast(field, bound));
        self
    }

    pub fn below(mut self, field: &'static str, bound: f64) -> Self {
        self.predicates.push(Predicate::Below(field, bound));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(doc))
    }
}

// -----------------------------------------------------------------------------
// RECORD STORE TRAIT
// -----------------------------------------------------------------------------
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    fn backend(&self) -> Backend;

    /// Matching records. The file store keeps insertion order; the database
    /// store returns newest first.
    async fn list(&self, filter: &Filter) -> Vec<T>;

    async fn get(&self, id: &str) -> Option<T>;

    /// Persist a new record, assigning its ID and timestamps.
    async fn create(&self, record: T) -> StoreResult<T>;

    async fn update(&self, id: &str, patch: Patch) -> StoreResult<Option<T>>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn count(&self, filter: &Filter) -> usize;
}

// -----------------------------------------------------------------------------
// ID GENERATION
// -----------------------------------------------------------------------------
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Base-36 millisecond timestamp followed by 64 random bits in base 36.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let random = Uuid::new_v4().as_u128() as u64;
    format!("{}{}", to_base36(millis), to_base36(random as u128))
}
