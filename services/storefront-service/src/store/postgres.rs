// =============================================================================
// POSTGRESQL RECORD STORE
// =============================================================================
// The networked backend. Each collection is a table of JSONB documents:
//
//     id TEXT PRIMARY KEY | data JSONB | created_at TIMESTAMPTZ
//
// Field constraints are enforced twice: by `Record::validate` before every
// write, and by CHECK constraints / unique indexes on the tables. A write
// rejected by the database surfaces as `StoreError::Validation`.
// =============================================================================

use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};

use super::{
    apply_patch, document_id, generate_id, overlay_document, Backend, Filter, Patch, Predicate,
    Record, RecordStore, StoreError, StoreResult,
};

// -----------------------------------------------------------------------------
// SCHEMA
// -----------------------------------------------------------------------------
// IF NOT EXISTS keeps every statement idempotent; migrations run each time
// the monitor sees the database come up for the first time.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

        CONSTRAINT product_required CHECK (
            length(data->>'name') > 0
            AND length(data->>'description') > 0
            AND length(data->>'category') > 0
        ),
        CONSTRAINT product_price CHECK (
            (data->>'price') IS NOT NULL AND (data->>'price')::numeric >= 0
        ),
        CONSTRAINT product_discount CHECK (
            COALESCE((data->>'discountPercent')::numeric, 0) BETWEEN 0 AND 100
        ),
        CONSTRAINT product_stock CHECK (
            COALESCE((data->>'stock')::numeric, 0) >= 0
        ),
        CONSTRAINT product_images CHECK (
            CASE WHEN jsonb_typeof(data->'images') = 'array'
                 THEN jsonb_array_length(data->'images') > 0
                 ELSE false
            END
        )
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_products_category ON products ((data->>'category'))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

        CONSTRAINT order_required CHECK (
            length(data->>'productId') > 0
            AND length(data->>'customerName') > 0
            AND length(data->>'customerPhone') > 0
        ),
        CONSTRAINT order_quantity CHECK ((data->>'quantity')::numeric >= 1),
        CONSTRAINT order_total CHECK ((data->>'totalAmount') IS NOT NULL),
        CONSTRAINT order_status CHECK (
            data->>'status' IN ('pending', 'confirmed', 'processing', 'shipped', 'delivered', 'cancelled')
        )
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_orders_status ON orders ((data->>'status'))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id TEXT PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

        CONSTRAINT admin_required CHECK (
            length(data->>'username') > 0
            AND length(data->>'password') > 0
            AND length(data->>'email') > 0
        ),
        CONSTRAINT admin_role CHECK (data->>'role' IN ('admin', 'super_admin'))
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_username ON admins ((data->>'username'))
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_email ON admins ((data->>'email'))
    "#,
];

// SQLSTATE codes that mean "the document was rejected", not "the database
// is broken": not_null_violation, unique_violation, check_violation.
const REJECTION_CODES: &[&str] = &["23502", "23505", "23514"];

fn map_sqlx_error(collection: &str, operation: &str, err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err
            .code()
            .is_some_and(|code| REJECTION_CODES.iter().any(|known| code == *known))
        {
            tracing::warn!(collection, operation, error = %db_err, "Database rejected document");
            return StoreError::Validation(db_err.message().to_string());
        }
    }

    tracing::error!(collection, operation, error = %err, "Database operation failed");
    StoreError::unavailable(Backend::Database, err)
}

// -----------------------------------------------------------------------------
// DATABASE HANDLE
// -----------------------------------------------------------------------------
/// Shared connection pool plus the collection-independent operations:
/// migrations, health probing and storage statistics.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Create a lazily-connecting pool.
    ///
    /// No connection is attempted here, so the service starts even when
    /// PostgreSQL is down; the backend monitor decides when it is usable.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(300))
            .connect_lazy(database_url)
            .context("Invalid DATABASE_URL")?;

        Ok(Self { pool })
    }

    /// Create the collection tables and indexes if they don't exist.
    pub async fn run_migrations(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply storefront schema")?;
        }
        Ok(())
    }

    /// Check if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// On-disk size of the current database in bytes.
    pub async fn storage_size(&self) -> StoreResult<u64> {
        let size: i64 = sqlx::query_scalar("SELECT pg_database_size(current_database())")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("database", "size", e))?;
        Ok(size.max(0) as u64)
    }

    pub fn store<T: Record>(&self) -> PgStore<T> {
        PgStore {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

// -----------------------------------------------------------------------------
// PER-COLLECTION STORE
// -----------------------------------------------------------------------------
pub struct PgStore<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

/// `SELECT <columns>` over one collection table, with each predicate
/// translated to a condition on the JSONB `data` column.
///
/// Equality compares `jsonb` values, so `12` and `12.0` are equal; the file
/// store normalizes numbers the same way. Thresholds cast the field to
/// `float8`, and a missing field yields NULL, which never matches.
fn select_query(
    collection: &str,
    columns: &str,
    filter: &Filter,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {columns} FROM {collection} WHERE TRUE"));

    for predicate in filter.predicates() {
        match predicate {
            Predicate::Eq(field, value) => {
                qb.push(" AND data -> ");
                qb.push_bind(*field);
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
            }
            Predicate::AtLeast(field, bound) => {
                qb.push(" AND (data ->> ");
                qb.push_bind(*field);
                qb.push(")::float8 >= ");
                qb.push_bind(*bound);
            }
            Predicate::Below(field, bound) => {
                qb.push(" AND (data ->> ");
                qb.push_bind(*field);
                qb.push(")::float8 < ");
                qb.push_bind(*bound);
            }
        }
    }
    qb
}

/// Newest first, matching the order the repositories sort into.
fn list_query(collection: &str, filter: &Filter) -> QueryBuilder<'static, Postgres> {
    let mut qb = select_query(collection, "data", filter);
    qb.push(" ORDER BY created_at DESC");
    qb
}

impl<T: Record> PgStore<T> {
    fn decode(doc: Value) -> Option<T> {
        let id = document_id(&doc).unwrap_or("?").to_string();
        match serde_json::from_value::<T>(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, id = %id, error = %e, "Skipping malformed document");
                None
            }
        }
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for PgStore<T> {
    fn backend(&self) -> Backend {
        Backend::Database
    }

    async fn list(&self, filter: &Filter) -> Vec<T> {
        let mut qb = list_query(T::COLLECTION, filter);

        match qb.build_query_scalar::<Json<Value>>().fetch_all(&self.pool).await {
            Ok(rows) => rows.into_iter().filter_map(|Json(doc)| Self::decode(doc)).collect(),
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "List failed, returning empty result");
                Vec::new()
            }
        }
    }

    async fn get(&self, id: &str) -> Option<T> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", T::COLLECTION);
        match sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.and_then(|Json(doc)| Self::decode(doc)),
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, id, error = %e, "Get failed, treating as absent");
                None
            }
        }
    }

    async fn create(&self, mut record: T) -> StoreResult<T> {
        record.assign_identity(generate_id(), Utc::now());
        record.validate().map_err(StoreError::Validation)?;

        let sql = format!(
            "INSERT INTO {} (id, data, created_at) VALUES ($1, $2, $3)",
            T::COLLECTION
        );
        sqlx::query(&sql)
            .bind(record.id())
            .bind(Json(&record))
            .bind(record.created_at())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(T::COLLECTION, "create", e))?;

        Ok(record)
    }

    /// Read-merge-write inside a transaction.
    ///
    /// FOR UPDATE locks the row so concurrent patches to the same document
    /// apply one after the other.
    async fn update(&self, id: &str, patch: Patch) -> StoreResult<Option<T>> {
        let fail = |e| map_sqlx_error(T::COLLECTION, "update", e);

        let mut tx = self.pool.begin().await.map_err(fail)?;

        let select = format!("SELECT data FROM {} WHERE id = $1 FOR UPDATE", T::COLLECTION);
        let row = sqlx::query_scalar::<_, Json<Value>>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(fail)?;

        // Dropping the transaction rolls it back
        let Some(Json(mut doc)) = row else {
            return Ok(None);
        };

        let current: T = serde_json::from_value(doc.clone())
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let updated = apply_patch(&current, &patch, Utc::now())?;
        overlay_document(&mut doc, &updated)?;

        let write = format!("UPDATE {} SET data = $2 WHERE id = $1", T::COLLECTION);
        sqlx::query(&write)
            .bind(id)
            .bind(Json(&doc))
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        tx.commit().await.map_err(fail)?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::COLLECTION);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(T::COLLECTION, "delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &Filter) -> usize {
        let mut qb = select_query(T::COLLECTION, "COUNT(*)", filter);
        match qb.build_query_scalar::<i64>().fetch_one(&self.pool).await {
            Ok(n) => n.max(0) as usize,
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, error = %e, "Count failed, returning zero");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_selects_whole_table() {
        let qb = select_query("products", "COUNT(*)", &Filter::all());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products WHERE TRUE");
    }

    #[test]
    fn test_filter_translates_to_bound_jsonb_conditions() {
        let filter = Filter::all()
            .eq("category", "x")
            .at_least("stock", 5.0)
            .below("stock", 15.0);
        let qb = select_query("products", "data", &filter);

        assert_eq!(
            qb.sql(),
            "SELECT data FROM products WHERE TRUE \
             AND data -> $1 = $2 \
             AND (data ->> $3)::float8 >= $4 \
             AND (data ->> $5)::float8 < $6"
        );
    }

    #[test]
    fn test_list_orders_newest_first() {
        let qb = list_query("orders", &Filter::all().eq("status", "pending"));
        assert_eq!(
            qb.sql(),
            "SELECT data FROM orders WHERE TRUE AND data -> $1 = $2 ORDER BY created_at DESC"
        );
    }
}
