// =============================================================================
// DOMAIN REPOSITORIES
// =============================================================================
// Typed facades over the record stores. Each collection gets a
// `StoreRouter` that sends every call to PostgreSQL or the file store,
// whichever the backend selector says is active at that moment.
//
// Settings are not a collection and always live in the data directory.
// =============================================================================

pub mod admins;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod settings;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{BackendSelector, StoreRouter};
use crate::store::file::FileStore;
use crate::store::postgres::PgDatabase;
use crate::store::{Record, RecordStore};

use admins::AdminRepository;
use orders::OrderRepository;
use products::ProductRepository;
use settings::SettingsRepository;

pub struct Repositories {
    pub products: ProductRepository,
    pub orders: OrderRepository,
    pub admins: AdminRepository,
    pub settings: SettingsRepository,
    selector: BackendSelector,
    database: Option<PgDatabase>,
    data_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl Repositories {
    pub fn new(
        data_dir: &Path,
        uploads_dir: &Path,
        database: Option<PgDatabase>,
        selector: BackendSelector,
    ) -> Self {
        Self {
            products: ProductRepository::new(routed(data_dir, database.as_ref(), &selector)),
            orders: OrderRepository::new(routed(data_dir, database.as_ref(), &selector)),
            admins: AdminRepository::new(routed(data_dir, database.as_ref(), &selector)),
            settings: SettingsRepository::new(data_dir),
            selector,
            database,
            data_dir: data_dir.to_path_buf(),
            uploads_dir: uploads_dir.to_path_buf(),
        }
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn has_database(&self) -> bool {
        self.database.is_some()
    }
}

fn routed<T: Record>(
    data_dir: &Path,
    database: Option<&PgDatabase>,
    selector: &BackendSelector,
) -> Arc<dyn RecordStore<T>> {
    let file: Arc<dyn RecordStore<T>> = Arc::new(FileStore::<T>::new(data_dir));
    let database =
        database.map(|db| Arc::new(db.store::<T>()) as Arc<dyn RecordStore<T>>);
    Arc::new(StoreRouter::new(file, database, selector.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ConnectionState;
    use crate::models::{CheckoutRequest, NewProduct, Settings};
    use crate::store::Backend;
    use tempfile::TempDir;

    // With the database marked down, every repository operation completes
    // against the file store with the usual shapes and errors.
    #[tokio::test]
    async fn test_disconnected_database_falls_back_to_files() {
        let dir = TempDir::new().unwrap();
        let selector = BackendSelector::with_state(ConnectionState::Disconnected);
        let repos = Repositories::new(dir.path(), dir.path(), None, selector);
        assert_eq!(repos.selector().active_backend(), Backend::File);

        let product = repos
            .products
            .create(NewProduct {
                name: "Shirt".into(),
                description: "Cotton".into(),
                price: 50.0,
                images: vec!["/images/s.jpg".into()],
                category: "shirts".into(),
                stock: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(dir.path().join("products.json").exists());

        let order = repos
            .orders
            .place(
                &repos.products,
                &Settings::default(),
                CheckoutRequest {
                    product_id: product.id.clone(),
                    quantity: 1,
                    customer_name: "Mona".into(),
                    customer_phone: "0122".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(repos.orders.get(&order.id).await.unwrap().total_amount, 50.0);

        assert!(matches!(
            repos.products.get("missing").await,
            Err(crate::error::AppError::NotFound(_))
        ));
    }
}
