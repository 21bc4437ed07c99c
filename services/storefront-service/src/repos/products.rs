// =============================================================================
// PRODUCT REPOSITORY
// =============================================================================

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{
    InventoryItem, InventoryReport, InventorySummary, NewProduct, Product, ProductPatch,
};
use crate::pricing::{clamp_discount, effective_price, stock_status, StockStatus, StockThresholds};
use crate::store::{to_patch, Filter, Record, RecordStore};

/// Listing filters. Every field is optional; no filter means all products.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub min_stock: Option<u32>,
    pub limit: Option<usize>,
}

impl ProductQuery {
    fn filter(&self) -> Filter {
        let mut filter = Filter::all();
        if let Some(category) = &self.category {
            filter = filter.eq("category", category.as_str());
        }
        if let Some(featured) = self.featured {
            filter = filter.eq("featured", featured);
        }
        if let Some(min_stock) = self.min_stock {
            filter = filter.at_least("stock", f64::from(min_stock));
        }
        filter
    }
}

#[derive(Clone)]
pub struct ProductRepository {
    store: Arc<dyn RecordStore<Product>>,
}

impl ProductRepository {
    pub fn new(store: Arc<dyn RecordStore<Product>>) -> Self {
        Self { store }
    }

    /// Matching products, newest first, truncated to `limit`.
    pub async fn list(&self, query: &ProductQuery) -> Vec<Product> {
        let mut products = self.store.list(&query.filter()).await;
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            products.truncate(limit);
        }
        products
    }

    pub async fn get(&self, id: &str) -> AppResult<Product> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn create(&self, input: NewProduct) -> AppResult<Product> {
        let product = input.into_product();
        product.validate().map_err(AppError::Validation)?;

        let created = self.store.create(product).await?;
        tracing::info!(
            id = %created.id,
            name = %created.name,
            backend = %self.store.backend(),
            "Product created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: &str, mut patch: ProductPatch) -> AppResult<Product> {
        patch.discount_percent = patch.discount_percent.map(clamp_discount);
        let patch = to_patch(&patch)?;

        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;
        tracing::info!(id = %updated.id, "Product updated");
        Ok(updated)
    }

    /// Hard delete. Orders referencing the product are left as they are.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::not_found("Product"));
        }
        tracing::info!(id = %id, "Product deleted");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.store.count(&Filter::all()).await
    }

    /// Products with stock strictly below the low threshold.
    pub async fn count_low_stock(&self, thresholds: &StockThresholds) -> usize {
        self.store
            .count(&Filter::all().below("stock", f64::from(thresholds.low())))
            .await
    }

    pub async fn inventory_report(&self, thresholds: StockThresholds) -> InventoryReport {
        let mut products = self.store.list(&Filter::all()).await;
        products.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        let mut summary = InventorySummary::default();
        let items = products
            .into_iter()
            .map(|product| {
                let status = stock_status(product.stock, &thresholds);
                match status {
                    StockStatus::InStock => summary.in_stock += 1,
                    StockStatus::LowStock => summary.low_stock += 1,
                    StockStatus::Critical => summary.critical += 1,
                    StockStatus::OutOfStock => summary.out_of_stock += 1,
                }
                InventoryItem {
                    effective_price: effective_price(product.price, product.discount_percent),
                    stock_status: status,
                    id: product.id,
                    name: product.name,
                    category: product.category,
                    stock: product.stock,
                    price: product.price,
                }
            })
            .collect();

        InventoryReport {
            items,
            summary,
            thresholds,
        }
    }
}
