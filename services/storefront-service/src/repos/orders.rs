// =============================================================================
// ORDER REPOSITORY
// =============================================================================
// Orders come from two places:
// - public checkout (`place`): priced from the current product and the
//   order settings, then frozen
// - admin entry (`create`): stored with the totals given
//
// Status changes are unconstrained: any status may be set to any other.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{CheckoutRequest, NewOrder, Order, OrderPatch, OrderStatus, Settings};
use crate::pricing::{effective_price, order_code, quote_order};
use crate::store::{to_patch, Filter, Record, RecordStore};

use super::products::ProductRepository;

#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn RecordStore<Order>>,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn RecordStore<Order>>) -> Self {
        Self { store }
    }

    /// Orders newest first, optionally restricted to one status.
    pub async fn list(&self, status: Option<OrderStatus>, limit: Option<usize>) -> Vec<Order> {
        let filter = match status {
            Some(status) => Filter::all().eq("status", status.as_str()),
            None => Filter::all(),
        };
        let mut orders = self.store.list(&filter).await;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        if let Some(limit) = limit {
            orders.truncate(limit);
        }
        orders
    }

    pub async fn get(&self, id: &str) -> AppResult<Order> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| AppError::not_found("Order"))
    }

    /// Place a public order.
    ///
    /// Nothing is written unless the product exists and the base amount
    /// meets the configured minimum.
    pub async fn place(
        &self,
        products: &ProductRepository,
        settings: &Settings,
        request: CheckoutRequest,
    ) -> AppResult<Order> {
        if request.product_id.trim().is_empty()
            || request.customer_name.trim().is_empty()
            || request.customer_phone.trim().is_empty()
            || request.quantity == 0
        {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }

        let product = products.get(&request.product_id).await?;
        let unit_price = effective_price(product.price, product.discount_percent);
        let quote = quote_order(
            unit_price,
            request.quantity,
            settings.orders.delivery_fee,
            settings.orders.min_amount,
        )?;

        let now = Utc::now();

        let order = Order {
            id: String::new(),
            order_code: Some(order_code(&settings.orders.prefix, now)),
            product_id: product.id.clone(),
            product_name: Some(product.name.clone()),
            product_price: Some(product.price),
            quantity: request.quantity,
            customer_name: request.customer_name.trim().to_string(),
            customer_phone: request.customer_phone.trim().to_string(),
            customer_email: request.customer_email.filter(|e| !e.trim().is_empty()),
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            status: OrderStatus::Pending,
            total_amount: quote.total_amount,
            order_date: now,
            updated_at: None,
        };

        let created = self.store.create(order).await?;
        metrics::record_order_created("checkout");
        tracing::info!(
            id = %created.id,
            order_code = created.order_code.as_deref().unwrap_or_default(),
            product_id = %created.product_id,
            total = created.total_amount,
            status = created.status.as_str(),
            "Order placed"
        );
        Ok(created)
    }

    /// Admin-entered order, stored as given.
    pub async fn create(&self, input: NewOrder) -> AppResult<Order> {
        let order = input.into_order();
        order.validate().map_err(AppError::Validation)?;

        let created = self.store.create(order).await?;
        metrics::record_order_created("admin");
        tracing::info!(id = %created.id, "Order created by admin");
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: OrderPatch) -> AppResult<Order> {
        let patch = to_patch(&patch)?;
        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;
        tracing::info!(id = %updated.id, status = updated.status.as_str(), "Order updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::not_found("Order"));
        }
        tracing::info!(id = %id, "Order deleted");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.store.count(&Filter::all()).await
    }

    pub async fn all(&self) -> Vec<Order> {
        self.store.list(&Filter::all()).await
    }
}
