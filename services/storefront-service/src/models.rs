// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures used throughout the service:
// - stored records (Product, Order, Admin) and their partial-update patches
// - the single Settings document
// - API request/response shapes
//
// Stored documents use camelCase keys and keep their ID under `_id`.
// `alias = "id"` lets documents written with a plain `id` key resolve too.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pricing::{clamp_discount, StockStatus, StockThresholds};
use crate::store::Record;

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be a non-negative number"));
    }
    Ok(())
}

// =============================================================================
// PRODUCT
// =============================================================================

/// Enumerated garment sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    pub name: String,

    pub description: String,

    /// List price before discount
    pub price: f64,

    /// Always within [0, 100]
    #[serde(default)]
    pub discount_percent: f64,

    /// Image URIs, at least one
    pub images: Vec<String>,

    /// Free-form taxonomy, no foreign key
    pub category: String,

    #[serde(default)]
    pub stock: u32,

    #[serde(default)]
    pub sizes: Vec<Size>,

    #[serde(default)]
    pub colors: Vec<String>,

    #[serde(default)]
    pub featured: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    // updated_at never moves backwards, even if the clock does
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(now);
    }

    fn validate(&self) -> Result<(), String> {
        non_empty("name", &self.name)?;
        non_empty("description", &self.description)?;
        non_empty("category", &self.category)?;
        non_negative("price", self.price)?;
        if !(0.0..=100.0).contains(&self.discount_percent) {
            return Err("discountPercent must be between 0 and 100".to_string());
        }
        if self.images.is_empty() {
            return Err("Product image is required".to_string());
        }
        if self.images.iter().any(|uri| uri.trim().is_empty()) {
            return Err("image URIs must not be empty".to_string());
        }
        Ok(())
    }
}

/// Fields accepted when creating a product.
///
/// Every field defaults so that a missing field reaches validation and is
/// reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(alias = "discount")]
    pub discount_percent: f64,
    pub images: Vec<String>,
    pub category: String,
    pub stock: u32,
    pub sizes: Vec<Size>,
    pub colors: Vec<String>,
    pub featured: bool,
}

impl NewProduct {
    /// Build an unsaved product; the store assigns ID and timestamps.
    pub fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: String::new(),
            name: self.name,
            description: self.description,
            price: self.price,
            discount_percent: clamp_discount(self.discount_percent),
            images: self.images,
            category: self.category,
            stock: self.stock,
            sizes: self.sizes,
            colors: self.colors,
            featured: self.featured,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial product update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "discount")]
    pub discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<Size>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

// =============================================================================
// ORDER
// =============================================================================

/// Order lifecycle states. Any state may be set to any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    /// Human-readable code: settings prefix + time-derived token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,

    /// Weak reference; deleting the product does not touch its orders
    pub product_id: String,

    /// Snapshot of the product at order time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    /// Snapshot of the list price at order time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_price: Option<f64>,

    pub quantity: u32,

    pub customer_name: String,

    pub customer_phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: OrderStatus,

    /// Fixed at creation; never recomputed from later product prices
    pub total_amount: f64,

    pub order_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.order_date
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.order_date = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(self.updated_at.map_or(now, |prev| prev.max(now)));
    }

    fn validate(&self) -> Result<(), String> {
        non_empty("productId", &self.product_id)?;
        non_empty("customerName", &self.customer_name)?;
        non_empty("customerPhone", &self.customer_phone)?;
        if self.quantity < 1 {
            return Err("quantity must be at least 1".to_string());
        }
        non_negative("totalAmount", self.total_amount)?;
        Ok(())
    }
}

/// Public checkout request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    pub product_id: String,
    pub quantity: u32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
}

/// Order created directly by an admin; totals are taken as given. Every
/// new order starts out pending.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub product_id: String,
    pub order_code: Option<String>,
    pub product_name: Option<String>,
    pub product_price: Option<f64>,
    pub quantity: u32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub total_amount: f64,
}

impl NewOrder {
    pub fn into_order(self) -> Order {
        Order {
            id: String::new(),
            order_code: self.order_code,
            product_id: self.product_id,
            product_name: self.product_name,
            product_price: self.product_price,
            quantity: self.quantity,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email.filter(|e| !e.trim().is_empty()),
            notes: self.notes,
            status: OrderStatus::Pending,
            total_amount: self.total_amount,
            order_date: Utc::now(),
            updated_at: None,
        }
    }
}

/// Partial order update (status change or full field patch).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

// =============================================================================
// ADMIN
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[default]
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,

    pub username: String,

    /// Argon2 PHC string, never plaintext
    pub password: String,

    pub email: String,

    #[serde(default)]
    pub role: AdminRole,

    pub created_at: DateTime<Utc>,
}

impl Record for Admin {
    const COLLECTION: &'static str = "admins";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
    }

    fn validate(&self) -> Result<(), String> {
        non_empty("username", &self.username)?;
        non_empty("password", &self.password)?;
        if !self.email.contains('@') {
            return Err("email must be a valid address".to_string());
        }
        Ok(())
    }
}

/// Account creation input; `password` is plaintext and hashed before
/// storage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: AdminRole,
}

/// Partial admin update. `password` must already be hashed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
}

/// Admin as shown to API clients (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: AdminRole,
}

impl From<&Admin> for AdminProfile {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            role: admin.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

// =============================================================================
// SETTINGS
// =============================================================================
// One global document. Each named section merges its own fields on update;
// unknown top-level keys are carried in `extra` and overwritten wholesale.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    pub name: String,
    pub description: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            name: "MK Local Brand".to_string(),
            description: "Local clothing brand offering the latest fashion in high quality"
                .to_string(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderSettings {
    pub prefix: String,
    pub min_amount: f64,
    pub delivery_fee: f64,
    pub auto_confirm: bool,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            prefix: "ORD-".to_string(),
            min_amount: 0.0,
            delivery_fee: 0.0,
            auto_confirm: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub new_order: bool,
    pub low_stock: bool,
    pub email: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            new_order: true,
            low_stock: true,
            email: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearanceSettings {
    pub dark_mode: bool,
    pub font_size: String,
    pub language: String,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            font_size: "medium".to_string(),
            language: "ar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    #[serde(rename = "quotaMB")]
    pub quota_mb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventorySettings {
    pub low_threshold: u32,
    pub critical_threshold: u32,
}

impl Default for InventorySettings {
    fn default() -> Self {
        let thresholds = StockThresholds::default();
        Self {
            low_threshold: thresholds.low(),
            critical_threshold: thresholds.critical(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub orders: OrderSettings,
    pub notifications: NotificationSettings,
    pub appearance: AppearanceSettings,
    pub storage: StorageSettings,
    pub inventory: InventorySettings,

    /// Unknown top-level keys, passed through as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Section names that deep-merge on update.
    pub const SECTIONS: [&'static str; 6] = [
        "store",
        "orders",
        "notifications",
        "appearance",
        "storage",
        "inventory",
    ];

    pub fn thresholds(&self) -> StockThresholds {
        StockThresholds::new(
            self.inventory.critical_threshold,
            self.inventory.low_threshold,
        )
        .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), String> {
        StockThresholds::new(
            self.inventory.critical_threshold,
            self.inventory.low_threshold,
        )
        .map_err(|e| e.to_string())?;
        non_negative("orders.minAmount", self.orders.min_amount)?;
        non_negative("orders.deliveryFee", self.orders.delivery_fee)?;
        if let Some(quota) = self.storage.quota_mb {
            non_negative("storage.quotaMB", quota)?;
        }
        Ok(())
    }
}

// =============================================================================
// AGGREGATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_orders: usize,
    pub low_stock_count: usize,
    pub monthly_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub mode: crate::store::Backend,
    pub used_bytes: u64,
    #[serde(rename = "usedMB")]
    pub used_mb: f64,
    #[serde(rename = "quotaMB")]
    pub quota_mb: Option<f64>,
}

/// One row of the inventory view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub stock: u32,
    pub price: f64,
    pub effective_price: f64,
    pub stock_status: StockStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub in_stock: usize,
    pub low_stock: usize,
    pub critical: usize,
    pub out_of_stock: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub items: Vec<InventoryItem>,
    pub summary: InventorySummary,
    pub thresholds: StockThresholds,
}

// =============================================================================
// API ENVELOPES
// =============================================================================

/// Standard success body: `{ success, data, count?, message? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            message: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            message: Some(message.into()),
        }
    }
}

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    /// Backend currently serving record operations
    pub backend: crate::store::Backend,
    /// Database connection state as last observed by the monitor
    pub database: String,
    pub data_dir: bool,
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,

    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_serializes_with_underscore_id() {
        let mut product = NewProduct {
            name: "Shirt".into(),
            description: "Cotton".into(),
            price: 10.0,
            images: vec!["/a.jpg".into()],
            category: "shirts".into(),
            sizes: vec![Size::Xs, Size::Xxl],
            ..Default::default()
        }
        .into_product();
        product.id = "p1".into();

        let doc = serde_json::to_value(&product).unwrap();
        assert_eq!(doc["_id"], "p1");
        assert_eq!(doc["discountPercent"], 0.0);
        assert_eq!(doc["sizes"], json!(["XS", "XXL"]));
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn test_new_product_clamps_discount() {
        let high = NewProduct {
            discount_percent: 140.0,
            ..Default::default()
        };
        assert_eq!(high.into_product().discount_percent, 100.0);

        let low: NewProduct = serde_json::from_value(json!({ "discount": -3 })).unwrap();
        assert_eq!(low.into_product().discount_percent, 0.0);
    }

    #[test]
    fn test_product_validation() {
        let valid = NewProduct {
            name: "Shirt".into(),
            description: "Cotton".into(),
            price: 10.0,
            images: vec!["/a.jpg".into()],
            category: "shirts".into(),
            ..Default::default()
        }
        .into_product();
        assert!(valid.validate().is_ok());

        let mut no_images = valid.clone();
        no_images.images.clear();
        assert!(no_images.validate().is_err());

        let mut blank_name = valid.clone();
        blank_name.name = "  ".into();
        assert!(blank_name.validate().is_err());

        let mut negative = valid;
        negative.price = -1.0;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_patch_skips_absent_fields_but_keeps_falsy_values() {
        let patch = ProductPatch {
            stock: Some(0),
            featured: Some(false),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "stock": 0, "featured": false }));
    }

    #[test]
    fn test_order_status_round_trip_names() {
        let status: OrderStatus = serde_json::from_value(json!("shipped")).unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert_eq!(status.as_str(), "shipped");
        assert!(serde_json::from_value::<OrderStatus>(json!("lost")).is_err());
    }

    #[test]
    fn test_admin_role_names() {
        assert_eq!(serde_json::to_value(AdminRole::SuperAdmin).unwrap(), "super_admin");
        assert_eq!(serde_json::to_value(AdminRole::Admin).unwrap(), "admin");
    }

    #[test]
    fn test_default_settings_document() {
        let doc = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(doc["orders"]["prefix"], "ORD-");
        assert_eq!(doc["orders"]["minAmount"], 0.0);
        assert_eq!(doc["notifications"]["newOrder"], true);
        assert_eq!(doc["appearance"]["fontSize"], "medium");
        assert_eq!(doc["storage"]["quotaMB"], Value::Null);
        assert_eq!(doc["inventory"]["lowThreshold"], 15);
        assert_eq!(doc["inventory"]["criticalThreshold"], 10);
    }

    #[test]
    fn test_settings_keep_unknown_keys() {
        let settings: Settings =
            serde_json::from_value(json!({ "theme": { "accent": "red" } })).unwrap();
        assert_eq!(settings.extra["theme"]["accent"], "red");
        assert_eq!(settings.orders, OrderSettings::default());

        let doc = serde_json::to_value(&settings).unwrap();
        assert_eq!(doc["theme"]["accent"], "red");
    }
}
