// =============================================================================
// PRICING & STOCK DERIVATION
// =============================================================================
// Pure functions, no I/O:
// - effective price (list price net of discount)
// - stock status classification against configurable thresholds
// - order totals and the minimum-order-amount check
// - human-readable order codes
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::to_base36;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("Minimum order amount is {minimum}, order amount is {amount}")]
    BelowMinimum { amount: f64, minimum: f64 },

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Critical threshold ({critical}) must not exceed low threshold ({low})")]
    InvalidThresholds { critical: u32, low: u32 },
}

// -----------------------------------------------------------------------------
// PRICES
// -----------------------------------------------------------------------------

/// Clamp a discount percentage into [0, 100]. NaN counts as no discount.
pub fn clamp_discount(discount_percent: f64) -> f64 {
    if discount_percent.is_nan() {
        return 0.0;
    }
    discount_percent.clamp(0.0, 100.0)
}

/// Price after applying the (clamped) discount percentage.
pub fn effective_price(price: f64, discount_percent: f64) -> f64 {
    price * (1.0 - clamp_discount(discount_percent) / 100.0)
}

// -----------------------------------------------------------------------------
// STOCK STATUS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    critical: u32,
    low: u32,
}

impl StockThresholds {
    /// Thresholds must satisfy `critical <= low` for the classification to
    /// be monotonic.
    pub fn new(critical: u32, low: u32) -> Result<Self, PricingError> {
        if critical > low {
            return Err(PricingError::InvalidThresholds { critical, low });
        }
        Ok(Self { critical, low })
    }

    pub fn critical(&self) -> u32 {
        self.critical
    }

    pub fn low(&self) -> u32 {
        self.low
    }
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            critical: 10,
            low: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,
    LowStock,
    Critical,
    OutOfStock,
}

pub fn stock_status(stock: u32, thresholds: &StockThresholds) -> StockStatus {
    if stock == 0 {
        StockStatus::OutOfStock
    } else if stock < thresholds.critical {
        StockStatus::Critical
    } else if stock < thresholds.low {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

// -----------------------------------------------------------------------------
// ORDER TOTALS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderQuote {
    /// effective unit price x quantity
    pub base_amount: f64,
    pub delivery_fee: f64,
    /// base amount + delivery fee, fixed at order time
    pub total_amount: f64,
}

/// Price an order line. Rejected when the base amount (before delivery)
/// is below `minimum_amount`.
pub fn quote_order(
    effective_price: f64,
    quantity: u32,
    delivery_fee: f64,
    minimum_amount: f64,
) -> Result<OrderQuote, PricingError> {
    if quantity == 0 {
        return Err(PricingError::InvalidQuantity);
    }

    let base_amount = effective_price * f64::from(quantity);
    if minimum_amount.is_finite() && base_amount < minimum_amount {
        return Err(PricingError::BelowMinimum {
            amount: base_amount,
            minimum: minimum_amount,
        });
    }

    let delivery_fee = if delivery_fee.is_finite() { delivery_fee } else { 0.0 };
    Ok(OrderQuote {
        base_amount,
        delivery_fee,
        total_amount: base_amount + delivery_fee,
    })
}

/// `prefix` followed by an upper-case base-36 token derived from the
/// current time. Intended, not guaranteed, to be unique.
pub fn order_code(prefix: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u128 % 100_000_000;
    format!("{}{}", prefix, to_base36(millis).to_uppercase())
}
