// =============================================================================
// DASHBOARD AGGREGATES
// =============================================================================

use chrono::{DateTime, Datelike, Local};

use crate::models::{DashboardStats, Order};

use super::Repositories;

impl Repositories {
    /// Headline numbers for the admin dashboard, evaluated against `now`.
    pub async fn dashboard_stats(&self, now: DateTime<Local>) -> DashboardStats {
        let settings = self.settings.get().await;
        let total_products = self.products.count().await;
        let low_stock_count = self.products.count_low_stock(&settings.thresholds()).await;
        let total_orders = self.orders.count().await;
        let orders = self.orders.all().await;

        DashboardStats {
            total_products,
            total_orders,
            low_stock_count,
            monthly_revenue: monthly_revenue(&orders, now),
        }
    }
}

/// Sum of order totals placed in the calendar month of `now`, in local time.
pub fn monthly_revenue(orders: &[Order], now: DateTime<Local>) -> f64 {
    orders
        .iter()
        .filter(|order| {
            let placed = order.order_date.with_timezone(&Local);
            placed.year() == now.year() && placed.month() == now.month()
        })
        .map(|order| order.total_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn order(total: f64, placed: DateTime<Utc>) -> Order {
        Order {
            id: "o".into(),
            order_code: None,
            product_id: "p".into(),
            product_name: None,
            product_price: None,
            quantity: 1,
            customer_name: "c".into(),
            customer_phone: "1".into(),
            customer_email: None,
            notes: None,
            status: OrderStatus::Delivered,
            total_amount: total,
            order_date: placed,
            updated_at: None,
        }
    }

    #[test]
    fn test_monthly_revenue_only_counts_current_month() {
        let now = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let this_month = now.with_timezone(&Utc) - Duration::days(5);
        let last_month = now.with_timezone(&Utc) - Duration::days(40);

        let orders = [
            order(100.0, this_month),
            order(50.0, this_month),
            order(100.0, last_month),
        ];
        assert_eq!(monthly_revenue(&orders, now), 150.0);
    }

    #[test]
    fn test_same_month_of_previous_year_is_excluded() {
        let now = Local.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let last_year = Local
            .with_ymd_and_hms(2023, 3, 20, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(monthly_revenue(&[order(80.0, last_year)], now), 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_stats_over_file_store() {
        use crate::backend::BackendSelector;
        use crate::models::NewProduct;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let repos = Repositories::new(dir.path(), dir.path(), None, BackendSelector::new());
        for stock in [3, 40] {
            repos
                .products
                .create(NewProduct {
                    name: "n".into(),
                    description: "d".into(),
                    price: 10.0,
                    images: vec!["/i.jpg".into()],
                    category: "c".into(),
                    stock,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let stats = repos.dashboard_stats(Local::now()).await;
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.monthly_revenue, 0.0);
    }
}
