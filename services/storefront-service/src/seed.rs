// =============================================================================
// BOOTSTRAP SEEDING
// =============================================================================
// Prepares the file store on startup so the service is usable on a fresh
// machine with no database:
// - data directory and the four data files
// - default admin account
// - a few sample products when the catalog is empty
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{Admin, NewProduct, Order, Product, Size};
use crate::repos::admins::ensure_default_admin;
use crate::repos::settings::SettingsRepository;
use crate::store::file::FileStore;
use crate::store::{Filter, RecordStore};

pub async fn seed_file_store(data_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let products = FileStore::<Product>::new(data_dir);
    let orders = FileStore::<Order>::new(data_dir);
    let admins = FileStore::<Admin>::new(data_dir);

    products.ensure_exists().await?;
    orders.ensure_exists().await?;
    admins.ensure_exists().await?;
    SettingsRepository::new(data_dir).ensure_exists().await?;

    ensure_default_admin(&admins).await?;

    if products.count(&Filter::all()).await == 0 {
        for sample in sample_products() {
            products.create(sample.into_product()).await?;
        }
        tracing::info!(path = %products.path().display(), "Seeded sample products");
    }

    Ok(())
}

fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Classic Shirt".to_string(),
            description: "Cotton shirt with a classic cut".to_string(),
            price: 89.99,
            images: vec!["/images/shirt1.jpg".to_string()],
            category: "shirts".to_string(),
            stock: 25,
            sizes: vec![Size::S, Size::M, Size::L, Size::Xl],
            colors: vec!["white".to_string(), "blue".to_string(), "black".to_string()],
            featured: true,
            ..Default::default()
        },
        NewProduct {
            name: "Sports Pants".to_string(),
            description: "Comfortable pants for training and everyday wear".to_string(),
            price: 129.99,
            images: vec!["/images/pants1.jpg".to_string()],
            category: "pants".to_string(),
            stock: 15,
            sizes: vec![Size::M, Size::L, Size::Xl, Size::Xxl],
            colors: vec!["black".to_string(), "gray".to_string()],
            featured: true,
            ..Default::default()
        },
        NewProduct {
            name: "Winter Jacket".to_string(),
            description: "Warm, water-resistant winter jacket".to_string(),
            price: 199.99,
            images: vec!["/images/jacket1.jpg".to_string()],
            category: "jackets".to_string(),
            stock: 10,
            sizes: vec![Size::M, Size::L, Size::Xl],
            colors: vec!["black".to_string(), "navy".to_string()],
            featured: true,
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_creates_files_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");

        seed_file_store(&data_dir).await.unwrap();
        seed_file_store(&data_dir).await.unwrap();

        for file in ["products.json", "orders.json", "admins.json", "settings.json"] {
            assert!(data_dir.join(file).exists(), "{file} missing");
        }

        let products = FileStore::<Product>::new(&data_dir);
        let seeded = products.list(&Filter::all()).await;
        assert_eq!(seeded.len(), 3);
        assert!(seeded.iter().all(|p| p.featured && !p.images.is_empty()));

        let admins = FileStore::<Admin>::new(&data_dir);
        assert_eq!(admins.count(&Filter::all()).await, 1);
        assert_eq!(FileStore::<Order>::new(&data_dir).count(&Filter::all()).await, 0);
    }
}
