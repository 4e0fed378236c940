//! Central inventory seed.
//!
//! Writes the initial catalog into the shared store on first boot only;
//! an inventory that already has entries is left untouched so restarts
//! and extra replicas never reset stock.

use tracing::info;

use ecomarket_core::Product;
use ecomarket_store::{keys, SharedStore, StateStore, StoreError, StoreResult};

/// Initial catalog, including the reserved test product.
pub fn initial_catalog(test_product_id: u32) -> Vec<Product> {
    vec![
        Product::new(1, "Organic Coffee 500g", 12.50, 100),
        Product::new(2, "Almond Milk 1L", 3.75, 200),
        Product::new(3, "Whole Wheat Bread", 2.40, 150),
        Product::new(4, "Free-Range Eggs x12", 4.90, 120),
        Product::new(5, "Olive Oil 750ml", 8.99, 80),
        Product::new(test_product_id, "Test Product", 0.0, 100_000),
    ]
}

/// Seeds the catalog if the inventory hash is empty.
pub async fn seed_if_empty(store: &SharedStore, test_product_id: u32) -> StoreResult<()> {
    if !store.hash_values(keys::INVENTORY_HASH).await?.is_empty() {
        info!("central inventory already present, seed skipped");
        return Ok(());
    }

    let catalog = initial_catalog(test_product_id);
    for product in &catalog {
        let value = serde_json::to_string(product)
            .map_err(|e| StoreError::malformed(keys::INVENTORY_HASH, e.to_string()))?;
        store
            .hash_set(keys::INVENTORY_HASH, &product.id.to_string(), &value)
            .await?;
    }
    info!(products = catalog.len(), "central inventory seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ecomarket_store::MemoryStore;

    #[tokio::test]
    async fn test_seed_writes_catalog_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        seed_if_empty(&store, 999).await.unwrap();
        assert_eq!(store.hash_values(keys::INVENTORY_HASH).await.unwrap().len(), 6);

        // Mutate one product, reseed, verify the mutation survives.
        let mut coffee: Product = serde_json::from_str(
            &store.hash_get(keys::INVENTORY_HASH, "1").await.unwrap().unwrap(),
        )
        .unwrap();
        coffee.stock = 7;
        store
            .hash_set(keys::INVENTORY_HASH, "1", &serde_json::to_string(&coffee).unwrap())
            .await
            .unwrap();

        seed_if_empty(&store, 999).await.unwrap();
        let after: Product = serde_json::from_str(
            &store.hash_get(keys::INVENTORY_HASH, "1").await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(after.stock, 7);
    }
}
