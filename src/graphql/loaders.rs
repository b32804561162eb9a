use crate::domain::{Customer, Product};
use crate::storage::Storage;
use async_graphql::dataloader::{DataLoader, Loader};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// DataLoader for batching customer lookups from orders
pub struct CustomerLoader {
    storage: Arc<dyn Storage>,
}

impl CustomerLoader {
    pub fn new(storage: Arc<dyn Storage>) -> DataLoader<Self> {
        DataLoader::new(Self { storage }, tokio::spawn)
    }
}

#[async_trait]
impl Loader<i64> for CustomerLoader {
    type Value = Customer;
    type Error = String;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        let customers = self
            .storage
            .get_customers_by_ids(keys.to_vec())
            .await
            .map_err(|e| e.to_string())?;

        Ok(customers.into_iter().map(|c| (c.id, c)).collect())
    }
}

/// DataLoader for the product list of each order
pub struct OrderProductsLoader {
    storage: Arc<dyn Storage>,
}

impl OrderProductsLoader {
    pub fn new(storage: Arc<dyn Storage>) -> DataLoader<Self> {
        DataLoader::new(Self { storage }, tokio::spawn)
    }
}

#[async_trait]
impl Loader<i64> for OrderProductsLoader {
    type Value = Vec<Product>;
    type Error = String;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        self.storage
            .get_products_for_orders(keys.to_vec())
            .await
            .map_err(|e| e.to_string())
    }
}
