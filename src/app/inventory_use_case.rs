use crate::domain::Product;
use crate::error::Result;
use crate::metrics::record_mutation;
use crate::storage::Storage;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RestockOutcome {
    pub success: bool,
    pub message: String,
    pub updated_products: Vec<Product>,
}

/// Use case for topping up products that are running low
pub struct InventoryUseCase {
    storage: Arc<dyn Storage>,
    threshold: i64,
    amount: i64,
}

impl InventoryUseCase {
    pub fn new(storage: Arc<dyn Storage>, threshold: i64, amount: i64) -> Self {
        Self { storage, threshold, amount }
    }

    pub async fn restock_low_stock(&self) -> Result<RestockOutcome> {
        let updated = self.storage.restock_low_stock(self.threshold, self.amount).await?;
        info!(
            "Restocked {} products below {} by {}",
            updated.len(),
            self.threshold,
            self.amount
        );
        record_mutation("updateLowStockProducts", true);
        Ok(RestockOutcome {
            success: true,
            message: format!("Updated {} low-stock product(s).", updated.len()),
            updated_products: updated,
        })
    }
}
