use crate::constants;
use crate::domain::{round_money, to_cents, NewProduct, Product};
use crate::error::Result;
use crate::metrics::record_mutation;
use crate::storage::Storage;
use crate::validation::normalize_name;
use async_graphql::InputObject;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, InputObject)]
pub struct ProductInput {
    pub name: String,
    pub price: Option<Decimal>,
    /// Defaults to 0
    pub stock: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateProductOutcome {
    pub product: Option<Product>,
    pub errors: Vec<String>,
}

/// Use case for creating products
pub struct ProductUseCase {
    storage: Arc<dyn Storage>,
}

impl ProductUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<CreateProductOutcome> {
        let new = match validate(input) {
            Ok(new) => new,
            Err(errors) => {
                record_mutation("createProduct", false);
                return Ok(CreateProductOutcome { product: None, errors });
            }
        };
        let product = self.storage.create_product(new).await?;
        info!("Created product {} ({} @ {})", product.id, product.name, product.price);
        record_mutation("createProduct", true);
        Ok(CreateProductOutcome { product: Some(product), errors: Vec::new() })
    }
}

fn validate(input: ProductInput) -> std::result::Result<NewProduct, Vec<String>> {
    let name = normalize_name(&input.name);
    let price = input.price.map(round_money);
    let stock = input.stock.unwrap_or(0);
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(constants::NAME_REQUIRED.to_string());
    }
    match price {
        Some(p) if p > Decimal::ZERO => {
            if to_cents(p).is_none() {
                errors.push(constants::PRICE_OUT_OF_RANGE.to_string());
            }
        }
        _ => errors.push(constants::PRICE_NOT_POSITIVE.to_string()),
    }
    if stock < 0 {
        errors.push(constants::STOCK_NEGATIVE.to_string());
    }

    match price {
        Some(price) if errors.is_empty() => Ok(NewProduct { name, price, stock }),
        _ => Err(errors),
    }
}
