use crate::constants;
use crate::domain::{NewOrder, Order};
use crate::error::Result;
use crate::metrics::record_mutation;
use crate::storage::Storage;
use async_graphql::{InputObject, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, InputObject)]
pub struct OrderInput {
    pub customer_id: ID,
    pub product_ids: Vec<ID>,
    /// Defaults to the time of creation
    pub order_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderOutcome {
    pub order: Option<Order>,
    pub errors: Vec<String>,
}

impl CreateOrderOutcome {
    fn rejected(message: &str) -> Self {
        record_mutation("createOrder", false);
        Self { order: None, errors: vec![message.to_string()] }
    }
}

/// Use case for placing orders
pub struct OrderUseCase {
    storage: Arc<dyn Storage>,
}

impl OrderUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Checks run in order and stop at the first failure: customer, then a
    /// non-empty product list, then that every requested id resolves to a
    /// distinct existing product. Order row and product links are written
    /// together.
    pub async fn create_order(&self, input: OrderInput) -> Result<CreateOrderOutcome> {
        let customer = match parse_id(&input.customer_id) {
            Some(id) => self.storage.get_customer_by_id(id).await?,
            None => None,
        };
        let Some(customer) = customer else {
            return Ok(CreateOrderOutcome::rejected(constants::INVALID_CUSTOMER_ID));
        };

        if input.product_ids.is_empty() {
            return Ok(CreateOrderOutcome::rejected(constants::NO_PRODUCTS));
        }

        let requested: Option<Vec<i64>> = input.product_ids.iter().map(parse_id).collect();
        let Some(requested) = requested else {
            return Ok(CreateOrderOutcome::rejected(constants::INVALID_PRODUCT_IDS));
        };
        let distinct: BTreeSet<i64> = requested.iter().copied().collect();
        let products = self
            .storage
            .get_products_by_ids(distinct.into_iter().collect())
            .await?;
        // Duplicate ids shrink the resolved set below the request, same as unknown ids
        if products.len() != requested.len() {
            return Ok(CreateOrderOutcome::rejected(constants::INVALID_PRODUCT_IDS));
        }

        let total_amount: Decimal = products.iter().map(|p| p.price).sum();
        let order = self
            .storage
            .create_order(NewOrder {
                customer_id: customer.id,
                product_ids: products.iter().map(|p| p.id).collect(),
                total_amount,
                order_date: input.order_date.unwrap_or_else(Utc::now),
            })
            .await?;

        info!(
            "Created order {} for customer {} ({} products, total {})",
            order.id,
            customer.email,
            products.len(),
            order.total_amount
        );
        record_mutation("createOrder", true);
        Ok(CreateOrderOutcome { order: Some(order), errors: Vec::new() })
    }
}

fn parse_id(id: &ID) -> Option<i64> {
    id.as_str().trim().parse().ok()
}
