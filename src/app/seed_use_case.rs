use crate::app::order_use_case::{OrderInput, OrderUseCase};
use crate::domain::{Customer, NewCustomer, NewProduct, Order, Product};
use crate::error::{CrmError, Result};
use crate::storage::Storage;
use async_graphql::ID;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct SeedSummary {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub order: Option<Order>,
}

/// Demo data: two customers and two products created when absent, plus one
/// new order for the first customer on every run.
pub struct SeedUseCase {
    storage: Arc<dyn Storage>,
}

impl SeedUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn run(&self) -> Result<SeedSummary> {
        let alice = self.customer("Alice", "alice@example.com", "+1234567890").await?;
        let bob = self.customer("Bob", "bob@example.com", "123-456-7890").await?;
        let laptop = self.product("Laptop", Decimal::new(99_999, 2), 10).await?;
        let mouse = self.product("Mouse", Decimal::new(1_999, 2), 50).await?;

        let outcome = OrderUseCase::new(self.storage.clone())
            .create_order(OrderInput {
                customer_id: ID(alice.id.to_string()),
                product_ids: vec![ID(laptop.id.to_string()), ID(mouse.id.to_string())],
                order_date: None,
            })
            .await?;
        if !outcome.errors.is_empty() {
            return Err(CrmError::Rejected(outcome.errors.join("; ")));
        }

        info!("Seed data created");
        Ok(SeedSummary {
            customers: vec![alice, bob],
            products: vec![laptop, mouse],
            order: outcome.order,
        })
    }

    async fn customer(&self, name: &str, email: &str, phone: &str) -> Result<Customer> {
        if let Some(existing) = self.storage.get_customer_by_email(email).await? {
            return Ok(existing);
        }
        self.storage
            .create_customer(NewCustomer {
                name: name.to_string(),
                email: email.to_string(),
                phone: Some(phone.to_string()),
            })
            .await
    }

    async fn product(&self, name: &str, price: Decimal, stock: i64) -> Result<Product> {
        if let Some(existing) = self.storage.get_product_by_name(name).await? {
            return Ok(existing);
        }
        self.storage
            .create_product(NewProduct { name: name.to_string(), price, stock })
            .await
    }
}
