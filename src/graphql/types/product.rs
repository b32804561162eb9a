use crate::domain::Product as DomainProduct;
use async_graphql::{Object, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// GraphQL representation of a Product
#[derive(Clone)]
pub struct Product {
    pub inner: DomainProduct,
}

impl From<DomainProduct> for Product {
    fn from(product: DomainProduct) -> Self {
        Self { inner: product }
    }
}

#[Object]
impl Product {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unit price with two decimal places
    async fn price(&self) -> Decimal {
        self.inner.price
    }

    /// Units on hand
    async fn stock(&self) -> i64 {
        self.inner.stock
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}
