use crate::domain::Order as DomainOrder;
use crate::graphql::schema::GraphQLContext;
use async_graphql::{Context, FieldResult, Object, ID};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// GraphQL representation of an Order
#[derive(Clone)]
pub struct Order {
    pub inner: DomainOrder,
}

impl From<DomainOrder> for Order {
    fn from(order: DomainOrder) -> Self {
        Self { inner: order }
    }
}

#[Object]
impl Order {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    /// The customer who placed the order
    async fn customer(&self, ctx: &Context<'_>) -> FieldResult<Option<super::customer::Customer>> {
        let context = ctx.data::<GraphQLContext>()?;
        let customer = context.customer_loader.load_one(self.inner.customer_id).await?;
        Ok(customer.map(|c| c.into()))
    }

    /// Products included in the order
    async fn products(&self, ctx: &Context<'_>) -> FieldResult<Vec<super::product::Product>> {
        let context = ctx.data::<GraphQLContext>()?;
        let products = context
            .order_products_loader
            .load_one(self.inner.id)
            .await?
            .unwrap_or_default();
        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// Sum of the product prices when the order was placed
    async fn total_amount(&self) -> Decimal {
        self.inner.total_amount
    }

    async fn order_date(&self) -> DateTime<Utc> {
        self.inner.order_date
    }
}
