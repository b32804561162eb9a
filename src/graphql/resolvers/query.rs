use crate::constants;
use crate::filters::{parse_order_by, CustomerFilter, OrderFilter, ProductFilter};
use crate::graphql::schema::GraphQLContext;
use crate::graphql::types::{Customer, Order, Product};
use async_graphql::{Context, FieldResult, Object};

/// Root query object for GraphQL
pub struct Query;

#[Object]
impl Query {
    /// Liveness check used by the heartbeat job
    async fn hello(&self) -> &'static str {
        constants::HELLO
    }

    /// List customers. `orderBy` takes field names, `-` prefixed for descending.
    async fn all_customers(
        &self,
        ctx: &Context<'_>,
        filter: Option<CustomerFilter>,
        order_by: Option<Vec<String>>,
    ) -> FieldResult<Vec<Customer>> {
        let context = ctx.data::<GraphQLContext>()?;
        let order_by = parse_order_by(&order_by.unwrap_or_default())?;
        let customers = context
            .storage
            .list_customers(&filter.unwrap_or_default(), &order_by)
            .await?;
        Ok(customers.into_iter().map(|c| c.into()).collect())
    }

    /// List products
    async fn all_products(
        &self,
        ctx: &Context<'_>,
        filter: Option<ProductFilter>,
        order_by: Option<Vec<String>>,
    ) -> FieldResult<Vec<Product>> {
        let context = ctx.data::<GraphQLContext>()?;
        let order_by = parse_order_by(&order_by.unwrap_or_default())?;
        let products = context
            .storage
            .list_products(&filter.unwrap_or_default(), &order_by)
            .await?;
        Ok(products.into_iter().map(|p| p.into()).collect())
    }

    /// List orders; joined filters never yield the same order twice
    async fn all_orders(
        &self,
        ctx: &Context<'_>,
        filter: Option<OrderFilter>,
        order_by: Option<Vec<String>>,
    ) -> FieldResult<Vec<Order>> {
        let context = ctx.data::<GraphQLContext>()?;
        let order_by = parse_order_by(&order_by.unwrap_or_default())?;
        let orders = context
            .storage
            .list_orders(&filter.unwrap_or_default(), &order_by)
            .await?;
        Ok(orders.into_iter().map(|o| o.into()).collect())
    }
}
