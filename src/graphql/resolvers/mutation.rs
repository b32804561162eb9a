use crate::app::{
    CustomerInput, CustomerUseCase, InventoryUseCase, OrderInput, OrderUseCase, ProductInput,
    ProductUseCase,
};
use crate::graphql::schema::GraphQLContext;
use crate::graphql::types::{
    BulkCreateCustomersPayload, CreateCustomerPayload, CreateOrderPayload, CreateProductPayload,
    UpdateLowStockProductsPayload,
};
use async_graphql::{Context, FieldResult, Object};

/// Root mutation object for GraphQL.
///
/// Validation failures come back in the payload's `errors`; only storage
/// faults surface as GraphQL errors.
pub struct Mutation;

#[Object]
impl Mutation {
    async fn create_customer(
        &self,
        ctx: &Context<'_>,
        input: CustomerInput,
    ) -> FieldResult<CreateCustomerPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let outcome = CustomerUseCase::new(context.storage.clone())
            .create_customer(input)
            .await?;
        Ok(outcome.into())
    }

    /// Create every valid row; invalid rows are reported as `Row N: <message>`
    async fn bulk_create_customers(
        &self,
        ctx: &Context<'_>,
        input: Vec<CustomerInput>,
    ) -> FieldResult<BulkCreateCustomersPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let outcome = CustomerUseCase::new(context.storage.clone())
            .bulk_create_customers(input)
            .await?;
        Ok(outcome.into())
    }

    async fn create_product(
        &self,
        ctx: &Context<'_>,
        input: ProductInput,
    ) -> FieldResult<CreateProductPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let outcome = ProductUseCase::new(context.storage.clone())
            .create_product(input)
            .await?;
        Ok(outcome.into())
    }

    async fn create_order(&self, ctx: &Context<'_>, input: OrderInput) -> FieldResult<CreateOrderPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let outcome = OrderUseCase::new(context.storage.clone())
            .create_order(input)
            .await?;
        Ok(outcome.into())
    }

    /// Top up every product whose stock is below the configured threshold
    async fn update_low_stock_products(
        &self,
        ctx: &Context<'_>,
    ) -> FieldResult<UpdateLowStockProductsPayload> {
        let context = ctx.data::<GraphQLContext>()?;
        let jobs = &context.config.jobs;
        let outcome = InventoryUseCase::new(
            context.storage.clone(),
            jobs.low_stock_threshold,
            jobs.restock_amount,
        )
        .restock_low_stock()
        .await?;
        Ok(outcome.into())
    }
}
