use super::{Customer, Order, Product};
use crate::app::{BulkCreateOutcome, CreateCustomerOutcome, CreateOrderOutcome, CreateProductOutcome, RestockOutcome};
use async_graphql::SimpleObject;

#[derive(SimpleObject)]
pub struct CreateCustomerPayload {
    pub customer: Option<Customer>,
    pub message: String,
    pub errors: Vec<String>,
}

#[derive(SimpleObject)]
pub struct BulkCreateCustomersPayload {
    pub customers: Vec<Customer>,
    /// One entry per rejected row, prefixed `Row N: `
    pub errors: Vec<String>,
}

#[derive(SimpleObject)]
pub struct CreateProductPayload {
    pub product: Option<Product>,
    pub errors: Vec<String>,
}

#[derive(SimpleObject)]
pub struct CreateOrderPayload {
    pub order: Option<Order>,
    pub errors: Vec<String>,
}

#[derive(SimpleObject)]
pub struct UpdateLowStockProductsPayload {
    pub success: bool,
    pub message: String,
    pub updated_products: Vec<Product>,
}

impl From<CreateCustomerOutcome> for CreateCustomerPayload {
    fn from(outcome: CreateCustomerOutcome) -> Self {
        Self {
            customer: outcome.customer.map(Into::into),
            message: outcome.message,
            errors: outcome.errors,
        }
    }
}

impl From<BulkCreateOutcome> for BulkCreateCustomersPayload {
    fn from(outcome: BulkCreateOutcome) -> Self {
        Self {
            customers: outcome.customers.into_iter().map(Into::into).collect(),
            errors: outcome.errors,
        }
    }
}

impl From<CreateProductOutcome> for CreateProductPayload {
    fn from(outcome: CreateProductOutcome) -> Self {
        Self { product: outcome.product.map(Into::into), errors: outcome.errors }
    }
}

impl From<CreateOrderOutcome> for CreateOrderPayload {
    fn from(outcome: CreateOrderOutcome) -> Self {
        Self { order: outcome.order.map(Into::into), errors: outcome.errors }
    }
}

impl From<RestockOutcome> for UpdateLowStockProductsPayload {
    fn from(outcome: RestockOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message,
            updated_products: outcome.updated_products.into_iter().map(Into::into).collect(),
        }
    }
}
