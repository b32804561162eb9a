pub mod customer;
pub mod order;
pub mod payloads;
pub mod product;

pub use customer::Customer;
pub use order::Order;
pub use payloads::{
    BulkCreateCustomersPayload, CreateCustomerPayload, CreateOrderPayload, CreateProductPayload,
    UpdateLowStockProductsPayload,
};
pub use product::Product;
