pub mod customer_use_case;
pub mod inventory_use_case;
pub mod order_use_case;
pub mod product_use_case;
pub mod seed_use_case;

pub use customer_use_case::{BulkCreateOutcome, CreateCustomerOutcome, CustomerInput, CustomerUseCase};
pub use inventory_use_case::{InventoryUseCase, RestockOutcome};
pub use order_use_case::{CreateOrderOutcome, OrderInput, OrderUseCase};
pub use product_use_case::{CreateProductOutcome, ProductInput, ProductUseCase};
pub use seed_use_case::{SeedSummary, SeedUseCase};
