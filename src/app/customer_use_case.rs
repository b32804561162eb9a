use crate::constants;
use crate::domain::{Customer, NewCustomer};
use crate::error::{CrmError, Result};
use crate::metrics::record_mutation;
use crate::storage::Storage;
use crate::validation::{is_valid_phone, normalize_email, normalize_name, normalize_phone};
use async_graphql::InputObject;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, InputObject)]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl CustomerInput {
    pub fn new(name: &str, email: &str, phone: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCustomerOutcome {
    pub customer: Option<Customer>,
    pub message: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BulkCreateOutcome {
    pub customers: Vec<Customer>,
    pub errors: Vec<String>,
}

impl CreateCustomerOutcome {
    fn failed(errors: Vec<String>) -> Self {
        Self {
            customer: None,
            message: constants::CUSTOMER_FAILED.to_string(),
            errors,
        }
    }
}

/// Use case for creating customers, one at a time or in batches
pub struct CustomerUseCase {
    storage: Arc<dyn Storage>,
}

impl CustomerUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Validate and persist a single customer. Validation problems come back
    /// in the outcome; only storage failures are returned as `Err`.
    pub async fn create_customer(&self, input: CustomerInput) -> Result<CreateCustomerOutcome> {
        let new = match self
            .validate(&input, &HashSet::new(), constants::PHONE_INVALID)
            .await?
        {
            Ok(new) => new,
            Err(errors) => {
                record_mutation("createCustomer", false);
                return Ok(CreateCustomerOutcome::failed(errors));
            }
        };

        match self.storage.create_customer(new).await {
            Ok(customer) => {
                info!("Created customer {} ({})", customer.id, customer.email);
                record_mutation("createCustomer", true);
                Ok(CreateCustomerOutcome {
                    customer: Some(customer),
                    message: constants::CUSTOMER_CREATED.to_string(),
                    errors: Vec::new(),
                })
            }
            // Lost a race with a concurrent insert of the same address
            Err(CrmError::DuplicateEmail(_)) => {
                record_mutation("createCustomer", false);
                Ok(CreateCustomerOutcome::failed(vec![constants::EMAIL_EXISTS.to_string()]))
            }
            Err(e) => Err(e),
        }
    }

    /// Validate each row independently and persist every valid row in one
    /// transaction. Failed rows are reported as `Row N: ...` (1-based).
    pub async fn bulk_create_customers(&self, inputs: Vec<CustomerInput>) -> Result<BulkCreateOutcome> {
        let mut outcome = BulkCreateOutcome::default();
        let mut row_errors: Vec<(usize, String)> = Vec::new();
        let mut accepted_emails = HashSet::new();
        let mut valid: Vec<(usize, NewCustomer)> = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            let row = index + 1;
            match self
                .validate(input, &accepted_emails, constants::PHONE_INVALID_SHORT)
                .await?
            {
                Ok(new) => {
                    accepted_emails.insert(new.email.clone());
                    valid.push((row, new));
                }
                Err(errors) => row_errors.push((row, errors.join("; "))),
            }
        }

        if !valid.is_empty() {
            let batch: Vec<(usize, String)> = valid.iter().map(|(row, c)| (*row, c.email.clone())).collect();
            match self
                .storage
                .create_customers(valid.into_iter().map(|(_, c)| c).collect())
                .await
            {
                Ok(created) => {
                    info!("Bulk created {} customers ({} rows rejected)", created.len(), row_errors.len());
                    outcome.customers = created;
                }
                Err(CrmError::DuplicateEmail(email)) => {
                    warn!("Bulk customer batch rolled back: {} was taken concurrently", email);
                    row_errors.extend(rolled_back_rows(&batch, &email));
                }
                Err(e) => return Err(e),
            }
        }

        row_errors.sort_by_key(|(row, _)| *row);
        outcome.errors = row_errors
            .into_iter()
            .map(|(row, message)| format!("Row {}: {}", row, message))
            .collect();
        record_mutation("bulkCreateCustomers", !outcome.customers.is_empty());
        Ok(outcome)
    }

    /// Normalize and check one input. `pending` holds emails already accepted
    /// earlier in the same batch.
    async fn validate(
        &self,
        input: &CustomerInput,
        pending: &HashSet<String>,
        phone_message: &str,
    ) -> Result<std::result::Result<NewCustomer, Vec<String>>> {
        let name = normalize_name(&input.name);
        let email = normalize_email(&input.email);
        let phone = normalize_phone(input.phone.as_deref());
        let mut errors = Vec::new();

        if name.is_empty() {
            errors.push(constants::NAME_REQUIRED.to_string());
        }
        if email.is_empty() {
            errors.push(constants::EMAIL_REQUIRED.to_string());
        } else if pending.contains(&email) || self.storage.customer_email_exists(&email).await? {
            errors.push(constants::EMAIL_EXISTS.to_string());
        }
        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                errors.push(phone_message.to_string());
            }
        }

        if errors.is_empty() {
            Ok(Ok(NewCustomer { name, email, phone }))
        } else {
            Ok(Err(errors))
        }
    }
}

/// Errors for a batch whose insert was undone: the first row holding the
/// conflicting email gets the duplicate message, every other row is told the
/// batch was rolled back.
fn rolled_back_rows(batch: &[(usize, String)], conflict: &str) -> Vec<(usize, String)> {
    let culprit = batch.iter().position(|(_, email)| email == conflict);
    batch
        .iter()
        .enumerate()
        .map(|(i, (row, _))| {
            let message = if Some(i) == culprit {
                constants::EMAIL_EXISTS
            } else {
                constants::BATCH_ROLLED_BACK
            };
            (*row, message.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewOrder, NewProduct, Order, Product};
    use crate::filters::{
        CustomerFilter, CustomerSort, OrderFilter, OrderSort, Ordering, ProductFilter, ProductSort,
    };
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Storage whose pre-insert email check never sees existing rows, so the
    /// unique index is what catches a duplicate, as when another writer wins.
    struct StaleEmailCheck(SqliteStorage);

    #[async_trait]
    impl Storage for StaleEmailCheck {
        async fn customer_email_exists(&self, _email: &str) -> Result<bool> {
            Ok(false)
        }
        async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
            self.0.create_customer(customer).await
        }
        async fn create_customers(&self, customers: Vec<NewCustomer>) -> Result<Vec<Customer>> {
            self.0.create_customers(customers).await
        }
        async fn get_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
            self.0.get_customer_by_id(id).await
        }
        async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
            self.0.get_customer_by_email(email).await
        }
        async fn get_customers_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Customer>> {
            self.0.get_customers_by_ids(ids).await
        }
        async fn list_customers(
            &self,
            filter: &CustomerFilter,
            order_by: &[Ordering<CustomerSort>],
        ) -> Result<Vec<Customer>> {
            self.0.list_customers(filter, order_by).await
        }
        async fn create_product(&self, product: NewProduct) -> Result<Product> {
            self.0.create_product(product).await
        }
        async fn get_product_by_name(&self, name: &str) -> Result<Option<Product>> {
            self.0.get_product_by_name(name).await
        }
        async fn get_products_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Product>> {
            self.0.get_products_by_ids(ids).await
        }
        async fn list_products(
            &self,
            filter: &ProductFilter,
            order_by: &[Ordering<ProductSort>],
        ) -> Result<Vec<Product>> {
            self.0.list_products(filter, order_by).await
        }
        async fn restock_low_stock(&self, threshold: i64, amount: i64) -> Result<Vec<Product>> {
            self.0.restock_low_stock(threshold, amount).await
        }
        async fn create_order(&self, order: NewOrder) -> Result<Order> {
            self.0.create_order(order).await
        }
        async fn list_orders(
            &self,
            filter: &OrderFilter,
            order_by: &[Ordering<OrderSort>],
        ) -> Result<Vec<Order>> {
            self.0.list_orders(filter, order_by).await
        }
        async fn get_products_for_orders(&self, order_ids: Vec<i64>) -> Result<HashMap<i64, Vec<Product>>> {
            self.0.get_products_for_orders(order_ids).await
        }
    }

    fn use_case() -> CustomerUseCase {
        CustomerUseCase::new(Arc::new(SqliteStorage::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn collects_every_error_for_a_row() {
        let outcome = use_case()
            .create_customer(CustomerInput::new("  ", "", Some("abc")))
            .await
            .unwrap();
        assert!(outcome.customer.is_none());
        assert_eq!(outcome.message, constants::CUSTOMER_FAILED);
        assert_eq!(
            outcome.errors,
            vec![constants::NAME_REQUIRED, constants::EMAIL_REQUIRED, constants::PHONE_INVALID]
        );
    }

    #[tokio::test]
    async fn normalizes_before_saving() {
        let outcome = use_case()
            .create_customer(CustomerInput::new(" Alice ", " ALICE@Example.com ", Some(" 123-456-7890 ")))
            .await
            .unwrap();
        let customer = outcome.customer.unwrap();
        assert_eq!(customer.name, "Alice");
        assert_eq!(customer.email, "alice@example.com");
        assert_eq!(customer.phone.as_deref(), Some("123-456-7890"));
        assert_eq!(outcome.message, constants::CUSTOMER_CREATED);
    }

    #[tokio::test]
    async fn duplicate_within_one_batch_is_reported_on_the_later_row() {
        let outcome = use_case()
            .bulk_create_customers(vec![
                CustomerInput::new("A", "same@example.com", None),
                CustomerInput::new("B", "SAME@example.com", None),
            ])
            .await
            .unwrap();
        assert_eq!(outcome.customers.len(), 1);
        assert_eq!(outcome.errors, vec!["Row 2: Email already exists."]);
    }

    #[tokio::test]
    async fn bulk_row_errors_are_joined() {
        let outcome = use_case()
            .bulk_create_customers(vec![CustomerInput::new("", "x@example.com", Some("12345"))])
            .await
            .unwrap();
        assert!(outcome.customers.is_empty());
        assert_eq!(outcome.errors, vec!["Row 1: Name is required.; Invalid phone format."]);
    }

    #[tokio::test]
    async fn rolled_back_batch_reports_every_row() {
        let storage = Arc::new(StaleEmailCheck(SqliteStorage::in_memory().unwrap()));
        storage
            .create_customer(NewCustomer {
                name: "Taken".to_string(),
                email: "taken@example.com".to_string(),
                phone: None,
            })
            .await
            .unwrap();
        let use_case = CustomerUseCase::new(storage.clone());

        let outcome = use_case
            .bulk_create_customers(vec![
                CustomerInput::new("A", "a@example.com", None),
                CustomerInput::new("", "bad@example.com", None),
                CustomerInput::new("T", "taken@example.com", None),
                CustomerInput::new("C", "c@example.com", None),
            ])
            .await
            .unwrap();

        assert!(outcome.customers.is_empty());
        assert_eq!(
            outcome.errors,
            vec![
                "Row 1: Batch rolled back.",
                "Row 2: Name is required.",
                "Row 3: Email already exists.",
                "Row 4: Batch rolled back.",
            ]
        );
        assert!(storage.0.get_customer_by_email("a@example.com").await.unwrap().is_none());
    }
}
