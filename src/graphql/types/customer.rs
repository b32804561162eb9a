use crate::domain::Customer as DomainCustomer;
use async_graphql::{Object, ID};
use chrono::{DateTime, Utc};

/// GraphQL representation of a Customer
#[derive(Clone)]
pub struct Customer {
    pub inner: DomainCustomer,
}

impl From<DomainCustomer> for Customer {
    fn from(customer: DomainCustomer) -> Self {
        Self { inner: customer }
    }
}

#[Object]
impl Customer {
    async fn id(&self) -> ID {
        ID(self.inner.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.inner.name
    }

    /// Always stored lowercase
    async fn email(&self) -> &str {
        &self.inner.email
    }

    async fn phone(&self) -> Option<&str> {
        self.inner.phone.as_deref()
    }

    /// When the customer was created
    async fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }
}
