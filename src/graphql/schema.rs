use crate::config::Config;
use crate::graphql::loaders::{CustomerLoader, OrderProductsLoader};
use crate::graphql::resolvers::{Mutation, Query};
use crate::storage::Storage;
use async_graphql::dataloader::DataLoader;
use async_graphql::{EmptySubscription, Schema};
use std::sync::Arc;

/// GraphQL context containing shared application state
pub struct GraphQLContext {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<Config>,
    pub customer_loader: DataLoader<CustomerLoader>,
    pub order_products_loader: DataLoader<OrderProductsLoader>,
}

/// The complete GraphQL schema
pub type GraphQLSchema = Schema<Query, Mutation, EmptySubscription>;

/// Create a new GraphQL schema with the given storage
pub fn create_schema(storage: Arc<dyn Storage>, config: Arc<Config>) -> GraphQLSchema {
    let context = GraphQLContext {
        customer_loader: CustomerLoader::new(storage.clone()),
        order_products_loader: OrderProductsLoader::new(storage.clone()),
        storage,
        config,
    };
    Schema::build(Query, Mutation, EmptySubscription)
        .data(context)
        .finish()
}
