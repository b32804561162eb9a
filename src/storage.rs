use crate::db::{self, format_timestamp, parse_timestamp};
use crate::domain::{from_cents, to_cents, Customer, NewCustomer, NewOrder, NewProduct, Order, Product};
use crate::error::{CrmError, Result};
use crate::filters::{
    CustomerFilter, CustomerSort, OrderFilter, OrderSort, Ordering, ProductFilter, ProductSort,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Storage trait for the CRM data model.
///
/// Multi-row writes (`create_customers`, `create_order`, `restock_low_stock`)
/// are all-or-nothing.
#[async_trait]
pub trait Storage: Send + Sync {
    // Customer operations
    async fn customer_email_exists(&self, email: &str) -> Result<bool>;
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer>;
    async fn create_customers(&self, customers: Vec<NewCustomer>) -> Result<Vec<Customer>>;
    async fn get_customer_by_id(&self, id: i64) -> Result<Option<Customer>>;
    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;
    async fn get_customers_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Customer>>;
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        order_by: &[Ordering<CustomerSort>],
    ) -> Result<Vec<Customer>>;

    // Product operations
    async fn create_product(&self, product: NewProduct) -> Result<Product>;
    async fn get_product_by_name(&self, name: &str) -> Result<Option<Product>>;
    async fn get_products_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Product>>;
    async fn list_products(
        &self,
        filter: &ProductFilter,
        order_by: &[Ordering<ProductSort>],
    ) -> Result<Vec<Product>>;
    /// Add `amount` to the stock of every product below `threshold`.
    async fn restock_low_stock(&self, threshold: i64, amount: i64) -> Result<Vec<Product>>;

    // Order operations
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        order_by: &[Ordering<OrderSort>],
    ) -> Result<Vec<Order>>;
    /// Products of each requested order, keyed by order id.
    async fn get_products_for_orders(&self, order_ids: Vec<i64>) -> Result<HashMap<i64, Vec<Product>>>;
}

const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.created_at";
const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price_cents, p.stock, p.created_at";
const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.total_amount_cents, o.order_date";

/// Extended result code for a violated UNIQUE constraint.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// Keeps `IN (...)` lists under SQLite's bound-parameter limit.
const IN_CHUNK: usize = 500;

/// SQLite-backed storage. A single connection serves the process; each
/// call holds it for the duration of its statements.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { conn: Mutex::new(db::open(path)?) })
    }

    /// Private in-memory database, used for tests and throwaway servers.
    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Mutex::new(db::open_in_memory()?) })
    }
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        price: from_cents(row.get(2)?),
        stock: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        total_amount: from_cents(row.get(2)?),
        order_date: timestamp_at(row, 3)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == SQLITE_CONSTRAINT_UNIQUE)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn insert_customer(conn: &Connection, customer: NewCustomer, now: DateTime<Utc>) -> Result<Customer> {
    let inserted = conn.execute(
        "INSERT INTO customers (name, email, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![customer.name, customer.email, customer.phone, format_timestamp(&now)],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(CrmError::DuplicateEmail(customer.email)),
        Err(e) => return Err(e.into()),
    }
    let id = conn.last_insert_rowid();
    debug!("Created customer: {} with id {}", customer.email, id);
    Ok(Customer {
        id,
        name: customer.name,
        email: customer.email,
        phone: customer.phone,
        created_at: now,
    })
}

fn select_products_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Product>> {
    let mut products = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT {} FROM products p WHERE p.id IN ({}) ORDER BY p.id",
            PRODUCT_COLUMNS,
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), product_from_row)?;
        for row in rows {
            products.push(row?);
        }
    }
    Ok(products)
}

/// `(order_id, product)` pairs for the given orders.
fn select_order_products(conn: &Connection, order_ids: &[i64]) -> Result<Vec<(i64, Product)>> {
    let mut pairs = Vec::new();
    for chunk in order_ids.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT op.order_id, {} FROM order_products op JOIN products p ON p.id = op.product_id \
             WHERE op.order_id IN ({}) ORDER BY op.order_id, p.id",
            PRODUCT_COLUMNS,
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            let order_id: i64 = row.get(0)?;
            let product = Product {
                id: row.get(1)?,
                name: row.get(2)?,
                price: from_cents(row.get(3)?),
                stock: row.get(4)?,
                created_at: timestamp_at(row, 5)?,
            };
            Ok((order_id, product))
        })?;
        for row in rows {
            pairs.push(row?);
        }
    }
    Ok(pairs)
}

fn query_all<T, F>(conn: &Connection, sql: &str, params: &[Value], map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn customer_email_exists(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM customers WHERE email = ?1", params![email], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let conn = self.conn.lock().await;
        insert_customer(&conn, customer, Utc::now())
    }

    async fn create_customers(&self, customers: Vec<NewCustomer>) -> Result<Vec<Customer>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(customers.len());
        for customer in customers {
            created.push(insert_customer(&tx, customer, now)?);
        }
        tx.commit()?;
        debug!("Committed batch of {} customers", created.len());
        Ok(created)
    }

    async fn get_customer_by_id(&self, id: i64) -> Result<Option<Customer>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM customers c WHERE c.id = ?1", CUSTOMER_COLUMNS);
        Ok(conn.query_row(&sql, params![id], customer_from_row).optional()?)
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM customers c WHERE c.email = ?1", CUSTOMER_COLUMNS);
        Ok(conn.query_row(&sql, params![email], customer_from_row).optional()?)
    }

    async fn get_customers_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Customer>> {
        let conn = self.conn.lock().await;
        let mut customers = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT {} FROM customers c WHERE c.id IN ({})",
                CUSTOMER_COLUMNS,
                placeholders(chunk.len())
            );
            let params: Vec<Value> = chunk.iter().map(|id| Value::Integer(*id)).collect();
            customers.extend(query_all(&conn, &sql, &params, customer_from_row)?);
        }
        Ok(customers)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        order_by: &[Ordering<CustomerSort>],
    ) -> Result<Vec<Customer>> {
        let tail = filter.to_sql(order_by);
        let sql = format!("SELECT {} FROM customers c{}", CUSTOMER_COLUMNS, tail.sql());
        let conn = self.conn.lock().await;
        query_all(&conn, &sql, &tail.params, customer_from_row)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let cents = to_cents(product.price)
            .ok_or_else(|| CrmError::InvalidAmount(product.price.to_string()))?;
        let now = Utc::now();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO products (name, price_cents, stock, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![product.name, cents, product.stock, format_timestamp(&now)],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created product: {} with id {}", product.name, id);
        Ok(Product {
            id,
            name: product.name,
            price: from_cents(cents),
            stock: product.stock,
            created_at: now,
        })
    }

    async fn get_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM products p WHERE p.name = ?1 ORDER BY p.id LIMIT 1", PRODUCT_COLUMNS);
        Ok(conn.query_row(&sql, params![name], product_from_row).optional()?)
    }

    async fn get_products_by_ids(&self, ids: Vec<i64>) -> Result<Vec<Product>> {
        let conn = self.conn.lock().await;
        select_products_by_ids(&conn, &ids)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        order_by: &[Ordering<ProductSort>],
    ) -> Result<Vec<Product>> {
        let tail = filter.to_sql(order_by)?;
        let sql = format!("SELECT {} FROM products p{}", PRODUCT_COLUMNS, tail.sql());
        let conn = self.conn.lock().await;
        query_all(&conn, &sql, &tail.params, product_from_row)
    }

    async fn restock_low_stock(&self, threshold: i64, amount: i64) -> Result<Vec<Product>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM products WHERE stock < ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![threshold], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        tx.execute("UPDATE products SET stock = stock + ?1 WHERE stock < ?2", params![amount, threshold])?;
        let updated = select_products_by_ids(&tx, &ids)?;
        tx.commit()?;
        debug!("Restocked {} products below {}", updated.len(), threshold);
        Ok(updated)
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let total_cents = to_cents(order.total_amount)
            .ok_or_else(|| CrmError::InvalidAmount(order.total_amount.to_string()))?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO orders (customer_id, total_amount_cents, order_date) VALUES (?1, ?2, ?3)",
            params![order.customer_id, total_cents, format_timestamp(&order.order_date)],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut link = tx.prepare("INSERT INTO order_products (order_id, product_id) VALUES (?1, ?2)")?;
            for product_id in &order.product_ids {
                link.execute(params![id, product_id])?;
            }
        }
        tx.commit()?;
        debug!("Created order {} with {} products", id, order.product_ids.len());
        Ok(Order {
            id,
            customer_id: order.customer_id,
            total_amount: from_cents(total_cents),
            order_date: order.order_date,
        })
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        order_by: &[Ordering<OrderSort>],
    ) -> Result<Vec<Order>> {
        let tail = filter.to_sql(order_by)?;
        let sql = format!("SELECT {} FROM orders o{}", ORDER_COLUMNS, tail.sql());
        let conn = self.conn.lock().await;
        query_all(&conn, &sql, &tail.params, order_from_row)
    }

    async fn get_products_for_orders(&self, order_ids: Vec<i64>) -> Result<HashMap<i64, Vec<Product>>> {
        let conn = self.conn.lock().await;
        let mut map: HashMap<i64, Vec<Product>> = HashMap::new();
        for (order_id, product) in select_order_products(&conn, &order_ids)? {
            map.entry(order_id).or_default().push(product);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer { name: "Test".to_string(), email: email.to_string(), phone: None }
    }

    #[tokio::test]
    async fn duplicate_email_in_batch_rolls_back_everything() {
        let storage = SqliteStorage::in_memory().unwrap();
        let err = storage
            .create_customers(vec![new_customer("a@example.com"), new_customer("a@example.com")])
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::DuplicateEmail(ref e) if e == "a@example.com"));
        assert!(!storage.customer_email_exists("a@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn order_with_unknown_product_writes_nothing() {
        let storage = SqliteStorage::in_memory().unwrap();
        let customer = storage.create_customer(new_customer("a@example.com")).await.unwrap();
        let result = storage
            .create_order(NewOrder {
                customer_id: customer.id,
                product_ids: vec![42],
                total_amount: Decimal::from_str("1.00").unwrap(),
                order_date: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(CrmError::Database(_))));
        let orders = storage.list_orders(&OrderFilter::default(), &[]).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn order_products_come_from_the_batch_lookup() {
        let storage = SqliteStorage::in_memory().unwrap();
        let customer = storage.create_customer(new_customer("a@example.com")).await.unwrap();
        let mut ids = Vec::new();
        for name in ["Laptop", "Mouse"] {
            let product = storage
                .create_product(NewProduct {
                    name: name.to_string(),
                    price: Decimal::from_str("10.00").unwrap(),
                    stock: 5,
                })
                .await
                .unwrap();
            ids.push(product.id);
        }
        let order = storage
            .create_order(NewOrder {
                customer_id: customer.id,
                product_ids: ids.clone(),
                total_amount: Decimal::from_str("20.00").unwrap(),
                order_date: Utc::now(),
            })
            .await
            .unwrap();

        let orders = storage.list_orders(&OrderFilter::default(), &[]).await.unwrap();
        assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![order.id]);
        assert_eq!(orders[0].total_amount, Decimal::from_str("20.00").unwrap());

        let linked = storage.get_products_for_orders(vec![order.id]).await.unwrap();
        let mut linked_ids: Vec<i64> = linked[&order.id].iter().map(|p| p.id).collect();
        linked_ids.sort();
        assert_eq!(linked_ids, ids);
    }

    #[tokio::test]
    async fn restock_only_touches_low_stock_products() {
        let storage = SqliteStorage::in_memory().unwrap();
        for (name, stock) in [("Low", 3), ("High", 50)] {
            storage
                .create_product(NewProduct {
                    name: name.to_string(),
                    price: Decimal::from_str("5.00").unwrap(),
                    stock,
                })
                .await
                .unwrap();
        }
        let updated = storage.restock_low_stock(10, 10).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].name, "Low");
        assert_eq!(updated[0].stock, 13);
    }
}
