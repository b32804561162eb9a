//! Filter and ordering inputs for the listing queries, and their SQL rendering.
//!
//! Every filter field is optional; an absent field places no constraint.
//! Present fields combine with logical AND.

use crate::error::{CrmError, Result};
use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::db::format_timestamp;

#[derive(Debug, Clone, Default, InputObject)]
pub struct CustomerFilter {
    /// Case-insensitive substring of the customer name
    pub name_icontains: Option<String>,
    /// Case-insensitive substring of the email address
    pub email_icontains: Option<String>,
    pub created_at_gte: Option<DateTime<Utc>>,
    pub created_at_lte: Option<DateTime<Utc>>,
    /// Exact string prefix of the phone number, e.g. "+1"
    pub phone_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct ProductFilter {
    pub name_icontains: Option<String>,
    pub price_gte: Option<Decimal>,
    pub price_lte: Option<Decimal>,
    pub stock_gte: Option<i64>,
    pub stock_lte: Option<i64>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct OrderFilter {
    /// Case-insensitive substring of the owning customer's name
    pub customer_name: Option<String>,
    /// Case-insensitive substring of any ordered product's name
    pub product_name: Option<String>,
    /// Orders containing this product id
    pub product_id: Option<i64>,
    pub total_amount_gte: Option<Decimal>,
    pub total_amount_lte: Option<Decimal>,
    pub order_date_gte: Option<DateTime<Utc>>,
    pub order_date_lte: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A column a listing may be sorted by.
pub trait SortField: Copy {
    fn parse(name: &str) -> Option<Self>;
    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering<F> {
    pub field: F,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSort {
    Name,
    Email,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    Name,
    Price,
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSort {
    OrderDate,
    TotalAmount,
}

impl SortField for CustomerSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "created_at" | "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "c.name",
            Self::Email => "c.email",
            Self::CreatedAt => "c.created_at",
        }
    }
}

impl SortField for ProductSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "stock" => Some(Self::Stock),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "p.name",
            Self::Price => "p.price_cents",
            Self::Stock => "p.stock",
        }
    }
}

impl SortField for OrderSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "order_date" | "orderDate" => Some(Self::OrderDate),
            "total_amount" | "totalAmount" => Some(Self::TotalAmount),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::OrderDate => "o.order_date",
            Self::TotalAmount => "o.total_amount_cents",
        }
    }
}

/// Parse `["name", "-created_at"]` style keys; a leading `-` sorts descending.
pub fn parse_order_by<F: SortField>(keys: &[String]) -> Result<Vec<Ordering<F>>> {
    keys.iter()
        .map(|key| {
            let key = key.trim();
            let (name, direction) = match key.strip_prefix('-') {
                Some(rest) => (rest, Direction::Desc),
                None => (key, Direction::Asc),
            };
            F::parse(name)
                .map(|field| Ordering { field, direction })
                .ok_or_else(|| CrmError::InvalidFilter(format!("unknown ordering field '{}'", key)))
        })
        .collect()
}

/// A rendered `WHERE ... ORDER BY ...` tail with its positional parameters.
#[derive(Debug, Default)]
pub(crate) struct SqlTail {
    clauses: Vec<String>,
    pub params: Vec<Value>,
    order: Vec<String>,
}

impl SqlTail {
    fn push(&mut self, clause: &str, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
    }

    fn contains(&mut self, column: &str, needle: &Option<String>) {
        if let Some(needle) = needle {
            self.push(&format!("{} LIKE ? ESCAPE '\\'", column), [Value::Text(like_pattern(needle))]);
        }
    }

    fn order_by<F: SortField>(&mut self, orderings: &[Ordering<F>], id_column: &str) {
        for o in orderings {
            let dir = match o.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            self.order.push(format!("{} {}", o.field.column(), dir));
        }
        self.order.push(format!("{} ASC", id_column));
    }

    pub fn sql(&self) -> String {
        let mut out = String::new();
        if !self.clauses.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&self.clauses.join(" AND "));
        }
        if !self.order.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_str(&self.order.join(", "));
        }
        out
    }
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Cents for a `>=` bound, rounded up so sub-cent bounds never admit
/// cheaper rows.
fn lower_cents(amount: Decimal) -> Result<Value> {
    bound_cents(amount, RoundingStrategy::ToPositiveInfinity)
}

/// Cents for a `<=` bound, rounded down.
fn upper_cents(amount: Decimal) -> Result<Value> {
    bound_cents(amount, RoundingStrategy::ToNegativeInfinity)
}

fn bound_cents(amount: Decimal, strategy: RoundingStrategy) -> Result<Value> {
    (amount.round_dp_with_strategy(2, strategy) * Decimal::ONE_HUNDRED)
        .to_i64()
        .map(Value::Integer)
        .ok_or_else(|| CrmError::InvalidFilter(format!("amount out of range: {}", amount)))
}

impl CustomerFilter {
    pub(crate) fn to_sql(&self, orderings: &[Ordering<CustomerSort>]) -> SqlTail {
        let mut tail = SqlTail::default();
        tail.contains("c.name", &self.name_icontains);
        tail.contains("c.email", &self.email_icontains);
        if let Some(ts) = self.created_at_gte {
            tail.push("c.created_at >= ?", [Value::Text(format_timestamp(&ts))]);
        }
        if let Some(ts) = self.created_at_lte {
            tail.push("c.created_at <= ?", [Value::Text(format_timestamp(&ts))]);
        }
        if let Some(prefix) = self.phone_pattern.as_deref().filter(|p| !p.is_empty()) {
            let p = Value::Text(prefix.to_string());
            tail.push("substr(c.phone, 1, length(?)) = ?", [p.clone(), p]);
        }
        tail.order_by(orderings, "c.id");
        tail
    }
}

impl ProductFilter {
    pub(crate) fn to_sql(&self, orderings: &[Ordering<ProductSort>]) -> Result<SqlTail> {
        let mut tail = SqlTail::default();
        tail.contains("p.name", &self.name_icontains);
        if let Some(v) = self.price_gte {
            tail.push("p.price_cents >= ?", [lower_cents(v)?]);
        }
        if let Some(v) = self.price_lte {
            tail.push("p.price_cents <= ?", [upper_cents(v)?]);
        }
        if let Some(v) = self.stock_gte {
            tail.push("p.stock >= ?", [Value::Integer(v)]);
        }
        if let Some(v) = self.stock_lte {
            tail.push("p.stock <= ?", [Value::Integer(v)]);
        }
        tail.order_by(orderings, "p.id");
        Ok(tail)
    }
}

impl OrderFilter {
    pub(crate) fn to_sql(&self, orderings: &[Ordering<OrderSort>]) -> Result<SqlTail> {
        let mut tail = SqlTail::default();
        if let Some(name) = &self.customer_name {
            tail.push(
                "o.customer_id IN (SELECT id FROM customers WHERE name LIKE ? ESCAPE '\\')",
                [Value::Text(like_pattern(name))],
            );
        }
        if let Some(name) = &self.product_name {
            tail.push(
                "EXISTS (SELECT 1 FROM order_products op JOIN products p ON p.id = op.product_id \
                 WHERE op.order_id = o.id AND p.name LIKE ? ESCAPE '\\')",
                [Value::Text(like_pattern(name))],
            );
        }
        if let Some(id) = self.product_id {
            tail.push(
                "EXISTS (SELECT 1 FROM order_products op WHERE op.order_id = o.id AND op.product_id = ?)",
                [Value::Integer(id)],
            );
        }
        if let Some(v) = self.total_amount_gte {
            tail.push("o.total_amount_cents >= ?", [lower_cents(v)?]);
        }
        if let Some(v) = self.total_amount_lte {
            tail.push("o.total_amount_cents <= ?", [upper_cents(v)?]);
        }
        if let Some(ts) = self.order_date_gte {
            tail.push("o.order_date >= ?", [Value::Text(format_timestamp(&ts))]);
        }
        if let Some(ts) = self.order_date_lte {
            tail.push("o.order_date <= ?", [Value::Text(format_timestamp(&ts))]);
        }
        tail.order_by(orderings, "o.id");
        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_keys_in_both_cases() {
        let keys = vec!["-createdAt".to_string(), "name".to_string()];
        let parsed: Vec<Ordering<CustomerSort>> = parse_order_by(&keys).unwrap();
        assert_eq!(
            parsed,
            vec![
                Ordering { field: CustomerSort::CreatedAt, direction: Direction::Desc },
                Ordering { field: CustomerSort::Name, direction: Direction::Asc },
            ]
        );
    }

    #[test]
    fn unknown_ordering_field_is_rejected() {
        let err = parse_order_by::<ProductSort>(&["weight".to_string()]).unwrap_err();
        assert!(matches!(err, CrmError::InvalidFilter(_)));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn empty_filter_renders_only_the_id_tiebreak() {
        let tail = CustomerFilter::default().to_sql(&[]);
        assert_eq!(tail.sql(), " ORDER BY c.id ASC");
        assert!(tail.params.is_empty());
    }

    #[test]
    fn combined_product_filter_uses_and() {
        let filter = ProductFilter {
            name_icontains: Some("lap".to_string()),
            stock_gte: Some(1),
            ..Default::default()
        };
        let tail = filter
            .to_sql(&[Ordering { field: ProductSort::Price, direction: Direction::Desc }])
            .unwrap();
        assert_eq!(
            tail.sql(),
            " WHERE p.name LIKE ? ESCAPE '\\' AND p.stock >= ? ORDER BY p.price_cents DESC, p.id ASC"
        );
        assert_eq!(tail.params.len(), 2);
    }

    #[test]
    fn sub_cent_bounds_round_inward() {
        let filter = ProductFilter {
            price_gte: Some(Decimal::new(19_991, 3)),
            price_lte: Some(Decimal::new(49_999, 3)),
            ..Default::default()
        };
        let tail = filter.to_sql(&[]).unwrap();
        assert_eq!(tail.params, vec![Value::Integer(2_000), Value::Integer(4_999)]);
    }

    #[test]
    fn whole_cent_bounds_are_unchanged() {
        let filter = OrderFilter {
            total_amount_gte: Some(Decimal::new(1_999, 2)),
            total_amount_lte: Some(Decimal::new(101_998, 2)),
            ..Default::default()
        };
        let tail = filter.to_sql(&[]).unwrap();
        assert_eq!(tail.params, vec![Value::Integer(1_999), Value::Integer(101_998)]);
    }
}
