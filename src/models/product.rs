use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::workflow::StockItem;

/// Column list matching `Product`; price is NUMERIC in the table.
pub const PRODUCT_COLUMNS: &str =
    "id, code, name, quantity, price::FLOAT8 AS price, created_at, updated_at";

#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub quantity: i32,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for StockItem {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            code: product.code,
            name: product.name,
            quantity: product.quantity,
        }
    }
}
