use sqlx::FromRow;

use crate::workflow::{PurchaseLine, PurchaseStatus};

#[derive(Debug, FromRow)]
pub struct PurchaseHeader {
    pub id: i64,
    pub description: String,
    pub status: PurchaseStatus,
    pub version: i64,
}

#[derive(Debug, FromRow)]
pub struct PurchaseDetail {
    pub id: i64,
    pub product_id: i64,
    pub quantity_purchase: i32,
    pub quantity_receive: i32,
}

impl From<PurchaseDetail> for PurchaseLine {
    fn from(row: PurchaseDetail) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity_purchase: row.quantity_purchase,
            quantity_receive: row.quantity_receive,
        }
    }
}
