use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::workflow::AdjustmentLine;

#[derive(Debug, FromRow)]
pub struct AdjustmentHeader {
    pub id: i64,
    pub description: String,
    pub version: i64,
}

#[derive(Debug, FromRow)]
pub struct AdjustmentDetail {
    pub id: i64,
    pub product_id: i64,
    pub quantity_adjust: i32,
    pub quantity_applied: Option<i32>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl From<AdjustmentDetail> for AdjustmentLine {
    fn from(row: AdjustmentDetail) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity_adjust: row.quantity_adjust,
            quantity_applied: row.quantity_applied,
            applied_at: row.applied_at,
        }
    }
}
