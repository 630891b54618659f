use serde::Serialize;

use crate::workflow::{AdjustmentBatch, Ledger, PurchaseOrder, PurchaseStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// What every workflow endpoint returns: the outcome plus the state after it. On error
/// `data` is the state as it was before the request.
#[derive(Debug, Serialize)]
pub struct WorkflowResponse<T> {
    pub status: ResultStatus,
    pub message: String,
    pub data: T,
}

impl<T> WorkflowResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdjustmentLineView {
    pub id: i64,
    pub product_id: i64,
    pub product_code: String,
    pub product_name: String,
    pub quantity_on_hand: i32,
    pub quantity_adjust: i32,
    pub quantity_applied: Option<i32>,
    pub applied_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjustmentSnapshot {
    pub id: i64,
    pub description: String,
    pub version: i64,
    pub lines: Vec<AdjustmentLineView>,
}

impl AdjustmentSnapshot {
    /// Lines whose product is gone from the ledger are left out.
    pub fn new(batch: &AdjustmentBatch, ledger: &Ledger) -> Self {
        let lines = batch
            .lines
            .iter()
            .filter_map(|line| {
                let product = ledger.get(line.product_id)?;
                Some(AdjustmentLineView {
                    id: line.id,
                    product_id: product.id,
                    product_code: product.code.clone(),
                    product_name: product.name.clone(),
                    quantity_on_hand: product.quantity,
                    quantity_adjust: line.quantity_adjust,
                    quantity_applied: line.quantity_applied,
                    applied_at: line.applied_at.map(|dt| dt.to_rfc3339()),
                })
            })
            .collect();

        Self {
            id: batch.id,
            description: batch.description.clone(),
            version: batch.version,
            lines,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseLineView {
    pub id: i64,
    pub product_id: i64,
    pub product_code: String,
    pub product_name: String,
    pub quantity_on_hand: i32,
    pub quantity_purchase: i32,
    pub quantity_receive: i32,
    /// Form keys a client posts back for this line.
    pub purchase_field: String,
    pub receive_field: String,
}

#[derive(Debug, Serialize)]
pub struct PurchaseSnapshot {
    pub id: i64,
    pub description: String,
    pub status: PurchaseStatus,
    pub version: i64,
    pub purchase_editable: bool,
    pub receive_editable: bool,
    pub lines: Vec<PurchaseLineView>,
}

impl PurchaseSnapshot {
    pub fn new(order: &PurchaseOrder, ledger: &Ledger) -> Self {
        let lines = order
            .lines
            .iter()
            .filter_map(|line| {
                let product = ledger.get(line.product_id)?;
                Some(PurchaseLineView {
                    id: line.id,
                    product_id: product.id,
                    product_code: product.code.clone(),
                    product_name: product.name.clone(),
                    quantity_on_hand: product.quantity,
                    quantity_purchase: line.quantity_purchase,
                    quantity_receive: line.quantity_receive,
                    purchase_field: format!("PURCHASE-{}-{}", line.id, product.code),
                    receive_field: format!("RECEIVE-{}-{}", line.id, product.code),
                })
            })
            .collect();

        Self {
            id: order.id,
            description: order.description.clone(),
            status: order.status,
            version: order.version,
            purchase_editable: order.status.purchase_editable(),
            receive_editable: order.status.receive_editable(),
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{PurchaseLine, StockItem};
    use serde_json::json;

    #[test]
    fn purchase_snapshot_serializes_status_and_field_names() {
        let ledger = Ledger::new([StockItem {
            id: 3,
            code: "KPKB".to_string(),
            name: "Kopiko Black".to_string(),
            quantity: 50,
        }]);
        let order = PurchaseOrder {
            id: 1,
            description: "Purchase Order".to_string(),
            status: PurchaseStatus::InTransit,
            version: 4,
            lines: vec![
                PurchaseLine { id: 8, product_id: 3, quantity_purchase: 20, quantity_receive: 0 },
                PurchaseLine { id: 9, product_id: 44, quantity_purchase: 1, quantity_receive: 0 },
            ],
        };

        let body = serde_json::to_value(WorkflowResponse::success(
            "Purchase started",
            PurchaseSnapshot::new(&order, &ledger),
        ))
        .unwrap();

        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["data"]["status"], json!("In Transit"));
        assert_eq!(body["data"]["purchase_editable"], json!(false));
        assert_eq!(body["data"]["receive_editable"], json!(false));
        assert_eq!(body["data"]["lines"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["lines"][0]["purchase_field"], json!("PURCHASE-8-KPKB"));
    }
}
