use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::form::PurchaseLineInput;
use super::{Ledger, WorkflowError};

/// Purchase order status. Moves New → In Transit → Received → New.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "purchase_status", rename_all = "snake_case")]
pub enum PurchaseStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Received")]
    Received,
}

impl PurchaseStatus {
    pub fn purchase_editable(self) -> bool {
        matches!(self, PurchaseStatus::New)
    }

    pub fn receive_editable(self) -> bool {
        matches!(self, PurchaseStatus::New | PurchaseStatus::Received)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseStatus::New => write!(f, "New"),
            PurchaseStatus::InTransit => write!(f, "In Transit"),
            PurchaseStatus::Received => write!(f, "Received"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLine {
    pub id: i64,
    pub product_id: i64,
    pub quantity_purchase: i32,
    pub quantity_receive: i32,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub id: i64,
    pub description: String,
    pub status: PurchaseStatus,
    pub version: i64,
    pub lines: Vec<PurchaseLine>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PurchaseApplied {
    pub touched: Vec<i64>,
    /// Units added to the ledger across all lines.
    pub units_received: i64,
}

impl PurchaseOrder {
    pub fn missing_products(&self, ledger: &Ledger) -> Vec<i64> {
        let present: BTreeSet<i64> = self.lines.iter().map(|l| l.product_id).collect();
        ledger
            .items()
            .map(|item| item.id)
            .filter(|id| !present.contains(id))
            .collect()
    }

    /// Records lines created for missing products, dropping any for a product the order
    /// already holds.
    pub fn add_loaded_lines(&mut self, loaded: impl IntoIterator<Item = PurchaseLine>) -> usize {
        let mut present: BTreeSet<i64> = self.lines.iter().map(|l| l.product_id).collect();
        let before = self.lines.len();
        self.lines
            .extend(loaded.into_iter().filter(|line| present.insert(line.product_id)));
        self.lines.len() - before
    }

    pub fn line(&self, id: i64) -> Option<&PurchaseLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Writes submitted quantities into the fields the current status lets the user edit.
    /// Lines whose id or product code does not resolve are skipped.
    pub fn save_lines(
        &mut self,
        inputs: &[PurchaseLineInput],
        ledger: &Ledger,
    ) -> Result<Vec<i64>, WorkflowError> {
        if let Some(bad) = inputs.iter().find(|i| i.purch_qty < 0 || i.receive_qty < 0) {
            return Err(WorkflowError::Validation(format!(
                "Line {} ({}): quantities cannot be negative",
                bad.id, bad.prod_code
            )));
        }

        let (purchase_editable, receive_editable) =
            (self.status.purchase_editable(), self.status.receive_editable());
        if !purchase_editable && !receive_editable {
            debug!(status = %self.status, "Purchase lines are read-only, submission ignored");
            return Ok(Vec::new());
        }

        let mut touched = Vec::new();
        for input in inputs {
            let Some(line) = self.lines.iter_mut().find(|l| l.id == input.id) else {
                debug!(line_id = input.id, "Unknown purchase line, skipped");
                continue;
            };
            match ledger.find_by_code(&input.prod_code) {
                Some(product) if product.id == line.product_id => {}
                Some(product) => {
                    warn!(
                        line_id = line.id,
                        code = %product.code,
                        "Product code does not match purchase line, skipped"
                    );
                    continue;
                }
                None => {
                    warn!(line_id = line.id, code = %input.prod_code, "Unknown product code, skipped");
                    continue;
                }
            }
            if purchase_editable {
                line.quantity_purchase = input.purch_qty;
            }
            if receive_editable {
                line.quantity_receive = input.receive_qty;
            }
            touched.push(line.id);
        }
        Ok(touched)
    }

    /// Only a New order can be started. Re-sending Start while In Transit or Received
    /// is an `InvalidTransition`, not a silent status reset.
    pub fn start(&mut self) -> Result<(), WorkflowError> {
        self.transition("start", PurchaseStatus::New, PurchaseStatus::InTransit)
    }

    pub fn receive(&mut self) -> Result<(), WorkflowError> {
        self.transition("receive", PurchaseStatus::InTransit, PurchaseStatus::Received)
    }

    /// Adds every line's received quantity to the ledger, clears the lines and reopens
    /// the order. Only allowed once the order is Received.
    pub fn apply(&mut self, ledger: &mut Ledger) -> Result<PurchaseApplied, WorkflowError> {
        self.require("apply", PurchaseStatus::Received)?;

        // Check every addition before writing any so a failure leaves the ledger as it was.
        for line in &self.lines {
            if let Some(product) = ledger.get(line.product_id) {
                if product.quantity.checked_add(line.quantity_receive).is_none() {
                    return Err(WorkflowError::Validation(format!(
                        "Quantity overflow for product {}",
                        product.code
                    )));
                }
            }
        }

        let mut result = PurchaseApplied::default();
        for line in self.lines.iter_mut() {
            if ledger.receive(line.product_id, line.quantity_receive)?.is_none() {
                warn!(
                    line_id = line.id,
                    product_id = line.product_id,
                    "Purchase line references a missing product, skipped"
                );
                continue;
            }
            result.units_received += i64::from(line.quantity_receive);
            line.quantity_purchase = 0;
            line.quantity_receive = 0;
            result.touched.push(line.id);
        }
        self.status = PurchaseStatus::New;
        Ok(result)
    }

    /// Removes a line. Lines can only be removed while the order is New.
    pub fn remove_line(&mut self, id: i64) -> Result<Option<PurchaseLine>, WorkflowError> {
        if self.status != PurchaseStatus::New {
            return Err(WorkflowError::OperationNotAllowed(format!(
                "Lines can only be deleted while the purchase order is New (currently {})",
                self.status
            )));
        }
        let Some(index) = self.lines.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        Ok(Some(self.lines.remove(index)))
    }

    pub fn export(&self) -> Result<(), WorkflowError> {
        Err(WorkflowError::NotImplemented("Purchase export"))
    }

    fn require(&self, action: &'static str, expected: PurchaseStatus) -> Result<(), WorkflowError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: PurchaseStatus,
        to: PurchaseStatus,
    ) -> Result<(), WorkflowError> {
        self.require(action, from)?;
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ledger::tests::item;

    fn line(id: i64, product_id: i64, purchase: i32, receive: i32) -> PurchaseLine {
        PurchaseLine {
            id,
            product_id,
            quantity_purchase: purchase,
            quantity_receive: receive,
        }
    }

    fn order(status: PurchaseStatus, lines: Vec<PurchaseLine>) -> PurchaseOrder {
        PurchaseOrder {
            id: 1,
            description: "Purchase Order".to_string(),
            status,
            version: 0,
            lines,
        }
    }

    fn input(id: i64, code: &str, purch_qty: i32, receive_qty: i32) -> PurchaseLineInput {
        PurchaseLineInput {
            id,
            prod_code: code.to_string(),
            purch_qty,
            receive_qty,
        }
    }

    #[test]
    fn full_cycle_restocks_the_product() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50)]);
        let mut po = order(PurchaseStatus::New, Vec::new());

        assert_eq!(po.missing_products(&ledger), vec![1]);
        assert_eq!(po.add_loaded_lines([line(1, 1, 0, 0)]), 1);
        assert!(po.missing_products(&ledger).is_empty());

        po.save_lines(&[input(1, "KPKB", 20, 0)], &ledger).unwrap();
        po.start().unwrap();
        assert_eq!(po.status, PurchaseStatus::InTransit);
        po.receive().unwrap();
        assert_eq!(po.status, PurchaseStatus::Received);

        po.save_lines(&[input(1, "KPKB", 20, 18)], &ledger).unwrap();
        let applied = po.apply(&mut ledger).unwrap();

        assert_eq!(applied.units_received, 18);
        assert_eq!(ledger.get(1).unwrap().quantity, 68);
        assert_eq!(po.status, PurchaseStatus::New);
        assert_eq!(po.line(1), Some(&line(1, 1, 0, 0)));
    }

    #[test]
    fn load_all_products_is_idempotent() {
        let ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 5)]);
        let mut po = order(PurchaseStatus::New, vec![line(7, 2, 3, 0)]);

        for expected in [1, 0] {
            let rows: Vec<PurchaseLine> = po
                .missing_products(&ledger)
                .into_iter()
                .map(|product_id| line(100 + product_id, product_id, 0, 0))
                .collect();
            assert_eq!(po.add_loaded_lines(rows), expected);
        }

        assert_eq!(po.lines, vec![line(7, 2, 3, 0), line(101, 1, 0, 0)]);
        assert_eq!(po.add_loaded_lines([line(102, 2, 0, 0)]), 0);
        assert_eq!(po.lines.len(), 2);
    }

    #[test]
    fn apply_outside_received_changes_nothing() {
        for status in [PurchaseStatus::New, PurchaseStatus::InTransit] {
            let mut ledger = Ledger::new([item(1, "KPKB", 50)]);
            let mut po = order(status, vec![line(1, 1, 20, 18)]);

            let err = po.apply(&mut ledger).unwrap_err();

            assert!(matches!(err, WorkflowError::InvalidTransition { action: "apply", .. }));
            assert_eq!(po.status, status);
            assert_eq!(po.line(1), Some(&line(1, 1, 20, 18)));
            assert_eq!(ledger.get(1).unwrap().quantity, 50);
            assert_eq!(ledger.changed().count(), 0);
        }
    }

    #[test]
    fn apply_adds_received_quantity_for_every_line() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 0), item(3, "MILO", 4)]);
        let mut po = order(
            PurchaseStatus::Received,
            vec![line(1, 1, 10, 10), line(2, 2, 5, 3), line(3, 3, 0, 0)],
        );

        po.apply(&mut ledger).unwrap();

        assert_eq!(ledger.get(1).unwrap().quantity, 60);
        assert_eq!(ledger.get(2).unwrap().quantity, 3);
        assert_eq!(ledger.get(3).unwrap().quantity, 4);
        assert!(po
            .lines
            .iter()
            .all(|l| l.quantity_purchase == 0 && l.quantity_receive == 0));
    }

    #[test]
    fn start_is_rejected_once_the_order_has_moved_on() {
        for status in [PurchaseStatus::InTransit, PurchaseStatus::Received] {
            let mut po = order(status, Vec::new());
            assert!(matches!(
                po.start(),
                Err(WorkflowError::InvalidTransition { action: "start", .. })
            ));
            assert_eq!(po.status, status);
        }
    }

    #[test]
    fn transitions_require_the_previous_status() {
        let mut po = order(PurchaseStatus::New, Vec::new());
        assert!(po.receive().is_err());

        po.start().unwrap();
        assert!(matches!(
            po.start(),
            Err(WorkflowError::InvalidTransition { action: "start", status: PurchaseStatus::InTransit })
        ));
        po.receive().unwrap();
        assert!(po.receive().is_err());
    }

    #[test]
    fn delete_line_only_while_new() {
        let mut po = order(PurchaseStatus::InTransit, vec![line(1, 1, 20, 0)]);

        let err = po.remove_line(1).unwrap_err();
        assert!(matches!(err, WorkflowError::OperationNotAllowed(_)));
        assert!(po.line(1).is_some());

        po.status = PurchaseStatus::New;
        assert!(po.remove_line(1).unwrap().is_some());
        assert!(po.remove_line(1).unwrap().is_none());
    }

    #[test]
    fn save_lines_respects_field_editability() {
        let ledger = Ledger::new([item(1, "KPKB", 50)]);

        let mut po = order(PurchaseStatus::InTransit, vec![line(1, 1, 20, 0)]);
        assert!(po.save_lines(&[input(1, "KPKB", 99, 99)], &ledger).unwrap().is_empty());
        assert_eq!(po.line(1), Some(&line(1, 1, 20, 0)));

        po.status = PurchaseStatus::Received;
        po.save_lines(&[input(1, "KPKB", 99, 18)], &ledger).unwrap();
        assert_eq!(po.line(1), Some(&line(1, 1, 20, 18)));
    }

    #[test]
    fn save_lines_skips_unresolved_references() {
        let ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 5)]);
        let mut po = order(PurchaseStatus::New, vec![line(1, 1, 0, 0), line(2, 2, 0, 0)]);

        let touched = po
            .save_lines(
                &[
                    input(1, "NOPE", 5, 0),
                    input(2, "KPKB", 5, 0),
                    input(9, "KPKB", 5, 0),
                    input(2, "NSCF", 7, 1),
                ],
                &ledger,
            )
            .unwrap();

        assert_eq!(touched, vec![2]);
        assert_eq!(po.line(1), Some(&line(1, 1, 0, 0)));
        assert_eq!(po.line(2), Some(&line(2, 2, 7, 1)));
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let ledger = Ledger::new([item(1, "KPKB", 50)]);
        let mut po = order(PurchaseStatus::New, vec![line(1, 1, 0, 0)]);

        let err = po.save_lines(&[input(1, "KPKB", -1, 0)], &ledger).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn export_is_not_available() {
        let po = order(PurchaseStatus::New, Vec::new());
        assert_eq!(
            po.export(),
            Err(WorkflowError::NotImplemented("Purchase export"))
        );
    }
}
