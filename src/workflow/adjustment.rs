use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{Ledger, WorkflowError};

/// One product line of the stock adjustment batch.
///
/// `quantity_adjust` is the staged on-hand count the user typed in. Applying it copies
/// the value into the product and into `quantity_applied`, then clears the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentLine {
    pub id: i64,
    pub product_id: i64,
    pub quantity_adjust: i32,
    pub quantity_applied: Option<i32>,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AdjustmentBatch {
    pub id: i64,
    pub description: String,
    pub version: i64,
    /// Ordered by creation.
    pub lines: Vec<AdjustmentLine>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct AdjustmentApplied {
    /// Lines written, whether or not their product resolved.
    pub touched: Vec<i64>,
    /// Products whose quantity was replaced.
    pub applied: usize,
}

impl AdjustmentBatch {
    /// Products in the ledger that have no line in this batch yet.
    pub fn missing_products(&self, ledger: &Ledger) -> Vec<i64> {
        let present: BTreeSet<i64> = self.lines.iter().map(|l| l.product_id).collect();
        ledger
            .items()
            .map(|item| item.id)
            .filter(|id| !present.contains(id))
            .collect()
    }

    /// Records lines created for missing products. A line for a product the batch already
    /// holds is dropped, so loading twice leaves one line per product.
    pub fn add_loaded_lines(&mut self, loaded: impl IntoIterator<Item = AdjustmentLine>) -> usize {
        let mut present: BTreeSet<i64> = self.lines.iter().map(|l| l.product_id).collect();
        let before = self.lines.len();
        for line in loaded {
            if present.insert(line.product_id) {
                self.lines.push(line);
            } else {
                debug!(product_id = line.product_id, "Product already in adjustment batch");
            }
        }
        self.lines.len() - before
    }

    pub fn line(&self, id: i64) -> Option<&AdjustmentLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Sets the staged quantity of every known line. Unknown ids are ignored.
    pub fn stage(&mut self, updates: &BTreeMap<i64, i32>) -> Vec<i64> {
        let mut touched = Vec::new();
        for line in self.lines.iter_mut() {
            if let Some(quantity) = updates.get(&line.id) {
                line.quantity_adjust = *quantity;
                touched.push(line.id);
            }
        }
        touched
    }

    /// Stages `updates`, then replaces each touched product's on-hand quantity with the
    /// staged value and clears the stage. Nothing changes if any staged value is negative.
    pub fn apply(
        &mut self,
        updates: &BTreeMap<i64, i32>,
        ledger: &mut Ledger,
        now: DateTime<Utc>,
    ) -> Result<AdjustmentApplied, WorkflowError> {
        if let Some((id, quantity)) = updates
            .iter()
            .find(|(id, quantity)| **quantity < 0 && self.line(**id).is_some())
        {
            return Err(WorkflowError::Validation(format!(
                "Line {id}: on-hand quantity cannot be negative ({quantity})"
            )));
        }

        let touched = self.stage(updates);
        let mut applied = 0;
        for line in self.lines.iter_mut().filter(|l| touched.contains(&l.id)) {
            match ledger.set_quantity(line.product_id, line.quantity_adjust)? {
                Some(_) => {
                    line.quantity_applied = Some(line.quantity_adjust);
                    line.applied_at = Some(now);
                    line.quantity_adjust = 0;
                    applied += 1;
                }
                None => warn!(
                    line_id = line.id,
                    product_id = line.product_id,
                    "Adjustment line references a missing product, skipped"
                ),
            }
        }

        Ok(AdjustmentApplied { touched, applied })
    }

    /// Removes the line if present.
    pub fn remove_line(&mut self, id: i64) -> Option<AdjustmentLine> {
        let index = self.lines.iter().position(|l| l.id == id)?;
        Some(self.lines.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ledger::tests::item;

    fn line(id: i64, product_id: i64) -> AdjustmentLine {
        AdjustmentLine {
            id,
            product_id,
            quantity_adjust: 0,
            quantity_applied: None,
            applied_at: None,
        }
    }

    fn batch(lines: Vec<AdjustmentLine>) -> AdjustmentBatch {
        AdjustmentBatch {
            id: 1,
            description: "Stock Adjustment".to_string(),
            version: 0,
            lines,
        }
    }

    // Stands in for the table assigning ids to inserted rows.
    fn load_products(batch: &mut AdjustmentBatch, ledger: &Ledger, next_id: &mut i64) -> usize {
        let rows: Vec<AdjustmentLine> = batch
            .missing_products(ledger)
            .into_iter()
            .map(|product_id| {
                *next_id += 1;
                line(*next_id, product_id)
            })
            .collect();
        batch.add_loaded_lines(rows)
    }

    #[test]
    fn load_all_products_is_idempotent() {
        let ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 5), item(3, "MILO", 0)]);
        let mut batch = batch(vec![line(10, 2)]);
        let mut next_id = 10;

        assert_eq!(load_products(&mut batch, &ledger, &mut next_id), 2);
        let once: Vec<i64> = batch.lines.iter().map(|l| l.product_id).collect();

        assert_eq!(load_products(&mut batch, &ledger, &mut next_id), 0);
        let twice: Vec<i64> = batch.lines.iter().map(|l| l.product_id).collect();

        assert_eq!(once, vec![2, 1, 3]);
        assert_eq!(once, twice);
    }

    #[test]
    fn loaded_line_for_present_product_is_dropped() {
        let mut batch = batch(vec![line(1, 1)]);

        let added = batch.add_loaded_lines([line(2, 1), line(3, 2), line(4, 2)]);

        assert_eq!(added, 1);
        let ids: Vec<i64> = batch.lines.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn save_draft_ignores_unknown_lines() {
        let mut batch = batch(vec![line(1, 1), line(2, 2)]);
        let touched = batch.stage(&BTreeMap::from([(2, 15), (99, 4)]));

        assert_eq!(touched, vec![2]);
        assert_eq!(batch.line(2).unwrap().quantity_adjust, 15);
        assert_eq!(batch.line(1).unwrap().quantity_adjust, 0);
    }

    #[test]
    fn apply_replaces_on_hand_and_clears_stage() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 5)]);
        let mut batch = batch(vec![line(1, 1), line(2, 2)]);
        let now = Utc::now();

        let result = batch
            .apply(&BTreeMap::from([(1, 12), (2, 0)]), &mut ledger, now)
            .unwrap();

        assert_eq!(result.applied, 2);
        assert_eq!(ledger.get(1).unwrap().quantity, 12);
        assert_eq!(ledger.get(2).unwrap().quantity, 0);
        for l in &batch.lines {
            assert_eq!(l.quantity_adjust, 0);
            assert_eq!(l.applied_at, Some(now));
        }
        assert_eq!(batch.line(1).unwrap().quantity_applied, Some(12));
    }

    #[test]
    fn apply_leaves_untouched_products_alone() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50), item(2, "NSCF", 5)]);
        let mut batch = batch(vec![line(1, 1), line(2, 2)]);

        batch
            .apply(&BTreeMap::from([(1, 8)]), &mut ledger, Utc::now())
            .unwrap();

        assert_eq!(ledger.get(2).unwrap().quantity, 5);
        let changed: Vec<i64> = ledger.changed().map(|i| i.id).collect();
        assert_eq!(changed, vec![1]);
    }

    #[test]
    fn negative_apply_changes_nothing() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50)]);
        let mut batch = batch(vec![line(1, 1)]);

        let err = batch
            .apply(&BTreeMap::from([(1, -3)]), &mut ledger, Utc::now())
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(ledger.get(1).unwrap().quantity, 50);
        assert_eq!(batch.line(1).unwrap().quantity_adjust, 0);
    }

    #[test]
    fn dangling_product_is_skipped() {
        let mut ledger = Ledger::new([item(1, "KPKB", 50)]);
        let mut batch = batch(vec![line(1, 1), line(2, 77)]);

        let result = batch
            .apply(&BTreeMap::from([(1, 30), (2, 9)]), &mut ledger, Utc::now())
            .unwrap();

        assert_eq!(result.touched, vec![1, 2]);
        assert_eq!(result.applied, 1);
        assert_eq!(batch.line(2).unwrap().quantity_adjust, 9);
        assert_eq!(ledger.get(1).unwrap().quantity, 30);
    }

    #[test]
    fn remove_line_is_a_no_op_for_unknown_ids() {
        let mut batch = batch(vec![line(1, 1)]);
        assert!(batch.remove_line(5).is_none());
        assert_eq!(batch.remove_line(1).map(|l| l.id), Some(1));
        assert!(batch.lines.is_empty());
    }
}
