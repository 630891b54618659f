use std::collections::{BTreeMap, BTreeSet};

use super::WorkflowError;

/// On-hand quantity of one product as seen by a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub quantity: i32,
}

/// Products loaded for one workflow operation. Tracks which quantities were written so
/// only those rows go back to the database.
#[derive(Debug, Default)]
pub struct Ledger {
    items: BTreeMap<i64, StockItem>,
    changed: BTreeSet<i64>,
}

impl Ledger {
    pub fn new(items: impl IntoIterator<Item = StockItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            changed: BTreeSet::new(),
        }
    }

    pub fn get(&self, id: i64) -> Option<&StockItem> {
        self.items.get(&id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&StockItem> {
        self.items.values().find(|item| item.code == code)
    }

    pub fn items(&self) -> impl Iterator<Item = &StockItem> {
        self.items.values()
    }

    /// Replaces the on-hand quantity. Returns the previous quantity, or `None` when the
    /// product is not in the ledger.
    pub fn set_quantity(&mut self, id: i64, quantity: i32) -> Result<Option<i32>, WorkflowError> {
        if quantity < 0 {
            return Err(WorkflowError::Validation(format!(
                "Quantity for product {id} cannot be negative"
            )));
        }
        let Some(item) = self.items.get_mut(&id) else {
            return Ok(None);
        };
        let previous = std::mem::replace(&mut item.quantity, quantity);
        self.changed.insert(id);
        Ok(Some(previous))
    }

    /// Adds received stock. Returns the new quantity, or `None` when the product is not in
    /// the ledger.
    pub fn receive(&mut self, id: i64, amount: i32) -> Result<Option<i32>, WorkflowError> {
        let Some(item) = self.items.get(&id) else {
            return Ok(None);
        };
        let total = item.quantity.checked_add(amount).ok_or_else(|| {
            WorkflowError::Validation(format!("Quantity overflow for product {}", item.code))
        })?;
        self.set_quantity(id, total).map(|prev| prev.map(|_| total))
    }

    /// Products whose quantity was written since the ledger was loaded.
    pub fn changed(&self) -> impl Iterator<Item = &StockItem> {
        self.changed.iter().filter_map(|id| self.items.get(id))
    }
}
