//! Stock workflows that post into the product quantity ledger.
//!
//! Each workflow is a plain in-memory model (header plus detail lines). Handlers load
//! the model inside a transaction, run one operation, and write back what changed.

pub mod adjustment;
pub mod error;
pub mod form;
pub mod ledger;
pub mod purchase;

pub use adjustment::{AdjustmentBatch, AdjustmentLine};
pub use error::WorkflowError;
pub use ledger::{Ledger, StockItem};
pub use purchase::{PurchaseLine, PurchaseOrder, PurchaseStatus};

/// Id of the singleton adjustment batch and purchase order rows.
pub const DEFAULT_WORKSPACE_ID: i64 = 1;
