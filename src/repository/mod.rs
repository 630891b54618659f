//! Transactional reads and writes behind the stock workflows.
//!
//! Every function takes a connection so callers decide the transaction boundary.

pub mod adjustment;
pub mod ledger;
pub mod purchase;
