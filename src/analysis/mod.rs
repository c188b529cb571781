//! Analysis modules.
//!
//! Pure reductions over stock and ledger rows. Nothing in here performs
//! I/O or keeps state between calls.

pub mod kpi;
pub mod ledger;
pub mod snapshot;
pub mod transactions;

pub use kpi::*;
pub use ledger::*;
pub use snapshot::*;
pub use transactions::*;
