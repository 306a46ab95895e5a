//! Ledger module containing creditor balance rules, bank-transaction
//! mirroring and the lifecycle operations that apply them

pub mod adjuster;
pub mod creditors;
pub mod journal;
pub mod mirror;
pub mod payments;
pub mod purchases;

pub use adjuster::*;
pub use creditors::*;
pub use journal::*;
pub use payments::*;
