//! # Payables Ledger
//!
//! Keeps creditor outstanding balances and mirrored bank transactions
//! consistent as payments and purchases are created, amended and deleted.
//!
//! ## Features
//!
//! - **Creditor reconciliation**: purchases raise a creditor's payable balance, payments settle it
//! - **Bank transaction mirroring**: payments can be shadowed by a linked withdrawal that follows every amendment
//! - **Bill settlement**: a payment covering a bill's total marks it paid
//! - **Failure handling**: a per-operation journal can undo applied writes when a later step fails
//! - **Storage abstraction**: any backend implementing [`PersistenceGateway`], scoped per business
//!
//! ## Quick Start
//!
//! ```rust
//! use payables_ledger::utils::MemoryGateway;
//! use payables_ledger::{BusinessSession, LedgerAdjuster, LedgerConfig};
//!
//! let config = LedgerConfig::default();
//! let session = BusinessSession::select("business-1".to_string(), &config).unwrap();
//! let adjuster = LedgerAdjuster::with_config(MemoryGateway::new(), config);
//! // adjuster.apply_purchase_create(&session, draft).await?;
//! # let _ = (session, adjuster);
//! ```

pub mod config;
pub mod ledger;
pub mod session;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use session::*;
pub use traits::*;
pub use types::*;
