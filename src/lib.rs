//! # Reconciliation Core
//!
//! Matches an internal ledger (sales or purchase invoices) against an
//! external record of payments or bank movements, and reports what paired,
//! how confidently, and what is left over.
//!
//! ## Features
//!
//! - **Exact reference matching**: invoice number equals payment reference
//! - **Embedded references**: narrations such as "Invoice #1004 bank transfer" (opt-in)
//! - **Fuzzy name matching**: token-sorted similarity of party and payer names
//! - **Amount-only matching**: closest dates first, with an optional date window
//! - **Combined invoices**: one payment settling several invoices (opt-in)
//! - **Review suggestions**: ranked candidates for every unmatched payment
//! - **Data-quality reporting**: bad rows are excluded and explained, never fatal
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{LedgerRow, MatchType, PaymentRow, ReconciliationEngine};
//!
//! let ledger = vec![LedgerRow::new()
//!     .with_invoice_no("INV1")
//!     .with_party_name("Acme Co")
//!     .with_amount("100.00")];
//! let payments = vec![PaymentRow::new()
//!     .with_reference("INV1")
//!     .with_payer_name("Acme Co")
//!     .with_amount("100.00")];
//!
//! let engine = ReconciliationEngine::new();
//! let report = engine.reconcile(&ledger, &payments).unwrap();
//!
//! assert_eq!(report.matches.len(), 1);
//! assert_eq!(report.matches[0].match_type, MatchType::ExactReference);
//! assert!(report.summary.is_fully_reconciled());
//! ```

pub mod reconciliation;
pub mod records;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciliation::{AmountTolerance, ReconciliationConfig, ReconciliationEngine};
pub use records::{FieldValue, LedgerRow, PaymentRow};
pub use traits::*;
pub use types::*;
