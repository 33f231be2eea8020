//! Reconciliation of ledger invoices against payment and bank records
//!
//! A run validates its inputs once, then pairs records in a fixed sequence of
//! passes, each seeing only what earlier passes left behind:
//!
//! 1. exact reference (invoice number equals payment reference)
//! 2. embedded reference, when enabled (reference cites the invoice number)
//! 3. fuzzy name with agreeing amount
//! 4. amount only, closest dates first
//! 5. combined invoices, when enabled (one payment settles several invoices)
//!
//! Whatever remains is reported as unmatched, with ranked suggestions for
//! each leftover payment.

pub mod config;
pub(crate) mod matcher;
pub(crate) mod report;
pub(crate) mod suggestion;

pub use config::*;

use crate::records::{validate_records, validate_rows, LedgerRow, PaymentRow, ValidatedInput};
use crate::traits::*;
use crate::types::*;

use matcher::MatchState;
use report::RunTotals;

/// Matches ledger records against payment records.
///
/// Holds only configuration; every call works on its own copies of the
/// input, so one engine can serve concurrent callers.
pub struct ReconciliationEngine {
    config: ReconciliationConfig,
    validator: Box<dyn RecordValidator>,
    similarity: Box<dyn NameSimilarity>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self {
            config: ReconciliationConfig::default(),
            validator: Box::new(DefaultRecordValidator),
            similarity: Box::new(TokenSortSimilarity),
        }
    }

    /// Create an engine with a custom configuration, rejecting out-of-range values
    pub fn with_config(config: ReconciliationConfig) -> ReconResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Replace the record validator
    pub fn with_validator(mut self, validator: Box<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the name similarity metric
    pub fn with_similarity(mut self, similarity: Box<dyn NameSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Reconcile raw ledger rows against raw payment rows.
    ///
    /// Rows that fail to parse or validate are excluded and listed in the
    /// summary's data-quality notes; only a bad configuration fails the call.
    pub fn reconcile(
        &self,
        ledger_rows: &[LedgerRow],
        payment_rows: &[PaymentRow],
    ) -> ReconResult<ReconciliationReport> {
        self.config.validate()?;
        let input = validate_rows(ledger_rows, payment_rows, self.validator.as_ref());
        Ok(self.run(input, ledger_rows.len(), payment_rows.len()))
    }

    /// Reconcile records the caller has already typed
    pub fn reconcile_records(
        &self,
        ledger_records: &[LedgerRecord],
        payment_records: &[PaymentRecord],
    ) -> ReconResult<ReconciliationReport> {
        self.config.validate()?;
        let input = validate_records(ledger_records, payment_records, self.validator.as_ref());
        Ok(self.run(input, ledger_records.len(), payment_records.len()))
    }

    fn run(
        &self,
        input: ValidatedInput,
        total_ledger: usize,
        total_payments: usize,
    ) -> ReconciliationReport {
        tracing::info!(
            "Reconciling {} ledger records against {} payments ({} excluded)",
            input.ledger.len(),
            input.payments.len(),
            input.notes.len()
        );

        let config = &self.config;
        let similarity = self.similarity.as_ref();
        let mut state = MatchState::new(&input.ledger, &input.payments);

        let exact = matcher::match_exact_references(&mut state, config);
        tracing::debug!("Exact reference pass matched {}", exact);

        if config.match_embedded_references {
            let embedded = matcher::match_embedded_references(&mut state, config);
            tracing::debug!("Embedded reference pass matched {}", embedded);
        }

        let fuzzy = matcher::match_fuzzy_names(&mut state, config, similarity);
        tracing::debug!("Fuzzy name pass matched {}", fuzzy);

        let amount_only = matcher::match_amounts_only(&mut state, config);
        tracing::debug!("Amount-only pass matched {}", amount_only);

        if config.combine_invoices {
            let combined = matcher::match_combined_invoices(&mut state, config, similarity);
            tracing::debug!("Combined-invoice pass allocated {} payments", combined);
        }

        let suggestions = suggestion::suggest(&state, config.max_suggestions, similarity);
        let report = report::assemble(
            &state,
            suggestions,
            RunTotals {
                total_ledger,
                total_payments,
                notes: input.notes,
            },
        );

        tracing::info!(
            "Reconciliation complete: {} matched, {} allocations, {} unmatched ledger, {} unmatched payments",
            report.summary.matched,
            report.summary.allocations,
            report.summary.unmatched_ledger,
            report.summary.unmatched_payments
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReconciliationEngine>();
    }

    #[test]
    fn test_with_config_rejects_bad_threshold() {
        let config = ReconciliationConfig::new().with_fuzzy_threshold(2.0);
        assert!(matches!(
            ReconciliationEngine::with_config(config),
            Err(ReconError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_similarity_is_used() {
        struct AlwaysSimilar;
        impl NameSimilarity for AlwaysSimilar {
            fn similarity(&self, _left: &str, _right: &str) -> f64 {
                1.0
            }
        }

        let ledger = vec![LedgerRecord::new(
            String::new(),
            "Completely".to_string(),
            BigDecimal::from(10),
        )];
        let payments = vec![PaymentRecord::new(
            String::new(),
            "Different".to_string(),
            BigDecimal::from(10),
        )];

        let engine = ReconciliationEngine::new().with_similarity(Box::new(AlwaysSimilar));
        let report = engine.reconcile_records(&ledger, &payments).unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].match_type, MatchType::FuzzyNameAmount);
    }

    #[test]
    fn test_custom_validator_excludes_records() {
        let ledger = vec![LedgerRecord::new(
            "INV1".to_string(),
            "Acme".to_string(),
            BigDecimal::from(10),
        )];
        let payments = vec![PaymentRecord::new(
            "INV1".to_string(),
            "Acme".to_string(),
            BigDecimal::from(10),
        )];

        let engine =
            ReconciliationEngine::new().with_validator(Box::new(StrictRecordValidator::default()));
        let report = engine.reconcile_records(&ledger, &payments).unwrap();
        assert!(report.matches.is_empty());
        assert_eq!(report.summary.excluded_ledger, 1);
        assert_eq!(report.summary.excluded_payments, 1);
        assert!(report
            .summary
            .data_quality
            .iter()
            .all(|note| note.error == InvalidRecordError::MissingDate));
    }
}
