//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the primary ledger (a sales or purchase invoice)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Position of the row in the caller's source file
    pub row: usize,
    /// Invoice number, empty when the ledger carries none
    pub invoice_no: String,
    /// Customer or supplier the invoice was raised against
    pub party_name: String,
    /// Free-text line description (item name, service details)
    pub details: String,
    /// Invoice total
    pub amount: BigDecimal,
    /// Invoice date, if known
    pub date: Option<NaiveDate>,
    /// Columns the engine does not interpret, passed through unmodified
    pub extra: BTreeMap<String, String>,
}

impl LedgerRecord {
    /// Create a new ledger record
    pub fn new(invoice_no: String, party_name: String, amount: BigDecimal) -> Self {
        Self {
            row: 0,
            invoice_no,
            party_name,
            details: String::new(),
            amount,
            date: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the source row index
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Set the invoice date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the line description
    pub fn with_details(mut self, details: String) -> Self {
        self.details = details;
        self
    }

    /// Attach a pass-through column
    pub fn with_extra(mut self, key: String, value: String) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Name used for similarity scoring: the party, or the details when the party is blank
    pub fn counterparty_label(&self) -> &str {
        if self.party_name.trim().is_empty() {
            self.details.trim()
        } else {
            self.party_name.trim()
        }
    }
}

/// One row of the external payments or bank file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Position of the row in the caller's source file
    pub row: usize,
    /// Payment reference or narration
    pub reference: String,
    /// Who paid (or was paid)
    pub payer_name: String,
    /// Amount moved
    pub amount: BigDecimal,
    /// Value date, if known
    pub date: Option<NaiveDate>,
    /// Columns the engine does not interpret, passed through unmodified
    pub extra: BTreeMap<String, String>,
}

impl PaymentRecord {
    /// Create a new payment record
    pub fn new(reference: String, payer_name: String, amount: BigDecimal) -> Self {
        Self {
            row: 0,
            reference,
            payer_name,
            amount,
            date: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the source row index
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Set the value date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Attach a pass-through column
    pub fn with_extra(mut self, key: String, value: String) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Name used for similarity scoring: the payer, or the reference when the payer is blank
    pub fn counterparty_label(&self) -> &str {
        if self.payer_name.trim().is_empty() {
            self.reference.trim()
        } else {
            self.payer_name.trim()
        }
    }
}

/// How a ledger record and a payment record were paired
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Invoice number and payment reference are identical
    ExactReference,
    /// Payment reference cites the invoice number among other words
    EmbeddedReference,
    /// Names are similar and amounts agree (or fall inside the tolerance band)
    FuzzyNameAmount,
    /// Only the amounts agree
    AmountOnly,
    /// No counterpart was found
    Unmatched,
}

/// Outcome for one ledger/payment pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub ledger_record: Option<LedgerRecord>,
    pub payment_record: Option<PaymentRecord>,
    pub match_type: MatchType,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// Ledger amount minus payment amount, zero when they agree within epsilon
    pub variance: BigDecimal,
    /// Absolute distance between the two dates, when both are known
    pub date_gap_days: Option<i64>,
    /// Human-readable account of why the pair matched and how it differs
    pub explanation: String,
}

impl MatchResult {
    /// Result for a ledger record nothing could be paired with
    pub fn unmatched_ledger(record: LedgerRecord) -> Self {
        let explanation = if record.invoice_no.is_empty() {
            format!("no payment found for {}", record.counterparty_label())
        } else {
            format!("no payment found for invoice {}", record.invoice_no)
        };
        Self {
            ledger_record: Some(record),
            payment_record: None,
            match_type: MatchType::Unmatched,
            confidence: 0.0,
            variance: BigDecimal::from(0),
            date_gap_days: None,
            explanation,
        }
    }

    /// Result for a payment record nothing could be paired with
    pub fn unmatched_payment(record: PaymentRecord) -> Self {
        let explanation = format!("no ledger entry found for payment {}", record.reference);
        Self {
            ledger_record: None,
            payment_record: Some(record),
            match_type: MatchType::Unmatched,
            confidence: 0.0,
            variance: BigDecimal::from(0),
            date_gap_days: None,
            explanation,
        }
    }

    /// Whether the two sides disagree on amount
    pub fn has_variance(&self) -> bool {
        self.variance != BigDecimal::from(0)
    }
}

/// One payment settled by several ledger invoices at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedAllocation {
    pub payment_record: PaymentRecord,
    /// Invoices covered by the payment, in ledger order
    pub ledger_records: Vec<LedgerRecord>,
    pub confidence: f64,
    /// Sum of the invoices minus the payment amount
    pub variance: BigDecimal,
    pub explanation: String,
}

/// A ledger record a reviewer may want to pair with an unmatched payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub ledger_record: LedgerRecord,
    /// Weighted candidate score, 0.0 to 1.0
    pub score: f64,
    /// 1.0 when the payment reference cites the invoice number
    pub reference_score: f64,
    pub amount_score: f64,
    pub name_score: f64,
}

/// Ranked review candidates for one unmatched payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSuggestions {
    pub payment_record: PaymentRecord,
    pub candidates: Vec<MatchSuggestion>,
}

/// Which input a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSide {
    Ledger,
    Payment,
}

/// A record removed from matching because it failed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityNote {
    pub side: RecordSide,
    /// Row index as supplied by the caller
    pub row: usize,
    /// Invoice number or payment reference, when one could be read
    pub identifier: String,
    pub error: InvalidRecordError,
    pub reason: String,
}

impl DataQualityNote {
    pub fn new(side: RecordSide, row: usize, identifier: String, error: InvalidRecordError) -> Self {
        let reason = error.to_string();
        Self {
            side,
            row,
            identifier,
            error,
            reason,
        }
    }
}

/// Counts and totals for one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_ledger: usize,
    pub total_payments: usize,
    /// Number of one-to-one matched pairs
    pub matched: usize,
    pub matched_by_type: BTreeMap<MatchType, usize>,
    pub allocations: usize,
    pub allocated_ledger: usize,
    pub unmatched_ledger: usize,
    pub unmatched_payments: usize,
    pub excluded_ledger: usize,
    pub excluded_payments: usize,
    /// Signed sum of every match and allocation variance
    pub total_variance: BigDecimal,
    pub total_absolute_variance: BigDecimal,
    pub data_quality: Vec<DataQualityNote>,
}

impl ReconciliationSummary {
    /// Fraction of valid ledger records that found a counterpart
    pub fn match_rate(&self) -> f64 {
        let valid = self.total_ledger - self.excluded_ledger;
        if valid == 0 {
            return 0.0;
        }
        (self.matched + self.allocated_ledger) as f64 / valid as f64
    }

    /// Whether every valid record on both sides found a counterpart
    pub fn is_fully_reconciled(&self) -> bool {
        self.unmatched_ledger == 0 && self.unmatched_payments == 0
    }
}

/// Complete output of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Matched pairs, highest confidence first, ties in ledger order
    pub matches: Vec<MatchResult>,
    pub allocations: Vec<CombinedAllocation>,
    pub unmatched_ledger: Vec<LedgerRecord>,
    pub unmatched_payments: Vec<PaymentRecord>,
    pub suggestions: Vec<PaymentSuggestions>,
    pub summary: ReconciliationSummary,
}

impl ReconciliationReport {
    /// Every outcome, matched pairs first, followed by one `Unmatched` entry per leftover record
    pub fn results(&self) -> Vec<MatchResult> {
        self.matches
            .iter()
            .cloned()
            .chain(
                self.unmatched_ledger
                    .iter()
                    .cloned()
                    .map(MatchResult::unmatched_ledger),
            )
            .chain(
                self.unmatched_payments
                    .iter()
                    .cloned()
                    .map(MatchResult::unmatched_payment),
            )
            .collect()
    }

    /// Matches whose amounts disagree
    pub fn discrepancies(&self) -> impl Iterator<Item = &MatchResult> {
        self.matches.iter().filter(|m| m.has_variance())
    }

    /// Whether any record was excluded for data-quality reasons
    pub fn has_data_quality_issues(&self) -> bool {
        !self.summary.data_quality.is_empty()
    }
}

/// Why a single input row could not take part in matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidRecordError {
    #[error("Amount is missing")]
    MissingAmount,
    #[error("Amount is not numeric: '{value}'")]
    InvalidAmount { value: String },
    #[error("Quantity is not numeric: '{value}'")]
    InvalidQuantity { value: String },
    #[error("Date is not recognised: '{value}'")]
    InvalidDate { value: String },
    #[error("Record has neither a reference nor a name")]
    MissingIdentity,
    #[error("Amount must be positive: {value}")]
    NonPositiveAmount { value: String },
    #[error("Date is missing")]
    MissingDate,
    #[error("Field '{field}' exceeds {max} characters")]
    FieldTooLong { field: String, max: usize },
}

/// Errors that can abort a reconciliation call
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] InvalidRecordError),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterparty_label_falls_back() {
        let ledger = LedgerRecord::new(String::new(), "  ".to_string(), BigDecimal::from(10))
            .with_details("Annual subscription".to_string());
        assert_eq!(ledger.counterparty_label(), "Annual subscription");

        let payment = PaymentRecord::new("NEFT 1004".to_string(), String::new(), BigDecimal::from(10));
        assert_eq!(payment.counterparty_label(), "NEFT 1004");

        let payment = payment.clone();
        let named = PaymentRecord {
            payer_name: "Acme".to_string(),
            ..payment
        };
        assert_eq!(named.counterparty_label(), "Acme");
    }

    #[test]
    fn test_unmatched_result_has_no_confidence() {
        let record = LedgerRecord::new("INV7".to_string(), "X".to_string(), BigDecimal::from(5));
        let result = MatchResult::unmatched_ledger(record);
        assert_eq!(result.match_type, MatchType::Unmatched);
        assert_eq!(result.confidence, 0.0);
        assert!(result.payment_record.is_none());
        assert!(!result.has_variance());
        assert!(result.explanation.contains("INV7"));
    }

    #[test]
    fn test_match_type_serializes_screaming_case() {
        let json = serde_json::to_string(&MatchType::FuzzyNameAmount).unwrap();
        assert_eq!(json, "\"FUZZY_NAME_AMOUNT\"");
    }

    #[test]
    fn test_data_quality_note_carries_reason() {
        let note = DataQualityNote::new(
            RecordSide::Ledger,
            3,
            "INV9".to_string(),
            InvalidRecordError::InvalidAmount {
                value: "bad".to_string(),
            },
        );
        assert_eq!(note.reason, "Amount is not numeric: 'bad'");
    }

    #[test]
    fn test_match_rate_ignores_excluded_records() {
        let summary = ReconciliationSummary {
            total_ledger: 4,
            total_payments: 3,
            matched: 2,
            matched_by_type: BTreeMap::new(),
            allocations: 0,
            allocated_ledger: 0,
            unmatched_ledger: 1,
            unmatched_payments: 1,
            excluded_ledger: 1,
            excluded_payments: 0,
            total_variance: BigDecimal::from(0),
            total_absolute_variance: BigDecimal::from(0),
            data_quality: Vec::new(),
        };
        assert!((summary.match_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert!(!summary.is_fully_reconciled());
    }
}
