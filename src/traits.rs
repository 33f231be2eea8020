//! Traits for validation and scoring extensibility

use crate::types::*;
use crate::utils::{
    token_sort_ratio, validate_field_length, validate_identity, validate_positive_amount,
};

/// Validation applied to every typed record before matching starts.
///
/// Parsing failures (non-numeric amounts, unreadable dates) are caught while
/// converting raw rows; a validator adds the business rules on top. A record
/// rejected here is excluded and reported as a data-quality note.
pub trait RecordValidator: Send + Sync {
    /// Validate a ledger record
    fn validate_ledger(&self, record: &LedgerRecord) -> Result<(), InvalidRecordError>;

    /// Validate a payment record
    fn validate_payment(&self, record: &PaymentRecord) -> Result<(), InvalidRecordError>;
}

/// Default validator: every record must carry something to identify it by
pub struct DefaultRecordValidator;

impl RecordValidator for DefaultRecordValidator {
    fn validate_ledger(&self, record: &LedgerRecord) -> Result<(), InvalidRecordError> {
        validate_identity(&[
            record.invoice_no.as_str(),
            record.party_name.as_str(),
            record.details.as_str(),
        ])
    }

    fn validate_payment(&self, record: &PaymentRecord) -> Result<(), InvalidRecordError> {
        validate_identity(&[record.reference.as_str(), record.payer_name.as_str()])
    }
}

/// Stricter validator for audit runs: dated, positive, reasonably sized records only
pub struct StrictRecordValidator {
    pub max_text_length: usize,
}

impl Default for StrictRecordValidator {
    fn default() -> Self {
        Self {
            max_text_length: 200,
        }
    }
}

impl RecordValidator for StrictRecordValidator {
    fn validate_ledger(&self, record: &LedgerRecord) -> Result<(), InvalidRecordError> {
        DefaultRecordValidator.validate_ledger(record)?;
        validate_positive_amount(&record.amount)?;
        if record.date.is_none() {
            return Err(InvalidRecordError::MissingDate);
        }
        validate_field_length("invoice_no", &record.invoice_no, self.max_text_length)?;
        validate_field_length("party_name", &record.party_name, self.max_text_length)?;
        validate_field_length("details", &record.details, self.max_text_length)?;
        Ok(())
    }

    fn validate_payment(&self, record: &PaymentRecord) -> Result<(), InvalidRecordError> {
        DefaultRecordValidator.validate_payment(record)?;
        validate_positive_amount(&record.amount)?;
        if record.date.is_none() {
            return Err(InvalidRecordError::MissingDate);
        }
        validate_field_length("reference", &record.reference, self.max_text_length)?;
        validate_field_length("payer_name", &record.payer_name, self.max_text_length)?;
        Ok(())
    }
}

/// Name similarity used by the fuzzy pass, the combined-invoice pool and suggestions.
///
/// Implementations must return a value in `0.0..=1.0` and be deterministic.
pub trait NameSimilarity: Send + Sync {
    fn similarity(&self, left: &str, right: &str) -> f64;
}

/// Token-sort ratio: word order, case and punctuation are ignored
pub struct TokenSortSimilarity;

impl NameSimilarity for TokenSortSimilarity {
    fn similarity(&self, left: &str, right: &str) -> f64 {
        token_sort_ratio(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[test]
    fn test_default_validator_requires_identity() {
        let anonymous = LedgerRecord::new(String::new(), String::new(), BigDecimal::from(10));
        assert_eq!(
            DefaultRecordValidator.validate_ledger(&anonymous),
            Err(InvalidRecordError::MissingIdentity)
        );

        let described = anonymous.with_details("Consulting services".to_string());
        assert!(DefaultRecordValidator.validate_ledger(&described).is_ok());

        let payment = PaymentRecord::new(String::new(), " ".to_string(), BigDecimal::from(10));
        assert!(DefaultRecordValidator.validate_payment(&payment).is_err());
    }

    #[test]
    fn test_strict_validator() {
        let validator = StrictRecordValidator::default();
        let record = LedgerRecord::new("INV1".to_string(), "Acme".to_string(), BigDecimal::from(10));
        assert_eq!(
            validator.validate_ledger(&record),
            Err(InvalidRecordError::MissingDate)
        );

        let dated = record.with_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(validator.validate_ledger(&dated).is_ok());

        let refund = PaymentRecord::new("R1".to_string(), "Acme".to_string(), BigDecimal::from(-10))
            .with_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(matches!(
            validator.validate_payment(&refund),
            Err(InvalidRecordError::NonPositiveAmount { .. })
        ));

        let short = StrictRecordValidator { max_text_length: 3 };
        assert!(matches!(
            short.validate_ledger(&dated),
            Err(InvalidRecordError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn test_token_sort_similarity() {
        let scorer = TokenSortSimilarity;
        assert_eq!(scorer.similarity("Sharma Traders", "traders sharma"), 1.0);
    }
}
