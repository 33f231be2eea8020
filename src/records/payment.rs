//! Raw payment rows and their conversion into typed records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::records::FieldValue;
use crate::traits::{DefaultRecordValidator, RecordValidator};
use crate::types::*;
use crate::utils::{parse_amount, parse_date};

/// A payment or bank-statement row as handed over by an adapter, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    #[serde(default)]
    pub reference: Option<FieldValue>,
    #[serde(default, alias = "payer")]
    pub payer_name: Option<FieldValue>,
    /// Narration; stands in for the reference when that column is blank
    #[serde(default)]
    pub details: Option<FieldValue>,
    #[serde(default, alias = "amt")]
    pub amount: Option<FieldValue>,
    #[serde(default)]
    pub date: Option<FieldValue>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl PaymentRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(FieldValue::from(reference));
        self
    }

    pub fn with_payer_name(mut self, payer_name: &str) -> Self {
        self.payer_name = Some(FieldValue::from(payer_name));
        self
    }

    pub fn with_amount(mut self, amount: &str) -> Self {
        self.amount = Some(FieldValue::from(amount));
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(FieldValue::from(date));
        self
    }

    /// Reference, or narration when the reference column is blank
    pub fn identifier(&self) -> String {
        let reference = FieldValue::text_of(&self.reference);
        if reference.is_empty() {
            FieldValue::text_of(&self.details)
        } else {
            reference
        }
    }

    /// Convert into a typed record; `row` is the row's position in the source
    pub fn parse(&self, row: usize) -> Result<PaymentRecord, InvalidRecordError> {
        let amount = parse_amount(self.amount.as_ref().map(FieldValue::to_text).as_deref())?;
        let date = parse_date(self.date.as_ref().map(FieldValue::to_text).as_deref())?;

        Ok(PaymentRecord {
            row,
            reference: self.identifier(),
            payer_name: FieldValue::text_of(&self.payer_name),
            amount,
            date,
            extra: FieldValue::text_map(&self.extra),
        })
    }
}

impl TryFrom<&PaymentRow> for PaymentRecord {
    type Error = ReconError;

    /// Convert a single row outside a reconciliation run, applying the default validator
    fn try_from(row: &PaymentRow) -> ReconResult<Self> {
        let record = row.parse(0)?;
        DefaultRecordValidator.validate_payment(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[test]
    fn test_parse_payment_row() {
        let row = PaymentRow::new()
            .with_reference("INV1")
            .with_payer_name("Acme Co")
            .with_amount("100.00")
            .with_date("11/01/2025");
        let record = row.parse(2).unwrap();
        assert_eq!(record.row, 2);
        assert_eq!(record.reference, "INV1");
        assert_eq!(record.amount, BigDecimal::from(100));
        assert!(record.date.is_some());
    }

    #[test]
    fn test_details_stand_in_for_reference() {
        let row: PaymentRow = serde_json::from_value(serde_json::json!({
            "amt": 7000.5,
            "date": "2025-01-16",
            "details": "Payment for invoice 1006"
        }))
        .unwrap();
        let record = row.parse(0).unwrap();
        assert_eq!(record.reference, "Payment for invoice 1006");
        assert_eq!(record.amount, BigDecimal::from_str("7000.5").unwrap());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_missing_amount() {
        let row = PaymentRow::new().with_reference("UTR123");
        assert_eq!(row.parse(0), Err(InvalidRecordError::MissingAmount));
    }

    #[test]
    fn test_try_from_row() {
        let row = PaymentRow::new().with_reference("INV1").with_amount("10");
        let record = PaymentRecord::try_from(&row).unwrap();
        assert_eq!(record.amount, BigDecimal::from(10));

        let error = PaymentRecord::try_from(&PaymentRow::new().with_amount("10")).unwrap_err();
        assert!(matches!(
            error,
            ReconError::InvalidRecord(InvalidRecordError::MissingIdentity)
        ));
    }
}
