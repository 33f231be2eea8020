//! Input boundary: raw rows become typed records or data-quality notes

pub mod ledger;
pub mod payment;

pub use ledger::*;
pub use payment::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::traits::RecordValidator;
use crate::types::*;

/// A loosely typed cell, as it arrives from JSON or a spreadsheet export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// Trimmed textual form; `Null` is empty
    pub fn to_text(&self) -> String {
        self.to_string().trim().to_string()
    }

    pub fn is_blank(&self) -> bool {
        self.to_text().is_empty()
    }

    pub(crate) fn text_of(value: &Option<FieldValue>) -> String {
        value.as_ref().map(FieldValue::to_text).unwrap_or_default()
    }

    pub(crate) fn text_map(values: &BTreeMap<String, FieldValue>) -> BTreeMap<String, String> {
        values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_text()))
            .collect()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Float(value) => write!(f, "{}", value),
            FieldValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Records that passed validation, plus a note for every one that did not
#[derive(Debug, Clone, Default)]
pub struct ValidatedInput {
    pub ledger: Vec<LedgerRecord>,
    pub payments: Vec<PaymentRecord>,
    pub notes: Vec<DataQualityNote>,
}

impl ValidatedInput {
    fn accept_ledger(
        &mut self,
        outcome: Result<LedgerRecord, InvalidRecordError>,
        row: usize,
        identifier: String,
        validator: &dyn RecordValidator,
    ) {
        match outcome.and_then(|record| validator.validate_ledger(&record).map(|_| record)) {
            Ok(record) => self.ledger.push(record),
            Err(error) => {
                tracing::warn!("Excluding ledger row {} ({}): {}", row, identifier, error);
                self.notes
                    .push(DataQualityNote::new(RecordSide::Ledger, row, identifier, error));
            }
        }
    }

    fn accept_payment(
        &mut self,
        outcome: Result<PaymentRecord, InvalidRecordError>,
        row: usize,
        identifier: String,
        validator: &dyn RecordValidator,
    ) {
        match outcome.and_then(|record| validator.validate_payment(&record).map(|_| record)) {
            Ok(record) => self.payments.push(record),
            Err(error) => {
                tracing::warn!("Excluding payment row {} ({}): {}", row, identifier, error);
                self.notes
                    .push(DataQualityNote::new(RecordSide::Payment, row, identifier, error));
            }
        }
    }
}

/// Parse and validate raw rows; each row's position becomes its `row` index
pub fn validate_rows(
    ledger_rows: &[LedgerRow],
    payment_rows: &[PaymentRow],
    validator: &dyn RecordValidator,
) -> ValidatedInput {
    let mut input = ValidatedInput::default();
    for (row, raw) in ledger_rows.iter().enumerate() {
        input.accept_ledger(raw.parse(row), row, raw.identifier(), validator);
    }
    for (row, raw) in payment_rows.iter().enumerate() {
        input.accept_payment(raw.parse(row), row, raw.identifier(), validator);
    }
    input
}

/// Validate already-typed records, keeping their own `row` indexes
pub fn validate_records(
    ledger_records: &[LedgerRecord],
    payment_records: &[PaymentRecord],
    validator: &dyn RecordValidator,
) -> ValidatedInput {
    let mut input = ValidatedInput::default();
    for record in ledger_records {
        input.accept_ledger(
            Ok(record.clone()),
            record.row,
            record.invoice_no.clone(),
            validator,
        );
    }
    for record in payment_records {
        input.accept_payment(
            Ok(record.clone()),
            record.row,
            record.reference.clone(),
            validator,
        );
    }
    input
}
