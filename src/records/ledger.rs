//! Raw ledger rows and their conversion into typed records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::records::FieldValue;
use crate::traits::{DefaultRecordValidator, RecordValidator};
use crate::types::*;
use crate::utils::{line_total, parse_amount, parse_date, parse_quantity};

/// A ledger row as handed over by a file or HTTP adapter, before validation.
///
/// Every field is optional and loosely typed. When `amount` is absent the
/// total is computed from `qty` and `unit_price`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(default, alias = "inv_no")]
    pub invoice_no: Option<FieldValue>,
    #[serde(default, alias = "party")]
    pub party_name: Option<FieldValue>,
    #[serde(default, alias = "item_name")]
    pub details: Option<FieldValue>,
    #[serde(default)]
    pub amount: Option<FieldValue>,
    #[serde(default)]
    pub qty: Option<FieldValue>,
    #[serde(default, alias = "invoice_value")]
    pub unit_price: Option<FieldValue>,
    #[serde(default, alias = "invoice_date")]
    pub date: Option<FieldValue>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl LedgerRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invoice_no(mut self, invoice_no: &str) -> Self {
        self.invoice_no = Some(FieldValue::from(invoice_no));
        self
    }

    pub fn with_party_name(mut self, party_name: &str) -> Self {
        self.party_name = Some(FieldValue::from(party_name));
        self
    }

    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(FieldValue::from(details));
        self
    }

    pub fn with_amount(mut self, amount: &str) -> Self {
        self.amount = Some(FieldValue::from(amount));
        self
    }

    /// Set quantity and unit price instead of a total
    pub fn with_line(mut self, qty: &str, unit_price: &str) -> Self {
        self.qty = Some(FieldValue::from(qty));
        self.unit_price = Some(FieldValue::from(unit_price));
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(FieldValue::from(date));
        self
    }

    /// Invoice number as written, used to label data-quality notes
    pub fn identifier(&self) -> String {
        FieldValue::text_of(&self.invoice_no)
    }

    /// Convert into a typed record; `row` is the row's position in the source
    pub fn parse(&self, row: usize) -> Result<LedgerRecord, InvalidRecordError> {
        let amount = match (&self.amount, &self.unit_price) {
            (Some(amount), _) if !amount.is_blank() => parse_amount(Some(&amount.to_text()))?,
            (_, Some(unit_price)) if !unit_price.is_blank() => {
                let quantity = parse_quantity(self.qty.as_ref().map(FieldValue::to_text).as_deref())?;
                let unit_price = parse_amount(Some(&unit_price.to_text()))?;
                line_total(&quantity, &unit_price)
            }
            _ => return Err(InvalidRecordError::MissingAmount),
        };
        let date = parse_date(self.date.as_ref().map(FieldValue::to_text).as_deref())?;

        Ok(LedgerRecord {
            row,
            invoice_no: FieldValue::text_of(&self.invoice_no),
            party_name: FieldValue::text_of(&self.party_name),
            details: FieldValue::text_of(&self.details),
            amount,
            date,
            extra: FieldValue::text_map(&self.extra),
        })
    }
}

impl TryFrom<&LedgerRow> for LedgerRecord {
    type Error = ReconError;

    /// Convert a single row outside a reconciliation run, applying the default validator
    fn try_from(row: &LedgerRow) -> ReconResult<Self> {
        let record = row.parse(0)?;
        DefaultRecordValidator.validate_ledger(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_parse_complete_row() {
        let row = LedgerRow::new()
            .with_invoice_no(" INV1 ")
            .with_party_name("Acme Co")
            .with_amount("1,000.00")
            .with_date("2025-01-01");

        let record = row.parse(4).unwrap();
        assert_eq!(record.row, 4);
        assert_eq!(record.invoice_no, "INV1");
        assert_eq!(record.party_name, "Acme Co");
        assert_eq!(record.amount, BigDecimal::from(1000));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    #[test]
    fn test_amount_from_quantity_and_unit_price() {
        let row = LedgerRow::new()
            .with_invoice_no("1004")
            .with_line("2", "10000.005");
        let record = row.parse(0).unwrap();
        assert_eq!(record.amount, BigDecimal::from_str("20000.01").unwrap());

        let no_qty = LedgerRow {
            unit_price: Some(FieldValue::from("7000")),
            invoice_no: Some(FieldValue::from("1006")),
            ..LedgerRow::default()
        };
        assert_eq!(no_qty.parse(1).unwrap().amount, BigDecimal::from(7000));
    }

    #[test]
    fn test_bad_fields_are_reported() {
        let row = LedgerRow::new().with_invoice_no("INV9").with_amount("bad");
        assert_eq!(
            row.parse(0),
            Err(InvalidRecordError::InvalidAmount {
                value: "bad".to_string()
            })
        );

        let row = LedgerRow::new().with_invoice_no("INV9");
        assert_eq!(row.parse(0), Err(InvalidRecordError::MissingAmount));

        let row = LedgerRow::new()
            .with_invoice_no("INV9")
            .with_amount("10")
            .with_date("yesterday");
        assert!(matches!(row.parse(0), Err(InvalidRecordError::InvalidDate { .. })));
    }

    #[test]
    fn test_deserialize_with_aliases_and_extra_columns() {
        let row: LedgerRow = serde_json::from_value(serde_json::json!({
            "inv_no": "1004",
            "invoice_date": "2025-01-01",
            "item_name": "Consulting services",
            "qty": 1,
            "unit_price": 20000,
            "gstin": "29ABCDE1234F1Z5",
            "branch": null
        }))
        .unwrap();

        let record = row.parse(0).unwrap();
        assert_eq!(record.invoice_no, "1004");
        assert_eq!(record.details, "Consulting services");
        assert_eq!(record.amount, BigDecimal::from(20000));
        assert_eq!(record.extra.get("gstin").map(String::as_str), Some("29ABCDE1234F1Z5"));
        assert_eq!(record.extra.get("branch").map(String::as_str), Some(""));
    }

    #[test]
    fn test_try_from_row() {
        let row = LedgerRow::new().with_invoice_no("INV1").with_amount("10");
        let record = LedgerRecord::try_from(&row).unwrap();
        assert_eq!(record.amount, BigDecimal::from(10));

        let error = LedgerRecord::try_from(&LedgerRow::new().with_amount("10")).unwrap_err();
        assert!(matches!(
            error,
            ReconError::InvalidRecord(InvalidRecordError::MissingIdentity)
        ));
    }
}
