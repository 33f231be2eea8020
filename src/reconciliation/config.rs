//! Tuning knobs accepted by the reconciliation engine

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::utils::amounts_agree;

/// Largest number of invoices one payment may be split across
const MAX_COMBINATION_LIMIT: usize = 5;

/// Default floor for accepting a combined-invoice allocation
const DEFAULT_MIN_ALLOCATION_CONFIDENCE: f64 = 0.65;

/// Extra slack allowed between amounts in the fuzzy and combined-invoice passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AmountTolerance {
    /// Amounts may differ by up to this much
    Absolute(BigDecimal),
    /// Amounts may differ by up to this percentage of the larger one
    Percentage(BigDecimal),
}

impl AmountTolerance {
    /// Whether `a` and `b` fall inside the band
    pub fn admits(&self, a: &BigDecimal, b: &BigDecimal) -> bool {
        let difference = (a - b).abs();
        match self {
            AmountTolerance::Absolute(limit) => difference <= *limit,
            AmountTolerance::Percentage(percent) => {
                let larger = std::cmp::max(a.abs(), b.abs());
                difference * BigDecimal::from(100) <= larger * percent
            }
        }
    }
}

/// Configuration for a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Minimum name similarity for a fuzzy match, 0.0 to 1.0
    pub fuzzy_threshold: f64,
    /// Amounts closer than this are treated as equal
    pub amount_epsilon: BigDecimal,
    /// Optional near-amount band for the fuzzy and combined-invoice passes
    pub amount_tolerance_band: Option<AmountTolerance>,
    /// Reject amount-only pairs whose dates are further apart than this
    pub date_window_days: Option<u32>,
    /// Also match payments whose reference cites the invoice number among other words
    pub match_embedded_references: bool,
    /// Try to settle a leftover payment with several leftover invoices
    pub combine_invoices: bool,
    pub max_combination_size: usize,
    /// Combinations scoring below this confidence are left unmatched
    pub min_allocation_confidence: f64,
    /// Review candidates listed per unmatched payment; zero disables suggestions
    pub max_suggestions: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.75,
            amount_epsilon: BigDecimal::from(1) / BigDecimal::from(100),
            amount_tolerance_band: None,
            date_window_days: None,
            match_embedded_references: false,
            combine_invoices: false,
            max_combination_size: 3,
            min_allocation_confidence: DEFAULT_MIN_ALLOCATION_CONFIDENCE,
            max_suggestions: 3,
        }
    }
}

impl ReconciliationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_amount_epsilon(mut self, epsilon: BigDecimal) -> Self {
        self.amount_epsilon = epsilon;
        self
    }

    pub fn with_tolerance_band(mut self, band: AmountTolerance) -> Self {
        self.amount_tolerance_band = Some(band);
        self
    }

    pub fn with_date_window(mut self, days: u32) -> Self {
        self.date_window_days = Some(days);
        self
    }

    pub fn with_embedded_references(mut self, enabled: bool) -> Self {
        self.match_embedded_references = enabled;
        self
    }

    /// Enable combined-invoice matching with up to `max_size` invoices per payment
    pub fn with_combined_invoices(mut self, max_size: usize) -> Self {
        self.combine_invoices = true;
        self.max_combination_size = max_size;
        self
    }

    pub fn with_min_allocation_confidence(mut self, confidence: f64) -> Self {
        self.min_allocation_confidence = confidence;
        self
    }

    pub fn with_max_suggestions(mut self, count: usize) -> Self {
        self.max_suggestions = count;
        self
    }

    /// Check every knob is in range
    pub fn validate(&self) -> ReconResult<()> {
        if !self.fuzzy_threshold.is_finite() || !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ReconError::Configuration(format!(
                "fuzzy_threshold must be between 0 and 1, got {}",
                self.fuzzy_threshold
            )));
        }

        if self.amount_epsilon < BigDecimal::from(0) {
            return Err(ReconError::Configuration(format!(
                "amount_epsilon cannot be negative, got {}",
                self.amount_epsilon
            )));
        }

        match &self.amount_tolerance_band {
            Some(AmountTolerance::Absolute(limit)) if *limit < BigDecimal::from(0) => {
                return Err(ReconError::Configuration(format!(
                    "absolute tolerance cannot be negative, got {}",
                    limit
                )));
            }
            Some(AmountTolerance::Percentage(percent))
                if *percent < BigDecimal::from(0) || *percent > BigDecimal::from(100) =>
            {
                return Err(ReconError::Configuration(format!(
                    "percentage tolerance must be between 0 and 100, got {}",
                    percent
                )));
            }
            _ => {}
        }

        if self.combine_invoices
            && !(2..=MAX_COMBINATION_LIMIT).contains(&self.max_combination_size)
        {
            return Err(ReconError::Configuration(format!(
                "max_combination_size must be between 2 and {}, got {}",
                MAX_COMBINATION_LIMIT, self.max_combination_size
            )));
        }

        if !self.min_allocation_confidence.is_finite()
            || !(0.0..=1.0).contains(&self.min_allocation_confidence)
        {
            return Err(ReconError::Configuration(format!(
                "min_allocation_confidence must be between 0 and 1, got {}",
                self.min_allocation_confidence
            )));
        }

        Ok(())
    }

    /// Whether two amounts are equal within epsilon
    pub fn amounts_agree(&self, a: &BigDecimal, b: &BigDecimal) -> bool {
        amounts_agree(a, b, &self.amount_epsilon)
    }

    /// Whether two amounts are close enough for the fuzzy and combined-invoice passes
    pub fn amounts_within_tolerance(&self, a: &BigDecimal, b: &BigDecimal) -> bool {
        self.amounts_agree(a, b)
            || self
                .amount_tolerance_band
                .as_ref()
                .is_some_and(|band| band.admits(a, b))
    }
}
