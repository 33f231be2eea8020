//! The matching passes. Each pass only considers records no earlier pass consumed.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::reconciliation::ReconciliationConfig;
use crate::traits::NameSimilarity;
use crate::types::*;
use crate::utils::{reference_cites, references_equal};

/// Invoices considered per payment when looking for a combined settlement
const COMBINATION_POOL_SIZE: usize = 10;

/// A one-to-one pairing, by position in the validated inputs
#[derive(Debug, Clone)]
pub(crate) struct Pairing {
    pub ledger: usize,
    pub payment: usize,
    pub match_type: MatchType,
    pub confidence: f64,
    pub variance: BigDecimal,
    pub date_gap_days: Option<i64>,
    pub explanation: String,
}

/// One payment settled by several invoices, by position in the validated inputs
#[derive(Debug, Clone)]
pub(crate) struct Allocation {
    pub payment: usize,
    pub ledger: Vec<usize>,
    pub confidence: f64,
    pub variance: BigDecimal,
    pub explanation: String,
}

/// Working state shared by the passes of one reconciliation call
pub(crate) struct MatchState<'a> {
    pub ledger: &'a [LedgerRecord],
    pub payments: &'a [PaymentRecord],
    ledger_used: Vec<bool>,
    payment_used: Vec<bool>,
    pub pairings: Vec<Pairing>,
    pub allocations: Vec<Allocation>,
}

impl<'a> MatchState<'a> {
    pub fn new(ledger: &'a [LedgerRecord], payments: &'a [PaymentRecord]) -> Self {
        Self {
            ledger,
            payments,
            ledger_used: vec![false; ledger.len()],
            payment_used: vec![false; payments.len()],
            pairings: Vec::new(),
            allocations: Vec::new(),
        }
    }

    /// Positions of ledger records still available, in input order
    pub fn free_ledger(&self) -> Vec<usize> {
        (0..self.ledger.len())
            .filter(|i| !self.ledger_used[*i])
            .collect()
    }

    /// Positions of payment records still available, in input order
    pub fn free_payments(&self) -> Vec<usize> {
        (0..self.payments.len())
            .filter(|i| !self.payment_used[*i])
            .collect()
    }

    fn is_free(&self, ledger: usize, payment: usize) -> bool {
        !self.ledger_used[ledger] && !self.payment_used[payment]
    }

    fn pair(&mut self, pairing: Pairing) {
        self.ledger_used[pairing.ledger] = true;
        self.payment_used[pairing.payment] = true;
        self.pairings.push(pairing);
    }

    fn allocate(&mut self, allocation: Allocation) {
        for ledger in &allocation.ledger {
            self.ledger_used[*ledger] = true;
        }
        self.payment_used[allocation.payment] = true;
        self.allocations.push(allocation);
    }

    fn absolute_difference(&self, ledger: usize, payment: usize) -> BigDecimal {
        (&self.ledger[ledger].amount - &self.payments[payment].amount).abs()
    }
}

/// Ledger minus payment, zero when the amounts agree within epsilon
pub(crate) fn variance(
    ledger_amount: &BigDecimal,
    payment_amount: &BigDecimal,
    config: &ReconciliationConfig,
) -> BigDecimal {
    if config.amounts_agree(ledger_amount, payment_amount) {
        BigDecimal::from(0)
    } else {
        ledger_amount - payment_amount
    }
}

pub(crate) fn date_gap(ledger: Option<NaiveDate>, payment: Option<NaiveDate>) -> Option<i64> {
    match (ledger, payment) {
        (Some(l), Some(p)) => Some((l - p).num_days().abs()),
        _ => None,
    }
}

/// Plain-language account of an amount variance
pub(crate) fn describe_variance(variance: &BigDecimal) -> String {
    let zero = BigDecimal::from(0);
    if *variance == zero {
        "amounts agree".to_string()
    } else if *variance > zero {
        format!("ledger exceeds payment by {}", variance)
    } else {
        format!("payment exceeds ledger by {}", variance.abs())
    }
}

/// Shared body of the two reference passes: for each ledger record in order,
/// take the admissible payment with the smallest amount difference,
/// earliest payment on ties.
fn match_by_reference(
    state: &mut MatchState<'_>,
    config: &ReconciliationConfig,
    match_type: MatchType,
    confidences: (f64, f64),
    admits: impl Fn(&LedgerRecord, &PaymentRecord) -> bool,
) -> usize {
    let (ledger_records, payment_records) = (state.ledger, state.payments);
    let mut matched = 0;
    for ledger in state.free_ledger() {
        let record = &ledger_records[ledger];
        if record.invoice_no.trim().is_empty() {
            continue;
        }

        let best = state
            .free_payments()
            .into_iter()
            .filter(|payment| admits(record, &payment_records[*payment]))
            .min_by(|a, b| {
                state
                    .absolute_difference(ledger, *a)
                    .cmp(&state.absolute_difference(ledger, *b))
                    .then(a.cmp(b))
            });

        if let Some(payment) = best {
            let payment_record = &payment_records[payment];
            let variance = variance(&record.amount, &payment_record.amount, config);
            let confidence = if variance == BigDecimal::from(0) {
                confidences.0
            } else {
                confidences.1
            };
            let explanation = match match_type {
                MatchType::ExactReference => format!(
                    "reference {} matches exactly; {}",
                    record.invoice_no.trim(),
                    describe_variance(&variance)
                ),
                _ => format!(
                    "payment reference '{}' cites invoice {}; {}",
                    payment_record.reference.trim(),
                    record.invoice_no.trim(),
                    describe_variance(&variance)
                ),
            };
            let pairing = Pairing {
                ledger,
                payment,
                match_type,
                confidence,
                variance,
                date_gap_days: date_gap(record.date, payment_record.date),
                explanation,
            };
            state.pair(pairing);
            matched += 1;
        }
    }
    matched
}

/// Pass 1: invoice number equals payment reference (trimmed, case-insensitive)
pub(crate) fn match_exact_references(
    state: &mut MatchState<'_>,
    config: &ReconciliationConfig,
) -> usize {
    match_by_reference(
        state,
        config,
        MatchType::ExactReference,
        (1.0, 0.9),
        |ledger, payment| references_equal(&ledger.invoice_no, &payment.reference),
    )
}

/// Pass 1b: payment reference cites the invoice number among its words
pub(crate) fn match_embedded_references(
    state: &mut MatchState<'_>,
    config: &ReconciliationConfig,
) -> usize {
    match_by_reference(
        state,
        config,
        MatchType::EmbeddedReference,
        (0.95, 0.85),
        |ledger, payment| reference_cites(&payment.reference, &ledger.invoice_no),
    )
}

/// Pass 2: similar names and agreeing amounts, best similarity first
pub(crate) fn match_fuzzy_names(
    state: &mut MatchState<'_>,
    config: &ReconciliationConfig,
    similarity: &dyn NameSimilarity,
) -> usize {
    let free_payments = state.free_payments();
    let mut candidates: Vec<(f64, BigDecimal, usize, usize)> = Vec::new();

    for ledger in state.free_ledger() {
        let record = &state.ledger[ledger];
        let label = record.counterparty_label();
        if label.is_empty() {
            continue;
        }
        for payment in &free_payments {
            let payment_record = &state.payments[*payment];
            if !config.amounts_within_tolerance(&record.amount, &payment_record.amount) {
                continue;
            }
            let score = similarity.similarity(label, payment_record.counterparty_label());
            if score.is_nan() {
                continue;
            }
            let score = score.clamp(0.0, 1.0);
            if score >= config.fuzzy_threshold {
                candidates.push((
                    score,
                    state.absolute_difference(ledger, *payment),
                    ledger,
                    *payment,
                ));
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
            .then(a.3.cmp(&b.3))
    });

    let (ledger_records, payment_records) = (state.ledger, state.payments);
    let mut matched = 0;
    for (score, _, ledger, payment) in candidates {
        if !state.is_free(ledger, payment) {
            continue;
        }
        let record = &ledger_records[ledger];
        let payment_record = &payment_records[payment];
        let variance = variance(&record.amount, &payment_record.amount, config);
        let explanation = format!(
            "'{}' resembles '{}' (similarity {:.3}); {}",
            record.counterparty_label(),
            payment_record.counterparty_label(),
            score,
            describe_variance(&variance)
        );
        let pairing = Pairing {
            ledger,
            payment,
            match_type: MatchType::FuzzyNameAmount,
            confidence: score,
            variance,
            date_gap_days: date_gap(record.date, payment_record.date),
            explanation,
        };
        state.pair(pairing);
        matched += 1;
    }
    matched
}

/// Pass 3: amounts agree; closest dates pair first, undated pairs last
pub(crate) fn match_amounts_only(state: &mut MatchState<'_>, config: &ReconciliationConfig) -> usize {
    let free_payments = state.free_payments();
    let mut candidates: Vec<(Option<i64>, usize, usize)> = Vec::new();

    for ledger in state.free_ledger() {
        let record = &state.ledger[ledger];
        for payment in &free_payments {
            let payment_record = &state.payments[*payment];
            if !config.amounts_agree(&record.amount, &payment_record.amount) {
                continue;
            }
            let gap = date_gap(record.date, payment_record.date);
            if let (Some(gap), Some(window)) = (gap, config.date_window_days) {
                if gap > i64::from(window) {
                    continue;
                }
            }
            candidates.push((gap, ledger, *payment));
        }
    }

    candidates.sort_by(|a, b| {
        a.0.is_none()
            .cmp(&b.0.is_none())
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut matched = 0;
    for (gap, ledger, payment) in candidates {
        if !state.is_free(ledger, payment) {
            continue;
        }
        let explanation = match gap {
            Some(days) => format!(
                "amounts agree at {}; dates {} days apart",
                state.ledger[ledger].amount, days
            ),
            None => format!(
                "amounts agree at {}; no dates to compare",
                state.ledger[ledger].amount
            ),
        };
        let pairing = Pairing {
            ledger,
            payment,
            match_type: MatchType::AmountOnly,
            confidence: 0.5,
            variance: BigDecimal::from(0),
            date_gap_days: gap,
            explanation,
        };
        state.pair(pairing);
        matched += 1;
    }
    matched
}

/// Confidence of a combined allocation from the mean name similarity of its invoices
fn allocation_confidence(mean_similarity: f64) -> f64 {
    0.4 + 0.4 * mean_similarity
}

/// Depth-first search over combinations of `size` pool positions, in lexicographic order
fn find_combination(
    pool_len: usize,
    size: usize,
    start: usize,
    chosen: &mut Vec<usize>,
    accept: &dyn Fn(&[usize]) -> bool,
) -> bool {
    if chosen.len() == size {
        return accept(chosen);
    }
    for position in start..pool_len {
        chosen.push(position);
        if find_combination(pool_len, size, position + 1, chosen, accept) {
            return true;
        }
        chosen.pop();
    }
    false
}

/// Pass 4: one payment settling several invoices whose totals add up to it
pub(crate) fn match_combined_invoices(
    state: &mut MatchState<'_>,
    config: &ReconciliationConfig,
    similarity: &dyn NameSimilarity,
) -> usize {
    let (ledger_records, payment_records) = (state.ledger, state.payments);
    let mut matched = 0;
    for payment in state.free_payments() {
        let payment_record = &payment_records[payment];

        let mut pool: Vec<(f64, usize)> = state
            .free_ledger()
            .into_iter()
            .map(|ledger| {
                let score = similarity.similarity(
                    ledger_records[ledger].counterparty_label(),
                    payment_record.counterparty_label(),
                );
                (if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }, ledger)
            })
            .collect();
        pool.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        pool.truncate(COMBINATION_POOL_SIZE);

        let mean_similarity = |positions: &[usize]| {
            positions.iter().map(|p| pool[*p].0).sum::<f64>() / positions.len() as f64
        };
        let acceptable = |positions: &[usize]| {
            let total: BigDecimal = positions
                .iter()
                .map(|p| &ledger_records[pool[*p].1].amount)
                .sum();
            config.amounts_within_tolerance(&total, &payment_record.amount)
                && allocation_confidence(mean_similarity(positions))
                    >= config.min_allocation_confidence
        };

        let max_size = config.max_combination_size.min(pool.len());
        let mut chosen = Vec::new();
        let found = (2..=max_size).any(|size| {
            chosen.clear();
            find_combination(pool.len(), size, 0, &mut chosen, &acceptable)
        });
        if !found {
            continue;
        }

        let mut ledger: Vec<usize> = chosen.iter().map(|p| pool[*p].1).collect();
        ledger.sort_unstable();
        let total: BigDecimal = ledger.iter().map(|l| &ledger_records[*l].amount).sum();
        let variance = variance(&total, &payment_record.amount, config);
        let invoices: Vec<String> = ledger
            .iter()
            .map(|l| {
                let record = &ledger_records[*l];
                if record.invoice_no.is_empty() {
                    format!("row {}", record.row)
                } else {
                    record.invoice_no.clone()
                }
            })
            .collect();
        let explanation = format!(
            "payment '{}' settles {} invoices ({}) totalling {}; {}",
            payment_record.reference.trim(),
            ledger.len(),
            invoices.join(", "),
            total,
            describe_variance(&variance)
        );

        state.allocate(Allocation {
            payment,
            ledger,
            confidence: allocation_confidence(mean_similarity(chosen.as_slice())),
            variance,
            explanation,
        });
        matched += 1;
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TokenSortSimilarity;
    use std::str::FromStr;

    fn amount(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn ledger(invoice_no: &str, party: &str, value: &str) -> LedgerRecord {
        LedgerRecord::new(invoice_no.to_string(), party.to_string(), amount(value))
    }

    fn payment(reference: &str, payer: &str, value: &str) -> PaymentRecord {
        PaymentRecord::new(reference.to_string(), payer.to_string(), amount(value))
    }

    #[test]
    fn test_exact_reference_prefers_smallest_variance() {
        let ledger = vec![ledger("INV1", "Acme", "100.00")];
        let payments = vec![
            payment("INV1", "Acme", "99.99"),
            payment("inv1 ", "Acme", "100.00"),
        ];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_exact_references(&mut state, &config), 1);
        let pairing = &state.pairings[0];
        assert_eq!(pairing.payment, 1);
        assert_eq!(pairing.confidence, 1.0);
        assert_eq!(pairing.variance, BigDecimal::from(0));
    }

    #[test]
    fn test_exact_reference_with_variance() {
        let ledger = vec![ledger("INV2", "Acme", "100.00")];
        let payments = vec![payment("INV2", "Acme", "90.00")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        match_exact_references(&mut state, &config);
        let pairing = &state.pairings[0];
        assert_eq!(pairing.confidence, 0.9);
        assert_eq!(pairing.variance, BigDecimal::from(10));
        assert!(pairing.explanation.contains("ledger exceeds payment by 10"));
    }

    #[test]
    fn test_earliest_payment_wins_full_tie() {
        let ledger = vec![ledger("INV3", "Acme", "50")];
        let payments = vec![payment("INV3", "A", "50"), payment("INV3", "B", "50")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        match_exact_references(&mut state, &config);
        assert_eq!(state.pairings[0].payment, 0);
        assert_eq!(state.free_payments(), vec![1]);
    }

    #[test]
    fn test_embedded_reference() {
        let ledger = vec![ledger("1004", "", "20000")];
        let payments = vec![payment("Invoice #1004 bank transfer", "", "20000")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_exact_references(&mut state, &config), 0);
        assert_eq!(match_embedded_references(&mut state, &config), 1);
        assert_eq!(state.pairings[0].match_type, MatchType::EmbeddedReference);
        assert_eq!(state.pairings[0].confidence, 0.95);
    }

    #[test]
    fn test_fuzzy_pass_is_greedy_by_similarity() {
        let ledger = vec![
            ledger("", "Acme Corp", "250.00"),
            ledger("", "Acme Corporation", "250.00"),
        ];
        let payments = vec![payment("", "Acme Corporation", "250.00")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_fuzzy_names(&mut state, &config, &TokenSortSimilarity), 1);
        assert_eq!(state.pairings[0].ledger, 1);
        assert_eq!(state.pairings[0].confidence, 1.0);
        assert_eq!(state.free_ledger(), vec![0]);
    }

    #[test]
    fn test_fuzzy_pass_requires_amount_agreement() {
        let ledger = vec![ledger("", "Acme Corp", "250.00")];
        let payments = vec![payment("", "Acme Corp", "240.00")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_fuzzy_names(&mut state, &config, &TokenSortSimilarity), 0);
    }

    #[test]
    fn test_amount_only_prefers_closest_dates() {
        let date = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        let ledger = vec![
            ledger("", "North", "75").with_date(date(1)),
            ledger("", "South", "75").with_date(date(20)),
        ];
        let payments = vec![
            payment("", "Zeta", "75").with_date(date(19)),
            payment("", "Omega", "75").with_date(date(2)),
        ];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_amounts_only(&mut state, &config), 2);
        let pairs: Vec<(usize, usize)> = state.pairings.iter().map(|p| (p.ledger, p.payment)).collect();
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(1, 0)));
        assert!(state.pairings.iter().all(|p| p.confidence == 0.5));
    }

    #[test]
    fn test_amount_only_respects_date_window() {
        let ledger = vec![ledger("", "North", "75")
            .with_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())];
        let payments = vec![payment("", "Zeta", "75")
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())];
        let config = ReconciliationConfig::new().with_date_window(30);
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_amounts_only(&mut state, &config), 0);
    }

    #[test]
    fn test_combined_invoices() {
        let ledger = vec![
            ledger("A1", "Sharma Traders", "1200"),
            ledger("A2", "Other Party", "999"),
            ledger("A3", "Sharma Traders", "800"),
        ];
        let payments = vec![payment("NEFT", "Sharma Traders", "2000")];
        let config = ReconciliationConfig::new().with_combined_invoices(3);
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_combined_invoices(&mut state, &config, &TokenSortSimilarity), 1);
        let allocation = &state.allocations[0];
        assert_eq!(allocation.ledger, vec![0, 2]);
        assert_eq!(allocation.variance, BigDecimal::from(0));
        assert!((allocation.confidence - 0.8).abs() < 1e-9);
        assert_eq!(state.free_ledger(), vec![1]);
        assert!(state.free_payments().is_empty());
    }

    #[test]
    fn test_combined_invoices_need_related_names() {
        let ledger = vec![
            ledger("A1", "Zenith Logistics", "1200"),
            ledger("A2", "Qwerty Foods", "800"),
        ];
        let payments = vec![payment("UTR9", "Marigold Bank", "2000")];
        let config = ReconciliationConfig::new().with_combined_invoices(3);
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_combined_invoices(&mut state, &config, &TokenSortSimilarity), 0);
        assert!(state.allocations.is_empty());
        assert_eq!(state.free_ledger(), vec![0, 1]);
        assert_eq!(state.free_payments(), vec![0]);

        let permissive = config.with_min_allocation_confidence(0.0);
        let mut state = MatchState::new(&ledger, &payments);
        assert_eq!(match_combined_invoices(&mut state, &permissive, &TokenSortSimilarity), 1);
        assert!(state.allocations[0].confidence < 0.65);
    }

    #[test]
    fn test_duplicate_ledger_references_consume_payment_once() {
        let ledger = vec![ledger("INV1", "Acme", "100"), ledger("inv1", "Acme", "100")];
        let payments = vec![payment("INV1", "Acme", "100")];
        let config = ReconciliationConfig::default();
        let mut state = MatchState::new(&ledger, &payments);

        assert_eq!(match_exact_references(&mut state, &config), 1);
        assert_eq!(state.pairings[0].ledger, 0);
        assert_eq!(state.free_ledger(), vec![1]);
        assert!(state.free_payments().is_empty());
    }

    #[test]
    fn test_describe_variance() {
        assert_eq!(describe_variance(&BigDecimal::from(0)), "amounts agree");
        assert_eq!(
            describe_variance(&amount("-0.01")),
            "payment exceeds ledger by 0.01"
        );
    }
}
