//! Report assembly once every pass has run

use bigdecimal::BigDecimal;
use std::collections::BTreeMap;

use crate::reconciliation::matcher::MatchState;
use crate::types::*;

/// Input sizes and exclusions, carried from validation into the summary
pub(crate) struct RunTotals {
    pub total_ledger: usize,
    pub total_payments: usize,
    pub notes: Vec<DataQualityNote>,
}

/// Build the final report. Matches are ordered by descending confidence,
/// ties in ledger input order; leftovers keep their input order.
pub(crate) fn assemble(
    state: &MatchState<'_>,
    suggestions: Vec<PaymentSuggestions>,
    totals: RunTotals,
) -> ReconciliationReport {
    let mut pairings: Vec<_> = state.pairings.iter().collect();
    pairings.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.ledger.cmp(&b.ledger)));

    let matches: Vec<MatchResult> = pairings
        .into_iter()
        .map(|pairing| MatchResult {
            ledger_record: Some(state.ledger[pairing.ledger].clone()),
            payment_record: Some(state.payments[pairing.payment].clone()),
            match_type: pairing.match_type,
            confidence: pairing.confidence,
            variance: pairing.variance.clone(),
            date_gap_days: pairing.date_gap_days,
            explanation: pairing.explanation.clone(),
        })
        .collect();

    let allocations: Vec<CombinedAllocation> = state
        .allocations
        .iter()
        .map(|allocation| CombinedAllocation {
            payment_record: state.payments[allocation.payment].clone(),
            ledger_records: allocation
                .ledger
                .iter()
                .map(|l| state.ledger[*l].clone())
                .collect(),
            confidence: allocation.confidence,
            variance: allocation.variance.clone(),
            explanation: allocation.explanation.clone(),
        })
        .collect();

    let unmatched_ledger: Vec<LedgerRecord> = state
        .free_ledger()
        .into_iter()
        .map(|l| state.ledger[l].clone())
        .collect();
    let unmatched_payments: Vec<PaymentRecord> = state
        .free_payments()
        .into_iter()
        .map(|p| state.payments[p].clone())
        .collect();

    let mut matched_by_type = BTreeMap::new();
    for result in &matches {
        *matched_by_type.entry(result.match_type).or_insert(0) += 1;
    }

    let variances = matches
        .iter()
        .map(|m| &m.variance)
        .chain(allocations.iter().map(|a| &a.variance));
    let total_variance: BigDecimal = variances.clone().sum();
    let total_absolute_variance: BigDecimal = variances.map(|v| v.abs()).sum();

    let excluded_ledger = totals
        .notes
        .iter()
        .filter(|n| n.side == RecordSide::Ledger)
        .count();
    let excluded_payments = totals.notes.len() - excluded_ledger;

    let summary = ReconciliationSummary {
        total_ledger: totals.total_ledger,
        total_payments: totals.total_payments,
        matched: matches.len(),
        matched_by_type,
        allocations: allocations.len(),
        allocated_ledger: allocations.iter().map(|a| a.ledger_records.len()).sum(),
        unmatched_ledger: unmatched_ledger.len(),
        unmatched_payments: unmatched_payments.len(),
        excluded_ledger,
        excluded_payments,
        total_variance,
        total_absolute_variance,
        data_quality: totals.notes,
    };

    ReconciliationReport {
        matches,
        allocations,
        unmatched_ledger,
        unmatched_payments,
        suggestions,
        summary,
    }
}
