//! Ranked review candidates for payments the passes could not place

use bigdecimal::{BigDecimal, ToPrimitive};

use crate::reconciliation::matcher::MatchState;
use crate::traits::NameSimilarity;
use crate::types::*;
use crate::utils::{reference_cites, references_equal};

const REFERENCE_WEIGHT: f64 = 0.45;
const AMOUNT_WEIGHT: f64 = 0.40;
const NAME_WEIGHT: f64 = 0.15;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Closeness of two amounts: 1.0 when equal, falling linearly to 0.0
pub(crate) fn amount_proximity(ledger: &BigDecimal, payment: &BigDecimal) -> f64 {
    let zero = BigDecimal::from(0);
    if *ledger <= zero && *payment <= zero {
        return 0.0;
    }
    let difference = (ledger - payment).abs();
    let denominator = std::cmp::max(
        std::cmp::max(ledger.clone(), payment.clone()),
        BigDecimal::from(1),
    );
    let ratio = (difference / denominator).to_f64().unwrap_or(1.0);
    (1.0 - ratio).max(0.0)
}

/// Score one ledger record as a candidate for one payment
pub(crate) fn score_candidate(
    ledger: &LedgerRecord,
    payment: &PaymentRecord,
    similarity: &dyn NameSimilarity,
) -> MatchSuggestion {
    let cited = references_equal(&ledger.invoice_no, &payment.reference)
        || reference_cites(&payment.reference, &ledger.invoice_no);
    let reference_score = if cited { 1.0 } else { 0.0 };
    let amount_score = amount_proximity(&ledger.amount, &payment.amount);

    let sanitize = |score: f64| if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
    let name_score = sanitize(similarity.similarity(
        ledger.counterparty_label(),
        payment.counterparty_label(),
    ))
    .max(sanitize(similarity.similarity(&ledger.details, &payment.reference)));

    let score = REFERENCE_WEIGHT * reference_score
        + AMOUNT_WEIGHT * amount_score
        + NAME_WEIGHT * name_score;

    MatchSuggestion {
        ledger_record: ledger.clone(),
        score: round3(score),
        reference_score,
        amount_score: round3(amount_score),
        name_score: round3(name_score),
    }
}

/// Up to `limit` candidates per still-unmatched payment, best first, ties in ledger order
pub(crate) fn suggest(
    state: &MatchState<'_>,
    limit: usize,
    similarity: &dyn NameSimilarity,
) -> Vec<PaymentSuggestions> {
    if limit == 0 {
        return Vec::new();
    }
    let free_ledger = state.free_ledger();

    state
        .free_payments()
        .into_iter()
        .filter_map(|payment| {
            let payment_record = &state.payments[payment];
            let mut ranked: Vec<(usize, MatchSuggestion)> = free_ledger
                .iter()
                .map(|ledger| {
                    (
                        *ledger,
                        score_candidate(&state.ledger[*ledger], payment_record, similarity),
                    )
                })
                .filter(|(_, suggestion)| suggestion.score > 0.0)
                .collect();
            ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
            ranked.truncate(limit);

            if ranked.is_empty() {
                return None;
            }
            Some(PaymentSuggestions {
                payment_record: payment_record.clone(),
                candidates: ranked.into_iter().map(|(_, suggestion)| suggestion).collect(),
            })
        })
        .collect()
}
