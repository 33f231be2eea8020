//! Reconciling a small sales ledger against a bank statement

use reconciliation_core::{
    AmountTolerance, LedgerRow, MatchType, PaymentRow, ReconciliationConfig, ReconciliationEngine,
};
use bigdecimal::BigDecimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reconciliation_core=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    println!("🧾 Reconciliation Core - Ledger vs Bank Statement\n");

    // 1. The sales ledger, as exported from the books
    let ledger = vec![
        LedgerRow::new()
            .with_invoice_no("1004")
            .with_details("Consulting services")
            .with_line("1", "20000")
            .with_date("2025-01-01"),
        LedgerRow::new()
            .with_invoice_no("1006")
            .with_details("Development work")
            .with_line("1", "7000")
            .with_date("2025-01-05"),
        LedgerRow::new()
            .with_invoice_no("INV-1010")
            .with_party_name("Acme Corp")
            .with_amount("2,500.00")
            .with_date("2025-01-08"),
        LedgerRow::new()
            .with_invoice_no("S-1")
            .with_party_name("Sharma Traders")
            .with_amount("1200.00"),
        LedgerRow::new()
            .with_invoice_no("S-2")
            .with_party_name("Sharma Traders")
            .with_amount("800.00"),
        LedgerRow::new()
            .with_invoice_no("INV-900")
            .with_details("Annual subscription premium")
            .with_line("1", "1500")
            .with_date("2025-02-01"),
        LedgerRow::new()
            .with_invoice_no("INV-911")
            .with_party_name("Initech")
            .with_amount("n/a"),
    ];

    // 2. The bank statement for the same period
    let payments = vec![
        PaymentRow::new()
            .with_reference("Invoice #1004 bank transfer")
            .with_amount("20000")
            .with_date("2025-01-11"),
        PaymentRow::new()
            .with_reference("Payment for invoice 1006")
            .with_amount("7000")
            .with_date("2025-01-16"),
        PaymentRow::new()
            .with_payer_name("ACME Co.")
            .with_amount("₹2,500")
            .with_date("2025-01-20"),
        PaymentRow::new()
            .with_reference("NEFT 88213")
            .with_payer_name("Sharma Traders")
            .with_amount("2000.00"),
        PaymentRow::new()
            .with_reference("Annual subscrptn premium by bank")
            .with_amount("1450")
            .with_date("2025-02-10"),
    ];

    // 3. Match embedded references and combined settlements too
    let config = ReconciliationConfig::new()
        .with_embedded_references(true)
        .with_combined_invoices(3)
        .with_tolerance_band(AmountTolerance::Absolute(BigDecimal::from(1)))
        .with_date_window(45);
    let engine = ReconciliationEngine::with_config(config)?;
    let report = engine.reconcile(&ledger, &payments)?;

    println!("\n✅ Matches:");
    for result in &report.matches {
        let (Some(invoice), Some(payment)) = (&result.ledger_record, &result.payment_record) else {
            continue;
        };
        let label = match result.match_type {
            MatchType::ExactReference => "exact",
            MatchType::EmbeddedReference => "embedded",
            MatchType::FuzzyNameAmount => "fuzzy",
            MatchType::AmountOnly => "amount",
            MatchType::Unmatched => "unmatched",
        };
        println!(
            "  ✓ [{:<8}] {:<10} ↔ {:<32} confidence {:.3}",
            label,
            invoice.invoice_no,
            payment.counterparty_label(),
            result.confidence
        );
        println!("      {}", result.explanation);
    }

    if !report.allocations.is_empty() {
        println!("\n🧩 Combined settlements:");
        for allocation in &report.allocations {
            println!(
                "  ✓ {} (confidence {:.3})",
                allocation.explanation, allocation.confidence
            );
        }
    }

    println!("\n❓ Needs review:");
    for entry in &report.suggestions {
        println!(
            "  • Payment '{}' of ₹{}",
            entry.payment_record.counterparty_label(),
            entry.payment_record.amount
        );
        for candidate in &entry.candidates {
            println!(
                "      → {} ({}) score {:.3}",
                candidate.ledger_record.invoice_no,
                candidate.ledger_record.counterparty_label(),
                candidate.score
            );
        }
    }
    for record in &report.unmatched_ledger {
        println!("  • Unpaid invoice {} for ₹{}", record.invoice_no, record.amount);
    }

    if report.has_data_quality_issues() {
        println!("\n⚠️  Excluded rows:");
        for note in &report.summary.data_quality {
            println!("  • {:?} row {} ({}): {}", note.side, note.row, note.identifier, note.reason);
        }
    }

    let summary = &report.summary;
    println!("\n📊 Summary:");
    println!("  Ledger records:   {}", summary.total_ledger);
    println!("  Payment records:  {}", summary.total_payments);
    println!("  Matched pairs:    {}", summary.matched);
    println!("  Allocations:      {}", summary.allocations);
    println!("  Match rate:       {:.1}%", summary.match_rate() * 100.0);
    println!("  Net variance:     ₹{}", summary.total_variance);

    println!("\n📄 Report as JSON:");
    println!("{}", serde_json::to_string_pretty(&report.summary)?);

    Ok(())
}
