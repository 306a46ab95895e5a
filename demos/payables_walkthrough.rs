//! Payables walkthrough: a purchase, a mirrored payment and an amendment

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use payables_ledger::utils::MemoryGateway;
use payables_ledger::{
    BankAccount, Bill, BusinessSession, Creditor, LedgerAdjuster, LedgerConfig, PaymentDraft,
    PurchaseDraft,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🧾 Payables Ledger - Walkthrough\n");

    let config = LedgerConfig::default();
    let session = BusinessSession::select("demo-business".to_string(), &config)?;
    let mut adjuster = LedgerAdjuster::with_config(MemoryGateway::new(), config);

    // 1. Supporting records
    let creditor = adjuster
        .insert_record(
            &session,
            Creditor::new("demo-business".to_string(), "Harbor Timber".to_string()),
        )
        .await?;
    let account = adjuster
        .insert_record(
            &session,
            BankAccount::new(
                "demo-business".to_string(),
                "Current Account".to_string(),
                "0012-4410".to_string(),
            ),
        )
        .await?;
    let bill = adjuster
        .insert_record(
            &session,
            Bill::new(
                "demo-business".to_string(),
                "INV-881".to_string(),
                BigDecimal::from(200),
                BigDecimal::from(0),
                NaiveDate::from_ymd_opt(2024, 7, 31).ok_or("invalid date")?,
            ),
        )
        .await?;
    println!("  ✓ Creditor: {} (owed {})", creditor.name, creditor.outstanding_amount);

    // 2. A purchase on credit
    let purchase = adjuster
        .apply_purchase_create(
            &session,
            PurchaseDraft::new(
                NaiveDate::from_ymd_opt(2024, 7, 1).ok_or("invalid date")?,
                "Pine planks".to_string(),
                BigDecimal::from(5),
                BigDecimal::from(100),
            )
            .creditor(Some(creditor.id.clone())),
        )
        .await?;
    println!(
        "  ✓ {}: {} x {} = {}",
        purchase.purchase_number, purchase.quantity, purchase.unit_price, purchase.total_price
    );
    println!(
        "    Owed to {}: {}",
        creditor.name,
        adjuster.creditor_balance(&session, &creditor.id).await?
    );

    // 3. A payment against the bill, mirrored on the bank account
    let outcome = adjuster
        .apply_payment_create(
            &session,
            PaymentDraft::new(
                NaiveDate::from_ymd_opt(2024, 7, 2).ok_or("invalid date")?,
                BigDecimal::from(200),
            )
            .creditor(Some(creditor.id.clone()))
            .bill(Some(bill.id.clone()))
            .mirror_to_bank(account.id.clone()),
        )
        .await?;
    println!(
        "  ✓ {} for {} (bill paid: {})",
        outcome.payment.payment_number, outcome.payment.amount, outcome.bill_marked_paid
    );
    if let Some(ref withdrawal) = outcome.bank_transaction {
        println!(
            "    Mirrored as {}: {} ({})",
            withdrawal.transaction_number, withdrawal.amount, withdrawal.description
        );
    }
    println!(
        "    Owed to {}: {}",
        creditor.name,
        adjuster.creditor_balance(&session, &creditor.id).await?
    );

    // 4. Amend the payment amount
    let draft = PaymentDraft::from_payment(&outcome.payment).amount(BigDecimal::from(350));
    let amended = adjuster
        .apply_payment_amend(&session, &outcome.payment.id, draft)
        .await?;
    println!("  ✓ Amended {} to {}", amended.payment.payment_number, amended.payment.amount);
    for withdrawal in adjuster
        .linked_withdrawals(&session, &amended.payment.id)
        .await?
    {
        println!("    Mirror now {}: {}", withdrawal.transaction_number, withdrawal.amount);
    }
    println!(
        "    Owed to {}: {}",
        creditor.name,
        adjuster.creditor_balance(&session, &creditor.id).await?
    );

    // 5. Delete the payment
    adjuster
        .apply_payment_delete(&session, &amended.payment.id)
        .await?;
    println!(
        "  ✓ Deleted {}; mirrored withdrawals left: {}",
        amended.payment.payment_number,
        adjuster
            .linked_withdrawals(&session, &amended.payment.id)
            .await?
            .len()
    );

    Ok(())
}
