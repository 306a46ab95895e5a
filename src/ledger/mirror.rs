//! Bank transactions that shadow payments

use crate::traits::Filter;
use crate::types::*;
use crate::utils::numbering::withdrawal_number;

/// Filter for the withdrawals linked to a payment
pub fn linked_withdrawals(payment_id: &str) -> Filter {
    Filter::new()
        .eq("reference_id", payment_id)
        .eq("type", TransactionType::Withdrawal.as_str())
}

/// Description for a mirrored withdrawal
pub fn withdrawal_description(
    payment: &Payment,
    creditor: Option<&Creditor>,
    bill: Option<&Bill>,
) -> String {
    let mut description = match creditor {
        Some(creditor) => format!("Payment to {}", creditor.name),
        None => format!("Payment {}", payment.payment_number),
    };
    if let Some(bill) = bill {
        description.push_str(" for bill ");
        description.push_str(&bill.bill_number);
    }
    description
}

/// Build the withdrawal mirroring `payment` on `account_id`
pub fn withdrawal_for(
    payment: &Payment,
    account_id: &str,
    creditor: Option<&Creditor>,
    bill: Option<&Bill>,
    category: &str,
) -> BankTransaction {
    let mut transaction = BankTransaction::new(
        payment.business_id.clone(),
        account_id.to_string(),
        withdrawal_number(&payment.payment_number),
        TransactionType::Withdrawal,
        payment.amount.clone(),
        payment.date,
        withdrawal_description(payment, creditor, bill),
        category.to_string(),
    );
    transaction.reference_id = Some(payment.id.clone());
    transaction
}

/// Bring an existing withdrawal in line with an amended payment
///
/// Amount, account, date and description follow the payment; the
/// transaction number and reconciliation flag are kept.
pub fn refreshed_withdrawal(
    existing: &BankTransaction,
    payment: &Payment,
    account_id: &str,
    creditor: Option<&Creditor>,
    bill: Option<&Bill>,
) -> BankTransaction {
    BankTransaction {
        account_id: account_id.to_string(),
        amount: payment.amount.clone(),
        date: payment.date,
        description: withdrawal_description(payment, creditor, bill),
        ..existing.clone()
    }
}
