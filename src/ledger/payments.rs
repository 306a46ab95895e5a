//! Payment lifecycle: creditor settlement, bill status and bank mirroring

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PaymentDeletePolicy;
use crate::ledger::journal::CompensationJournal;
use crate::ledger::mirror;
use crate::ledger::LedgerAdjuster;
use crate::session::BusinessSession;
use crate::traits::*;
use crate::types::*;
use crate::utils::numbering::PAYMENT_SERIES;

/// Result of recording or amending a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    /// The payment as stored
    pub payment: Payment,
    /// The withdrawal mirroring the payment, when mirroring is on
    pub bank_transaction: Option<BankTransaction>,
    /// Whether this call moved the referenced bill to `PAID`
    pub bill_marked_paid: bool,
}

fn payment_number(payment: &Payment) -> &str {
    &payment.payment_number
}

impl<G: PersistenceGateway> LedgerAdjuster<G> {
    /// Record a payment and apply its side effects
    ///
    /// The payment row is inserted before anything that refers to it. Then,
    /// in order: the creditor's balance is settled by the amount (floored
    /// at zero), a referenced bill whose total the amount covers is marked
    /// `PAID`, and a withdrawal is created when mirroring is requested.
    /// Partial payments never change a bill's status.
    ///
    /// Referenced creditor, bill and bank account must exist; if one does
    /// not, nothing is written.
    pub async fn apply_payment_create(
        &mut self,
        session: &BusinessSession,
        draft: PaymentDraft,
    ) -> LedgerResult<PaymentOutcome> {
        self.validator.validate_payment(&draft)?;
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("payment_create");
        let result = self
            .create_payment_steps(business_id, draft, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    /// Amend a stored payment and reconcile its side effects
    ///
    /// With the same creditor, the balance is settled by the change in
    /// amount (floored at zero). When the creditor changes, the old
    /// creditor gets the old amount back and the new creditor is settled by
    /// the new amount. The mirrored withdrawal is updated in place, created,
    /// or deleted to match the payment's mirroring flag.
    pub async fn apply_payment_amend(
        &mut self,
        session: &BusinessSession,
        payment_id: &str,
        draft: PaymentDraft,
    ) -> LedgerResult<PaymentOutcome> {
        self.validator.validate_payment(&draft)?;
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("payment_amend");
        let result = self
            .amend_payment_steps(business_id, payment_id, draft, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    /// Delete a payment and its mirrored withdrawals
    ///
    /// Linked withdrawals go first so no transaction is left pointing at a
    /// missing payment. The creditor's balance is only restored under
    /// [`PaymentDeletePolicy::RestoreBalance`].
    pub async fn apply_payment_delete(
        &mut self,
        session: &BusinessSession,
        payment_id: &str,
    ) -> LedgerResult<Payment> {
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("payment_delete");
        let result = self
            .delete_payment_steps(business_id, payment_id, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    async fn create_payment_steps(
        &mut self,
        business_id: &str,
        draft: PaymentDraft,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<PaymentOutcome> {
        let creditor: Option<Creditor> = self
            .require_optional(business_id, draft.creditor_id.as_deref())
            .await?;
        let bill: Option<Bill> = self
            .require_optional(business_id, draft.bill_id.as_deref())
            .await?;
        self.require_optional::<BankAccount>(business_id, draft.bank_account_id.as_deref())
            .await?;

        let number = self
            .document_number::<Payment>(
                business_id,
                PAYMENT_SERIES,
                draft.payment_number.as_deref(),
                None,
                payment_number,
            )
            .await?;
        let payment = self
            .gateway
            .insert(&draft.into_payment(business_id, number))
            .await?;
        journal.inserted(payment.clone());

        if let Some(ref creditor_id) = payment.creditor_id {
            let amount = payment.amount.clone();
            self.adjust_creditor(business_id, creditor_id, journal, |book, balance| {
                book.settle(balance, &amount)
            })
            .await?;
        }

        let mut bill_marked_paid = false;
        if let Some(ref bill) = bill {
            if bill.status == BillStatus::Pending && payment.amount >= bill.total_amount {
                let paid = Bill {
                    status: BillStatus::Paid,
                    ..bill.clone()
                };
                self.gateway.update(&paid).await?;
                journal.updated(bill.clone());
                bill_marked_paid = true;
            }
        }

        let bank_transaction = match payment.bank_account_id.as_deref() {
            Some(account_id) if payment.mirrors_to_bank() => {
                let withdrawal = mirror::withdrawal_for(
                    &payment,
                    account_id,
                    creditor.as_ref(),
                    bill.as_ref(),
                    &self.config.withdrawal_category,
                );
                let stored = self.gateway.insert(&withdrawal).await?;
                journal.inserted(stored.clone());
                Some(stored)
            }
            _ => None,
        };

        info!(
            business_id,
            payment_id = %payment.id,
            payment_number = %payment.payment_number,
            amount = %payment.amount,
            mirrored = bank_transaction.is_some(),
            bill_marked_paid,
            "payment recorded"
        );

        Ok(PaymentOutcome {
            payment,
            bank_transaction,
            bill_marked_paid,
        })
    }

    async fn amend_payment_steps(
        &mut self,
        business_id: &str,
        payment_id: &str,
        draft: PaymentDraft,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<PaymentOutcome> {
        let old: Payment = self.require(business_id, payment_id).await?;
        let creditor: Option<Creditor> = self
            .require_optional(business_id, draft.creditor_id.as_deref())
            .await?;
        let bill: Option<Bill> = self
            .require_optional(business_id, draft.bill_id.as_deref())
            .await?;
        self.require_optional::<BankAccount>(business_id, draft.bank_account_id.as_deref())
            .await?;

        let number = self
            .document_number(
                business_id,
                PAYMENT_SERIES,
                draft.payment_number.as_deref(),
                Some(&old),
                payment_number,
            )
            .await?;
        let payment = self.gateway.update(&old.amended(draft, number)).await?;
        journal.updated(old.clone());

        self.reconcile_payment_creditors(business_id, &old, &payment, journal)
            .await?;
        let bank_transaction = self
            .reconcile_withdrawal(
                business_id,
                &payment,
                creditor.as_ref(),
                bill.as_ref(),
                journal,
            )
            .await?;

        info!(
            business_id,
            payment_id = %payment.id,
            old_amount = %old.amount,
            new_amount = %payment.amount,
            mirrored = bank_transaction.is_some(),
            "payment amended"
        );

        Ok(PaymentOutcome {
            payment,
            bank_transaction,
            bill_marked_paid: false,
        })
    }

    async fn reconcile_payment_creditors(
        &mut self,
        business_id: &str,
        old: &Payment,
        new: &Payment,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<()> {
        match (old.creditor_id.as_deref(), new.creditor_id.as_deref()) {
            (Some(previous), Some(next)) if previous == next => {
                let delta = &new.amount - &old.amount;
                if delta != BigDecimal::from(0) {
                    self.adjust_creditor(business_id, next, journal, |book, balance| {
                        book.settle(balance, &delta)
                    })
                    .await?;
                }
            }
            (previous, next) => {
                if let Some(previous) = previous {
                    let amount = old.amount.clone();
                    self.adjust_creditor(business_id, previous, journal, |book, balance| {
                        book.refund(balance, &amount)
                    })
                    .await?;
                }
                if let Some(next) = next {
                    let amount = new.amount.clone();
                    self.adjust_creditor(business_id, next, journal, |book, balance| {
                        book.settle(balance, &amount)
                    })
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Make the payment's mirrored withdrawal match its current state
    async fn reconcile_withdrawal(
        &mut self,
        business_id: &str,
        payment: &Payment,
        creditor: Option<&Creditor>,
        bill: Option<&Bill>,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<Option<BankTransaction>> {
        let linked: Vec<BankTransaction> = self
            .gateway
            .select(business_id, &mirror::linked_withdrawals(&payment.id))
            .await?;

        let account_id = match payment.bank_account_id.as_deref() {
            Some(account_id) if payment.mirrors_to_bank() => account_id,
            _ => {
                for withdrawal in linked {
                    self.remove_withdrawal(business_id, withdrawal, journal)
                        .await?;
                }
                return Ok(None);
            }
        };

        let mut linked = linked.into_iter();
        let stored = match linked.next() {
            Some(existing) => {
                let refreshed =
                    mirror::refreshed_withdrawal(&existing, payment, account_id, creditor, bill);
                let stored = self.gateway.update(&refreshed).await?;
                journal.updated(existing);
                stored
            }
            None => {
                let withdrawal = mirror::withdrawal_for(
                    payment,
                    account_id,
                    creditor,
                    bill,
                    &self.config.withdrawal_category,
                );
                let stored = self.gateway.insert(&withdrawal).await?;
                journal.inserted(stored.clone());
                stored
            }
        };

        // Only one withdrawal may shadow a payment
        for duplicate in linked {
            self.remove_withdrawal(business_id, duplicate, journal)
                .await?;
        }

        Ok(Some(stored))
    }

    async fn remove_withdrawal(
        &mut self,
        business_id: &str,
        withdrawal: BankTransaction,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<()> {
        self.gateway
            .delete::<BankTransaction>(business_id, &withdrawal.id)
            .await?;
        journal.deleted(withdrawal);
        Ok(())
    }

    async fn delete_payment_steps(
        &mut self,
        business_id: &str,
        payment_id: &str,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<Payment> {
        let payment: Payment = self.require(business_id, payment_id).await?;

        let linked: Vec<BankTransaction> = self
            .gateway
            .select(business_id, &mirror::linked_withdrawals(&payment.id))
            .await?;
        for withdrawal in linked {
            self.remove_withdrawal(business_id, withdrawal, journal)
                .await?;
        }

        self.gateway
            .delete::<Payment>(business_id, &payment.id)
            .await?;
        journal.deleted(payment.clone());

        if let (PaymentDeletePolicy::RestoreBalance, Some(creditor_id)) = (
            self.config.payment_delete_policy,
            payment.creditor_id.as_deref(),
        ) {
            let amount = payment.amount.clone();
            self.adjust_creditor(business_id, creditor_id, journal, |book, balance| {
                book.refund(balance, &amount)
            })
            .await?;
        }

        info!(
            business_id,
            payment_id = %payment.id,
            policy = ?self.config.payment_delete_policy,
            "payment deleted"
        );

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_gateway::{GatewayOp, MemoryGateway};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    fn session() -> BusinessSession {
        BusinessSession::with_ttl("biz".to_string(), chrono::Duration::hours(1))
    }

    async fn creditor_with_balance(
        adjuster: &mut LedgerAdjuster<MemoryGateway>,
        balance: i64,
    ) -> Creditor {
        let creditor = Creditor::new("biz".to_string(), "Northwind Supply".to_string())
            .with_opening_balance(BigDecimal::from(balance));
        adjuster.insert_record(&session(), creditor).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_reference_writes_nothing() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let draft =
            PaymentDraft::new(date(), BigDecimal::from(50)).creditor(Some("ghost".to_string()));

        let result = adjuster.apply_payment_create(&session(), draft).await;

        assert!(matches!(
            result,
            Err(LedgerError::NotFound {
                table: Table::Creditors,
                ..
            })
        ));
        assert_eq!(adjuster.gateway().row_count(Table::Payments), 0);
    }

    #[tokio::test]
    async fn test_validation_runs_before_gateway_calls() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let draft = PaymentDraft::new(date(), BigDecimal::from(0));

        assert!(matches!(
            adjuster.apply_payment_create(&session(), draft).await,
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(
            adjuster
                .gateway()
                .call_count(Table::Payments, GatewayOp::Insert),
            0
        );
    }

    #[tokio::test]
    async fn test_amend_moves_payment_between_creditors() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let first = creditor_with_balance(&mut adjuster, 500).await;
        let second = creditor_with_balance(&mut adjuster, 100).await;

        let outcome = adjuster
            .apply_payment_create(
                &session(),
                PaymentDraft::new(date(), BigDecimal::from(200)).creditor(Some(first.id.clone())),
            )
            .await
            .unwrap();
        assert_eq!(outcome.payment.payment_number, "PAY-0001");

        let draft = PaymentDraft::from_payment(&outcome.payment)
            .creditor(Some(second.id.clone()))
            .amount(BigDecimal::from(150));
        adjuster
            .apply_payment_amend(&session(), &outcome.payment.id, draft)
            .await
            .unwrap();

        // First creditor gets the old amount back; second is settled by the new one
        assert_eq!(
            adjuster.creditor_balance(&session(), &first.id).await.unwrap(),
            BigDecimal::from(500)
        );
        assert_eq!(
            adjuster
                .creditor_balance(&session(), &second.id)
                .await
                .unwrap(),
            BigDecimal::from(0)
        );
    }

    #[tokio::test]
    async fn test_reducing_amount_raises_balance_again() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let creditor = creditor_with_balance(&mut adjuster, 400).await;

        let outcome = adjuster
            .apply_payment_create(
                &session(),
                PaymentDraft::new(date(), BigDecimal::from(300)).creditor(Some(creditor.id.clone())),
            )
            .await
            .unwrap();

        let draft = PaymentDraft::from_payment(&outcome.payment).amount(BigDecimal::from(100));
        adjuster
            .apply_payment_amend(&session(), &outcome.payment.id, draft)
            .await
            .unwrap();

        assert_eq!(
            adjuster
                .creditor_balance(&session(), &creditor.id)
                .await
                .unwrap(),
            BigDecimal::from(300)
        );
    }

    #[tokio::test]
    async fn test_amend_repairs_duplicate_withdrawals() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let account = adjuster
            .insert_record(
                &session(),
                BankAccount::new("biz".to_string(), "Operating".to_string(), "001".to_string()),
            )
            .await
            .unwrap();

        let outcome = adjuster
            .apply_payment_create(
                &session(),
                PaymentDraft::new(date(), BigDecimal::from(80)).mirror_to_bank(account.id.clone()),
            )
            .await
            .unwrap();

        let mut duplicate = outcome.bank_transaction.clone().unwrap();
        duplicate.id = "duplicate".to_string();
        adjuster.insert_record(&session(), duplicate).await.unwrap();
        assert_eq!(
            adjuster
                .linked_withdrawals(&session(), &outcome.payment.id)
                .await
                .unwrap()
                .len(),
            2
        );

        let draft = PaymentDraft::from_payment(&outcome.payment).amount(BigDecimal::from(90));
        adjuster
            .apply_payment_amend(&session(), &outcome.payment.id, draft)
            .await
            .unwrap();

        let linked = adjuster
            .linked_withdrawals(&session(), &outcome.payment.id)
            .await
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].amount, BigDecimal::from(90));
    }
}
