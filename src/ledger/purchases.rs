//! Purchase lifecycle: creditor payable balances

use bigdecimal::BigDecimal;
use tracing::info;

use crate::config::PurchaseDeletePolicy;
use crate::ledger::journal::CompensationJournal;
use crate::ledger::LedgerAdjuster;
use crate::session::BusinessSession;
use crate::traits::*;
use crate::types::*;
use crate::utils::numbering::PURCHASE_SERIES;

fn purchase_number(purchase: &Purchase) -> &str {
    &purchase.purchase_number
}

impl<G: PersistenceGateway> LedgerAdjuster<G> {
    /// Record a purchase and raise its creditor's balance by the total
    ///
    /// Purchases never create bank transactions.
    pub async fn apply_purchase_create(
        &mut self,
        session: &BusinessSession,
        draft: PurchaseDraft,
    ) -> LedgerResult<Purchase> {
        self.validator.validate_purchase(&draft)?;
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("purchase_create");
        let result = self
            .create_purchase_steps(business_id, draft, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    /// Amend a stored purchase, recomputing its total
    ///
    /// With the same creditor the balance moves by the change in total.
    /// When the creditor changes, the old total leaves the old creditor
    /// (floored at zero) and the new total is added to the new creditor.
    pub async fn apply_purchase_amend(
        &mut self,
        session: &BusinessSession,
        purchase_id: &str,
        draft: PurchaseDraft,
    ) -> LedgerResult<Purchase> {
        self.validator.validate_purchase(&draft)?;
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("purchase_amend");
        let result = self
            .amend_purchase_steps(business_id, purchase_id, draft, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    /// Delete a purchase; see [`PurchaseDeletePolicy`] for the balance effect
    pub async fn apply_purchase_delete(
        &mut self,
        session: &BusinessSession,
        purchase_id: &str,
    ) -> LedgerResult<Purchase> {
        let business_id = session.business_id()?;

        let mut journal = CompensationJournal::new("purchase_delete");
        let result = self
            .delete_purchase_steps(business_id, purchase_id, &mut journal)
            .await;
        self.finish(journal, result).await
    }

    async fn create_purchase_steps(
        &mut self,
        business_id: &str,
        draft: PurchaseDraft,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<Purchase> {
        self.require_optional::<Creditor>(business_id, draft.creditor_id.as_deref())
            .await?;

        let number = self
            .document_number::<Purchase>(
                business_id,
                PURCHASE_SERIES,
                draft.purchase_number.as_deref(),
                None,
                purchase_number,
            )
            .await?;
        let purchase = self
            .gateway
            .insert(&draft.into_purchase(business_id, number))
            .await?;
        journal.inserted(purchase.clone());

        if let Some(ref creditor_id) = purchase.creditor_id {
            let total = purchase.total_price.clone();
            self.adjust_creditor(business_id, creditor_id, journal, |book, balance| {
                book.charge(balance, &total)
            })
            .await?;
        }

        info!(
            business_id,
            purchase_id = %purchase.id,
            purchase_number = %purchase.purchase_number,
            total_price = %purchase.total_price,
            "purchase recorded"
        );

        Ok(purchase)
    }

    async fn amend_purchase_steps(
        &mut self,
        business_id: &str,
        purchase_id: &str,
        draft: PurchaseDraft,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<Purchase> {
        let old: Purchase = self.require(business_id, purchase_id).await?;
        self.require_optional::<Creditor>(business_id, draft.creditor_id.as_deref())
            .await?;

        let number = self
            .document_number(
                business_id,
                PURCHASE_SERIES,
                draft.purchase_number.as_deref(),
                Some(&old),
                purchase_number,
            )
            .await?;
        let purchase = self.gateway.update(&old.amended(draft, number)).await?;
        journal.updated(old.clone());

        match (old.creditor_id.as_deref(), purchase.creditor_id.as_deref()) {
            (Some(previous), Some(next)) if previous == next => {
                let delta = &purchase.total_price - &old.total_price;
                if delta != BigDecimal::from(0) {
                    self.adjust_creditor(business_id, next, journal, |book, balance| {
                        book.adjust(balance, &delta)
                    })
                    .await?;
                }
            }
            (previous, next) => {
                if let Some(previous) = previous {
                    let total = old.total_price.clone();
                    self.adjust_creditor(business_id, previous, journal, |book, balance| {
                        book.release(balance, &total)
                    })
                    .await?;
                }
                if let Some(next) = next {
                    let total = purchase.total_price.clone();
                    self.adjust_creditor(business_id, next, journal, |book, balance| {
                        book.charge(balance, &total)
                    })
                    .await?;
                }
            }
        }

        info!(
            business_id,
            purchase_id = %purchase.id,
            old_total = %old.total_price,
            new_total = %purchase.total_price,
            "purchase amended"
        );

        Ok(purchase)
    }

    async fn delete_purchase_steps(
        &mut self,
        business_id: &str,
        purchase_id: &str,
        journal: &mut CompensationJournal,
    ) -> LedgerResult<Purchase> {
        let purchase: Purchase = self.require(business_id, purchase_id).await?;

        self.gateway
            .delete::<Purchase>(business_id, &purchase.id)
            .await?;
        journal.deleted(purchase.clone());

        if let (PurchaseDeletePolicy::ReverseBalance, Some(creditor_id)) = (
            self.config.purchase_delete_policy,
            purchase.creditor_id.as_deref(),
        ) {
            let total = purchase.total_price.clone();
            self.adjust_creditor(business_id, creditor_id, journal, |book, balance| {
                book.release(balance, &total)
            })
            .await?;
        }

        info!(
            business_id,
            purchase_id = %purchase.id,
            policy = ?self.config.purchase_delete_policy,
            "purchase deleted"
        );

        Ok(purchase)
    }
}
