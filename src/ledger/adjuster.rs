//! Ledger adjuster that keeps creditor balances and mirrored bank
//! transactions consistent with payments and purchases

use bigdecimal::BigDecimal;
use tracing::{debug, error, warn};

use crate::config::{FailurePolicy, LedgerConfig};
use crate::ledger::creditors::CreditorBook;
use crate::ledger::journal::CompensationJournal;
use crate::session::BusinessSession;
use crate::traits::*;
use crate::types::*;
use crate::utils::numbering::{next_number, NumberSeries};

/// Applies the bookkeeping side effects of payment and purchase lifecycle
/// events on top of a [`PersistenceGateway`]
///
/// Each operation re-reads current balances before writing, so nothing is
/// cached between calls. Operations are sequences of independent gateway
/// calls: two concurrent operations against the same creditor can lose an
/// update, and a failure part way through is handled according to
/// [`LedgerConfig::failure_policy`].
pub struct LedgerAdjuster<G: PersistenceGateway> {
    pub(crate) gateway: G,
    pub(crate) config: LedgerConfig,
    pub(crate) book: CreditorBook,
    pub(crate) validator: Box<dyn DraftValidator>,
}

impl<G: PersistenceGateway> LedgerAdjuster<G> {
    /// Create an adjuster with the default configuration
    pub fn new(gateway: G) -> Self {
        Self::with_config(gateway, LedgerConfig::default())
    }

    pub fn with_config(gateway: G, config: LedgerConfig) -> Self {
        Self::with_validator(gateway, config, Box::new(DefaultDraftValidator))
    }

    /// Create an adjuster with a custom draft validator
    pub fn with_validator(
        gateway: G,
        config: LedgerConfig,
        validator: Box<dyn DraftValidator>,
    ) -> Self {
        Self {
            gateway,
            book: CreditorBook::new(config.balance_floor),
            config,
            validator,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Insert a supporting record (creditor, bill, bank account) for the
    /// session's business
    pub async fn insert_record<R: Record>(
        &mut self,
        session: &BusinessSession,
        record: R,
    ) -> LedgerResult<R> {
        let business_id = session.business_id()?;
        if record.business_id() != business_id {
            return Err(LedgerError::Validation(format!(
                "Record {} belongs to business {}, not {}",
                record.id(),
                record.business_id(),
                business_id
            )));
        }
        self.gateway.insert(&record).await
    }

    /// Fetch a record of the session's business, failing if it is missing
    pub async fn fetch<R: Record>(&self, session: &BusinessSession, id: &str) -> LedgerResult<R> {
        self.require(session.business_id()?, id).await
    }

    /// Current outstanding balance of a creditor
    pub async fn creditor_balance(
        &self,
        session: &BusinessSession,
        creditor_id: &str,
    ) -> LedgerResult<BigDecimal> {
        let creditor: Creditor = self.fetch(session, creditor_id).await?;
        Ok(creditor.outstanding_amount)
    }

    /// Withdrawals mirroring a payment
    pub async fn linked_withdrawals(
        &self,
        session: &BusinessSession,
        payment_id: &str,
    ) -> LedgerResult<Vec<BankTransaction>> {
        self.gateway
            .select(
                session.business_id()?,
                &crate::ledger::mirror::linked_withdrawals(payment_id),
            )
            .await
    }

    pub(crate) async fn require<R: Record>(&self, business_id: &str, id: &str) -> LedgerResult<R> {
        self.gateway
            .get(business_id, id)
            .await?
            .ok_or_else(|| LedgerError::not_found(R::TABLE, id))
    }

    /// Resolve an optional reference, failing if it is set but missing
    pub(crate) async fn require_optional<R: Record>(
        &self,
        business_id: &str,
        id: Option<&str>,
    ) -> LedgerResult<Option<R>> {
        match id {
            Some(id) => Ok(Some(self.require(business_id, id).await?)),
            None => Ok(None),
        }
    }

    /// Re-read a creditor, apply a balance rule and write it back
    pub(crate) async fn adjust_creditor<F>(
        &mut self,
        business_id: &str,
        creditor_id: &str,
        journal: &mut CompensationJournal,
        apply: F,
    ) -> LedgerResult<Creditor>
    where
        F: FnOnce(&CreditorBook, &BigDecimal) -> BigDecimal + Send,
    {
        let mut creditor: Creditor = self.require(business_id, creditor_id).await?;
        let previous = creditor.clone();

        creditor.outstanding_amount = apply(&self.book, &previous.outstanding_amount);
        creditor.updated_at = chrono::Utc::now().naive_utc();
        debug!(
            business_id,
            creditor_id,
            operation = journal.operation(),
            from = %previous.outstanding_amount,
            to = %creditor.outstanding_amount,
            "adjusting creditor balance"
        );

        let stored = self.gateway.update(&creditor).await?;
        journal.updated(previous);
        Ok(stored)
    }

    /// Pick the document number for a new or amended record
    ///
    /// A requested number must not be used by another record of the
    /// business. Without one, an amended record keeps its number and a new
    /// record gets the next number in the series.
    pub(crate) async fn document_number<R: Record>(
        &self,
        business_id: &str,
        series: NumberSeries,
        requested: Option<&str>,
        current: Option<&R>,
        number_of: fn(&R) -> &str,
    ) -> LedgerResult<String> {
        match (requested, current) {
            (Some(number), Some(current)) if number == number_of(current) => {
                Ok(number.to_string())
            }
            (Some(number), current) => {
                let clashes: Vec<R> = self
                    .gateway
                    .select(business_id, &Filter::new().eq(series.column, number))
                    .await?;
                let current_id = current.map(|r| r.id());
                if clashes.iter().any(|r| Some(r.id()) != current_id) {
                    return Err(LedgerError::Validation(format!(
                        "{} {} is already in use",
                        series.label, number
                    )));
                }
                Ok(number.to_string())
            }
            (None, Some(current)) => Ok(number_of(current).to_string()),
            (None, None) => {
                let existing: Vec<R> = self.gateway.select(business_id, &Filter::new()).await?;
                next_number(series.prefix, existing.iter().map(number_of))
            }
        }
    }

    /// Resolve an operation's result against the failure policy
    pub(crate) async fn finish<T>(
        &mut self,
        journal: CompensationJournal,
        result: LedgerResult<T>,
    ) -> LedgerResult<T> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if journal.is_empty() {
            return Err(error);
        }

        match self.config.failure_policy {
            FailurePolicy::LeaveApplied => {
                warn!(
                    operation = journal.operation(),
                    applied = journal.len(),
                    error = %error,
                    "ledger operation failed; applied steps were left in place"
                );
            }
            FailurePolicy::Compensate => {
                warn!(
                    operation = journal.operation(),
                    applied = journal.len(),
                    error = %error,
                    "ledger operation failed; compensating applied steps"
                );
                let operation = journal.operation();
                let failed = journal.unwind(&mut self.gateway).await;
                if failed > 0 {
                    error!(operation, failed, "compensation left steps applied");
                }
            }
        }

        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_gateway::MemoryGateway;
    use crate::utils::numbering::PAYMENT_SERIES;
    use chrono::NaiveDate;

    fn payment_number(payment: &Payment) -> &str {
        &payment.payment_number
    }

    fn session() -> BusinessSession {
        BusinessSession::with_ttl("biz".to_string(), chrono::Duration::hours(1))
    }

    #[tokio::test]
    async fn test_document_numbers_are_allocated_and_checked() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let first = adjuster
            .document_number::<Payment>("biz", PAYMENT_SERIES, None, None, payment_number)
            .await
            .unwrap();
        assert_eq!(first, "PAY-0001");

        let payment = PaymentDraft::new(date, BigDecimal::from(10)).into_payment("biz", first);
        adjuster.gateway.insert(&payment).await.unwrap();

        let next = adjuster
            .document_number::<Payment>("biz", PAYMENT_SERIES, None, None, payment_number)
            .await
            .unwrap();
        assert_eq!(next, "PAY-0002");

        let clash = adjuster
            .document_number::<Payment>(
                "biz",
                PAYMENT_SERIES,
                Some("PAY-0001"),
                None,
                payment_number,
            )
            .await;
        assert!(matches!(clash, Err(LedgerError::Validation(_))));

        let kept = adjuster
            .document_number(
                "biz",
                PAYMENT_SERIES,
                Some("PAY-0001"),
                Some(&payment),
                payment_number,
            )
            .await
            .unwrap();
        assert_eq!(kept, "PAY-0001");
    }

    #[tokio::test]
    async fn test_insert_record_checks_tenant() {
        let mut adjuster = LedgerAdjuster::new(MemoryGateway::new());
        let session = session();

        let foreign = Creditor::new("other".to_string(), "Elsewhere Ltd".to_string());
        assert!(matches!(
            adjuster.insert_record(&session, foreign).await,
            Err(LedgerError::Validation(_))
        ));

        let own = Creditor::new("biz".to_string(), "Local Ltd".to_string());
        let own = adjuster.insert_record(&session, own).await.unwrap();
        assert_eq!(
            adjuster.creditor_balance(&session, &own.id).await.unwrap(),
            BigDecimal::from(0)
        );

        assert!(matches!(
            adjuster.creditor_balance(&session, "missing").await,
            Err(LedgerError::NotFound {
                table: Table::Creditors,
                ..
            })
        ));
    }
}
