//! Record of the writes a ledger operation has applied, for compensation

use tracing::{debug, error};

use crate::traits::*;
use crate::types::*;

/// A row touched by a ledger operation
#[derive(Debug, Clone, PartialEq)]
pub enum JournalRow {
    Creditor(Creditor),
    Bill(Bill),
    Payment(Payment),
    Purchase(Purchase),
    Transaction(BankTransaction),
}

impl JournalRow {
    pub fn table(&self) -> Table {
        match self {
            JournalRow::Creditor(_) => Table::Creditors,
            JournalRow::Bill(_) => Table::Bills,
            JournalRow::Payment(_) => Table::Payments,
            JournalRow::Purchase(_) => Table::Purchases,
            JournalRow::Transaction(_) => Table::Transactions,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            JournalRow::Creditor(r) => &r.id,
            JournalRow::Bill(r) => &r.id,
            JournalRow::Payment(r) => &r.id,
            JournalRow::Purchase(r) => &r.id,
            JournalRow::Transaction(r) => &r.id,
        }
    }
}

impl From<Creditor> for JournalRow {
    fn from(row: Creditor) -> Self {
        JournalRow::Creditor(row)
    }
}

impl From<Bill> for JournalRow {
    fn from(row: Bill) -> Self {
        JournalRow::Bill(row)
    }
}

impl From<Payment> for JournalRow {
    fn from(row: Payment) -> Self {
        JournalRow::Payment(row)
    }
}

impl From<Purchase> for JournalRow {
    fn from(row: Purchase) -> Self {
        JournalRow::Purchase(row)
    }
}

impl From<BankTransaction> for JournalRow {
    fn from(row: BankTransaction) -> Self {
        JournalRow::Transaction(row)
    }
}

/// Kind of write that was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Row was inserted; undo deletes it
    Inserted,
    /// Row was overwritten; the journal holds its previous state
    Updated,
    /// Row was deleted; the journal holds it for re-insertion
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalStep {
    pub kind: StepKind,
    pub row: JournalRow,
}

async fn undo_record<G: PersistenceGateway, R: Record>(
    gateway: &mut G,
    kind: StepKind,
    record: &R,
) -> LedgerResult<()> {
    match kind {
        StepKind::Inserted => {
            gateway
                .delete::<R>(record.business_id(), record.id())
                .await
        }
        StepKind::Updated => gateway.update(record).await.map(|_| ()),
        StepKind::Deleted => gateway.insert(record).await.map(|_| ()),
    }
}

impl JournalStep {
    async fn undo<G: PersistenceGateway>(&self, gateway: &mut G) -> LedgerResult<()> {
        match &self.row {
            JournalRow::Creditor(r) => undo_record(gateway, self.kind, r).await,
            JournalRow::Bill(r) => undo_record(gateway, self.kind, r).await,
            JournalRow::Payment(r) => undo_record(gateway, self.kind, r).await,
            JournalRow::Purchase(r) => undo_record(gateway, self.kind, r).await,
            JournalRow::Transaction(r) => undo_record(gateway, self.kind, r).await,
        }
    }
}

/// Ordered log of the writes applied by one ledger operation
#[derive(Debug, Clone, PartialEq)]
pub struct CompensationJournal {
    operation: &'static str,
    steps: Vec<JournalStep>,
}

impl CompensationJournal {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn steps(&self) -> &[JournalStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn inserted(&mut self, row: impl Into<JournalRow>) {
        self.push(StepKind::Inserted, row.into());
    }

    /// Record an overwrite, given the row as it was before
    pub fn updated(&mut self, previous: impl Into<JournalRow>) {
        self.push(StepKind::Updated, previous.into());
    }

    pub fn deleted(&mut self, row: impl Into<JournalRow>) {
        self.push(StepKind::Deleted, row.into());
    }

    fn push(&mut self, kind: StepKind, row: JournalRow) {
        self.steps.push(JournalStep { kind, row });
    }

    /// Undo every step in reverse order, returning how many undos failed
    ///
    /// Failures are logged and do not stop the remaining undos. Restored
    /// rows overwrite whatever was written to them in the meantime.
    pub async fn unwind<G: PersistenceGateway>(self, gateway: &mut G) -> usize {
        let mut failed = 0;
        for step in self.steps.iter().rev() {
            match step.undo(gateway).await {
                Ok(()) => debug!(
                    operation = self.operation,
                    table = %step.row.table(),
                    id = step.row.id(),
                    kind = ?step.kind,
                    "undid ledger step"
                ),
                Err(e) => {
                    failed += 1;
                    error!(
                        operation = self.operation,
                        table = %step.row.table(),
                        id = step.row.id(),
                        kind = ?step.kind,
                        error = %e,
                        "failed to undo ledger step"
                    );
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{GatewayOp, MemoryGateway};
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn test_unwind_reverses_steps() {
        let mut gateway = MemoryGateway::new();
        let mut journal = CompensationJournal::new("test");

        let kept = Creditor::new("biz".to_string(), "Kept".to_string());
        gateway.insert(&kept).await.unwrap();

        let inserted = Creditor::new("biz".to_string(), "Inserted".to_string());
        gateway.insert(&inserted).await.unwrap();
        journal.inserted(inserted.clone());

        let mut changed = kept.clone();
        changed.outstanding_amount = BigDecimal::from(900);
        gateway.update(&changed).await.unwrap();
        journal.updated(kept.clone());

        let removed = Creditor::new("biz".to_string(), "Removed".to_string());
        gateway.insert(&removed).await.unwrap();
        gateway
            .delete::<Creditor>("biz", &removed.id)
            .await
            .unwrap();
        journal.deleted(removed.clone());

        assert_eq!(journal.len(), 3);
        let kinds: Vec<StepKind> = journal.steps().iter().map(|step| step.kind).collect();
        assert_eq!(
            kinds,
            vec![StepKind::Inserted, StepKind::Updated, StepKind::Deleted]
        );
        assert_eq!(journal.steps()[1].row.id(), kept.id);
        assert_eq!(journal.unwind(&mut gateway).await, 0);

        let restored: Creditor = gateway.get("biz", &kept.id).await.unwrap().unwrap();
        assert_eq!(restored.outstanding_amount, BigDecimal::from(0));
        let gone: Option<Creditor> = gateway.get("biz", &inserted.id).await.unwrap();
        assert!(gone.is_none());
        let back: Option<Creditor> = gateway.get("biz", &removed.id).await.unwrap();
        assert!(back.is_some());
    }

    #[tokio::test]
    async fn test_unwind_continues_past_failures() {
        let mut gateway = MemoryGateway::new();
        let mut journal = CompensationJournal::new("test");

        let first = Creditor::new("biz".to_string(), "First".to_string());
        let second = Creditor::new("biz".to_string(), "Second".to_string());
        gateway.insert(&first).await.unwrap();
        gateway.insert(&second).await.unwrap();
        journal.inserted(first.clone());
        journal.inserted(second.clone());

        gateway.fail_on(Table::Creditors, GatewayOp::Delete);
        assert_eq!(journal.unwind(&mut gateway).await, 1);

        // The second insert was undone first and failed; the first was removed
        assert_eq!(gateway.row_count(Table::Creditors), 1);
        let left: Option<Creditor> = gateway.get("biz", &second.id).await.unwrap();
        assert!(left.is_some());
    }
}
