//! Traits for persistence abstraction and extensibility

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::*;

/// A row type stored in one of the gateway's tables
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the record lives in
    const TABLE: Table;

    fn id(&self) -> &str;

    /// Owning business; every gateway call is scoped by it
    fn business_id(&self) -> &str;
}

macro_rules! impl_record {
    ($ty:ty, $table:expr) => {
        impl Record for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> &str {
                &self.id
            }

            fn business_id(&self) -> &str {
                &self.business_id
            }
        }
    };
}

impl_record!(Creditor, Table::Creditors);
impl_record!(Payment, Table::Payments);
impl_record!(Purchase, Table::Purchases);
impl_record!(BankTransaction, Table::Transactions);
impl_record!(Bill, Table::Bills);
impl_record!(BankAccount, Table::BankAccounts);

impl Record for Business {
    const TABLE: Table = Table::Businesses;

    fn id(&self) -> &str {
        &self.id
    }

    fn business_id(&self) -> &str {
        &self.id
    }
}

/// Column-equality predicates, combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// A filter that matches every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to equal `value`
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Evaluate the filter against a serialized row
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

/// Persistence abstraction over the hosted backend
///
/// Implementations expose plain CRUD against named tables. Nothing here is
/// transactional: each call stands alone, and callers sequencing several
/// calls get no isolation between them.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetch one record by business and record id
    async fn get<R: Record>(&self, business_id: &str, id: &str) -> LedgerResult<Option<R>>;

    /// Fetch all records of the business matching `filter`
    async fn select<R: Record>(&self, business_id: &str, filter: &Filter)
        -> LedgerResult<Vec<R>>;

    /// Insert a new record, returning the stored row
    async fn insert<R: Record>(&mut self, record: &R) -> LedgerResult<R>;

    /// Replace an existing record, returning the stored row
    async fn update<R: Record>(&mut self, record: &R) -> LedgerResult<R>;

    /// Delete a record by business and record id
    async fn delete<R: Record>(&mut self, business_id: &str, id: &str) -> LedgerResult<()>;
}

/// Trait for implementing custom draft validation rules
pub trait DraftValidator: Send + Sync {
    /// Validate a payment draft before any gateway call
    fn validate_payment(&self, draft: &PaymentDraft) -> LedgerResult<()>;

    /// Validate a purchase draft before any gateway call
    fn validate_purchase(&self, draft: &PurchaseDraft) -> LedgerResult<()>;
}

/// Default validator: positive amounts, quantities and prices
pub struct DefaultDraftValidator;

impl DraftValidator for DefaultDraftValidator {
    fn validate_payment(&self, draft: &PaymentDraft) -> LedgerResult<()> {
        draft.validate()
    }

    fn validate_purchase(&self, draft: &PurchaseDraft) -> LedgerResult<()> {
        draft.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_all_conditions() {
        let row = json!({ "reference_id": "p1", "type": "withdrawal", "amount": "10" });

        assert!(Filter::new().matches(&row));
        assert!(Filter::new().eq("reference_id", "p1").matches(&row));
        assert!(Filter::new()
            .eq("reference_id", "p1")
            .eq("type", "withdrawal")
            .matches(&row));
        assert!(!Filter::new()
            .eq("reference_id", "p1")
            .eq("type", "deposit")
            .matches(&row));
        assert!(!Filter::new().eq("missing", "x").matches(&row));

        let filter = Filter::new().eq("reference_id", "p1").eq("type", "withdrawal");
        assert_eq!(
            filter.conditions(),
            &[
                ("reference_id".to_string(), json!("p1")),
                ("type".to_string(), json!("withdrawal")),
            ]
        );
    }

    #[test]
    fn test_business_scopes_itself() {
        let business = Business::new("Acme Traders".to_string());
        assert_eq!(business.business_id(), business.id());
        assert_eq!(<Business as Record>::TABLE, Table::Businesses);
    }
}
