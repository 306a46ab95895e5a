//! Core types and data structures for the payables ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Remote record collections exposed by the persistence gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Businesses,
    Creditors,
    Payments,
    Purchases,
    Transactions,
    Bills,
    BankAccounts,
}

impl Table {
    /// Name of the table on the hosted backend
    pub fn name(&self) -> &'static str {
        match self {
            Table::Businesses => "businesses",
            Table::Creditors => "creditors",
            Table::Payments => "payments",
            Table::Purchases => "purchases",
            Table::Transactions => "transactions",
            Table::Bills => "bills",
            Table::BankAccounts => "bank_accounts",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tenant that owns every other record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl Business {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            created_at: now(),
        }
    }
}

/// A counterparty the business owes money to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creditor {
    /// Unique identifier for the creditor
    pub id: String,
    /// Owning business
    pub business_id: String,
    /// Display name, used in mirrored bank transaction descriptions
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Running payable balance owed to this creditor
    pub outstanding_amount: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Creditor {
    /// Create a creditor with a zero outstanding balance
    pub fn new(business_id: String, name: String) -> Self {
        let now = now();
        Self {
            id: new_id(),
            business_id,
            name,
            email: None,
            phone: None,
            address: None,
            outstanding_amount: BigDecimal::from(0),
            created_at: now,
            updated_at: now,
        }
    }

    /// Start the creditor with an opening balance
    pub fn with_opening_balance(mut self, amount: BigDecimal) -> Self {
        self.outstanding_amount = amount;
        self
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    BankTransfer,
    Cheque,
    Card,
    Upi,
    Other,
}

/// An outgoing payment, optionally settling a creditor balance and a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub business_id: String,
    /// Sequential number, unique per business (e.g. `PAY-0007`)
    pub payment_number: String,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub creditor_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub bill_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Whether this payment is mirrored as a withdrawal on its bank account
    pub create_bank_transaction: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payment {
    /// True when a withdrawal should shadow this payment
    pub fn mirrors_to_bank(&self) -> bool {
        self.create_bank_transaction && self.bank_account_id.is_some()
    }

    /// Apply an amended draft, keeping identity and creation time
    pub fn amended(&self, draft: PaymentDraft, payment_number: String) -> Self {
        Self {
            id: self.id.clone(),
            business_id: self.business_id.clone(),
            payment_number,
            date: draft.date,
            amount: draft.amount,
            creditor_id: draft.creditor_id,
            bank_account_id: draft.bank_account_id,
            payment_method: draft.payment_method,
            bill_id: draft.bill_id,
            reference: draft.reference,
            notes: draft.notes,
            create_bank_transaction: draft.create_bank_transaction,
            created_at: self.created_at,
            updated_at: now(),
        }
    }
}

/// Caller-supplied payment fields for create and amend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// Leave empty to allocate the next number for the business
    pub payment_number: Option<String>,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub creditor_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub bill_id: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub create_bank_transaction: bool,
}

impl PaymentDraft {
    pub fn new(date: NaiveDate, amount: BigDecimal) -> Self {
        Self {
            payment_number: None,
            date,
            amount,
            creditor_id: None,
            bank_account_id: None,
            payment_method: PaymentMethod::default(),
            bill_id: None,
            reference: None,
            notes: None,
            create_bank_transaction: false,
        }
    }

    /// Seed a draft from a stored payment, for amending a subset of fields
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            payment_number: Some(payment.payment_number.clone()),
            date: payment.date,
            amount: payment.amount.clone(),
            creditor_id: payment.creditor_id.clone(),
            bank_account_id: payment.bank_account_id.clone(),
            payment_method: payment.payment_method,
            bill_id: payment.bill_id.clone(),
            reference: payment.reference.clone(),
            notes: payment.notes.clone(),
            create_bank_transaction: payment.create_bank_transaction,
        }
    }

    pub fn number(mut self, payment_number: String) -> Self {
        self.payment_number = Some(payment_number);
        self
    }

    pub fn amount(mut self, amount: BigDecimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn creditor(mut self, creditor_id: Option<String>) -> Self {
        self.creditor_id = creditor_id;
        self
    }

    pub fn bill(mut self, bill_id: Option<String>) -> Self {
        self.bill_id = bill_id;
        self
    }

    pub fn method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Mirror the payment as a withdrawal from the given bank account
    pub fn mirror_to_bank(mut self, bank_account_id: String) -> Self {
        self.bank_account_id = Some(bank_account_id);
        self.create_bank_transaction = true;
        self
    }

    /// Stop mirroring, keeping the bank account reference
    pub fn without_bank_transaction(mut self) -> Self {
        self.create_bank_transaction = false;
        self
    }

    /// Check field values before any gateway call
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        if let Some(ref number) = self.payment_number {
            if number.trim().is_empty() {
                return Err(LedgerError::Validation(
                    "Payment number cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn into_payment(self, business_id: &str, payment_number: String) -> Payment {
        let now = now();
        Payment {
            id: new_id(),
            business_id: business_id.to_string(),
            payment_number,
            date: self.date,
            amount: self.amount,
            creditor_id: self.creditor_id,
            bank_account_id: self.bank_account_id,
            payment_method: self.payment_method,
            bill_id: self.bill_id,
            reference: self.reference,
            notes: self.notes,
            create_bank_transaction: self.create_bank_transaction,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A purchase on credit that raises a creditor's payable balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub business_id: String,
    pub purchase_number: String,
    pub date: NaiveDate,
    pub creditor_id: Option<String>,
    pub item_description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    /// Always `quantity * unit_price`
    pub total_price: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Purchase {
    /// Apply an amended draft and recompute the total
    pub fn amended(&self, draft: PurchaseDraft, purchase_number: String) -> Self {
        let total_price = draft.total_price();
        Self {
            id: self.id.clone(),
            business_id: self.business_id.clone(),
            purchase_number,
            date: draft.date,
            creditor_id: draft.creditor_id,
            item_description: draft.item_description,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total_price,
            created_at: self.created_at,
            updated_at: now(),
        }
    }
}

/// Caller-supplied purchase fields for create and amend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub purchase_number: Option<String>,
    pub date: NaiveDate,
    pub creditor_id: Option<String>,
    pub item_description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
}

impl PurchaseDraft {
    pub fn new(
        date: NaiveDate,
        item_description: String,
        quantity: BigDecimal,
        unit_price: BigDecimal,
    ) -> Self {
        Self {
            purchase_number: None,
            date,
            creditor_id: None,
            item_description,
            quantity,
            unit_price,
        }
    }

    pub fn from_purchase(purchase: &Purchase) -> Self {
        Self {
            purchase_number: Some(purchase.purchase_number.clone()),
            date: purchase.date,
            creditor_id: purchase.creditor_id.clone(),
            item_description: purchase.item_description.clone(),
            quantity: purchase.quantity.clone(),
            unit_price: purchase.unit_price.clone(),
        }
    }

    pub fn number(mut self, purchase_number: String) -> Self {
        self.purchase_number = Some(purchase_number);
        self
    }

    pub fn creditor(mut self, creditor_id: Option<String>) -> Self {
        self.creditor_id = creditor_id;
        self
    }

    pub fn quantity(mut self, quantity: BigDecimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn unit_price(mut self, unit_price: BigDecimal) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn total_price(&self) -> BigDecimal {
        &self.quantity * &self.unit_price
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.quantity <= BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Purchase quantity must be positive".to_string(),
            ));
        }

        if self.unit_price <= BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Purchase unit price must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn into_purchase(self, business_id: &str, purchase_number: String) -> Purchase {
        let now = now();
        let total_price = self.total_price();
        Purchase {
            id: new_id(),
            business_id: business_id.to_string(),
            purchase_number,
            date: self.date,
            creditor_id: self.creditor_id,
            item_description: self.item_description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Direction of a bank transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
        }
    }
}

/// A movement on one of the business's bank accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: String,
    pub business_id: String,
    pub account_id: String,
    pub transaction_number: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: BigDecimal,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    /// Originating payment, when this transaction mirrors one
    pub reference_id: Option<String>,
    pub reconciled: bool,
    pub created_at: NaiveDateTime,
}

impl BankTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        business_id: String,
        account_id: String,
        transaction_number: String,
        transaction_type: TransactionType,
        amount: BigDecimal,
        date: NaiveDate,
        description: String,
        category: String,
    ) -> Self {
        Self {
            id: new_id(),
            business_id,
            account_id,
            transaction_number,
            transaction_type,
            amount,
            date,
            description,
            category,
            reference_id: None,
            reconciled: false,
            created_at: now(),
        }
    }
}

/// Settlement state of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Paid,
}

/// A payable invoice received from a creditor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub business_id: String,
    pub bill_number: String,
    pub creditor_id: Option<String>,
    pub amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub due_date: NaiveDate,
    pub status: BillStatus,
}

impl Bill {
    /// Create a pending bill; the total includes tax
    pub fn new(
        business_id: String,
        bill_number: String,
        amount: BigDecimal,
        tax_amount: BigDecimal,
        due_date: NaiveDate,
    ) -> Self {
        let total_amount = &amount + &tax_amount;
        Self {
            id: new_id(),
            business_id,
            bill_number,
            creditor_id: None,
            amount,
            tax_amount,
            total_amount,
            due_date,
            status: BillStatus::Pending,
        }
    }
}

/// A bank account payments can be drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub business_id: String,
    pub account_name: String,
    pub account_number: String,
    pub bank_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl BankAccount {
    pub fn new(business_id: String, account_name: String, account_number: String) -> Self {
        Self {
            id: new_id(),
            business_id,
            account_name,
            account_number,
            bank_name: None,
            created_at: now(),
        }
    }
}

/// Errors that can occur in the payables ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Record not found in {table}: {id}")]
    NotFound { table: Table, id: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Session expired for business {0}")]
    SessionExpired(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn not_found(table: Table, id: &str) -> Self {
        LedgerError::NotFound {
            table,
            id: id.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
