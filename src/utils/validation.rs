//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal, field: &str) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(format!("{} must be positive", field)))
    } else {
        Ok(())
    }
}

/// Parse a user-entered amount, rejecting non-numeric and non-positive input
pub fn parse_amount(input: &str, field: &str) -> LedgerResult<BigDecimal> {
    let amount = BigDecimal::from_str(input.trim())
        .map_err(|_| LedgerError::Validation(format!("{} must be a number", field)))?;
    validate_positive_amount(&amount, field)?;
    Ok(amount)
}

/// Validate a payment or purchase number
pub fn validate_document_number(number: &str) -> LedgerResult<()> {
    if number.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Document number cannot be empty".to_string(),
        ));
    }

    if number.len() > 30 {
        return Err(LedgerError::Validation(
            "Document number cannot exceed 30 characters".to_string(),
        ));
    }

    // Check for valid characters (alphanumeric, dashes, underscores)
    if !number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "Document number can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate an optional free-text field against a length limit
pub fn validate_text(text: Option<&str>, field: &str, max_len: usize) -> LedgerResult<()> {
    match text {
        Some(text) if text.len() > max_len => Err(LedgerError::Validation(format!(
            "{} cannot exceed {} characters",
            field, max_len
        ))),
        _ => Ok(()),
    }
}

/// Stricter draft validator for form input
pub struct StrictDraftValidator;

impl DraftValidator for StrictDraftValidator {
    fn validate_payment(&self, draft: &PaymentDraft) -> LedgerResult<()> {
        // Basic validation
        draft.validate()?;

        if let Some(ref number) = draft.payment_number {
            validate_document_number(number)?;
        }
        validate_text(draft.reference.as_deref(), "Payment reference", 100)?;
        validate_text(draft.notes.as_deref(), "Payment notes", 500)?;

        if draft.create_bank_transaction && draft.bank_account_id.is_none() {
            return Err(LedgerError::Validation(
                "A bank account is required to record a bank transaction".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_purchase(&self, draft: &PurchaseDraft) -> LedgerResult<()> {
        draft.validate()?;

        if let Some(ref number) = draft.purchase_number {
            validate_document_number(number)?;
        }

        if draft.item_description.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Item description cannot be empty".to_string(),
            ));
        }
        validate_text(Some(&draft.item_description), "Item description", 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount(" 125.50 ", "Amount").unwrap(),
            BigDecimal::from_str("125.50").unwrap()
        );
        assert!(matches!(
            parse_amount("12abc", "Amount"),
            Err(LedgerError::Validation(msg)) if msg == "Amount must be a number"
        ));
        assert!(matches!(
            parse_amount("-3", "Quantity"),
            Err(LedgerError::Validation(msg)) if msg == "Quantity must be positive"
        ));
        assert!(parse_amount("", "Amount").is_err());
    }

    #[test]
    fn test_document_numbers() {
        assert!(validate_document_number("PAY-0001").is_ok());
        assert!(validate_document_number("").is_err());
        assert!(validate_document_number("PAY 0001").is_err());
        assert!(validate_document_number(&"9".repeat(31)).is_err());
    }

    #[test]
    fn test_strict_validator_requires_bank_account_for_mirroring() {
        let validator = StrictDraftValidator;
        let mut draft = PaymentDraft::new(date(), BigDecimal::from(40));
        draft.create_bank_transaction = true;
        assert!(validator.validate_payment(&draft).is_err());

        let draft = draft.mirror_to_bank("acct".to_string());
        assert!(validator.validate_payment(&draft).is_ok());
    }

    #[test]
    fn test_strict_validator_requires_item_description() {
        let validator = StrictDraftValidator;
        let draft = PurchaseDraft::new(
            date(),
            "   ".to_string(),
            BigDecimal::from(1),
            BigDecimal::from(1),
        );
        assert!(validator.validate_purchase(&draft).is_err());
    }
}
