//! Document numbering for payments, purchases and mirrored withdrawals

use crate::types::{LedgerError, LedgerResult};

pub const PAYMENT_PREFIX: &str = "PAY-";
pub const PURCHASE_PREFIX: &str = "PUR-";
pub const WITHDRAWAL_PREFIX: &str = "WIT-";

/// A per-business sequence of document numbers stored in one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberSeries {
    pub label: &'static str,
    pub column: &'static str,
    pub prefix: &'static str,
}

pub const PAYMENT_SERIES: NumberSeries = NumberSeries {
    label: "Payment number",
    column: "payment_number",
    prefix: PAYMENT_PREFIX,
};

pub const PURCHASE_SERIES: NumberSeries = NumberSeries {
    label: "Purchase number",
    column: "purchase_number",
    prefix: PURCHASE_PREFIX,
};

/// Numeric sequence of a document number carrying `prefix`
pub fn sequence_of(number: &str, prefix: &str) -> Option<u64> {
    number.strip_prefix(prefix)?.parse().ok()
}

/// Next number after the highest sequence among `existing`
///
/// Numbers that do not carry the prefix, or whose suffix is not numeric,
/// are ignored. Fails when the highest sequence cannot be incremented.
pub fn next_number<'a>(
    prefix: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> LedgerResult<String> {
    let last = existing
        .into_iter()
        .filter_map(|number| sequence_of(number, prefix))
        .max()
        .unwrap_or(0);
    let next = last.checked_add(1).ok_or_else(|| {
        LedgerError::Validation(format!(
            "No number follows {}{}; give one explicitly",
            prefix, last
        ))
    })?;
    Ok(format!("{}{:04}", prefix, next))
}

/// Transaction number for the withdrawal mirroring a payment
pub fn withdrawal_number(payment_number: &str) -> String {
    match payment_number.strip_prefix(PAYMENT_PREFIX) {
        Some(rest) => format!("{}{}", WITHDRAWAL_PREFIX, rest),
        None => format!("{}{}", WITHDRAWAL_PREFIX, payment_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_number_follows_highest_sequence() {
        assert_eq!(next_number(PAYMENT_PREFIX, []).unwrap(), "PAY-0001");
        assert_eq!(
            next_number(PAYMENT_PREFIX, ["PAY-0002", "PAY-0010", "PAY-0003"]).unwrap(),
            "PAY-0011"
        );
        assert_eq!(
            next_number(PURCHASE_PREFIX, ["PAY-0009", "PUR-x", "manual"]).unwrap(),
            "PUR-0001"
        );
        assert_eq!(
            next_number(PAYMENT_PREFIX, ["PAY-9999"]).unwrap(),
            "PAY-10000"
        );
    }

    #[test]
    fn test_next_number_fails_at_end_of_sequence() {
        let result = next_number(PAYMENT_PREFIX, ["PAY-0001", "PAY-18446744073709551615"]);
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        assert_eq!(
            next_number(PAYMENT_PREFIX, ["PAY-18446744073709551614"]).unwrap(),
            "PAY-18446744073709551615"
        );
    }

    #[test]
    fn test_withdrawal_number_swaps_prefix() {
        assert_eq!(withdrawal_number("PAY-0042"), "WIT-0042");
        assert_eq!(withdrawal_number("CHQ-17"), "WIT-CHQ-17");
    }
}
