//! Ledger configuration
//!
//! Policies for the behaviors that differ between strict bookkeeping and
//! compatibility with existing data: balance flooring, delete handling and
//! what happens when a multi-step operation fails part way through.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::*;

const DEFAULT_WITHDRAWAL_CATEGORY: &str = "payment";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// What deleting a payment does to its creditor's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDeletePolicy {
    /// Leave the balance untouched; corrections are manual
    #[default]
    KeepBalance,
    /// Add the payment amount back to the creditor
    RestoreBalance,
}

/// What deleting a purchase does to its creditor's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseDeletePolicy {
    KeepBalance,
    /// Remove the purchase total from the creditor, floored at zero
    #[default]
    ReverseBalance,
}

/// Where creditor balances are clamped at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceFloor {
    /// Floor only where payments settle or purchases are released; refunds
    /// and purchase deltas are applied as-is
    #[default]
    Compatible,
    /// Clamp every resulting balance at zero
    Always,
}

/// Handling of steps already applied when a later step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep applied writes and report the failure
    #[default]
    LeaveApplied,
    /// Undo applied writes in reverse order, best effort
    Compensate,
}

/// Configuration for a [`crate::LedgerAdjuster`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub payment_delete_policy: PaymentDeletePolicy,
    pub purchase_delete_policy: PurchaseDeletePolicy,
    pub balance_floor: BalanceFloor,
    pub failure_policy: FailurePolicy,
    /// Category tag written on mirrored withdrawals
    pub withdrawal_category: String,
    /// Lifetime of a selected-business session
    pub session_ttl_hours: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            payment_delete_policy: PaymentDeletePolicy::default(),
            purchase_delete_policy: PurchaseDeletePolicy::default(),
            balance_floor: BalanceFloor::default(),
            failure_policy: FailurePolicy::default(),
            withdrawal_category: DEFAULT_WITHDRAWAL_CATEGORY.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.session_ttl()?;

        if self.withdrawal_category.trim().is_empty() {
            return Err(LedgerError::Config(
                "withdrawal_category cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Session lifetime as a duration
    pub fn session_ttl(&self) -> LedgerResult<Duration> {
        if self.session_ttl_hours <= 0 {
            return Err(LedgerError::Config(format!(
                "session_ttl_hours must be positive, got {}",
                self.session_ttl_hours
            )));
        }

        Duration::try_hours(self.session_ttl_hours).ok_or_else(|| {
            LedgerError::Config(format!(
                "session_ttl_hours is out of range: {}",
                self.session_ttl_hours
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_existing_behavior() {
        let config = LedgerConfig::default();
        assert_eq!(config.payment_delete_policy, PaymentDeletePolicy::KeepBalance);
        assert_eq!(config.balance_floor, BalanceFloor::Compatible);
        assert_eq!(config.failure_policy, FailurePolicy::LeaveApplied);
        assert_eq!(config.session_ttl().unwrap(), Duration::hours(24));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LedgerConfig::from_json_str(
            r#"{ "payment_delete_policy": "restore_balance", "failure_policy": "compensate" }"#,
        )
        .unwrap();

        assert_eq!(
            config.payment_delete_policy,
            PaymentDeletePolicy::RestoreBalance
        );
        assert_eq!(config.failure_policy, FailurePolicy::Compensate);
        assert_eq!(config.withdrawal_category, "payment");
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            LedgerConfig::from_json_str(r#"{ "session_ttl_hours": 0 }"#),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json_str(r#"{ "balance_flor": "always" }"#),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json_str("not json"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(
            LedgerConfig::from_json_file("/nonexistent/payables-ledger.json"),
            Err(LedgerError::Config(_))
        ));
    }
}
