//! Selected-business session with an explicit time-to-live

use chrono::{Duration, NaiveDateTime};

use crate::config::LedgerConfig;
use crate::types::*;

/// The business a user is working in, valid until its TTL elapses
///
/// Every ledger operation takes a session and scopes all gateway calls by
/// its business id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessSession {
    business_id: String,
    selected_at: NaiveDateTime,
    ttl: Duration,
}

impl BusinessSession {
    /// Select a business now, with the configured TTL
    pub fn select(business_id: String, config: &LedgerConfig) -> LedgerResult<Self> {
        Ok(Self::with_ttl(business_id, config.session_ttl()?))
    }

    /// Select a business now with an explicit TTL
    pub fn with_ttl(business_id: String, ttl: Duration) -> Self {
        Self::selected_at(business_id, chrono::Utc::now().naive_utc(), ttl)
    }

    /// Rebuild a session that was selected at a known time
    pub fn selected_at(business_id: String, selected_at: NaiveDateTime, ttl: Duration) -> Self {
        Self {
            business_id,
            selected_at,
            ttl,
        }
    }

    pub fn expires_at(&self) -> NaiveDateTime {
        self.selected_at + self.ttl
    }

    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().naive_utc())
    }

    /// Business id to scope gateway calls by, if the session is still live
    pub fn business_id(&self) -> LedgerResult<&str> {
        if self.is_expired() {
            return Err(LedgerError::SessionExpired(self.business_id.clone()));
        }
        Ok(&self.business_id)
    }

    /// Restart the TTL from now
    pub fn refresh(&mut self) {
        self.selected_at = chrono::Utc::now().naive_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let selected = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let session =
            BusinessSession::selected_at("biz".to_string(), selected, Duration::hours(2));

        assert!(!session.is_expired_at(selected + Duration::minutes(119)));
        assert!(session.is_expired_at(selected + Duration::hours(2)));
    }

    #[test]
    fn test_expired_session_refuses_business_id_until_refreshed() {
        let selected = chrono::Utc::now().naive_utc() - Duration::hours(30);
        let mut session =
            BusinessSession::selected_at("biz".to_string(), selected, Duration::hours(24));

        assert!(matches!(
            session.business_id(),
            Err(LedgerError::SessionExpired(id)) if id == "biz"
        ));

        session.refresh();
        assert_eq!(session.business_id().unwrap(), "biz");
    }

    #[test]
    fn test_select_uses_configured_ttl() {
        let config = LedgerConfig {
            session_ttl_hours: 1,
            ..LedgerConfig::default()
        };
        let session = BusinessSession::select("biz".to_string(), &config).unwrap();
        assert_eq!(session.expires_at() - session.selected_at, Duration::hours(1));
    }
}
