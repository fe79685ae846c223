//! Plan tier definitions
//!
//! Plans are a closed enum so that adding a tier forces every policy match
//! to be revisited at compile time. Tier limits live with the quota policy
//! in recap-api; this module only defines the tiers and their storage form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known owner id standing in for "no authenticated owner yet".
///
/// All unauthenticated visitors share this single owner row; individual
/// visitors are disambiguated only through fingerprint/client-IP signals
/// stored in usage event and summary metadata.
pub const ANONYMOUS_OWNER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);

/// Subscription plan tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Shared sentinel tier for unauthenticated visitors (lifetime limit 1)
    Anonymous,
    /// Default tier for authenticated owners (lifetime limit 3)
    Free,
    /// Paid tier with a calendar-month window
    Pro,
    /// Unmetered tier
    Enterprise,
}

impl Plan {
    /// Parse from database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "anonymous" => Some(Plan::Anonymous),
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Plan::Anonymous => "anonymous",
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_db_string_round_trip() {
        for plan in [Plan::Anonymous, Plan::Free, Plan::Pro, Plan::Enterprise] {
            assert_eq!(Plan::from_db_string(plan.to_db_string()), Some(plan));
        }
        assert_eq!(Plan::from_db_string("platinum"), None);
    }

    #[test]
    fn test_anonymous_owner_id_is_stable() {
        assert_eq!(
            ANONYMOUS_OWNER_ID.to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
    }
}
