//! Quota policy
//!
//! Pure decision functions: tier + usage-so-far + time in, allow/deny out.
//! No I/O here; callers compute the usage count for the tier (see
//! UsageGuard) and pass it in, which keeps every allow/deny outcome
//! reproducible in tests. One function per tier, dispatched by an
//! exhaustive match so a new tier cannot compile without a policy.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use recap_common::Plan;
use serde::Serialize;

/// Lifetime summary limit for the shared anonymous tier
pub const ANONYMOUS_LIFETIME_LIMIT: i64 = 1;

/// Lifetime summary limit for the free tier
pub const FREE_LIFETIME_LIMIT: i64 = 3;

/// Calendar-month summary limit for the pro tier
pub const PRO_MONTHLY_LIMIT: i64 = 25;

/// Outcome of a quota evaluation
#[derive(Debug, Clone, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub current_usage: i64,
    /// None = unmetered
    pub limit: Option<i64>,
    /// None = unmetered
    pub remaining: Option<i64>,
    /// Tier-specific denial copy; drives upgrade messaging at the boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Next reset instant for windowed tiers (pro only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_resets_at: Option<DateTime<Utc>>,
}

/// Evaluate quota for a tier given its usage count
pub fn evaluate(plan: Plan, usage_count: i64, now: DateTime<Utc>) -> QuotaDecision {
    match plan {
        Plan::Anonymous => evaluate_anonymous(usage_count),
        Plan::Free => evaluate_free(usage_count),
        Plan::Pro => evaluate_pro(usage_count, now),
        Plan::Enterprise => evaluate_enterprise(usage_count),
    }
}

fn evaluate_anonymous(usage_count: i64) -> QuotaDecision {
    let allowed = usage_count < ANONYMOUS_LIFETIME_LIMIT;
    QuotaDecision {
        allowed,
        current_usage: usage_count,
        limit: Some(ANONYMOUS_LIFETIME_LIMIT),
        remaining: Some((ANONYMOUS_LIFETIME_LIMIT - usage_count).max(0)),
        reason: (!allowed).then(|| {
            "Free summary limit reached. Sign up to keep this summary and create up to 3 for free."
                .to_string()
        }),
        window_resets_at: None,
    }
}

fn evaluate_free(usage_count: i64) -> QuotaDecision {
    let allowed = usage_count < FREE_LIFETIME_LIMIT;
    QuotaDecision {
        allowed,
        current_usage: usage_count,
        limit: Some(FREE_LIFETIME_LIMIT),
        remaining: Some((FREE_LIFETIME_LIMIT - usage_count).max(0)),
        reason: (!allowed).then(|| {
            format!(
                "You have used all {} free summaries. Upgrade to Pro for {} summaries every month.",
                FREE_LIFETIME_LIMIT, PRO_MONTHLY_LIMIT
            )
        }),
        window_resets_at: None,
    }
}

fn evaluate_pro(usage_count: i64, now: DateTime<Utc>) -> QuotaDecision {
    let allowed = usage_count < PRO_MONTHLY_LIMIT;
    QuotaDecision {
        allowed,
        current_usage: usage_count,
        limit: Some(PRO_MONTHLY_LIMIT),
        remaining: Some((PRO_MONTHLY_LIMIT - usage_count).max(0)),
        reason: (!allowed).then(|| {
            format!(
                "You have reached {} summaries this month. Your quota resets on the 1st, \
                 or contact us about Enterprise for unlimited summaries.",
                PRO_MONTHLY_LIMIT
            )
        }),
        window_resets_at: Some(next_month_start(now)),
    }
}

fn evaluate_enterprise(usage_count: i64) -> QuotaDecision {
    QuotaDecision {
        allowed: true,
        current_usage: usage_count,
        limit: None,
        remaining: None,
        reason: None,
        window_resets_at: None,
    }
}

/// Start of the calendar month containing `now` (UTC)
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    // Day 1 of a real month is always constructible
    let date = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .unwrap_or_else(|| now.date_naive());
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Start of the calendar month after the one containing `now` (UTC)
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| now.date_naive());
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_anonymous_single_use() {
        let now = at(2026, 3, 15, 12, 0);

        let first = evaluate(Plan::Anonymous, 0, now);
        assert!(first.allowed);
        assert_eq!(first.remaining, Some(1));

        let second = evaluate(Plan::Anonymous, 1, now);
        assert!(!second.allowed);
        assert_eq!(second.remaining, Some(0));
        assert!(second.reason.as_deref().unwrap().contains("Sign up"));
    }

    #[test]
    fn test_free_lifetime_limit() {
        let now = at(2026, 3, 15, 12, 0);

        assert!(evaluate(Plan::Free, 2, now).allowed);

        let denied = evaluate(Plan::Free, 3, now);
        assert!(!denied.allowed);
        assert!(denied.reason.as_deref().unwrap().contains("Pro"));
    }

    #[test]
    fn test_pro_monthly_limit_and_reset() {
        let now = at(2026, 3, 15, 12, 0);

        let allowed = evaluate(Plan::Pro, 24, now);
        assert!(allowed.allowed);
        assert_eq!(allowed.window_resets_at, Some(at(2026, 4, 1, 0, 0)));

        let denied = evaluate(Plan::Pro, 25, now);
        assert!(!denied.allowed);
        assert!(denied.reason.as_deref().unwrap().contains("Enterprise"));
    }

    #[test]
    fn test_enterprise_unconditionally_allowed() {
        let now = at(2026, 3, 15, 12, 0);
        let decision = evaluate(Plan::Enterprise, 1_000_000, now);
        assert!(decision.allowed);
        assert_eq!(decision.limit, None);
        assert_eq!(decision.remaining, None);
    }

    #[test]
    fn test_month_window_boundaries() {
        // 23:59 on the last day of March belongs to March's window
        let late_march = at(2026, 3, 31, 23, 59);
        assert_eq!(month_start(late_march), at(2026, 3, 1, 0, 0));

        // 00:00 on April 1st opens a fresh window
        let april_first = at(2026, 4, 1, 0, 0);
        assert_eq!(month_start(april_first), at(2026, 4, 1, 0, 0));
        assert!(month_start(april_first) > late_march);
    }

    #[test]
    fn test_december_rolls_into_january() {
        let december = at(2026, 12, 31, 23, 59);
        assert_eq!(next_month_start(december), at(2027, 1, 1, 0, 0));
    }

    #[test]
    fn test_usage_over_limit_clamps_remaining() {
        // Pathological concurrency can leave usage one over the limit;
        // remaining must not go negative
        let now = at(2026, 3, 15, 12, 0);
        let decision = evaluate(Plan::Free, 4, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, Some(0));
    }
}
