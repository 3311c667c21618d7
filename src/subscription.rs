//! Mocked $1/month supporter subscription.
//!
//! Nothing is charged or stored. `create` validates the email and echoes an
//! active subscription; `check` reports every address as an active
//! subscriber half way through its billing period.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::{BibleError, Result};

/// Monthly price in cents.
pub const AMOUNT_CENTS: u32 = 100;
pub const CURRENCY: &str = "usd";
pub const INTERVAL: &str = "month";
pub const BILLING_PERIOD_DAYS: i64 = 30;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: &'static str,
    pub amount: u32,
    pub currency: &'static str,
    pub interval: &'static str,
    pub created_at: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
}

impl Subscription {
    fn active(email: &str, name: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("sub_{}", uuid::Uuid::new_v4().simple()),
            email: email.to_string(),
            name,
            status: "active",
            amount: AMOUNT_CENTS,
            currency: CURRENCY,
            interval: INTERVAL,
            created_at,
            next_billing_date: created_at + Duration::days(BILLING_PERIOD_DAYS),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Start a subscription for `email`. `name` defaults to "Anonymous".
pub fn create(email: &str, name: Option<&str>) -> Result<Subscription> {
    let email = email.trim();
    if email.is_empty() {
        return Err(BibleError::Validation("Email is required".into()));
    }
    if !is_valid_email(email) {
        return Err(BibleError::Validation("Invalid email format".into()));
    }

    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Anonymous")
        .to_string();
    let subscription = Subscription::active(email, Some(name), Utc::now());
    info!(id = %subscription.id, "Subscription created");
    Ok(subscription)
}

/// Report the subscription status for `email`.
pub fn check(email: &str) -> Result<Subscription> {
    let email = email.trim();
    if email.is_empty() {
        return Err(BibleError::Validation("Email parameter is required".into()));
    }
    let created_at = Utc::now() - Duration::days(BILLING_PERIOD_DAYS / 2);
    Ok(Subscription::active(email, None, created_at))
}
