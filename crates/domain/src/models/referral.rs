//! Referral attribution models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a referral.
///
/// `Pending` at signup, `Active` once the first commission is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Active,
    Cancelled,
}

impl std::fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralStatus::Pending => write!(f, "pending"),
            ReferralStatus::Active => write!(f, "active"),
            ReferralStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Marketing attribution captured at signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UtmMetadata {
    #[validate(length(max = 255, message = "utm_source must be at most 255 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,

    #[validate(length(max = 255, message = "utm_medium must be at most 255 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,

    #[validate(length(max = 255, message = "utm_campaign must be at most 255 characters"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
}

/// A referrer ↔ referred relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub status: ReferralStatus,
    pub referral_code: String,
    #[serde(flatten)]
    pub utm: UtmMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

/// Data needed to insert a referral.
#[derive(Debug, Clone)]
pub struct NewReferral {
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub referral_code: String,
    pub utm: UtmMetadata,
}

/// Request body to attribute the caller's signup to a referral code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegisterReferralRequest {
    #[validate(length(min = 1, max = 64, message = "referral_code must be 1-64 characters"))]
    pub referral_code: String,

    #[serde(flatten)]
    #[validate(nested)]
    pub utm: UtmMetadata,
}

/// Response after registering a referral.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisterReferralResponse {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
}

/// Referral listing entry for a referrer, with the referred user's display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReferralItem {
    pub id: Uuid,
    pub referred_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_display_name: Option<String>,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

/// Shareable referral link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReferralLinkResponse {
    pub referral_code: String,
    pub url: String,
}

/// Builds the public referral link for a slug.
///
/// Pure formatting: the slug is lower-cased, percent-encoded and appended as
/// the `ref` query parameter of the signup page under `base_url`.
pub fn generate_referral_link(base_url: &str, slug: &str) -> String {
    let mut encoded = String::with_capacity(slug.len());
    for byte in slug.to_lowercase().bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    format!("{}/signup?ref={}", base_url.trim_end_matches('/'), encoded)
}
