//! Referral attribution.

use chrono::Utc;
use shared::validation::validate_slug;
use uuid::Uuid;

use crate::models::{
    generate_referral_link, NewReferral, PageQuery, Referral, ReferralItem, ReferralLinkResponse,
    UtmMetadata,
};

use super::error::LedgerError;
use super::ledger::ReferralLedger;

impl ReferralLedger {
    /// Attributes `referred_id`'s signup to the owner of `referral_code`.
    ///
    /// A user has at most one referrer ever. The store's uniqueness guarantee
    /// decides concurrent attempts; the loser gets `AlreadyReferred`.
    pub async fn register_referral(
        &self,
        referral_code: &str,
        referred_id: Uuid,
        utm: UtmMetadata,
    ) -> Result<Referral, LedgerError> {
        let code = referral_code.trim().to_lowercase();
        if validate_slug(&code).is_err() {
            return Err(LedgerError::InvalidCode);
        }

        let referrer_id = self
            .directory
            .resolve_referral_code(&code)
            .await?
            .ok_or(LedgerError::InvalidCode)?;

        if referrer_id == referred_id {
            tracing::warn!(user_id = %referred_id, "Self-referral rejected");
            return Err(LedgerError::SelfReferral);
        }

        let referral = self
            .store
            .insert_referral(
                NewReferral {
                    referrer_id,
                    referred_id,
                    referral_code: code,
                    utm,
                },
                Utc::now(),
            )
            .await
            .map_err(LedgerError::from)?;

        tracing::info!(
            referral_id = %referral.id,
            referrer_id = %referral.referrer_id,
            referred_id = %referral.referred_id,
            utm_source = referral.utm.utm_source.as_deref().unwrap_or(""),
            "Referral registered"
        );
        Ok(referral)
    }

    /// A referrer's referrals, newest first, with referred display names.
    pub async fn list_referrals(
        &self,
        referrer_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<ReferralItem>, LedgerError> {
        let (limit, offset) = page.limit_offset();
        let referrals = self.store.list_referrals(referrer_id, limit, offset).await?;

        let referred_ids: Vec<Uuid> = referrals.iter().map(|r| r.referred_id).collect();
        let mut names = self.directory.display_names(&referred_ids).await?;

        Ok(referrals
            .into_iter()
            .map(|r| ReferralItem {
                id: r.id,
                referred_id: r.referred_id,
                referred_display_name: names.remove(&r.referred_id),
                status: r.status,
                created_at: r.created_at,
                activated_at: r.activated_at,
            })
            .collect())
    }

    /// Shareable link for the user's own referral code.
    pub async fn referral_link(
        &self,
        user_id: Uuid,
        base_url: &str,
    ) -> Result<ReferralLinkResponse, LedgerError> {
        let code = self
            .directory
            .referral_code_for(user_id)
            .await?
            .ok_or(LedgerError::NotFound("Profile"))?;

        Ok(ReferralLinkResponse {
            url: generate_referral_link(base_url, &code),
            referral_code: code,
        })
    }
}
