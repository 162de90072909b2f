//! The referral ledger service.
//!
//! Operations are split by concern across `attribution`, `commission`,
//! `balance` and `withdrawal`; this module holds the shared state and the
//! policy administration paths.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use validator::Validate;

use crate::models::{ReferralConfig, ReferralConfigInput};

use super::config_cache::ConfigCache;
use super::error::LedgerError;
use super::store::{LedgerStore, ProfileDirectory};

/// Referral attribution, commissions, balances and withdrawals over a store.
pub struct ReferralLedger {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) directory: Arc<dyn ProfileDirectory>,
    config_cache: ConfigCache,
}

impl ReferralLedger {
    pub fn new(store: Arc<dyn LedgerStore>, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            store,
            directory,
            config_cache: ConfigCache::default(),
        }
    }

    /// Ledger whose policy cache expires after `ttl`.
    pub fn with_config_ttl(
        store: Arc<dyn LedgerStore>,
        directory: Arc<dyn ProfileDirectory>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            config_cache: ConfigCache::new(ttl),
        }
    }

    /// The active policy, or `None` when the program is disabled.
    pub async fn active_config(
        &self,
        force_refresh: bool,
    ) -> Result<Option<Arc<ReferralConfig>>, LedgerError> {
        self.config_cache
            .get(self.store.as_ref(), force_refresh)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Referral config unreadable");
                LedgerError::SystemUnavailable
            })
    }

    /// Drops the cached policy so the next read hits the store.
    pub async fn invalidate_config_cache(&self) {
        self.config_cache.invalidate().await;
    }

    /// Policy for recording a commission. A missing or inactive policy
    /// disables the program.
    pub(crate) async fn config_for_commission(&self) -> Result<Arc<ReferralConfig>, LedgerError> {
        match self.active_config(false).await? {
            Some(config) if config.is_active => Ok(config),
            _ => Err(LedgerError::ProgramDisabled),
        }
    }

    /// Policy for gating withdrawals. Without one no withdrawal terms exist.
    pub(crate) async fn config_for_withdrawal(&self) -> Result<Arc<ReferralConfig>, LedgerError> {
        self.active_config(false)
            .await?
            .ok_or(LedgerError::SystemUnavailable)
    }

    /// Replaces the active policy with a new version.
    ///
    /// Existing commissions keep their snapshotted amounts.
    pub async fn replace_config(
        &self,
        input: ReferralConfigInput,
    ) -> Result<ReferralConfig, LedgerError> {
        input
            .validate()
            .map_err(|err| LedgerError::InvalidInput(err.to_string()))?;

        let result = self.store.replace_active_config(&input, Utc::now()).await;
        self.invalidate_config_cache().await;
        let config = result?;

        tracing::info!(
            config_id = %config.id,
            commission_type = %config.commission_type,
            commission_percentage = %config.commission_percentage,
            release_days = config.release_days,
            "Referral config replaced"
        );
        Ok(config)
    }

    /// Deactivates the active policy, disabling new commissions.
    pub async fn disable_program(&self) -> Result<(), LedgerError> {
        let result = self.store.deactivate_config(Utc::now()).await;
        self.invalidate_config_cache().await;
        if !result? {
            return Err(LedgerError::NotFound("Active referral config"));
        }

        tracing::info!("Referral program disabled");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::referral_config::tests::sample_config;
    use crate::models::CommissionType;
    use crate::services::memory::{InMemoryLedgerStore, InMemoryProfileDirectory};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Ledger over in-memory stores, with the stores kept for inspection.
    pub struct Fixture {
        pub ledger: ReferralLedger,
        pub store: Arc<InMemoryLedgerStore>,
        pub directory: Arc<InMemoryProfileDirectory>,
    }

    impl Fixture {
        pub fn new(commission_type: CommissionType) -> Self {
            Self::with_config(sample_config(commission_type))
        }

        pub fn with_config(config: ReferralConfig) -> Self {
            let store = Arc::new(InMemoryLedgerStore::with_config(config));
            Self::from_store(store)
        }

        pub fn without_config() -> Self {
            Self::from_store(Arc::new(InMemoryLedgerStore::new()))
        }

        fn from_store(store: Arc<InMemoryLedgerStore>) -> Self {
            let directory = Arc::new(InMemoryProfileDirectory::new());
            let ledger = ReferralLedger::new(store.clone(), directory.clone());
            Self {
                ledger,
                store,
                directory,
            }
        }

        /// Adds a profile with the given slug and returns its id.
        pub fn user(&self, slug: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.directory.add_profile(id, slug, slug);
            id
        }
    }

    pub fn config_input(commission_type: CommissionType, percentage: i64) -> ReferralConfigInput {
        ReferralConfigInput {
            commission_percentage: Decimal::from(percentage),
            commission_type,
            fixed_commission_amount: (commission_type == CommissionType::Fixed)
                .then(|| Decimal::from(30)),
            release_days: 14,
            require_referred_active: false,
            min_withdrawal_amount: Decimal::from(100),
            payment_day: 5,
        }
    }

    #[tokio::test]
    async fn test_replace_config_invalidates_cache() {
        let fixture = Fixture::new(CommissionType::FirstPayment);
        let before = fixture.ledger.active_config(false).await.unwrap().unwrap();

        let replaced = fixture
            .ledger
            .replace_config(config_input(CommissionType::Recurring, 15))
            .await
            .unwrap();
        let after = fixture.ledger.active_config(false).await.unwrap().unwrap();

        assert_ne!(before.id, after.id);
        assert_eq!(after.id, replaced.id);
        assert_eq!(after.commission_type, CommissionType::Recurring);
        assert_eq!(after.commission_percentage, Decimal::from(15));
    }

    #[tokio::test]
    async fn test_replace_config_rejects_invalid_input() {
        let fixture = Fixture::new(CommissionType::FirstPayment);
        let mut input = config_input(CommissionType::Fixed, 10);
        input.fixed_commission_amount = None;

        let err = fixture.ledger.replace_config(input).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_disable_program() {
        let fixture = Fixture::new(CommissionType::FirstPayment);
        fixture.ledger.active_config(false).await.unwrap();

        fixture.ledger.disable_program().await.unwrap();

        assert!(fixture.ledger.active_config(false).await.unwrap().is_none());
        assert!(matches!(
            fixture.ledger.disable_program().await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_config_is_system_unavailable() {
        let fixture = Fixture::new(CommissionType::FirstPayment);
        fixture.store.set_config_unavailable(true);

        assert!(matches!(
            fixture.ledger.active_config(false).await,
            Err(LedgerError::SystemUnavailable)
        ));
    }
}
