//! Background job that releases matured commissions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::services::ReferralLedger;

use super::scheduler::Job;
use crate::middleware::metrics::record_commissions_released;

/// Moves pending commissions past their release date to available, or to
/// awaiting verification when the referred user must be active and is not.
pub struct ReleaseCommissionsJob {
    ledger: Arc<ReferralLedger>,
    interval: Duration,
}

impl ReleaseCommissionsJob {
    pub fn new(ledger: Arc<ReferralLedger>, interval: Duration) -> Self {
        Self { ledger, interval }
    }
}

#[async_trait::async_trait]
impl Job for ReleaseCommissionsJob {
    fn name(&self) -> &'static str {
        "release_commissions"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        let summary = self
            .ledger
            .release_due_commissions(Utc::now())
            .await
            .map_err(|e| format!("Commission release failed: {}", e))?;

        record_commissions_released(summary.released);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{CommissionStatus, PageQuery, UtmMetadata};
    use domain::services::{InMemoryLedgerStore, InMemoryProfileDirectory};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_releases_commission_with_zero_release_days() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let directory = Arc::new(InMemoryProfileDirectory::new());
        let ledger = Arc::new(ReferralLedger::new(store.clone(), directory.clone()));

        ledger
            .replace_config(domain::models::ReferralConfigInput {
                commission_percentage: Decimal::from(10),
                commission_type: domain::models::CommissionType::Recurring,
                fixed_commission_amount: None,
                release_days: 0,
                require_referred_active: false,
                min_withdrawal_amount: Decimal::from(50),
                payment_day: 10,
            })
            .await
            .unwrap();

        let referrer = Uuid::new_v4();
        let referred = Uuid::new_v4();
        directory.add_profile(referrer, "ana", "Ana");
        directory.add_profile(referred, "bruno", "Bruno");
        ledger
            .register_referral("ana", referred, UtmMetadata::default())
            .await
            .unwrap();
        ledger
            .register_commission(referred, Decimal::from(200), Some("pay_1".into()))
            .await
            .unwrap();

        let job = ReleaseCommissionsJob::new(ledger.clone(), Duration::from_secs(60));
        assert_eq!(job.name(), "release_commissions");
        assert_eq!(job.interval(), Duration::from_secs(60));
        job.execute().await.unwrap();

        let commissions = ledger
            .list_commissions(referrer, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(commissions.len(), 1);
        assert_eq!(commissions[0].status, CommissionStatus::Available);
    }

    #[tokio::test]
    async fn test_unreadable_config_fails_run() {
        let store = Arc::new(InMemoryLedgerStore::new());
        store.set_config_unavailable(true);
        let ledger = Arc::new(ReferralLedger::new(
            store,
            Arc::new(InMemoryProfileDirectory::new()),
        ));

        let job = ReleaseCommissionsJob::new(ledger, Duration::from_secs(60));
        assert!(job.execute().await.is_err());
    }
}
