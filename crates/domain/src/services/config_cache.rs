//! TTL cache for the active commission policy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::models::ReferralConfig;

use super::error::StoreError;
use super::store::LedgerStore;

/// Default time a fetched policy is served without re-reading the store.
pub const DEFAULT_CONFIG_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<(Arc<ReferralConfig>, Instant)>,
    /// Bumped on every invalidation so an in-flight fetch that started before
    /// it does not repopulate the cache with the old policy.
    generation: u64,
}

/// Cached copy of the active policy.
///
/// Readers get an `Arc` snapshot; invalidation replaces the slot under the
/// write lock, so a reader sees either the old or the new policy.
#[derive(Debug)]
pub struct ConfigCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Returns the active policy, reading the store on a miss, on expiry or
    /// when `force_refresh` is set.
    ///
    /// If the store fails, the last fetched policy is served even if expired.
    /// `Ok(None)` means no policy is active; absence is never cached.
    pub async fn get(
        &self,
        store: &dyn LedgerStore,
        force_refresh: bool,
    ) -> Result<Option<Arc<ReferralConfig>>, StoreError> {
        let generation = {
            let state = self.state.read().await;
            if !force_refresh {
                if let Some((config, fetched_at)) = &state.entry {
                    if fetched_at.elapsed() < self.ttl {
                        return Ok(Some(Arc::clone(config)));
                    }
                }
            }
            state.generation
        };

        match store.fetch_active_config().await {
            Ok(Some(config)) => {
                let config = Arc::new(config);
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.entry = Some((Arc::clone(&config), Instant::now()));
                }
                Ok(Some(config))
            }
            Ok(None) => {
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.entry = None;
                }
                Ok(None)
            }
            Err(err) => {
                let state = self.state.read().await;
                match &state.entry {
                    Some((config, _)) => {
                        tracing::warn!(
                            error = %err,
                            config_id = %config.id,
                            "Failed to refresh referral config, serving cached copy"
                        );
                        Ok(Some(Arc::clone(config)))
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Drops the cached policy. Must follow every policy edit.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.entry = None;
        state.generation = state.generation.wrapping_add(1);
        tracing::debug!("Referral config cache invalidated");
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_TTL)
    }
}
