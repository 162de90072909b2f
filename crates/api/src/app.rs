use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::ReferralLedger;
use persistence::{PgLedgerStore, PgProfileDirectory};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{
    admin_commissions, admin_referral_config, admin_withdrawals, health, referrals, webhooks,
    withdrawals,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub ledger: Arc<ReferralLedger>,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    /// State backed by Postgres stores on `pool`.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let ledger = ReferralLedger::with_config_ttl(
            Arc::new(PgLedgerStore::new(pool.clone())),
            Arc::new(PgProfileDirectory::new(pool.clone())),
            Duration::from_secs(config.referral.config_cache_ttl_secs),
        );
        Self::with_ledger(config, pool, Arc::new(ledger))
    }

    /// State around an already-built ledger.
    pub fn with_ledger(
        config: Config,
        pool: PgPool,
        ledger: Arc<ReferralLedger>,
    ) -> Result<Self, JwtError> {
        let jwt = JwtConfig::from_parts(&config.jwt.algorithm, &config.jwt.key, config.jwt.leeway_secs)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            ledger,
            jwt: Arc::new(jwt),
        })
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    Ok(build_router(AppState::new(config, pool)?))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // User routes (Bearer JWT, checked by the UserAuth extractor)
    let user_routes = Router::new()
        .route(
            "/api/v1/referrals",
            post(referrals::register_referral).get(referrals::list_referrals),
        )
        .route("/api/v1/referrals/link", get(referrals::referral_link))
        .route("/api/v1/referrals/balance", get(referrals::get_balance))
        .route(
            "/api/v1/referrals/commissions",
            get(referrals::list_commissions),
        )
        .route(
            "/api/v1/withdrawals/eligibility",
            get(withdrawals::eligibility),
        )
        .route(
            "/api/v1/withdrawals",
            post(withdrawals::request_withdrawal).get(withdrawals::list_withdrawals),
        );

    // Admin routes (Bearer JWT with the admin role, checked by AdminAuth)
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/referral-config",
            get(admin_referral_config::get_config).put(admin_referral_config::replace_config),
        )
        .route(
            "/api/v1/admin/referral-config/disable",
            post(admin_referral_config::disable_program),
        )
        .route(
            "/api/v1/admin/withdrawals",
            get(admin_withdrawals::list_withdrawals),
        )
        .route(
            "/api/v1/admin/withdrawals/:id/approve",
            post(admin_withdrawals::approve_withdrawal),
        )
        .route(
            "/api/v1/admin/withdrawals/:id/reject",
            post(admin_withdrawals::reject_withdrawal),
        )
        .route(
            "/api/v1/admin/withdrawals/:id/pay",
            post(admin_withdrawals::pay_withdrawal),
        )
        .route(
            "/api/v1/admin/commissions/:id/cancel",
            post(admin_commissions::cancel_commission),
        )
        .route(
            "/api/v1/admin/commissions/release",
            post(admin_commissions::release_due),
        );

    // Payment gateway (HMAC-signed body)
    let webhook_routes = Router::new().route(
        "/api/v1/webhooks/payments",
        post(webhooks::payment_received),
    );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security.cors_origins))
        .with_state(state)
}
