//! Profile repository for database operations.
//!
//! Profiles are owned by the platform; the ledger only reads them.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ProfileNameEntity;
use crate::metrics::QueryTimer;

/// Read-only repository over profiles.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Creates a new ProfileRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the owner of a slug, case-insensitively.
    pub async fn find_id_by_slug(&self, slug: &str) -> Result<Option<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_profile_by_slug");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM profiles WHERE LOWER(slug) = LOWER($1)
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user's slug.
    pub async fn find_slug(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let timer = QueryTimer::new("find_profile_slug");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT slug FROM profiles WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Whether the user exists and is active.
    pub async fn is_active(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("profile_is_active");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1 AND is_active = TRUE)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Display names for a set of users.
    pub async fn display_names(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<ProfileNameEntity>, sqlx::Error> {
        let timer = QueryTimer::new("profile_display_names");
        let result = sqlx::query_as::<_, ProfileNameEntity>(
            r#"
            SELECT id, display_name FROM profiles WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
