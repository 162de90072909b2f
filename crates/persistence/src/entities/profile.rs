//! Profile entity (database row mapping).

use sqlx::FromRow;
use uuid::Uuid;

/// Display data of a profile.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileNameEntity {
    pub id: Uuid,
    pub display_name: String,
}
