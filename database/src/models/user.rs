use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use tally_models::auth::User;
use tally_models::error::{slugs, AppError};
use tally_models::settings::{StoredSettings, UserSettings};

/// Row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub hash: String,
    pub settings: Json<StoredSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let settings = UserSettings::try_from(row.settings.0).map_err(|e| {
            tracing::error!(user_id = %row.uuid, error = %e, "Stored user settings are unreadable");
            AppError::unknown(e.to_string(), slugs::INTERNAL_SERVER_ERROR)
        })?;

        Ok(User {
            id: row.uuid,
            email: row.email,
            name: row.name,
            password_hash: row.hash,
            settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
