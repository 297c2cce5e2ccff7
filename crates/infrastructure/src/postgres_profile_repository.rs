use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qatrail_application::ProfileRepository;
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{Profile, Role, UserId, UserRole, UserRoleId};

use crate::store_error::store_error;

const SELECT_PROFILE: &str = r"
    SELECT id, full_name, email, avatar_url, created_at, updated_at
    FROM profiles
";

/// PostgreSQL-backed repository for user profiles and role assignments.
#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    full_name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            full_name: row.full_name,
            email: row.email,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    id: Uuid,
    user_id: Uuid,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRoleRow {
    fn into_domain(self) -> AppResult<UserRole> {
        Ok(UserRole {
            id: UserRoleId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            role: Role::from_str(&self.role)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!("{SELECT_PROFILE} WHERE id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_error("failed to load profile", error))?;

        Ok(row.map(Profile::from))
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> AppResult<Vec<Profile>> {
        let ids: Vec<Uuid> = user_ids.iter().map(UserId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProfileRow>(&format!("{SELECT_PROFILE} WHERE id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to load profiles", error))?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn list_profiles(&self) -> AppResult<Vec<Profile>> {
        let rows =
            sqlx::query_as::<_, ProfileRow>(&format!("{SELECT_PROFILE} ORDER BY full_name"))
                .fetch_all(&self.pool)
                .await
                .map_err(|error| store_error("failed to list profiles", error))?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<UserRole>> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            r"
            SELECT id, user_id, role, created_at
            FROM user_roles
            WHERE user_id = $1
            ORDER BY created_at
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list user roles", error))?;

        rows.into_iter().map(UserRoleRow::into_domain).collect()
    }
}
