//! Profile repository for database operations.

use async_trait::async_trait;
use domain::models::{Profile, Role};
use domain::services::ProfileStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ProfileEntity, RoleDb};
use crate::error::{backend, conflict_or_backend};
use crate::metrics::QueryTimer;

/// Repository for profile-related database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let timer = QueryTimer::new("find_profile_by_id");
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, username, role, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(backend)?.map(Profile::from))
    }

    async fn ensure(&self, id: Uuid) -> Result<Profile, StoreError> {
        let timer = QueryTimer::new("ensure_profile");
        // The no-op update makes RETURNING yield the existing row too.
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            INSERT INTO profiles (id)
            VALUES ($1)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING id, username, role, created_at
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(backend)?.into())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("update_profile_role");
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(RoleDb::from(role))
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(backend)?.rows_affected() == 1)
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("update_profile_username");
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET username = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(username)
        .execute(&self.pool)
        .await;
        timer.record();

        let done = result.map_err(|e| conflict_or_backend(e, "username already taken"))?;
        Ok(done.rows_affected() == 1)
    }

    async fn search(
        &self,
        query: &str,
        exclude: Uuid,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        let timer = QueryTimer::new("search_profiles");
        let pattern = format!("%{}%", escape_like(query));
        let result = sqlx::query_as::<_, ProfileEntity>(
            r#"
            SELECT id, username, role, created_at
            FROM profiles
            WHERE username ILIKE $1 AND id <> $2
            ORDER BY username
            LIMIT $3
            "#,
        )
        .bind(pattern)
        .bind(exclude)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result
            .map_err(backend)?
            .into_iter()
            .map(Profile::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ork"), "ork");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
