//! Invitation repository for database operations.

use async_trait::async_trait;
use domain::models::invitation::NewInvitation;
use domain::models::{Invitation, InvitationStatus};
use domain::services::InvitationStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{InvitationEntity, InvitationStatusDb};
use crate::error::{backend, conflict_or_backend};
use crate::metrics::QueryTimer;

/// Repository for invitation-related database operations.
#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationStore for InvitationRepository {
    async fn insert(&self, new: NewInvitation) -> Result<Invitation, StoreError> {
        let timer = QueryTimer::new("create_invitation");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            INSERT INTO invitations (inviter_id, invitee_id, table_id, game_date, token_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, inviter_id, invitee_id, table_id, game_date, status, token_hash, created_at
            "#,
        )
        .bind(new.inviter_id)
        .bind(new.invitee_id)
        .bind(new.table_id.get())
        .bind(new.game_date)
        .bind(&new.token_hash)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result
            .map_err(|e| conflict_or_backend(e, "token already in use"))?
            .try_into()
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let timer = QueryTimer::new("find_invitation_by_token_hash");
        let result = sqlx::query_as::<_, InvitationEntity>(
            r#"
            SELECT id, inviter_id, invitee_id, table_id, game_date, status, token_hash, created_at
            FROM invitations
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)?.map(Invitation::try_from).transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        invitee_id: Uuid,
        expected: InvitationStatus,
        new: InvitationStatus,
    ) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("transition_invitation");
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET status = $4, updated_at = NOW()
            WHERE id = $1 AND invitee_id = $2 AND status = $3
            "#,
        )
        .bind(id)
        .bind(invitee_id)
        .bind(InvitationStatusDb::from(expected))
        .bind(InvitationStatusDb::from(new))
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(backend)?.rows_affected() == 1)
    }
}
