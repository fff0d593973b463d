//! Invitation entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Invitation, InvitationStatus};
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

use super::reservation::table_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
pub enum InvitationStatusDb {
    Pending,
    Accepted,
    Expired,
    Declined,
}

impl From<InvitationStatusDb> for InvitationStatus {
    fn from(db: InvitationStatusDb) -> Self {
        match db {
            InvitationStatusDb::Pending => InvitationStatus::Pending,
            InvitationStatusDb::Accepted => InvitationStatus::Accepted,
            InvitationStatusDb::Expired => InvitationStatus::Expired,
            InvitationStatusDb::Declined => InvitationStatus::Declined,
        }
    }
}

impl From<InvitationStatus> for InvitationStatusDb {
    fn from(status: InvitationStatus) -> Self {
        match status {
            InvitationStatus::Pending => InvitationStatusDb::Pending,
            InvitationStatus::Accepted => InvitationStatusDb::Accepted,
            InvitationStatus::Expired => InvitationStatusDb::Expired,
            InvitationStatus::Declined => InvitationStatusDb::Declined,
        }
    }
}

/// Database row mapping for the invitations table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationEntity {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub table_id: i16,
    pub game_date: DateTime<Utc>,
    pub status: InvitationStatusDb,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InvitationEntity> for Invitation {
    type Error = StoreError;

    fn try_from(entity: InvitationEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            inviter_id: entity.inviter_id,
            invitee_id: entity.invitee_id,
            table_id: table_id(entity.table_id)?,
            game_date: entity.game_date,
            status: entity.status.into(),
            token_hash: entity.token_hash,
            created_at: entity.created_at,
        })
    }
}
