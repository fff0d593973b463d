//! Reservation entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::reservation::OccupantRow;
use domain::models::{GameMode, Reservation, TableId};
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for game_mode that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "game_mode")]
pub enum GameModeDb {
    #[sqlx(rename = "40k")]
    Warhammer40k,
    #[sqlx(rename = "killteam")]
    KillTeam,
    #[sqlx(rename = "aos_spearhead")]
    AosSpearhead,
}

impl From<GameModeDb> for GameMode {
    fn from(db: GameModeDb) -> Self {
        match db {
            GameModeDb::Warhammer40k => GameMode::Warhammer40k,
            GameModeDb::KillTeam => GameMode::KillTeam,
            GameModeDb::AosSpearhead => GameMode::AosSpearhead,
        }
    }
}

impl From<GameMode> for GameModeDb {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Warhammer40k => GameModeDb::Warhammer40k,
            GameMode::KillTeam => GameModeDb::KillTeam,
            GameMode::AosSpearhead => GameModeDb::AosSpearhead,
        }
    }
}

pub(crate) fn table_id(raw: i16) -> Result<TableId, StoreError> {
    TableId::new(raw).map_err(StoreError::Backend)
}

/// Database row mapping for the reservations table.
#[derive(Debug, Clone, FromRow)]
pub struct ReservationEntity {
    pub id: Uuid,
    pub table_id: i16,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub game_mode: GameModeDb,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReservationEntity> for Reservation {
    type Error = StoreError;

    fn try_from(entity: ReservationEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            table_id: table_id(entity.table_id)?,
            user_id: entity.user_id,
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            game_mode: entity.game_mode.into(),
            created_at: entity.created_at,
        })
    }
}

/// Reservation joined with the occupant's profile name.
#[derive(Debug, Clone, FromRow)]
pub struct OccupantEntity {
    pub table_id: i16,
    pub user_id: Uuid,
    pub game_mode: GameModeDb,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OccupantEntity> for OccupantRow {
    type Error = StoreError;

    fn try_from(entity: OccupantEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            table_id: table_id(entity.table_id)?,
            user_id: entity.user_id,
            game_mode: entity.game_mode.into(),
            username: entity.username,
            created_at: entity.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_mode_db_round_trip() {
        for mode in GameMode::ALL {
            assert_eq!(GameMode::from(GameModeDb::from(mode)), mode);
        }
    }

    #[test]
    fn test_entity_with_bad_table_is_rejected() {
        let entity = ReservationEntity {
            id: Uuid::new_v4(),
            table_id: 9,
            user_id: Uuid::new_v4(),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            game_mode: GameModeDb::KillTeam,
            created_at: Utc::now(),
        };
        assert!(matches!(
            Reservation::try_from(entity),
            Err(StoreError::Backend(_))
        ));
    }
}
