//! Reservation domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::game_mode::GameMode;
use super::schedule::GameNight;
use super::table::TableId;

/// One seat held by one user at one table for one game night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Reservation {
    pub id: Uuid,
    pub table_id: TableId,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub game_mode: GameMode,
    pub created_at: DateTime<Utc>,
}

/// Row to be inserted for a new seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub table_id: TableId,
    pub user_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub game_mode: GameMode,
}

impl NewReservation {
    /// A seat spanning the whole game night.
    pub fn for_night(table_id: TableId, user_id: Uuid, night: &GameNight, mode: GameMode) -> Self {
        Self {
            table_id,
            user_id,
            starts_at: night.starts_at,
            ends_at: night.ends_at,
            game_mode: mode,
        }
    }
}

/// Reservation joined with the occupant's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupantRow {
    pub table_id: TableId,
    pub user_id: Uuid,
    pub game_mode: GameMode,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for reserving a seat.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateReservationRequest {
    #[validate(range(min = 1, max = 6, message = "table_id must be between 1 and 6"))]
    pub table_id: i16,

    pub game_mode: GameMode,

    /// Second member to seat at the same table in one go.
    pub partner_id: Option<Uuid>,
}

impl CreateReservationRequest {
    pub fn table(&self) -> Result<TableId, String> {
        TableId::new(self.table_id)
    }
}

/// Result of a successful `reserve` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReservationOutcome {
    pub game_night: GameNight,
    pub reservation: Reservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_reservation: Option<Reservation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::schedule::GameNightSchedule;

    #[test]
    fn test_new_reservation_spans_night() {
        let schedule = GameNightSchedule::default();
        let night = schedule.game_night_on(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
        let table = TableId::new(3).unwrap();
        let user = Uuid::new_v4();

        let new = NewReservation::for_night(table, user, &night, GameMode::KillTeam);
        assert_eq!(new.starts_at, night.starts_at);
        assert_eq!(new.ends_at, night.ends_at);
        assert_eq!(new.game_mode, GameMode::KillTeam);
    }

    #[test]
    fn test_create_reservation_request_validation() {
        let valid: CreateReservationRequest =
            serde_json::from_str(r#"{"table_id": 3, "game_mode": "40k"}"#).unwrap();
        assert!(valid.validate().is_ok());
        assert_eq!(valid.table().unwrap().get(), 3);
        assert!(valid.partner_id.is_none());

        let out_of_range: CreateReservationRequest =
            serde_json::from_str(r#"{"table_id": 7, "game_mode": "killteam"}"#).unwrap();
        assert!(out_of_range.validate().is_err());
        assert!(out_of_range.table().is_err());
    }

    #[test]
    fn test_create_reservation_request_rejects_unknown_mode() {
        let result = serde_json::from_str::<CreateReservationRequest>(
            r#"{"table_id": 1, "game_mode": "chess"}"#,
        );
        assert!(result.is_err());
    }
}
