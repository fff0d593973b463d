//! Active game night and its booking window.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use domain::models::GameNight;
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GameNightResponse {
    pub game_night: GameNight,
    pub booking_opens_at: DateTime<Utc>,
    pub booking_closes_at: DateTime<Utc>,
    pub booking_open: bool,
}

pub async fn current(State(state): State<AppState>) -> Json<GameNightResponse> {
    let allocator = state.allocator();
    let night = allocator.active_night();
    let window = allocator.schedule().booking_window(&night);

    Json(GameNightResponse {
        game_night: night,
        booking_opens_at: window.from,
        booking_closes_at: window.to,
        booking_open: allocator.is_booking_open(),
    })
}
