//! Reservation endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use domain::models::reservation::{CreateReservationRequest, ReservationOutcome};
use domain::models::{GameNight, OccupancySnapshot, Reservation, TableId};
use domain::services::ReservationChanged;
use domain::BookingError;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;
use crate::middleware::metrics::{record_reservation_rejected, record_reservations_created};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MyReservationResponse {
    pub game_night: GameNight,
    pub reservation: Option<Reservation>,
}

/// Seat counts, modes and occupant names for the active night.
pub async fn get_occupancy(
    State(state): State<AppState>,
) -> Result<Json<OccupancySnapshot>, ApiError> {
    Ok(Json(state.club.refresh().await?))
}

pub async fn my_reservation(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<MyReservationResponse>, ApiError> {
    let reservation = state.allocator().my_reservation(session.get()).await?;
    Ok(Json(MyReservationResponse {
        game_night: state.allocator().active_night(),
        reservation,
    }))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationOutcome>), ApiError> {
    request.validate()?;
    let table_id = request.table().map_err(ApiError::Validation)?;

    let outcome = state
        .club
        .reserve(session.get(), table_id, request.game_mode, request.partner_id)
        .await
        .map_err(rejected)?;

    record_reservations_created(1 + usize::from(outcome.partner_reservation.is_some()));
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// 404 when the caller holds no seat at the table, so a stale client view
/// surfaces instead of silently succeeding.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(table_id): Path<i16>,
) -> Result<StatusCode, ApiError> {
    let table_id = TableId::new(table_id).map_err(ApiError::Validation)?;
    state.club.cancel(session.get(), table_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent stream of reservation changes. A subscriber that falls
/// behind gets a `resync` event and should re-read occupancy.
pub async fn reservation_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.allocator().feed().subscribe();
    Sse::new(change_stream(receiver)).keep_alive(KeepAlive::default())
}

fn change_stream(
    receiver: broadcast::Receiver<ReservationChanged>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            let event = match receiver.recv().await {
                Ok(change) => match Event::default().event("reservation").json_data(&change) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping unserializable change event");
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => Event::default()
                    .event("resync")
                    .data(skipped.to_string()),
                Err(RecvError::Closed) => return None,
            };
            return Some((Ok(event), receiver));
        }
    })
}

fn rejected(err: BookingError) -> BookingError {
    record_reservation_rejected(err.code());
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::services::{ChangeFeed, ChangeKind};
    use futures::StreamExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_change_stream_forwards_events() {
        let feed = ChangeFeed::new(4);
        let mut events = Box::pin(change_stream(feed.subscribe()));

        feed.publish(ReservationChanged {
            table_id: TableId::new(2).unwrap(),
            user_id: Uuid::new_v4(),
            kind: ChangeKind::Created,
            at: Utc::now(),
        });

        assert!(events.next().await.is_some());
        drop(feed);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_change_stream_signals_lag() {
        let feed = ChangeFeed::new(1);
        let mut events = Box::pin(change_stream(feed.subscribe()));

        for _ in 0..3 {
            feed.publish(ReservationChanged {
                table_id: TableId::new(1).unwrap(),
                user_id: Uuid::new_v4(),
                kind: ChangeKind::Cancelled,
                at: Utc::now(),
            });
        }

        // lag notice, then the one retained event
        assert!(events.next().await.is_some());
        assert!(events.next().await.is_some());
    }
}
