//! Invitation endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::invitation::{
    AcceptedInvitation, CreateInvitationRequest, CreatedInvitation, InvitationPreview,
};
use domain::models::Invitation;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;
use crate::middleware::metrics::{record_invitation_accepted, record_reservations_created};

/// Invites someone to the caller's table for the active game night.
pub async fn create_invitation(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreatedInvitation>), ApiError> {
    request.validate()?;
    let table_id = request.table().map_err(ApiError::Validation)?;
    let night = state.allocator().active_night();

    let created = state
        .invitations
        .create_invitation(session.get(), request.invitee_id, table_id, night.starts_at)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Public: the landing page renders this before the invitee signs in.
pub async fn preview_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationPreview>, ApiError> {
    Ok(Json(state.invitations.preview_invitation(&token).await?))
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(token): Path<String>,
) -> Result<Json<AcceptedInvitation>, ApiError> {
    let accepted = state
        .invitations
        .accept_invitation(session.get(), &token)
        .await?;

    record_invitation_accepted();
    record_reservations_created(1);
    Ok(Json(accepted))
}

pub async fn decline_invitation(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(token): Path<String>,
) -> Result<Json<Invitation>, ApiError> {
    Ok(Json(
        state
            .invitations
            .decline_invitation(session.get(), &token)
            .await?,
    ))
}
