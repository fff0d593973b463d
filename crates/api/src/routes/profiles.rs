//! Profile endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::profile::{ChangeRoleRequest, ProfileSummary, RenameRequest, SearchQuery};
use domain::models::Profile;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentSession;

/// The caller's profile. First contact creates it as a guest.
pub async fn get_me(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.me(session.get()).await?))
}

pub async fn rename(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Profile>, ApiError> {
    request.validate()?;
    Ok(Json(
        state
            .profiles
            .rename(session.get(), &request.username)
            .await?,
    ))
}

/// Up to five members whose username contains `q`, for partner and invitee
/// pickers.
pub async fn search(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError> {
    Ok(Json(
        state
            .profiles
            .search_members(session.get(), &query.q)
            .await?,
    ))
}

pub async fn change_role(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(user_id): Path<Uuid>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(
        state
            .profiles
            .change_role(session.get(), user_id, request.role)
            .await?,
    ))
}
