//! Session extractor for handlers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::Session;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{bearer_token, UserAuth};

/// The caller's session, or `None` for anonymous requests.
///
/// Uses the identity placed in extensions by the auth middleware and falls
/// back to checking the header itself on routers without that layer.
#[derive(Debug, Clone, Copy)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn get(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(CurrentSession(Some(auth.session())));
        }

        let token = bearer_token(&parts.headers).map_err(|_| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        match token {
            None => Ok(CurrentSession(None)),
            Some(token) => UserAuth::validate(&state.jwt, token)
                .map(|auth| CurrentSession(Some(auth.session())))
                .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_current_session_get() {
        let user_id = Uuid::new_v4();
        assert_eq!(
            CurrentSession(Some(Session::new(user_id))).get(),
            Some(&Session::new(user_id))
        );
        assert!(CurrentSession(None).get().is_none());
    }
}
