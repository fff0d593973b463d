//! Session token authentication middleware.
//!
//! Tokens come from the external identity provider. A request without a
//! token passes through anonymously (the booking operations decide whether
//! that is allowed); a request with a bad token is rejected here.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::Session;
use serde_json::json;
use shared::jwt::{extract_user_id, JwtConfig, JwtError};
use uuid::Uuid;

use crate::app::AppState;

/// Authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl UserAuth {
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt_config.validate_token(token)?;
        Ok(UserAuth {
            user_id: extract_user_id(&claims)?,
            email: claims.email,
        })
    }

    pub fn session(&self) -> Session {
        Session::new(self.user_id)
    }
}

/// Bearer token from the `Authorization` header, if one is present.
/// `Err(())` means a header exists but is not a bearer token.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ()> {
    match headers.get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| Some(t.trim()))
            .ok_or(()),
    }
}

pub async fn user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => return next.run(req).await,
        Err(()) => return unauthorized_response("Invalid Authorization header format"),
    };

    match UserAuth::validate(&state.jwt, token) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Session token rejected");
            unauthorized_response("Invalid or expired token")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> JwtConfig {
        JwtConfig::from_secret("middleware_test_secret_0123456789", 900, 0)
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Ok(None));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Ok(Some("abc.def")));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), Err(()));
    }

    #[test]
    fn test_validate_round_trip() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = config
            .issue_session_token(user_id, Some("ork@example.com".into()))
            .unwrap();

        let auth = UserAuth::validate(&config, &token).unwrap();
        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.session(), Session::new(user_id));
        assert_eq!(auth.email.as_deref(), Some("ork@example.com"));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(UserAuth::validate(&config(), "garbage").is_err());
    }

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
