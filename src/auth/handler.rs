//! Sign-in, token check, and the auth guard applied to every protected route.

use axum::{
    Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{Admins, COOKIE_NAME};
use crate::api::{LoginResponse, Msg};
use crate::error::{AppError, AppResult};
use crate::handler::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Response> {
    let admin = Admins::new(&state.db)
        .verify_credentials(&payload.username, &payload.password)
        .await?;

    let token = state.auth.issue(&admin.username)?;
    tracing::info!(username = %admin.username, "admin signed in");

    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        COOKIE_NAME,
        token,
        state.auth.token_ttl_seconds()
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            msg: "Auth Passed".to_string(),
            token,
        }),
    )
        .into_response())
}

/// Probe endpoint: reaching it at all means the guard accepted the token.
pub async fn authenticate() -> impl IntoResponse {
    Json(Msg::new("Auth Passed"))
}

/// Rejects the request before it reaches a handler unless the `jwt` cookie
/// holds a token we signed and it has not expired.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(cookie_value)
        .ok_or_else(|| AppError::Unauthorized("No auth token".to_string()))?;

    state.auth.verify_token(&token)?;
    Ok(next.run(request).await)
}

fn cookie_value(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_jwt_among_others() {
        assert_eq!(
            cookie_value("theme=dark; jwt=abc.def.ghi; lang=en"),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(cookie_value("jwt=solo"), Some("solo".to_string()));
        assert_eq!(cookie_value("theme=dark"), None);
        assert_eq!(cookie_value(""), None);
    }
}
