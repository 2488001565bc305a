//! Password login, logout and the current-user endpoint.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AuthUser, LoginRequest, LogoutResponse, TokenResponse};
use crate::services::auth::issue_session_tokens;

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = state.auth.login(&body.email, &body.password).await?;
    let resp = issue_session_tokens(&state.auth, user, state.config.session_ttl_secs).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — drop the caller's session.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> AppResult<Json<LogoutResponse>> {
    state.auth.logout(&user.id).await?;
    Ok(Json(LogoutResponse { success: true }))
}

/// `GET /auth/me`
pub async fn me_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<AuthUser> {
    Json(user.into())
}
