//! OAuth2 authorization-code flow endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use emporium_core::auth::oauth::{OAuthPendingState, generate_state};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthorizeQuery, AuthorizeResponse, OAuthCallbackRequest, ProvidersResponse, TokenResponse,
};
use crate::services::auth::issue_session_tokens;

/// `GET /auth/oauth/providers`
pub async fn providers_handler(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = state
        .auth
        .oauth_providers()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(ProvidersResponse { providers })
}

/// `GET /auth/oauth/{provider}/authorize?redirectUri=...` — start the flow.
pub async fn authorize_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> AppResult<Json<AuthorizeResponse>> {
    if query.redirect_uri.is_empty() {
        return Err(AppError::Validation("redirectUri is required".into()));
    }
    let state_key = generate_state();
    // Unknown providers fail here, before any state is recorded.
    let url = state
        .auth
        .authorization_url(&provider, &query.redirect_uri, &state_key)?;
    state.oauth_state.insert(
        state_key.clone(),
        OAuthPendingState::new(&provider, &query.redirect_uri),
    );
    debug!(provider = %provider, "issued oauth authorization url");
    Ok(Json(AuthorizeResponse {
        url,
        state: state_key,
    }))
}

/// `POST /auth/oauth/{provider}/callback` — finish the flow and open a session.
pub async fn callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(body): Json<OAuthCallbackRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pending = state
        .oauth_state
        .take(&body.state)
        .ok_or_else(|| AppError::Unauthorized("Unknown or expired OAuth state".into()))?;
    if pending.provider != provider {
        warn!(expected = %pending.provider, got = %provider, "oauth state provider mismatch");
        return Err(AppError::Unauthorized("OAuth state does not match provider".into()));
    }

    let user = state
        .auth
        .login_oauth(&provider, &body.code, &pending.redirect_uri)
        .await?;
    let resp = issue_session_tokens(&state.auth, user, state.config.session_ttl_secs).await?;
    Ok(Json(resp))
}
