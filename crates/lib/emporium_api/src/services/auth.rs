//! Token issuance for freshly authenticated users.

use emporium_core::auth::AuthManager;
use emporium_core::models::auth::User;

use crate::error::AppResult;
use crate::models::TokenResponse;

/// Creates the user's session and pairs it with a refresh token.
///
/// The access token replaces any session the user already had.
pub async fn issue_session_tokens(
    auth: &AuthManager,
    user: User,
    ttl_secs: u64,
) -> AppResult<TokenResponse> {
    let access_token = auth.create_session(&user, ttl_secs).await?;
    let refresh_token = auth.issue_refresh_token(&user)?;
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".into(),
        expires_in: ttl_secs,
        user: user.into(),
    })
}
