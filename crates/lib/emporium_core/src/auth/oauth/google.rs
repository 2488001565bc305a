//! Google OAuth2 provider ("Sign in with Google").

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    OAuthCredentials, OAuthProvider, ParsedEndpoints, ProviderEndpoints, send_json,
    url_with_params,
};
use crate::auth::AuthError;
use crate::models::auth::OAuthProfile;

/// Registry name of this provider.
pub const NAME: &str = "google";

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPE: &str = "email profile";

impl ProviderEndpoints {
    /// Google's public endpoints.
    pub fn google() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.into(),
            token_url: TOKEN_URL.into(),
            userinfo_url: USERINFO_URL.into(),
        }
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Response from Google's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    /// Required: the `email` scope is always requested, so a userinfo body
    /// without it is treated as a malformed response (`Provider` error)
    /// rather than creating an account with no email.
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for OAuthProfile {
    fn from(info: GoogleUserInfo) -> Self {
        OAuthProfile {
            id: info.id,
            name: info.name.unwrap_or_else(|| info.email.clone()),
            email: Some(info.email),
            avatar_url: info.picture,
        }
    }
}

/// Google OAuth2 adapter.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    http: Client,
    credentials: OAuthCredentials,
    endpoints: ParsedEndpoints,
}

impl GoogleProvider {
    pub fn new(
        http: Client,
        credentials: OAuthCredentials,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            http,
            credentials,
            endpoints: endpoints.parse()?,
        })
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn build_auth_url(&self, redirect_uri: &str, state: &str) -> String {
        url_with_params(
            &self.endpoints.authorize,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("state", state),
                ("access_type", "offline"),
            ],
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthProfile, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let token: GoogleTokenResponse = send_json(
            self.http.post(self.endpoints.token.clone()).form(&params),
            NAME,
            "token exchange",
        )
        .await?;

        let info: GoogleUserInfo = send_json(
            self.http
                .get(self.endpoints.userinfo.clone())
                .bearer_auth(&token.access_token),
            NAME,
            "userinfo",
        )
        .await?;

        debug!(external_id = %info.id, "google profile fetched");
        Ok(info.into())
    }
}
