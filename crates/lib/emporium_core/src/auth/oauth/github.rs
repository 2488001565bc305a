//! GitHub OAuth2 provider ("Sign in with GitHub").

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use super::{
    OAuthCredentials, OAuthProvider, ParsedEndpoints, ProviderEndpoints, send_json,
    url_with_params,
};
use crate::auth::AuthError;
use crate::models::auth::OAuthProfile;

/// Registry name of this provider.
pub const NAME: &str = "github";

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USERINFO_URL: &str = "https://api.github.com/user";

const SCOPE: &str = "user:email";

/// GitHub's API rejects requests without a User-Agent.
const CLIENT_USER_AGENT: &str = concat!("emporium/", env!("CARGO_PKG_VERSION"));

impl ProviderEndpoints {
    /// GitHub's public endpoints.
    pub fn github() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.into(),
            token_url: TOKEN_URL.into(),
            userinfo_url: USERINFO_URL.into(),
        }
    }
}

/// Response from GitHub's token endpoint. Failures come back as HTTP 200
/// with `error` set and no `access_token`.
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Response from GitHub's `/user` endpoint.
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

impl From<GitHubUser> for OAuthProfile {
    fn from(user: GitHubUser) -> Self {
        OAuthProfile {
            id: user.id.to_string(),
            email: user.email,
            name: user.name.unwrap_or(user.login),
            avatar_url: user.avatar_url,
        }
    }
}

/// GitHub OAuth2 adapter.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    http: Client,
    credentials: OAuthCredentials,
    endpoints: ParsedEndpoints,
}

impl GitHubProvider {
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
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn build_auth_url(&self, redirect_uri: &str, state: &str) -> String {
        url_with_params(
            &self.endpoints.authorize,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", SCOPE),
                ("state", state),
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
        ];
        let token: GitHubTokenResponse = send_json(
            self.http
                .post(self.endpoints.token.clone())
                .header(ACCEPT, "application/json")
                .form(&params),
            NAME,
            "token exchange",
        )
        .await?;

        let access_token = match token.access_token {
            Some(t) if !t.is_empty() => t,
            _ => {
                let reason = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "no access_token in response".into());
                return Err(AuthError::Provider(format!(
                    "{NAME} token exchange rejected: {reason}"
                )));
            }
        };

        let user: GitHubUser = send_json(
            self.http
                .get(self.endpoints.userinfo.clone())
                .header(AUTHORIZATION, format!("token {access_token}"))
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, CLIENT_USER_AGENT),
            NAME,
            "userinfo",
        )
        .await?;

        debug!(external_id = user.id, login = %user.login, "github profile fetched");
        Ok(user.into())
    }
}
