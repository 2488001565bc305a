//! OAuth2 federation with third-party identity providers.
//!
//! Each provider implements [`OAuthProvider`]: it builds the authorization
//! URL for the browser redirect and exchanges the returned code for a
//! normalized [`OAuthProfile`]. The exchange is always two sequential HTTP
//! calls (code → access token, access token → profile) and any failure is
//! surfaced immediately as [`AuthError::Provider`]. There are no retries.

pub mod github;
pub mod google;
pub mod state;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use super::AuthError;
use crate::models::auth::OAuthProfile;

pub use github::GitHubProvider;
pub use google::GoogleProvider;
pub use state::{OAuthPendingState, OAuthStateStore};

/// Capability set every identity provider offers.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name as registered with the auth manager (e.g. `"google"`).
    fn name(&self) -> &str;

    /// URL the user agent is redirected to in order to grant access.
    fn build_auth_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange an authorization code for the user's profile.
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
    -> Result<OAuthProfile, AuthError>;
}

/// Client credentials issued by a provider.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The three endpoints a provider exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Parsed form of [`ProviderEndpoints`], validated once at construction.
#[derive(Debug, Clone)]
pub(crate) struct ParsedEndpoints {
    pub authorize: Url,
    pub token: Url,
    pub userinfo: Url,
}

impl ProviderEndpoints {
    pub(crate) fn parse(&self) -> Result<ParsedEndpoints, AuthError> {
        let parse = |label: &str, raw: &str| {
            Url::parse(raw)
                .map_err(|e| AuthError::ValidationError(format!("invalid {label} url {raw}: {e}")))
        };
        Ok(ParsedEndpoints {
            authorize: parse("authorize", &self.authorize_url)?,
            token: parse("token", &self.token_url)?,
            userinfo: parse("userinfo", &self.userinfo_url)?,
        })
    }
}

/// Create a provider by name (`"google"` or `"github"`, case-insensitive)
/// using its public endpoints. Returns `Ok(None)` for unknown names.
pub fn create_provider(
    name: &str,
    http: Client,
    credentials: OAuthCredentials,
) -> Result<Option<Arc<dyn OAuthProvider>>, AuthError> {
    let provider: Arc<dyn OAuthProvider> = match name.to_ascii_lowercase().as_str() {
        google::NAME => Arc::new(GoogleProvider::new(
            http,
            credentials,
            ProviderEndpoints::google(),
        )?),
        github::NAME => Arc::new(GitHubProvider::new(
            http,
            credentials,
            ProviderEndpoints::github(),
        )?),
        _ => return Ok(None),
    };
    Ok(Some(provider))
}

/// Generate a cryptographic state parameter (CSRF token).
pub fn generate_state() -> String {
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Append query parameters to a base URL.
pub(crate) fn url_with_params(base: &Url, params: &[(&str, &str)]) -> String {
    let mut url = base.clone();
    url.query_pairs_mut().extend_pairs(params);
    url.into()
}

/// Send a request and decode a 2xx JSON body. `step` names the call in errors.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
    step: &str,
) -> Result<T, AuthError> {
    let resp = request
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("{provider} {step} failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::Provider(format!(
            "{provider} {step} HTTP {status}: {body}"
        )));
    }

    resp.json::<T>()
        .await
        .map_err(|e| AuthError::Provider(format!("{provider} {step} parse error: {e}")))
}
