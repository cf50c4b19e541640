//! OAuth 2.0 resource-owner password grant.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::credentials::ImpersonationParams;
use crate::error::{Error, ErrorKind, Result};

/// OAuth client issuing password-grant token requests.
#[derive(Clone)]
pub struct OAuthClient {
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient").finish_non_exhaustive()
    }
}

impl Default for OAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthClient {
    /// Create a new OAuth client.
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// Trade the given credentials for an access token.
    ///
    /// Posts `grant_type=password` to the identity endpoint selected by the
    /// params' instance. The submitted password is the user password with
    /// the security token appended. A non-success response is surfaced as
    /// [`ErrorKind::OAuth`] with the service's error code and description
    /// passed through verbatim.
    #[instrument(skip(self, params), fields(username = %params.username))]
    pub async fn password_grant(&self, params: &ImpersonationParams) -> Result<TokenResponse> {
        let password = params.password_with_token();
        let form = [
            ("grant_type", "password"),
            ("client_id", &params.client_id),
            ("client_secret", params.client_secret()),
            ("username", &params.username),
            ("password", &password),
        ];
        let body = serde_urlencoded::to_string(form)?;

        let response = self
            .http_client
            .post(format!("{}/services/oauth2/token", params.instance.login_url()))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: OAuthErrorResponse = response.json().await?;
            return Err(Error::new(ErrorKind::OAuth {
                error: error.error,
                description: error.error_description,
            }));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token)
    }
}

/// Token response from the identity service.
///
/// The access token is redacted in Debug output.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Base URL of the org instance the token is valid for.
    pub instance_url: String,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Identity URL of the authenticated user.
    #[serde(default)]
    pub id: Option<String>,
    /// Issued-at timestamp (epoch millis as a string).
    #[serde(default)]
    pub issued_at: Option<String>,
    /// Signature for verification.
    #[serde(default)]
    pub signature: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("token_type", &self.token_type)
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// OAuth error response body.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: String,
}
