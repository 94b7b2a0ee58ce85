//! OpenID token discovery, validation and refresh.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{blocking_runtime, build_http_client, RestClient};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Provider metadata from `.well-known/openid-configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    #[serde(default)]
    pub issuer: Option<String>,
    /// OAuth2 token endpoint.
    pub token_endpoint: String,
    /// JSON Web Key Set location.
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// An OpenID provider.
#[derive(Debug, Clone)]
pub struct OpenIdAuth {
    url: String,
    metadata: ProviderMetadata,
}

impl OpenIdAuth {
    /// Create from already known metadata.
    pub fn new(url: impl Into<String>, metadata: ProviderMetadata) -> Self {
        Self {
            url: url.into(),
            metadata,
        }
    }

    /// Fetch `<url>/.well-known/openid-configuration`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::OpenId` if the document is unavailable or lacks
    /// a `token_endpoint`.
    pub async fn discover(http: &Client, url: &str) -> ClientResult<Self> {
        let url = url.trim_end_matches('/');
        let well_known = format!("{url}/.well-known/openid-configuration");
        debug!(url = %well_known, "fetching OpenID provider metadata");

        let response = http.get(&well_known).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::openid(format!(
                "discovery at {well_known} failed with HTTP {status}"
            )));
        }

        let metadata = serde_json::from_slice(&body)
            .map_err(|e| ClientError::openid(format!("invalid provider metadata: {e}")))?;

        Ok(Self::new(url, metadata))
    }

    /// Provider base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Token endpoint.
    pub fn token_url(&self) -> &str {
        &self.metadata.token_endpoint
    }

    /// Discovered metadata.
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Decode a JWT and check that it is still usable.
    ///
    /// Rejects malformed tokens, tokens whose `exp` has passed, and tokens
    /// whose `iss` differs from the provider's issuer. The signature is not
    /// verified; the token is only being checked for freshness before use.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::OpenId` describing the first failed check.
    pub fn validate(&self, token: &str) -> ClientResult<Map<String, Value>> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::openid("malformed token"));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClientError::openid(format!("invalid token payload: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::openid(format!("invalid token claims: {e}")))?;

        if let Some(exp) = claims.get("exp") {
            let exp = exp
                .as_f64()
                .ok_or_else(|| ClientError::openid("exp claim is not numeric"))?;
            let now = Utc::now().timestamp() as f64;
            if exp <= now {
                return Err(ClientError::openid("token expired"));
            }
        }

        if let (Some(expected), Some(issuer)) = (
            self.metadata.issuer.as_deref(),
            claims.get("iss").and_then(Value::as_str),
        ) {
            if issuer != expected {
                return Err(ClientError::openid(format!(
                    "token issued by {issuer}, expected {expected}"
                )));
            }
        }

        Ok(claims)
    }
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// A [`RestClient`] that keeps its bearer token fresh with the OAuth2
/// refresh-token grant.
#[derive(Debug)]
pub struct OpenIdRestClient {
    client: RestClient,
    auth: OpenIdAuth,
    client_id: String,
    client_secret: String,
    tokens: Mutex<TokenState>,
}

impl OpenIdRestClient {
    /// Discover the provider at `token_url` and obtain a first access token.
    ///
    /// # Errors
    ///
    /// Fails on discovery errors, or with `ClientError::NoToken` if the
    /// refresh token is rejected.
    pub async fn connect(
        config: ClientConfig,
        token_url: &str,
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ClientResult<Self> {
        let client = RestClient::new(config)?;
        let auth = OpenIdAuth::discover(client.http(), token_url).await?;

        let this = Self {
            client,
            auth,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tokens: Mutex::new(TokenState {
                access_token: None,
                refresh_token: Some(refresh_token.into()),
            }),
        };
        this.access_token(this.client.http()).await?;

        Ok(this)
    }

    /// The OpenID provider.
    pub fn auth(&self) -> &OpenIdAuth {
        &self.auth
    }

    /// The wrapped client.
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Send a request with a fresh access token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoToken` when no token can be obtained, else
    /// the same errors as [`RestClient::request`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        args: Option<&Value>,
    ) -> ClientResult<Value> {
        let http = self.client.http();
        let token = self.access_token(http).await?;
        self.client
            .request_with_token(http, method, path, args, Some(&token))
            .await
    }

    /// Blocking version of [`request`](Self::request).
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request), plus `ClientError::Runtime`.
    pub fn request_seq(
        &self,
        method: Method,
        path: &str,
        args: Option<&Value>,
    ) -> ClientResult<Value> {
        let runtime = blocking_runtime()?;
        let http = build_http_client(self.client.config())?;
        runtime.block_on(async {
            let token = self.access_token(&http).await?;
            self.client
                .request_with_token(&http, method, path, args, Some(&token))
                .await
        })
    }

    /// Close the session.
    pub fn close(self) {
        self.client.close();
    }

    /// Current access token, refreshing it if it no longer validates.
    async fn access_token(&self, http: &Client) -> ClientResult<String> {
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = &tokens.access_token {
            match self.auth.validate(token) {
                Ok(_) => return Ok(token.clone()),
                Err(e) => {
                    debug!(error = %e, "OpenID token expired");
                    tokens.access_token = None;
                }
            }
        }

        // a failed refresh leaves no refresh token behind
        if let Some(refresh_token) = tokens.refresh_token.take() {
            match self.refresh(http, &refresh_token).await {
                Ok(grant) => {
                    debug!("OpenID token refreshed");
                    tokens.refresh_token = grant.refresh_token;
                    tokens.access_token = Some(grant.access_token.clone());
                    return Ok(grant.access_token);
                }
                Err(e) => warn!(error = %e, "OpenID token refresh failed"),
            }
        }

        Err(ClientError::NoToken)
    }

    async fn refresh(&self, http: &Client, refresh_token: &str) -> ClientResult<TokenGrant> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = http.post(self.auth.token_url()).form(&form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::status(
                status.as_u16(),
                String::from_utf8_lossy(&body),
            ));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    fn auth(issuer: Option<&str>) -> OpenIdAuth {
        OpenIdAuth::new(
            "https://keycloak.example.org/auth/realms/test",
            ProviderMetadata {
                issuer: issuer.map(ToString::to_string),
                token_endpoint: "https://keycloak.example.org/token".to_string(),
                jwks_uri: None,
            },
        )
    }

    #[test]
    fn test_validate_fresh_token() {
        let exp = Utc::now().timestamp() + 300;
        let claims = auth(None)
            .validate(&token(&json!({"sub": "alice", "exp": exp})))
            .unwrap();
        assert_eq!(claims["sub"], "alice");
    }

    #[test]
    fn test_validate_expired_token() {
        let exp = Utc::now().timestamp() - 10;
        let err = auth(None)
            .validate(&token(&json!({"exp": exp})))
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_validate_without_exp() {
        assert!(auth(None).validate(&token(&json!({"sub": "bob"}))).is_ok());
    }

    #[test]
    fn test_validate_malformed() {
        let auth = auth(None);
        assert!(auth.validate("not-a-jwt").is_err());
        assert!(auth.validate("a.b").is_err());
        assert!(auth.validate("a.b.c.d").is_err());
        assert!(auth.validate("a.!!!.c").is_err());
    }

    #[test]
    fn test_validate_issuer() {
        let auth = auth(Some("https://issuer.example.org"));
        assert!(auth
            .validate(&token(&json!({"iss": "https://issuer.example.org"})))
            .is_ok());
        assert!(auth
            .validate(&token(&json!({"iss": "https://elsewhere.example.org"})))
            .is_err());
    }

    #[test]
    fn test_provider_metadata_optional_fields() {
        let metadata: ProviderMetadata =
            serde_json::from_str(r#"{"token_endpoint": "https://idp/token"}"#).unwrap();
        assert_eq!(metadata.token_endpoint, "https://idp/token");
        assert!(metadata.issuer.is_none());
    }
}
