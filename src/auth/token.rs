/// OAuth2 access token exchanges
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{AuthorizedUserCredentials, ServiceAccountKey};
use super::AuthError;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const JWT_LIFETIME_SECS: i64 = 3600;

/// Bearer token for Google APIs
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_access_token(self, issued_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            token: self.access_token,
            expires_at: self
                .expires_in
                .map(|secs| issued_at + Duration::seconds(secs)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JwtClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Self-signed assertion for the JWT bearer grant
pub(crate) fn service_account_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = JwtClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now.timestamp(),
        exp: now.timestamp() + JWT_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Invalid service account private key")?;

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .context("Failed to sign service account assertion")
}

/// Exchange a signed service account assertion for an access token
pub async fn service_account_token(
    http: &Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<AccessToken> {
    let now = Utc::now();
    let assertion = service_account_assertion(key, scope, now)?;
    debug!("Requesting token for service account {}", key.client_email);

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .context("Failed to reach token endpoint")?;

    Ok(parse_token_response(response).await?.into_access_token(now))
}

/// Exchange a user refresh token for an access token
pub async fn authorized_user_token(
    http: &Client,
    credentials: &AuthorizedUserCredentials,
) -> Result<AccessToken> {
    let now = Utc::now();
    debug!("Refreshing user credentials for client {}", credentials.client_id);

    let response = http
        .post(&credentials.token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
        ])
        .send()
        .await
        .context("Failed to reach token endpoint")?;

    Ok(parse_token_response(response).await?.into_access_token(now))
}

/// Fetch the default service account token from the GCE metadata server
pub async fn metadata_token(http: &Client, metadata_host: &str) -> Result<AccessToken> {
    let now = Utc::now();
    let url = format!(
        "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
        metadata_host
    );
    debug!("GET {}", url);

    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| AuthError::NoCredentials(e.to_string()))?;

    Ok(parse_token_response(response).await?.into_access_token(now))
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();

    if status.is_success() {
        response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::TokenRejected {
            status: status.as_u16(),
            body,
        }
        .into())
    }
}
