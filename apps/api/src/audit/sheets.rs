//! Google Sheets append client authenticated with a service account.
//!
//! Each append is two calls: an OAuth 2.0 JWT-bearer token exchange, then a
//! `values:append`. Tokens are not cached and nothing is retried.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::audit::{AuditError, AuditRecord, AuditSink};
use crate::config::AuditConfig;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(blob: &str) -> Result<Self, AuditError> {
        serde_json::from_str(blob).map_err(|e| AuditError::Credentials(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct SheetsClient {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    spreadsheet_id: String,
    range: String,
    api_url: String,
}

impl SheetsClient {
    /// Validates the credential blob and signing key up front, so a bad
    /// blob is caught at startup rather than on the first append.
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let key = ServiceAccountKey::from_json(&config.service_account_json)?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AuditError::Credentials(format!("private_key: {e}")))?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            key,
            encoding_key,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            api_url: config.sheets_api_url.trim_end_matches('/').to_string(),
        })
    }

    fn signed_assertion(&self) -> Result<String, AuditError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).map_err(|e| AuditError::Token(e.to_string()))
    }

    async fn access_token(&self) -> Result<String, AuditError> {
        let assertion = self.signed_assertion()?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Token(format!("status {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuditError::Token(e.to_string()))?;
        Ok(token.access_token)
    }

    fn append_url(&self) -> String {
        format!(
            "{}/{}/values/{}:append",
            self.api_url, self.spreadsheet_id, self.range
        )
    }
}

#[async_trait]
impl AuditSink for SheetsClient {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(self.append_url())
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [record.to_row()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuditError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Sheets append succeeded for spreadsheet {}", self.spreadsheet_id);
        Ok(())
    }
}
