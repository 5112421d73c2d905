//! HTTP client for the license server.
//!
//! ```rust,ignore
//! use argus::client::VerifyClient;
//!
//! let client = VerifyClient::new("https://licenses.example.com")?;
//! match client.verify_this_machine("069a79f4-44e9-4726-a5be-fca90e38aaf5").await {
//!     Ok(v) => println!("licensed to {}", v.display_name()),
//!     Err(e) if e.is_denial() => eprintln!("not licensed here: {e}"),
//!     Err(e) => eprintln!("could not check license, try again later: {e}"),
//! }
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{LicenseError, LicenseResult};
use crate::hardware::get_hardware_id;
use crate::protocol::{
    HealthResponse, RegisterRequest, RegisterResponse, Verification, VerifyRequest,
    VerifyResponse,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for `/verify`, `/add_license` and `/health`.
#[derive(Debug, Clone)]
pub struct VerifyClient {
    base_url: String,
    http: Client,
}

impl VerifyClient {
    pub fn new(base_url: impl Into<String>) -> LicenseResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> LicenseResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verify `identity` against `fingerprint`, binding on first use.
    ///
    /// Denials come back as [`LicenseError::NotLicensed`] or
    /// [`LicenseError::HardwareMismatch`]; anything retryable as a storage,
    /// network or server error.
    pub async fn verify(&self, identity: &str, fingerprint: &str) -> LicenseResult<Verification> {
        let body = VerifyRequest {
            uuid: Some(identity.to_string()),
            hwid: Some(fingerprint.to_string()),
        };
        let response: VerifyResponse = self.post_json("/verify", &body).await?;
        debug!(code = ?response.code, "verify answered");
        response.into_result()
    }

    /// Verify `identity` using this machine's hardware fingerprint.
    pub async fn verify_this_machine(&self, identity: &str) -> LicenseResult<Verification> {
        self.verify(identity, &get_hardware_id()).await
    }

    /// Register or refresh a license.
    pub async fn register(
        &self,
        account_id: i64,
        identity: &str,
        display_name: &str,
    ) -> LicenseResult<()> {
        let body = RegisterRequest {
            discord_id: Some(account_id),
            minecraft_uuid: Some(identity.to_string()),
            username: Some(display_name.to_string()),
        };
        let response: RegisterResponse = self.post_json("/add_license", &body).await?;
        if response.success {
            Ok(())
        } else {
            Err(LicenseError::from_outcome(response.code, response.reason))
        }
    }

    /// Number of stored licenses, or the server's storage error.
    pub async fn health(&self) -> LicenseResult<i64> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let health: HealthResponse = decode(response).await?;
        match (health.status.as_str(), health.total_licenses) {
            ("healthy", Some(count)) => Ok(count),
            _ => Err(LicenseError::StorageError(
                health.error.unwrap_or_else(|| "database disconnected".to_string()),
            )),
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> LicenseResult<T>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

/// Decode a JSON body regardless of status; the body carries the outcome.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> LicenseResult<T> {
    let status = response.status();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        LicenseError::ServerError(format!("HTTP {status}: undecodable body ({e})"))
    })
}
