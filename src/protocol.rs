//! Wire types shared by the license server and the client.
//!
//! Field names follow the deployed HTTP contract (`uuid`, `hwid`,
//! `discord_id`, `minecraft_uuid`, `username`).

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{LicenseError, LicenseResult};

/// A successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// First use: the license is now bound to the presented fingerprint.
    Bound { display_name: String },
    /// The presented fingerprint matches the bound one.
    Verified { display_name: String },
}

impl Verification {
    pub fn display_name(&self) -> &str {
        match self {
            Verification::Bound { display_name } | Verification::Verified { display_name } => {
                display_name
            }
        }
    }

    /// Human-readable reason, as sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Verification::Bound { .. } => "hardware bound",
            Verification::Verified { .. } => "verified",
        }
    }
}

/// Machine-readable outcome codes.
///
/// These let clients tell a definitive denial apart from an indeterminate
/// failure without parsing `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeCode {
    HardwareBound,
    Verified,
    Registered,
    Released,
    InvalidRequest,
    NotLicensed,
    HardwareMismatch,
    StorageError,
}

impl From<&LicenseError> for OutcomeCode {
    fn from(err: &LicenseError) -> Self {
        match err {
            LicenseError::InvalidRequest(_) => OutcomeCode::InvalidRequest,
            LicenseError::NotLicensed => OutcomeCode::NotLicensed,
            LicenseError::HardwareMismatch => OutcomeCode::HardwareMismatch,
            LicenseError::StorageError(_)
            | LicenseError::ConfigError(_)
            | LicenseError::NetworkError(_)
            | LicenseError::ServerError(_) => OutcomeCode::StorageError,
        }
    }
}

impl From<&Verification> for OutcomeCode {
    fn from(v: &Verification) -> Self {
        match v {
            Verification::Bound { .. } => OutcomeCode::HardwareBound,
            Verification::Verified { .. } => OutcomeCode::Verified,
        }
    }
}

/// Accepts an account ID as either a JSON number or a numeric string.
///
/// Discord snowflakes exceed the range JavaScript numbers represent exactly,
/// so bots commonly send them as strings.
fn deserialize_account_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AccountId {
        Number(i64),
        Text(String),
    }

    match Option::<AccountId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AccountId::Number(n)) => Ok(Some(n)),
        Some(AccountId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(AccountId::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("discord_id must be an integer")),
    }
}

/// Request body for `/verify`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Response body for `/verify`.
#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub reason: String,
    pub code: OutcomeCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Redacted identity, only on "not licensed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl VerifyResponse {
    pub fn from_result(result: &LicenseResult<Verification>, redacted_identity: &str) -> Self {
        match result {
            Ok(verification) => Self {
                valid: true,
                reason: verification.reason().to_string(),
                code: verification.into(),
                username: Some(verification.display_name().to_string()),
                uuid: None,
            },
            Err(err) => Self {
                valid: false,
                reason: err.to_string(),
                code: err.into(),
                username: None,
                uuid: matches!(err, LicenseError::NotLicensed)
                    .then(|| redacted_identity.to_string()),
            },
        }
    }

    /// Convert back into the registry's result type.
    pub fn into_result(self) -> LicenseResult<Verification> {
        let display_name = self.username.unwrap_or_default();
        match self.code {
            OutcomeCode::HardwareBound if self.valid => Ok(Verification::Bound { display_name }),
            OutcomeCode::Verified if self.valid => Ok(Verification::Verified { display_name }),
            code => Err(LicenseError::from_outcome(code, self.reason)),
        }
    }
}

impl LicenseError {
    /// Rebuild an error from a failed response's code and reason.
    pub fn from_outcome(code: OutcomeCode, reason: String) -> Self {
        match code {
            OutcomeCode::InvalidRequest => LicenseError::InvalidRequest(reason),
            OutcomeCode::NotLicensed => LicenseError::NotLicensed,
            OutcomeCode::HardwareMismatch => LicenseError::HardwareMismatch,
            OutcomeCode::StorageError => {
                const PREFIX: &str = "server error: ";
                if reason.starts_with(PREFIX) {
                    LicenseError::StorageError(reason[PREFIX.len()..].to_string())
                } else {
                    LicenseError::StorageError(reason)
                }
            }
            other => LicenseError::ServerError(format!("unexpected outcome {other:?}: {reason}")),
        }
    }
}

/// Request body for `/add_license`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "deserialize_account_id")]
    pub discord_id: Option<i64>,
    #[serde(default)]
    pub minecraft_uuid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Response body for `/add_license` and `/reset_hwid`.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub reason: String,
    pub code: OutcomeCode,
}

impl RegisterResponse {
    pub fn ok(code: OutcomeCode, reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
            code,
        }
    }

    pub fn failed(err: &LicenseError) -> Self {
        Self {
            success: false,
            reason: err.to_string(),
            code: err.into(),
        }
    }
}

/// Request body for `/reset_hwid`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub minecraft_uuid: Option<String>,
}

/// Response body for `/health`.
#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_licenses: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn healthy(total_licenses: i64) -> Self {
        Self {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            total_licenses: Some(total_licenses),
            error: None,
        }
    }

    pub fn unhealthy(err: &LicenseError) -> Self {
        Self {
            status: "error".to_string(),
            database: "disconnected".to_string(),
            total_licenses: None,
            error: Some(err.to_string()),
        }
    }
}
