use thiserror::Error;

/// Errors produced by the license registry, its storage layer and the client.
///
/// The first four variants are the outcomes a caller gates access on:
/// - `InvalidRequest` and the two denials are definitive answers.
/// - `StorageError` is indeterminate; the caller should retry later and must
///   not treat it as "not licensed".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LicenseError {
    /// A required input was missing, empty or out of bounds.
    #[error("{0}")]
    InvalidRequest(String),

    /// No license record exists for the identity.
    #[error("identity not licensed")]
    NotLicensed,

    /// The license is bound to a different fingerprint.
    #[error("hardware mismatch: licensed to a different machine")]
    HardwareMismatch,

    /// Storage was unreachable, timed out or rejected the statement.
    #[error("server error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Transport failure talking to a license server.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The license server answered with something we could not interpret.
    #[error("unexpected server response: {0}")]
    ServerError(String),
}

impl LicenseError {
    /// `true` for definitive license denials (not licensed, hardware mismatch).
    pub fn is_denial(&self) -> bool {
        matches!(self, LicenseError::NotLicensed | LicenseError::HardwareMismatch)
    }

    /// `true` when the outcome is indeterminate and the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LicenseError::StorageError(_) | LicenseError::NetworkError(_) | LicenseError::ServerError(_)
        )
    }
}

impl From<reqwest::Error> for LicenseError {
    fn from(err: reqwest::Error) -> Self {
        LicenseError::NetworkError(err.to_string())
    }
}

pub type LicenseResult<T> = Result<T, LicenseError>;
