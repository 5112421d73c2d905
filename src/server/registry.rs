//! The license registry: register, verify, count and hardware reset.
//!
//! Every operation normalizes the identity, bounds its storage work with a
//! timeout and returns a structured [`LicenseResult`]. Nothing is retried
//! internally; a [`LicenseError::StorageError`] tells the caller to try again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{LicenseError, LicenseResult};
use crate::identity::normalize;
use crate::protocol::Verification;
use crate::server::database::Database;
use crate::server::logging::{log_license_event, LicenseEvent};
use crate::server::validation::{
    validate_max_length, MAX_DISPLAY_NAME_LEN, MAX_FINGERPRINT_LEN, MAX_IDENTITY_LEN,
};

/// Reason returned when verify is missing an input.
pub const MISSING_VERIFY_INPUT: &str = "missing identity or fingerprint";
/// Reason returned when register is missing an input.
pub const MISSING_REGISTER_INPUT: &str = "missing required fields";

/// License registry over an injected storage handle.
#[derive(Debug, Clone)]
pub struct LicenseRegistry {
    db: Arc<Database>,
    timeout: Duration,
}

impl LicenseRegistry {
    pub fn new(db: Arc<Database>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run `fut` under the operation timeout. Expiry is a storage error,
    /// never a denial.
    async fn bounded<T, F>(&self, op: &str, fut: F) -> LicenseResult<T>
    where
        F: Future<Output = LicenseResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{op} timed out after {:?}", self.timeout);
                Err(LicenseError::StorageError(format!(
                    "{op} timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Verify a license and bind it to `fingerprint` on first use.
    ///
    /// - unknown identity → `NotLicensed`
    /// - unbound → atomically bound to `fingerprint` → `Bound`
    ///   (`InvalidRequest` if `fingerprint` is too long to store)
    /// - bound to `fingerprint` (byte-exact) → `Verified`
    /// - bound to anything else → `HardwareMismatch`
    pub async fn verify(&self, identity: &str, fingerprint: &str) -> LicenseResult<Verification> {
        let identity = normalize(identity);
        if identity.is_empty() || fingerprint.is_empty() {
            return Err(LicenseError::InvalidRequest(MISSING_VERIFY_INPUT.to_string()));
        }

        let outcome = self
            .bounded("verify", self.verify_inner(&identity, fingerprint))
            .await;

        match &outcome {
            Ok(Verification::Bound { display_name }) => {
                log_license_event(LicenseEvent::Bound, &identity, Some(display_name))
            }
            Ok(Verification::Verified { display_name }) => {
                log_license_event(LicenseEvent::Verified, &identity, Some(display_name))
            }
            Err(LicenseError::NotLicensed) => {
                log_license_event(LicenseEvent::NotLicensed, &identity, None)
            }
            // Mismatch is logged inside, where the display name is known.
            Err(_) => {}
        }

        outcome
    }

    async fn verify_inner(&self, identity: &str, fingerprint: &str) -> LicenseResult<Verification> {
        let mut record = self
            .db
            .get_license(identity)
            .await?
            .ok_or(LicenseError::NotLicensed)?;

        if !record.is_bound() {
            // Only a fingerprint about to be stored has to fit the column.
            validate_max_length(fingerprint, "hwid", MAX_FINGERPRINT_LEN)?;
            if self.db.bind_hardware(identity, fingerprint).await? {
                return Ok(Verification::Bound {
                    display_name: record.display_name,
                });
            }

            // Lost the bind race: check against whichever fingerprint won.
            debug!("bind lost a race, re-reading record");
            record = self
                .db
                .get_license(identity)
                .await?
                .ok_or(LicenseError::NotLicensed)?;
        }

        if record.hardware_fingerprint.as_deref() == Some(fingerprint) {
            Ok(Verification::Verified {
                display_name: record.display_name,
            })
        } else {
            log_license_event(LicenseEvent::Mismatch, identity, Some(&record.display_name));
            Err(LicenseError::HardwareMismatch)
        }
    }

    /// Create a license or refresh its owner and display name.
    ///
    /// An existing hardware binding is never touched, so re-registering
    /// cannot move a license to new hardware.
    pub async fn register(
        &self,
        account_id: Option<i64>,
        identity: &str,
        display_name: &str,
    ) -> LicenseResult<()> {
        let identity = normalize(identity);
        let display_name = display_name.trim();
        let account_id = match account_id {
            Some(id) if id != 0 && !identity.is_empty() && !display_name.is_empty() => id,
            _ => {
                return Err(LicenseError::InvalidRequest(
                    MISSING_REGISTER_INPUT.to_string(),
                ))
            }
        };
        if account_id <= 0 {
            return Err(LicenseError::InvalidRequest(
                "invalid field discord_id: must be a positive integer".to_string(),
            ));
        }
        validate_max_length(&identity, "minecraft_uuid", MAX_IDENTITY_LEN)?;
        validate_max_length(display_name, "username", MAX_DISPLAY_NAME_LEN)?;

        self.bounded(
            "register",
            self.db.upsert_license(account_id, &identity, display_name),
        )
        .await?;

        log_license_event(LicenseEvent::Registered, &identity, Some(display_name));
        Ok(())
    }

    /// Total number of stored licenses.
    pub async fn count(&self) -> LicenseResult<i64> {
        self.bounded("count", self.db.count_licenses()).await
    }

    /// Clear a license's hardware binding so the next verify binds again.
    ///
    /// Returns whether a binding was actually cleared.
    pub async fn reset_binding(&self, identity: &str) -> LicenseResult<bool> {
        let identity = normalize(identity);
        if identity.is_empty() {
            return Err(LicenseError::InvalidRequest(
                MISSING_REGISTER_INPUT.to_string(),
            ));
        }

        let released = self
            .bounded("reset_binding", async {
                if self.db.clear_hardware(&identity).await? {
                    return Ok(true);
                }
                match self.db.get_license(&identity).await? {
                    Some(_) => Ok(false),
                    None => Err(LicenseError::NotLicensed),
                }
            })
            .await?;

        if released {
            log_license_event(LicenseEvent::Released, &identity, None);
        }
        Ok(released)
    }
}
