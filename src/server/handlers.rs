use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::errors::LicenseError;
use crate::identity::{normalize, redact};
use crate::protocol::{
    HealthResponse, OutcomeCode, RegisterRequest, RegisterResponse, VerifyRequest, VerifyResponse,
};
use crate::server::registry::LicenseRegistry;

#[cfg(feature = "admin-api")]
use crate::protocol::ResetRequest;

/// Shared application state for handlers.
///
/// Wraps the registry, which owns the injected database handle.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LicenseRegistry>,
}

impl AppState {
    pub fn new(registry: LicenseRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

/// HTTP status for an outcome.
///
/// License decisions, including denials, are 200. Bad input is 400 and
/// storage trouble is 503 so it is never cached as a denial.
pub fn status_for(code: OutcomeCode) -> StatusCode {
    match code {
        OutcomeCode::InvalidRequest => StatusCode::BAD_REQUEST,
        OutcomeCode::StorageError => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    }
}

impl IntoResponse for VerifyResponse {
    fn into_response(self) -> Response {
        (status_for(self.code), Json(self)).into_response()
    }
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (status_for(self.code), Json(self)).into_response()
    }
}

/// Plain-text banner for `/`.
pub async fn home_handler() -> &'static str {
    "Argus License Server - Running"
}

/// Handler for verifying a license.
///
/// Behavior:
/// - Unknown identity → `valid: false`, "identity not licensed"
/// - First use → binds the fingerprint, "hardware bound"
/// - Matching fingerprint → "verified"
/// - Other fingerprint → `valid: false`, "hardware mismatch: ..."
///
/// Unparseable bodies are treated like missing fields.
pub async fn verify_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> VerifyResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Rejected verify body: {rejection}");
            VerifyRequest::default()
        }
    };
    let identity = req.uuid.unwrap_or_default();
    let fingerprint = req.hwid.unwrap_or_default();

    let result = state.registry.verify(&identity, &fingerprint).await;
    if let Err(LicenseError::StorageError(detail)) = &result {
        error!("Verification error: {detail}");
    }

    VerifyResponse::from_result(&result, &redact(&normalize(&identity)))
}

/// Handler for registering (or refreshing) a license.
///
/// An existing hardware binding is preserved.
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> RegisterResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Rejected add_license body: {rejection}");
            if rejection.body_text().contains("discord_id") {
                return RegisterResponse::failed(&LicenseError::InvalidRequest(
                    "invalid field discord_id: must be an integer".to_string(),
                ));
            }
            RegisterRequest::default()
        }
    };

    let result = state
        .registry
        .register(
            req.discord_id,
            req.minecraft_uuid.as_deref().unwrap_or_default(),
            req.username.as_deref().unwrap_or_default(),
        )
        .await;

    match result {
        Ok(()) => RegisterResponse::ok(OutcomeCode::Registered, "license added"),
        Err(err) => {
            if err.is_retryable() {
                error!("Add license error: {err}");
            }
            RegisterResponse::failed(&err)
        }
    }
}

/// Handler for clearing a license's hardware binding.
#[cfg(feature = "admin-api")]
pub async fn reset_binding_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> RegisterResponse {
    let identity = match payload {
        Ok(Json(req)) => req.minecraft_uuid.unwrap_or_default(),
        Err(rejection) => {
            warn!("Rejected reset_hwid body: {rejection}");
            String::new()
        }
    };

    match state.registry.reset_binding(&identity).await {
        Ok(true) => RegisterResponse::ok(OutcomeCode::Released, "hardware binding cleared"),
        Ok(false) => RegisterResponse::ok(OutcomeCode::Released, "license was not bound"),
        Err(err) => {
            if err.is_retryable() {
                error!("Reset hwid error: {err}");
            }
            RegisterResponse::failed(&err)
        }
    }
}

/// Health check: storage reachability and license count.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.registry.count().await {
        Ok(count) => (StatusCode::OK, Json(HealthResponse::healthy(count))),
        Err(err) => {
            error!("Health check failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse::unhealthy(&err)),
            )
        }
    }
}
