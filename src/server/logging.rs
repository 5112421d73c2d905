//! Audit events and request logging middleware for Argus.
//!
//! This module provides:
//! - Structured audit events for license state changes and denials
//! - Unique request ID tracking
//! - Request timing
//! - Request ID propagation in response headers
//!
//! Identities are always redacted before they reach a log line.
//!
//! # Usage
//!
//! ```rust,ignore
//! use argus::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/health", get(health_handler))
//!     .layer(axum::middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::identity::redact;

/// License audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseEvent {
    /// License was created or its metadata refreshed
    Registered,
    /// License was bound to hardware on first use
    Bound,
    /// License was verified against its bound hardware
    Verified,
    /// Verification presented a different fingerprint
    Mismatch,
    /// Verification for an identity with no license
    NotLicensed,
    /// Hardware binding was cleared by an operator
    Released,
}

impl std::fmt::Display for LicenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseEvent::Registered => "registered",
            LicenseEvent::Bound => "bound",
            LicenseEvent::Verified => "verified",
            LicenseEvent::Mismatch => "mismatch",
            LicenseEvent::NotLicensed => "not_licensed",
            LicenseEvent::Released => "released",
        };
        write!(f, "{}", s)
    }
}

impl LicenseEvent {
    /// Denials are logged at `warn`, everything else at `info`.
    pub fn is_denial(&self) -> bool {
        matches!(self, LicenseEvent::Mismatch | LicenseEvent::NotLicensed)
    }
}

/// Log a license audit event.
///
/// # Arguments
///
/// * `event` - The type of license event
/// * `identity` - The normalized identity (redacted before logging)
/// * `display_name` - The license holder's display name, when known
pub fn log_license_event(event: LicenseEvent, identity: &str, display_name: Option<&str>) {
    let span = info_span!(
        "license_event",
        event = %event,
        identity = %redact(identity),
    );
    let _enter = span.enter();

    let name = display_name.unwrap_or("-");
    if event.is_denial() {
        warn!(display_name = %name, "License denied");
    } else {
        info!(display_name = %name, "License event occurred");
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// This middleware:
/// 1. Generates a unique request ID for each incoming request
/// 2. Creates a tracing span with the request ID
/// 3. Logs the request method and path
/// 4. Measures and logs the response time
/// 5. Adds the request ID to the response headers
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}
