use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

use crate::server::handlers::{
    health_handler, home_handler, register_handler, verify_handler, AppState,
};
use crate::server::logging::request_logging_middleware;

#[cfg(feature = "admin-api")]
use crate::server::handlers::reset_binding_handler;

/// Build the main application router for the Argus server.
///
/// This is a convenience helper so `main.rs` or tests can
/// construct the router in a single call.
///
/// # Routes
///
/// - `GET /` - Banner
/// - `POST /verify` - Verify a license, binding it on first use
/// - `POST /add_license` - Register or refresh a license
/// - `GET /health` - Storage reachability and license count
///
/// ## Admin endpoints (requires `admin-api` feature)
/// - `POST /reset_hwid` - Clear a license's hardware binding
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(home_handler))
        .route("/verify", post(verify_handler))
        .route("/add_license", post(register_handler))
        .route("/health", get(health_handler));

    #[cfg(feature = "admin-api")]
    let router = router.route("/reset_hwid", post(reset_binding_handler));

    router
        .layer(ServiceBuilder::new().layer(middleware::from_fn(request_logging_middleware)))
        .with_state(state)
}
