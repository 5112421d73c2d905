// src/server/mod.rs

//! Server-side components for Argus.
//!
//! This module contains:
//! - `database`    → DB abstraction over SQLite/Postgres
//! - `registry`    → License state machine (register, verify, count, reset)
//! - `handlers`    → Axum HTTP handlers for the license endpoints
//! - `routes`      → Router builder
//! - `logging`     → Audit events and request logging middleware
//! - `validation`  → Request validation utilities

pub mod database;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod routes;
pub mod validation;

pub use database::{Database, LicenseRecord};
pub use handlers::{
    health_handler, home_handler, register_handler, status_for, verify_handler, AppState,
};
pub use logging::{log_license_event, request_logging_middleware, LicenseEvent};
pub use registry::LicenseRegistry;
pub use routes::build_router;

#[cfg(feature = "admin-api")]
pub use handlers::reset_binding_handler;

pub use validation::{validate_max_length, ValidationError, ValidationResult};
