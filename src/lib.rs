//! Argus - a per-device license registry
//!
//! A license binds an account to an application identity and, on first
//! successful verification, to one machine's hardware fingerprint. Later
//! verifications must present the same fingerprint.
//!
//! # Features
//!
//! - `server` - License registry, HTTP handlers and database. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `admin-api` - Adds the `/reset_hwid` route.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (server + sqlite)
//! argus = { package = "netviper-argus", version = "0.1" }
//!
//! # Client-only (no server components)
//! argus = { package = "netviper-argus", version = "0.1", default-features = false }
//!
//! # Server with PostgreSQL
//! argus = { package = "netviper-argus", version = "0.1", features = ["server", "postgres"] }
//! ```

#[cfg(all(feature = "server", not(any(feature = "sqlite", feature = "postgres"))))]
compile_error!("the `server` feature needs a database backend: enable `sqlite` or `postgres`");

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod hardware;
pub mod identity;
pub mod protocol;

// Client-related modules (always available)
pub mod client {
    pub mod verify_client;

    pub use verify_client::VerifyClient;
}

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
