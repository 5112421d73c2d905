use chrono::{NaiveDateTime, Utc};
use sqlx::{query, query_as, query_scalar, FromRow};
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
#[cfg(feature = "sqlite")]
use std::str::FromStr;

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{LicenseError, LicenseResult};

/// A license record as stored in the `licenses` table.
///
/// Column names are those of the deployed table; the struct uses the
/// registry's vocabulary.
#[derive(Debug, Clone, FromRow)]
pub struct LicenseRecord {
    pub id: i64,
    /// Owning account (a Discord user ID).
    #[sqlx(rename = "discord_id")]
    pub account_id: i64,
    /// Normalized identity, unique across the table.
    #[sqlx(rename = "minecraft_uuid")]
    pub identity: String,
    #[sqlx(rename = "username")]
    pub display_name: String,
    /// `None` until the first successful verify binds the license.
    #[sqlx(rename = "hwid")]
    pub hardware_fingerprint: Option<String>,
    pub created_at: NaiveDateTime,
}

impl LicenseRecord {
    pub fn is_bound(&self) -> bool {
        self.hardware_fingerprint.is_some()
    }
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
///
/// Both variants wrap a connection pool, so a `Database` is safe to share
/// between concurrent requests.
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// Log a failed statement and wrap it as a storage error.
fn storage_error(backend: &str, op: &str, e: sqlx::Error) -> LicenseError {
    error!("{backend} {op} failed: {e}");
    LicenseError::StorageError(format!("database error: {e}"))
}

impl Database {
    /// Initialize the database connection from the global configuration.
    ///
    /// See `crate::config` for configuration options.
    pub async fn new() -> LicenseResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await
    }

    /// Open a connection pool for the given database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> LicenseResult<Arc<Self>> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let options = SqliteConnectOptions::from_str(&db_config.sqlite_url)
                    .map_err(|e| {
                        LicenseError::ConfigError(format!("invalid SQLite URL: {e}"))
                    })?
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(db_config.timeout())
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        LicenseError::StorageError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(LicenseError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(db_config.timeout())
                    .connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        LicenseError::StorageError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(LicenseError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(LicenseError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Short backend name, as used in configuration.
    pub fn backend_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the `licenses` table if it does not exist yet.
    pub async fn init_schema(&self) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS licenses (
                        id             INTEGER PRIMARY KEY AUTOINCREMENT,
                        discord_id     INTEGER NOT NULL,
                        minecraft_uuid TEXT NOT NULL UNIQUE,
                        username       TEXT NOT NULL,
                        hwid           TEXT,
                        created_at     TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(|e| storage_error("SQLite", "init_schema", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS licenses (
                        id             BIGSERIAL PRIMARY KEY,
                        discord_id     BIGINT NOT NULL,
                        minecraft_uuid VARCHAR(32) NOT NULL UNIQUE,
                        username       VARCHAR(16) NOT NULL,
                        hwid           VARCHAR(64),
                        created_at     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(|e| storage_error("Postgres", "init_schema", e))?;
            }
        }

        Ok(())
    }

    /// Insert a new license or refresh an existing one.
    ///
    /// This acts like an "upsert" keyed on `identity`:
    /// - if the license doesn't exist, it is created unbound
    /// - if it exists, only `account_id` and `display_name` change;
    ///   the hardware binding and creation time are left alone
    pub async fn upsert_license(
        &self,
        account_id: i64,
        identity: &str,
        display_name: &str,
    ) -> LicenseResult<()> {
        let now = Utc::now().naive_utc();

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO licenses (discord_id, minecraft_uuid, username, created_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(minecraft_uuid) DO UPDATE SET
                        discord_id = excluded.discord_id,
                        username   = excluded.username
                    "#,
                )
                .bind(account_id)
                .bind(identity)
                .bind(display_name)
                .bind(now)
                .execute(pool)
                .await
                .map_err(|e| storage_error("SQLite", "upsert_license", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO licenses (discord_id, minecraft_uuid, username, created_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (minecraft_uuid) DO UPDATE SET
                        discord_id = EXCLUDED.discord_id,
                        username   = EXCLUDED.username
                    "#,
                )
                .bind(account_id)
                .bind(identity)
                .bind(display_name)
                .bind(now)
                .execute(pool)
                .await
                .map_err(|e| storage_error("Postgres", "upsert_license", e))?;
            }
        }

        Ok(())
    }

    /// Fetch a license by its normalized identity.
    ///
    /// Returns:
    /// - `Ok(Some(LicenseRecord))` if found
    /// - `Ok(None)` if not found
    /// - `Err(LicenseError::StorageError)` on DB failure
    pub async fn get_license(&self, identity: &str) -> LicenseResult<Option<LicenseRecord>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseRecord>(
                "SELECT id, discord_id, minecraft_uuid, username, hwid, created_at \
                     FROM licenses WHERE minecraft_uuid = ?",
            )
            .bind(identity)
            .fetch_optional(pool)
            .await
            .map_err(|e| storage_error("SQLite", "get_license", e)),
            // Older deployments created `id` as SERIAL (INT4).
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseRecord>(
                "SELECT id::BIGINT AS id, discord_id, minecraft_uuid, username, hwid, created_at \
                     FROM licenses WHERE minecraft_uuid = $1",
            )
            .bind(identity)
            .fetch_optional(pool)
            .await
            .map_err(|e| storage_error("Postgres", "get_license", e)),
        }
    }

    /// Bind an unbound license to `fingerprint`.
    ///
    /// A single conditional UPDATE guarded by `hwid IS NULL`, so among
    /// concurrent callers at most one ever succeeds for a given identity.
    ///
    /// Returns:
    /// - `Ok(true)` if this call performed the binding
    /// - `Ok(false)` if the license was already bound or does not exist
    pub async fn bind_hardware(&self, identity: &str, fingerprint: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE licenses \
                     SET hwid = ? \
                     WHERE minecraft_uuid = ? AND hwid IS NULL",
            )
            .bind(fingerprint)
            .bind(identity)
            .execute(pool)
            .await
            .map_err(|e| storage_error("SQLite", "bind_hardware", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE licenses \
                     SET hwid = $1 \
                     WHERE minecraft_uuid = $2 AND hwid IS NULL",
            )
            .bind(fingerprint)
            .bind(identity)
            .execute(pool)
            .await
            .map_err(|e| storage_error("Postgres", "bind_hardware", e))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Clear the hardware binding of a license.
    ///
    /// Returns `Ok(true)` if a bound license was released, `Ok(false)` if
    /// the license was unbound or does not exist.
    pub async fn clear_hardware(&self, identity: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE licenses \
                     SET hwid = NULL \
                     WHERE minecraft_uuid = ? AND hwid IS NOT NULL",
            )
            .bind(identity)
            .execute(pool)
            .await
            .map_err(|e| storage_error("SQLite", "clear_hardware", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE licenses \
                     SET hwid = NULL \
                     WHERE minecraft_uuid = $1 AND hwid IS NOT NULL",
            )
            .bind(identity)
            .execute(pool)
            .await
            .map_err(|e| storage_error("Postgres", "clear_hardware", e))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Total number of stored licenses.
    pub async fn count_licenses(&self) -> LicenseResult<i64> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar::<_, i64>("SELECT COUNT(*) FROM licenses")
                .fetch_one(pool)
                .await
                .map_err(|e| storage_error("SQLite", "count_licenses", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar::<_, i64>("SELECT COUNT(*) FROM licenses")
                .fetch_one(pool)
                .await
                .map_err(|e| storage_error("Postgres", "count_licenses", e)),
        }
    }
}
