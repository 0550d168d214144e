//! Database configuration and the shared connection handle.
//!
//! [`DatabaseConfig`] is an immutable value built once by the caller (the CLI
//! reads it from flags and the environment) and passed explicitly to
//! [`Database::connect`]. Nothing in the crate reads global configuration.

use std::env;
use std::sync::Arc;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::migrate::MigrateDatabase;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Any, AnyPool, ConnectOptions};
use tracing::{debug, info};

use crate::dialect::{dialect_for_url, Dialect};
use crate::error::{CoreError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    url: String,
    schema: String,
    max_connections: u32,
}

impl DatabaseConfig {
    /// Builds a configuration from a connection URL.
    ///
    /// The schema (database name) used to scope catalog queries is taken from
    /// the URL path for MySQL and is `main` for SQLite.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] for an unsupported scheme or a MySQL URL
    /// without a database name.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let dialect = dialect_for_url(&url)?;
        let schema = match dialect.default_schema() {
            Some(schema) => schema.to_string(),
            None => database_name_from_url(&url).ok_or_else(|| {
                CoreError::Config(format!("database URL '{}' names no database", redact(&url)))
            })?,
        };
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            DEFAULT_MAX_CONNECTIONS
        };

        Ok(Self {
            url,
            schema,
            max_connections,
        })
    }

    /// Builds a MySQL configuration from individual settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when the database name is empty.
    pub fn mysql(
        host: &str,
        port: Option<u16>,
        username: &str,
        password: &str,
        database: &str,
    ) -> Result<Self> {
        if database.is_empty() {
            return Err(CoreError::Config("database name is empty".to_string()));
        }
        let mut options = MySqlConnectOptions::new()
            .host(host)
            .username(username)
            .database(database);
        if !password.is_empty() {
            options = options.password(password);
        }
        if let Some(port) = port {
            options = options.port(port);
        }
        Self::new(options.to_url_lossy().to_string())
    }

    /// Reads the configuration from the environment.
    ///
    /// `DATABASE_URL` wins when set; otherwise a MySQL URL is assembled from
    /// `DB_HOST` (default `localhost`), `DB_PORT`, `DB_USERNAME`,
    /// `DB_PASSWORD` and `DB_NAME`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when neither form is available or a
    /// value is invalid.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Self::new(url);
        }

        let database = env::var("DB_NAME").map_err(|_| {
            CoreError::Config("set DATABASE_URL or DB_NAME/DB_USERNAME/DB_PASSWORD".to_string())
        })?;
        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let username = env::var("DB_USERNAME").unwrap_or_else(|_| "root".to_string());
        let password = env::var("DB_PASSWORD").unwrap_or_default();
        let port = match env::var("DB_PORT") {
            Ok(port) => Some(
                port.parse::<u16>()
                    .map_err(|_| CoreError::Config(format!("invalid DB_PORT '{port}'")))?,
            ),
            Err(_) => None,
        };

        Self::mysql(&host, port, &username, &password, &database)
    }

    /// Overrides the pool size.
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the URL with any password masked, for logs and messages.
    #[must_use]
    pub fn display_url(&self) -> String {
        redact(&self.url)
    }

    /// Returns the schema (database name) catalog queries are scoped to.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the configured pool size.
    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Returns the dialect matching the URL.
    ///
    /// # Errors
    ///
    /// Never fails for a configuration built by [`DatabaseConfig::new`].
    pub fn dialect(&self) -> Result<Arc<dyn Dialect>> {
        dialect_for_url(&self.url)
    }
}

/// A connected database: pool, dialect and the schema it is scoped to.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: Arc<dyn Dialect>,
    schema: String,
}

impl Database {
    /// Connects using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Connection`] when the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        install_default_drivers();
        let dialect = config.dialect()?;

        let mut options = AnyPoolOptions::new().max_connections(config.max_connections);
        if config.url.contains(":memory:") {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        debug!(url = %config.display_url(), "Connecting to database");
        let pool = options
            .connect(&config.url)
            .await
            .map_err(CoreError::Connection)?;

        Ok(Self::from_pool(pool, dialect, config.schema.clone()))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: AnyPool, dialect: Arc<dyn Dialect>, schema: impl Into<String>) -> Self {
        Self {
            pool,
            dialect,
            schema: schema.into(),
        }
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the schema catalog queries are scoped to.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Creates the configured database if it does not exist yet.
///
/// Returns `true` when the database was created by this call.
///
/// # Errors
///
/// Returns [`CoreError::Connection`] when the server cannot be reached.
pub async fn ensure_database_exists(config: &DatabaseConfig) -> Result<bool> {
    install_default_drivers();
    if config.url.contains(":memory:") {
        return Ok(false);
    }

    if Any::database_exists(&config.url)
        .await
        .map_err(CoreError::Connection)?
    {
        return Ok(false);
    }

    Any::create_database(&config.url)
        .await
        .map_err(CoreError::Connection)?;
    info!(schema = %config.schema, "Database created");
    Ok(true)
}

fn database_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split('?').next().unwrap_or_default();
    let after_scheme = without_query.split_once("://")?.1;
    let (_, path) = after_scheme.split_once('/')?;
    let name = path.trim_matches('/');
    (!name.is_empty()).then(|| name.to_string())
}

fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
