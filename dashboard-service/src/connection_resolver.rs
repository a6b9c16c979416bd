//! Per-operation database connections.
//!
//! Resolves a logical database key to a URL through the static registry and
//! opens a single, unpooled connection to it. The caller owns the returned
//! [`DbConnection`] and must hand it back through [`DbConnection::close`].

use std::time::Duration;

use common::config::{AppConfig, DatabaseRegistry, DeploymentMode};
use common::errors::{AppError, AppResult};
use common::models::connection::{redact_url, DatabaseItem, DbType};
use common::utils::Dialect;
use sqlx::{Connection, PgConnection, SqliteConnection};

/// A live connection to one logical database.
pub enum DbConnection {
    /// PostgreSQL connection.
    Postgres(PgConnection),
    /// SQLite connection.
    Sqlite(SqliteConnection),
}

impl DbConnection {
    /// Returns the database type behind this connection.
    pub fn db_type(&self) -> DbType {
        match self {
            DbConnection::Postgres(_) => DbType::Postgres,
            DbConnection::Sqlite(_) => DbType::SQLite,
        }
    }

    /// Returns the SQL dialect for statements sent on this connection.
    pub fn dialect(&self) -> Dialect {
        Dialect::from(self.db_type())
    }

    /// Closes the connection. Consuming `self` makes a second close impossible.
    pub async fn close(self) {
        let result = match self {
            DbConnection::Postgres(conn) => conn.close().await,
            DbConnection::Sqlite(conn) => conn.close().await,
        };
        match result {
            Ok(()) => tracing::debug!("连接已关闭"),
            Err(e) => tracing::warn!(error = %e, "关闭连接失败"),
        }
    }
}

/// Opens connections for registered databases.
pub struct ConnectionResolver {
    registry: DatabaseRegistry,
    mode: DeploymentMode,
    connect_timeout: Duration,
}

impl ConnectionResolver {
    /// Creates a resolver from the immutable process configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            registry: config.databases.clone(),
            mode: config.mode,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    /// Returns the process-wide deployment mode.
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Opens a connection to `key` using the process-wide mode.
    pub async fn resolve(&self, key: &str) -> AppResult<DbConnection> {
        self.resolve_with_mode(key, self.mode).await
    }

    /// Opens a connection to `key` using the given URL variant.
    ///
    /// # Errors
    /// - `UnknownDatabase` if the key is not registered
    /// - `MissingConfiguration` if no URL exists for `mode`
    /// - `UnsupportedDatabaseType` for an unknown URL scheme
    /// - `ConnectionFailed` if the driver fails or the connect timeout elapses
    pub async fn resolve_with_mode(
        &self,
        key: &str,
        mode: DeploymentMode,
    ) -> AppResult<DbConnection> {
        let url = self.registry.url_for(key, mode)?;
        let db_type = DbType::from_url(url)?;

        tracing::info!(database = %key, mode = %mode, target = %redact_url(url), "打开数据库连接");

        let connect = async {
            match db_type {
                DbType::Postgres => PgConnection::connect(url).await.map(DbConnection::Postgres),
                DbType::SQLite => SqliteConnection::connect(url).await.map(DbConnection::Sqlite),
            }
        };

        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => {
                tracing::warn!(database = %key, error = %e, "数据库连接失败");
                Err(AppError::ConnectionFailed(e.to_string()))
            }
            Err(_) => Err(AppError::ConnectionFailed(format!(
                "timed out after {}s connecting to '{}'",
                self.connect_timeout.as_secs(),
                key
            ))),
        }
    }

    /// Describes every registered database for the current mode.
    pub fn describe_databases(&self) -> Vec<DatabaseItem> {
        self.registry
            .keys()
            .map(|key| {
                let url = self.registry.url_for(key, self.mode).ok();
                DatabaseItem {
                    key: key.to_string(),
                    mode: self.mode,
                    configured: url.is_some(),
                    db_type: url.and_then(|u| DbType::from_url(u).ok()),
                    target: url.map(redact_url),
                }
            })
            .collect()
    }
}
