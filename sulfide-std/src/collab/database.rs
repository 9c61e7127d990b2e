//! Persistence collaborator.
//!
//! SQL engines are external: a [`Driver`] opens a [`Connection`] from the
//! `database.*` settings. [`Database`] creates the connection on first use,
//! rewrites `~~~` to the configured table prefix, and reports connection use
//! through its own `core_database` subject.

use crate::{
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use sulfide_core::{BoxError, ConfigError, HookError, Parameters};
use thiserror::Error;

/// Emitted the first time the connection is created.
pub const CONNECTED: &str = "connected";
/// Emitted every time the connection is handed out.
pub const ACCESSED: &str = "accessed";

/// Placeholder replaced by the table prefix in every query.
pub const TABLE_PREFIX_PLACEHOLDER: &str = "~~~";

/// One result row, column name to value.
pub type Row = IndexMap<String, String>;

/// The `database` settings group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    /// Driver name, matched case-insensitively.
    pub driver: String,
    /// Server host.
    #[serde(default)]
    pub host: String,
    /// Database name.
    #[serde(default)]
    pub database_name: String,
    /// User name.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Replaces `~~~` in queries.
    #[serde(default)]
    pub table_prefix: String,
}

impl DatabaseSettings {
    /// Read the `database` group.
    pub fn from_config(config: &ConfigTree) -> Result<Self, ConfigError> {
        config.get_as(&["database"])
    }
}

/// An open database connection.
pub trait Connection: Send + Sync {
    /// Run `sql` with bound parameters.
    fn query(&self, sql: &str, params: &Parameters) -> Result<Vec<Row>, BoxError>;
}

/// Opens connections for one database engine.
pub trait Driver: Send + Sync {
    /// The driver name (`mysql`).
    fn name(&self) -> &str;

    /// Open a connection.
    fn connect(&self, settings: &DatabaseSettings) -> Result<Box<dyn Connection>, BoxError>;
}

/// Errors from the persistence collaborator.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// No driver with the configured name is registered.
    #[error("unsupported database driver `{driver}`")]
    UnsupportedDriver {
        /// The configured driver name.
        driver: String,
    },

    /// The driver failed to connect.
    #[error("failed to connect with driver `{driver}`")]
    Connect {
        /// The driver name.
        driver: String,
        /// The driver's error.
        #[source]
        source: BoxError,
    },

    /// The query failed.
    #[error("query failed")]
    Query(#[source] BoxError),

    /// A subscriber failed on `connected` or `accessed`.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The `database` settings are missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A lazily connected database handle.
pub struct Database {
    settings: DatabaseSettings,
    drivers: Vec<Arc<dyn Driver>>,
    connection: OnceLock<Box<dyn Connection>>,
    connecting: Mutex<()>,
    hooks: Arc<HookRegistry>,
}

impl Database {
    /// Create a handle from explicit settings. Nothing connects yet.
    pub fn new(settings: DatabaseSettings, drivers: Vec<Arc<dyn Driver>>) -> Self {
        Self {
            settings,
            drivers,
            connection: OnceLock::new(),
            connecting: Mutex::new(()),
            hooks: HookRegistry::new("core", "database"),
        }
    }

    /// Create a handle from the `database` settings group.
    pub fn from_config(
        config: &ConfigTree,
        drivers: Vec<Arc<dyn Driver>>,
    ) -> Result<Self, DatabaseError> {
        Ok(Self::new(DatabaseSettings::from_config(config)?, drivers))
    }

    /// The settings in use.
    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// Whether a connection has been created.
    pub fn is_connected(&self) -> bool {
        self.connection.get().is_some()
    }

    /// The connection, created on first use.
    ///
    /// Emits `connected` once, when the connection is created, and `accessed`
    /// on every call.
    pub fn connection(&self) -> Result<&dyn Connection, DatabaseError> {
        let connection = match self.connection.get() {
            Some(connection) => connection.as_ref(),
            None => self.connect()?,
        };
        self.hooks.emit(ACCESSED, &[])?;
        Ok(connection)
    }

    fn connect(&self) -> Result<&dyn Connection, DatabaseError> {
        let _guard = self.connecting.lock();
        if let Some(connection) = self.connection.get() {
            return Ok(connection.as_ref());
        }

        let driver = self
            .drivers
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(&self.settings.driver))
            .ok_or_else(|| DatabaseError::UnsupportedDriver {
                driver: self.settings.driver.clone(),
            })?;
        let opened = driver
            .connect(&self.settings)
            .map_err(|source| DatabaseError::Connect {
                driver: driver.name().to_owned(),
                source,
            })?;

        let connection = self.connection.get_or_init(|| opened);
        tracing::info!(driver = driver.name(), host = %self.settings.host, "database connected");
        self.hooks.emit(CONNECTED, &[])?;
        Ok(connection.as_ref())
    }

    /// Replace every `~~~` in `sql` with the table prefix.
    pub fn prefix_tables(&self, sql: &str) -> String {
        sql.replace(TABLE_PREFIX_PLACEHOLDER, &self.settings.table_prefix)
    }

    /// Run a query on the connection, after table-prefix substitution.
    pub fn query(&self, sql: &str, params: &Parameters) -> Result<Vec<Row>, DatabaseError> {
        let connection = self.connection()?;
        let sql = self.prefix_tables(sql);
        tracing::trace!(%sql, params = params.len(), "query");
        connection.query(&sql, params).map_err(DatabaseError::Query)
    }
}

impl Hookable for Database {
    fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.settings.driver)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
