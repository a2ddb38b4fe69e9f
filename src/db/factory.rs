//! Adapter factory for dependency injection.
//!
//! The record store takes its persistence adapter as a constructor argument;
//! this module centralizes how that adapter (and the local fallback store
//! next to it) gets built from environment variables or a config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::adapter::{BackendKind, PersistenceAdapter};
use super::config::StoreConfig;
use super::error::{StoreError, StoreResult};
use super::local::{LocalAdapter, LocalStore};
#[cfg(feature = "postgres-repo")]
use super::postgres::PostgresAdapter;
use super::PostgresConfig;

/// Default directory for the local fallback files.
pub const DEFAULT_DATA_DIR: &str = "./data";

impl BackendKind {
    /// Get the backend kind from environment variables.
    ///
    /// Reads `STORE_BACKEND`. Defaults to Postgres if a database URL is
    /// present, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("STORE_BACKEND") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

fn data_dir_from_env() -> PathBuf {
    std::env::var("LOCAL_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Factory for creating persistence adapters.
pub struct AdapterFactory;

impl AdapterFactory {
    /// Create an adapter of the given kind.
    ///
    /// # Arguments
    /// * `kind` - Backend to create
    /// * `postgres_config` - Database configuration (required for Postgres)
    /// * `local` - Local fallback store (used by the local backend)
    pub async fn create(
        kind: BackendKind,
        postgres_config: Option<&PostgresConfig>,
        local: LocalStore,
    ) -> StoreResult<Arc<dyn PersistenceAdapter>> {
        match kind {
            BackendKind::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        StoreError::configuration(
                            "Postgres backend requires a PostgresConfig",
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as Arc<dyn PersistenceAdapter>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = (postgres_config, local);
                    Err(StoreError::configuration(
                        "Postgres backend feature not enabled",
                    ))
                }
            }
            BackendKind::Local => Ok(Self::create_local(local)),
        }
    }

    /// Create a Postgres adapter.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(config: &PostgresConfig) -> StoreResult<Arc<PostgresAdapter>> {
        let adapter = PostgresAdapter::new(config.clone())?;
        Ok(Arc::new(adapter))
    }

    /// Create a local adapter over the given fallback store.
    pub fn create_local(local: LocalStore) -> Arc<dyn PersistenceAdapter> {
        Arc::new(LocalAdapter::new(local))
    }

    /// Create an adapter and its local fallback store from the environment.
    ///
    /// Reads `STORE_BACKEND` (falling back on `DATABASE_URL` presence) and
    /// `LOCAL_STORE_DIR`.
    pub async fn from_env() -> StoreResult<(Arc<dyn PersistenceAdapter>, LocalStore)> {
        let local = LocalStore::new(data_dir_from_env());

        match BackendKind::from_env() {
            BackendKind::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config =
                        PostgresConfig::from_env().map_err(StoreError::configuration)?;
                    let pg = Self::create_postgres(&config).await?;
                    Ok((pg as Arc<dyn PersistenceAdapter>, local))
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(StoreError::configuration(
                        "Postgres backend feature not enabled",
                    ))
                }
            }
            BackendKind::Local => {
                let adapter = Self::create_local(local.clone());
                Ok((adapter, local))
            }
        }
    }

    /// Create an adapter and its local fallback store from a TOML file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> StoreResult<(Arc<dyn PersistenceAdapter>, LocalStore)> {
        let config = StoreConfig::from_file(config_path)?;
        Self::from_store_config(&config).await
    }

    /// Create an adapter from the default configuration file location.
    ///
    /// Searches for `store.toml` in standard locations.
    pub async fn from_default_config() -> StoreResult<(Arc<dyn PersistenceAdapter>, LocalStore)> {
        let config = StoreConfig::from_default_location()?;
        Self::from_store_config(&config).await
    }

    /// Create an adapter from a parsed [`StoreConfig`].
    pub async fn from_store_config(
        config: &StoreConfig,
    ) -> StoreResult<(Arc<dyn PersistenceAdapter>, LocalStore)> {
        let kind = config
            .backend_kind()
            .map_err(|e| StoreError::configuration(format!("Invalid backend type: {}", e)))?;
        let local = LocalStore::new(&config.local.data_dir);

        match kind {
            BackendKind::Postgres => {
                let pg_config = config.to_postgres_config()?.ok_or_else(|| {
                    StoreError::configuration("Postgres backend requires database configuration")
                })?;
                let adapter = Self::create(kind, Some(&pg_config), local.clone()).await?;
                Ok((adapter, local))
            }
            BackendKind::Local => {
                let adapter = Self::create_local(local.clone());
                Ok((adapter, local))
            }
        }
    }
}

/// Builder for configuring adapter creation.
///
/// ```ignore
/// use sustituciones_rust::db::{AdapterBuilder, BackendKind};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (adapter, local) = AdapterBuilder::new()
///     .backend_kind(BackendKind::Local)
///     .data_dir("./data")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct AdapterBuilder {
    kind: BackendKind,
    data_dir: PathBuf,
    #[cfg(feature = "postgres-repo")]
    postgres_config: Option<PostgresConfig>,
}

impl AdapterBuilder {
    /// Create a new builder with environment defaults.
    pub fn new() -> Self {
        Self {
            kind: BackendKind::from_env(),
            data_dir: data_dir_from_env(),
            #[cfg(feature = "postgres-repo")]
            postgres_config: None,
        }
    }

    /// Set the backend kind.
    pub fn backend_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the local fallback data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the Postgres configuration.
    #[cfg(feature = "postgres-repo")]
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(mut self, config_path: P) -> Result<Self, StoreError> {
        let config = StoreConfig::from_file(config_path)?;

        self.kind = config
            .backend_kind()
            .map_err(|e| StoreError::configuration(format!("Invalid backend type: {}", e)))?;
        self.data_dir = PathBuf::from(&config.local.data_dir);

        if self.kind == BackendKind::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                let pg_config = config.to_postgres_config()?.ok_or_else(|| {
                    StoreError::configuration("Postgres backend requires database configuration")
                })?;
                self.postgres_config = Some(pg_config);
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(StoreError::configuration(
                    "Postgres backend feature not enabled",
                ));
            }
        }

        Ok(self)
    }

    /// Build the adapter and its local fallback store.
    pub async fn build(self) -> StoreResult<(Arc<dyn PersistenceAdapter>, LocalStore)> {
        let local = LocalStore::new(self.data_dir);

        #[cfg(feature = "postgres-repo")]
        let pg_config = self.postgres_config.as_ref();
        #[cfg(not(feature = "postgres-repo"))]
        let pg_config = None;

        let adapter = AdapterFactory::create(self.kind, pg_config, local.clone()).await?;
        Ok((adapter, local))
    }
}

impl Default for AdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_local(tag: &str) -> LocalStore {
        LocalStore::new(std::env::temp_dir().join(format!(
            "sustituciones-factory-{}-{}",
            tag,
            std::process::id()
        )))
    }

    #[tokio::test]
    async fn test_create_local_adapter() {
        let adapter = AdapterFactory::create_local(temp_local("create"));
        assert_eq!(adapter.kind(), BackendKind::Local);
        assert!(adapter.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_builder_local_adapter() {
        let root = std::env::temp_dir().join(format!(
            "sustituciones-factory-builder-{}",
            std::process::id()
        ));
        let (adapter, local) = AdapterBuilder::new()
            .backend_kind(BackendKind::Local)
            .data_dir(&root)
            .build()
            .await
            .unwrap();

        assert_eq!(adapter.kind(), BackendKind::Local);
        assert_eq!(local.root(), root.as_path());
        assert!(adapter.health_check().await.unwrap());
    }

    #[cfg(not(feature = "postgres-repo"))]
    #[tokio::test]
    async fn test_postgres_requires_feature() {
        let result =
            AdapterFactory::create(BackendKind::Postgres, None, temp_local("pgless")).await;
        assert!(result.is_err());
    }
}
