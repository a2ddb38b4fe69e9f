//! Persistence layer for the substitution tracker.
//!
//! This module provides the persistence-adapter abstraction the record store
//! is built against, allowing the storage backend to be swapped without
//! touching store logic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (frontend glue, import tooling)      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Record Store (store) - collections, dedup, queries     │
//! └─────────┬─────────────────────────────────┬─────────────┘
//!           │                                 │ write-through
//! ┌─────────▼─────────────────────┐ ┌─────────▼─────────────┐
//! │  PersistenceAdapter (trait)   │ │  LocalStore (floor)   │
//! │  postgres  │  local           │ │  one JSON file / key  │
//! └───────────────────────────────┘ └───────────────────────┘
//! ```
//!
//! The module includes:
//! - `adapter`: Trait definition for backend operations
//! - `postgres`: Postgres implementation with Diesel ORM (`postgres-repo`)
//! - `local`: JSON-file fallback storage and its adapter
//! - `factory`: Factory for creating adapter instances
//! - `config`: TOML configuration (`store.toml`)
//!
//! # Recommended Usage
//!
//! ```ignore
//! use sustituciones_rust::db::AdapterFactory;
//! use sustituciones_rust::store::Store;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let (adapter, local) = AdapterFactory::from_env().await?;
//!     let store = Store::open(adapter, local, Default::default()).await?;
//!     let _ = store.teachers();
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod factory;
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

#[cfg(feature = "postgres-repo")]
pub use postgres::{PoolStats, PostgresAdapter, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use adapter::{BackendKind, IdAssignment, PersistenceAdapter};
pub use config::StoreConfig;
pub use error::{ErrorContext, StoreError, StoreResult};
pub use factory::{AdapterBuilder, AdapterFactory};
pub use local::{
    LocalAdapter, LocalStore, KEY_AVAILABILITY, KEY_SUBJECTS, KEY_SUBSTITUTIONS, KEY_TEACHERS,
};
