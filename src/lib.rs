//! # Control de Sustituciones data-access layer
//!
//! Backend-agnostic data layer for a school substitute-teacher tracker. It
//! manages four record collections (teachers, subjects, substitutions and
//! substitution-availability windows) and keeps them persisted to a remote
//! relational backend when one is reachable, with local JSON storage as a
//! durability floor either way.
//!
//! ## Features
//!
//! - **Record Store**: CRUD over the four collections with per-collection
//!   duplicate suppression and batched bulk imports
//! - **Availability matching**: find free substitutes by day and instant or
//!   by day and time range
//! - **Day/time normalization**: diacritic-insensitive weekday
//!   canonicalization and lenient clock-time parsing
//! - **Persistence adapters**: Postgres (Diesel, behind `postgres-repo`) or
//!   local JSON files, selected at construction
//! - **Backup & migration**: JSON export bundle and a one-shot
//!   local-to-remote migration helper
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`models`]: domain records, canonical days, clock-time helpers
//! - [`availability`]: the availability index queries
//! - [`store`]: the record store and its batching/export helpers
//! - [`db`]: persistence adapters, factory, configuration and errors
//!
//! ## Consistency model
//!
//! Mutations apply in memory first and propagate best-effort to the active
//! backend; a remote failure is logged, never surfaced as a hard error, and
//! never rolls back the local mutation. The local fallback files are
//! rewritten on every mutation regardless of the active backend.

pub mod availability;
pub mod db;
pub mod models;
pub mod store;

pub use availability::AvailabilityIndex;
pub use db::{AdapterBuilder, AdapterFactory, BackendKind, PersistenceAdapter, StoreError,
    StoreResult};
pub use models::{
    AvailabilityEntry, BatchInsertReport, CanonicalDay, InsertOutcome, NewAvailability,
    NewSubject, NewSubstitution, NewTeacher, ScheduleSlot, Stats, Subject, Substitution,
    SubstitutionPatch, Teacher,
};
pub use store::{ExportBundle, MigrationReport, Store};
