//! # Cadence Core Library
//!
//! The recurring-task scheduling engine behind the Cadence CRM: given a set
//! of recurrence series (daily/weekly/monthly/yearly tasks with an interval
//! and a reference timezone), it decides which single current instance must
//! exist for each series and materializes it exactly once, idempotently,
//! even under concurrent or repeated invocation.
//!
//! ## Features
//!
//! - **Timezone-Correct Date Arithmetic**: IANA timezone date-keys with
//!   noon-anchored interval stepping that survives DST transitions
//! - **Stable Series Identity**: deterministic hashed ids that group legacy
//!   rows created before an explicit series column existed
//! - **Idempotent Backfill**: at most one instance per (series, date),
//!   enforced by an existence check plus a storage uniqueness constraint
//!   that absorbs concurrent-run races
//! - **Injected Clock and Repository**: no ambient globals, so runs are
//!   deterministic under test
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and schema management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`backfill`]: The backfill engine and its run policy
//! - [`calendar`]: Date-key and timezone utilities
//! - [`identity`]: Series identity derivation
//! - [`error`]: Error types with context
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadence_core::{
//!     backfill::{BackfillConfig, BackfillEngine, SystemClock},
//!     db,
//!     repository::SqliteRepository,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let repository = SqliteRepository::new(pool);
//!
//!     let engine = BackfillEngine::new(
//!         repository,
//!         Arc::new(SystemClock),
//!         BackfillConfig::default(),
//!     );
//!
//!     // Dry run first: full computation, no writes.
//!     let preview = engine.run_backfill(true).await?;
//!     println!("would create {} task(s)", preview.tasks_created);
//!
//!     let summary = engine.run_backfill(false).await?;
//!     println!("created {} task(s)", summary.tasks_created);
//!
//!     Ok(())
//! }
//! ```

pub mod backfill;
pub mod calendar;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod repository;
