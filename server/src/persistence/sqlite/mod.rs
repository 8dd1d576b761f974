//! SQLite-backed document store.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer and multiple concurrent readers.
//! - **Busy timeout and pool size** from [`SqliteSettings`], so a writer
//!   waits for the current writer instead of failing with `SQLITE_BUSY`.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   automatically when [`Database::open`] is called. The schema is idempotent.
//!
//! ## Layout
//!
//! Every collection is a table holding the full JSON document in a
//! `document` column, next to the handful of columns used for lookups and
//! ordering. [`SqliteStore`] implements all repository traits from
//! [`crate::persistence::traits`] on top of one pool.
//!
//! `results.session_id` is `UNIQUE`, so a second result for the same
//! session is rejected by the database itself.

mod database;
mod document_store;

pub use database::{Database, SqliteSettings};
pub use document_store::SqliteStore;
