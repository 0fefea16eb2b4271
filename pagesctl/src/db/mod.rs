//! Database layer for data persistence and access.
//!
//! SQLx + PostgreSQL behind the repository pattern:
//!
//! ```text
//! Handlers -> Repositories (db::handlers) -> Models (db::models) -> PostgreSQL
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//! - [`embedded`]: Embedded PostgreSQL support (optional feature)
//!
//! # Transactions
//!
//! Repositories borrow a `PgConnection`; multi-step mutations create the
//! repository from a transaction so either everything commits or nothing
//! does:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Stories::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Managed by SQLx from the `migrations/` directory and applied on startup
//! via [`crate::migrator`].

#[cfg(feature = "embedded-db")]
pub mod embedded;
pub mod errors;
pub mod handlers;
pub mod models;
