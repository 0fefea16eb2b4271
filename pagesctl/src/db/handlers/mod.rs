//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed CRUD operations, handles query construction and parameter
//! binding, and returns domain models from [`crate::db::models`].
//!
//! # Common Pattern
//!
//! ```ignore
//! use pagesctl::db::handlers::Stories;
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Stories::new(&mut tx);
//!     // ... operations ...
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod api_keys;
pub mod chapters;
pub mod error_reports;
pub mod generation_logs;
pub mod profiles;
pub mod repository;
pub mod stories;
pub mod story_facts;
pub mod users;

pub use api_keys::ApiKeys;
pub use chapters::Chapters;
pub use error_reports::ErrorReports;
pub use generation_logs::GenerationLogs;
pub use profiles::Profiles;
pub use repository::Repository;
pub use stories::Stories;
pub use story_facts::StoryFacts;
pub use users::Users;
