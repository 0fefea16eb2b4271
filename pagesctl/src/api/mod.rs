//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Register, login, logout
//! - **Stories** (`/api/stories/*`): Story creation/generation and chapters
//! - **Universe** (`/api/stories/{id}/universe/setup`): Foundation management
//! - **Creators** (`/api/creators/*`): Earnings views
//! - **Credits** (`/api/credits/*`): Balance and admin grants
//! - **Analytics** (`/api/analytics/*`): Usage aggregates
//! - **Errors** (`/api/errors`, `/api/admin/errors`): Error monitoring
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! the rendered docs are served at `/api/docs`.

pub mod handlers;
pub mod models;
