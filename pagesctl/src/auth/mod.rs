//! Authentication and authorization.
//!
//! # Authentication Methods
//!
//! Tried in priority order by the [`current_user`] extractor:
//!
//! 1. **API key** - `Authorization: Bearer <key>`, for programmatic access
//! 2. **JWT session cookie** - browser clients, set by
//!    `/authentication/login`
//! 3. **Trusted proxy header** - SSO deployments where an auth proxy
//!    injects the user's email (optional auto-creation of unknown users)
//!
//! # Authorization
//!
//! Access control combines the admin flag, the subscription tier, the
//! creator flag, and resource ownership; see [`permissions`].
//!
//! # Modules
//!
//! - [`current_user`]: Extractor producing the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Permission checking logic
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
