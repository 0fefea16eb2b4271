//! Request/response data structures for API communication.

pub mod analytics;
pub mod chapters;
pub mod credits;
pub mod creators;
pub mod error_reports;
pub mod foundation;
pub mod pagination;
pub mod stories;
pub mod users;
