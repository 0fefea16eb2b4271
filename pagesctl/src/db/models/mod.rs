//! Database record structures matching table schemas.

pub mod chapters;
pub mod error_reports;
pub mod generation_logs;
pub mod profiles;
pub mod stories;
pub mod story_facts;
pub mod users;
