//! Generation orchestration.
//!
//! - [`dispatcher`]: the billable pipeline shared by story and chapter
//!   generation (validate, moderate, estimate, draft, generate, persist,
//!   deduct, log).
//! - [`facts`]: SFSL story-fact extraction and encoding, carried between
//!   generation calls so later chapters stay consistent.

pub mod dispatcher;
pub mod facts;
