//! Thin wrapper around the generation provider.
//!
//! - [`client`]: Anthropic Messages API client (fixed model, configured
//!   token budget and timeout). Remote failures surface as a single
//!   "service unavailable" condition; there is no retry or backoff.
//! - [`cache`]: in-memory response cache keyed by a hash of the prompt.
//! - [`prompts`]: prompt assembly from user fields and static instruction
//!   boilerplate.

pub mod cache;
pub mod client;
pub mod prompts;

pub use cache::ResponseCache;
pub use client::{AnthropicClient, Completion, CompletionRequest, TokenUsage};
