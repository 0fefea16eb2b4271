//! Credit estimation and cost accounting.
//!
//! Two static tables live here: the credit estimate for a (mode, length)
//! pair, used for the pre-flight balance check, and the per-model USD token
//! rates used to price completed calls. Actual credit charges are derived
//! from reported token usage, not the estimate.

use crate::llm::client::TokenUsage;
use crate::validation::CreationMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Requested output length / complexity for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    Flash,
    Short,
    #[default]
    Standard,
    Long,
    Epic,
}

impl StoryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLength::Flash => "flash",
            StoryLength::Short => "short",
            StoryLength::Standard => "standard",
            StoryLength::Long => "long",
            StoryLength::Epic => "epic",
        }
    }

    /// Token budget handed to the provider for this length.
    pub fn max_tokens(&self) -> u32 {
        match self {
            StoryLength::Flash => 1024,
            StoryLength::Short => 2048,
            StoryLength::Standard => 4096,
            StoryLength::Long => 8192,
            StoryLength::Epic => 16384,
        }
    }
}

/// Tokens covered by one credit when charging actual usage.
pub const TOKENS_PER_CREDIT: i64 = 1000;

/// Base credit cost per mode, at standard length.
fn mode_base_cost(mode: CreationMode) -> Decimal {
    match mode {
        CreationMode::Story => Decimal::new(5, 0),
        CreationMode::Novel => Decimal::new(8, 0),
        CreationMode::ChoiceBook => Decimal::new(10, 0),
        CreationMode::AiBuilder => Decimal::new(6, 0),
    }
}

/// Length multiplier, in tenths to stay exact in decimal arithmetic.
fn length_multiplier(length: StoryLength) -> Decimal {
    match length {
        StoryLength::Flash => Decimal::new(5, 1),    // 0.5
        StoryLength::Short => Decimal::new(8, 1),    // 0.8
        StoryLength::Standard => Decimal::new(10, 1), // 1.0
        StoryLength::Long => Decimal::new(18, 1),    // 1.8
        StoryLength::Epic => Decimal::new(30, 1),    // 3.0
    }
}

/// Estimated credit cost for a generation. Pure table lookup; unrecognized
/// modes have already been folded to `story` by [`CreationMode::parse`].
pub fn estimate_credits(mode: CreationMode, length: StoryLength) -> Decimal {
    mode_base_cost(mode) * length_multiplier(length)
}

/// Chapter generation is billed like a standard single-story call.
pub fn estimate_chapter_credits(length: StoryLength) -> Decimal {
    estimate_credits(CreationMode::Story, length)
}

/// Actual credits charged for a completed call: total tokens, ceiling-divided
/// by [`TOKENS_PER_CREDIT`], with a floor of one credit.
pub fn credits_for_usage(usage: &TokenUsage) -> Decimal {
    let total = usage.input_tokens + usage.output_tokens;
    let credits = (total + TOKENS_PER_CREDIT - 1) / TOKENS_PER_CREDIT;
    Decimal::from(credits.max(1))
}

/// USD credited to creators per published word.
pub fn creator_word_rate() -> Decimal {
    Decimal::new(1, 3) // $0.001
}

/// Estimated creator earnings for a body of published words.
pub fn creator_earnings(words: i64) -> Decimal {
    Decimal::from(words) * creator_word_rate()
}

/// USD rates per million tokens for a model.
#[derive(Debug, Clone, Copy)]
pub struct TokenRates {
    pub input_per_mtok: Decimal,
    pub output_per_mtok: Decimal,
}

/// Static per-model rate table. Unknown models fall back to the default
/// model's rates so cost accounting never fails a request.
pub fn token_rates(model: &str) -> TokenRates {
    match model {
        m if m.starts_with("claude-3-5-haiku") => TokenRates {
            input_per_mtok: Decimal::new(80, 2),    // $0.80
            output_per_mtok: Decimal::new(400, 2),  // $4.00
        },
        m if m.starts_with("claude-3-opus") => TokenRates {
            input_per_mtok: Decimal::new(1500, 2),  // $15.00
            output_per_mtok: Decimal::new(7500, 2), // $75.00
        },
        // claude-3-5-sonnet and anything unrecognized
        _ => TokenRates {
            input_per_mtok: Decimal::new(300, 2),   // $3.00
            output_per_mtok: Decimal::new(1500, 2), // $15.00
        },
    }
}

/// Approximate USD cost of a call from its token usage.
pub fn usd_cost(model: &str, usage: &TokenUsage) -> Decimal {
    let rates = token_rates(model);
    let mtok = Decimal::new(1_000_000, 0);
    (Decimal::from(usage.input_tokens) * rates.input_per_mtok
        + Decimal::from(usage.output_tokens) * rates.output_per_mtok)
        / mtok
}
