//! The billable generation pipeline.
//!
//! Both story (foundation) and chapter generation run the same sequence:
//! validate, moderation pre-scan, estimate + balance check, draft, provider
//! call, moderation post-scan, persist + deduct + log in one transaction.
//! The progress counter is coarse and for UI display only.
//!
//! Billing invariants:
//! - No remote call is made unless the balance covers the estimate.
//! - The actual charge (from reported token usage) is deducted by a single
//!   conditional update; concurrent requests cannot overdraw.
//! - If that conditional update loses a race after a successful provider
//!   call, the remainder is clamped at zero and logged - the user keeps the
//!   content because the provider cost is already sunk.

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::{
    AppState,
    api::models::{
        chapters::ChapterCreateRequest,
        foundation::Foundation,
        stories::{GenerationMeta, Progress, StoryCreateRequest, StoryStatus},
    },
    db::{
        handlers::{Chapters, GenerationLogs, Profiles, Repository, Stories, StoryFacts},
        models::{
            chapters::{ChapterCreateDBRequest, ChapterDBResponse},
            generation_logs::{GenerationLogCreateDBRequest, GenerationOperation},
            profiles::UsageIncrement,
            stories::{StoryCreateDBRequest, StoryDBResponse},
        },
    },
    errors::{Error, Result},
    generation::facts,
    llm::{CompletionRequest, prompts},
    pricing,
    types::UserId,
    validation::{self, CreationMode},
};

const FOUNDATION_STEPS: u32 = 6;
const CHAPTER_STEPS: u32 = 6;

/// Result of a successful foundation generation.
pub struct FoundationOutcome {
    pub story: StoryDBResponse,
    pub meta: GenerationMeta,
}

/// Result of a successful chapter generation.
pub struct ChapterOutcome {
    pub chapter: ChapterDBResponse,
    pub story: StoryDBResponse,
    pub meta: GenerationMeta,
}

fn completed(total_steps: u32) -> Progress {
    Progress {
        current_step: total_steps,
        total_steps,
        stage: "complete".to_string(),
    }
}

/// Number of whitespace-separated words in generated prose.
fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

/// First ~40 words of a chapter, used as its stored summary and as the
/// context handed to the next chapter's prompt.
fn summarize(content: &str) -> String {
    let mut words: Vec<&str> = content.split_whitespace().take(40).collect();
    let truncated = words.len() == 40;
    if truncated {
        words.push("...");
    }
    words.join(" ")
}

/// Generate a story foundation: the `POST /api/stories` pipeline.
#[instrument(skip_all, fields(user = %crate::types::abbrev_uuid(&user_id)))]
pub async fn generate_story(state: &AppState, user_id: UserId, request: &StoryCreateRequest) -> Result<FoundationOutcome> {
    let mut warnings = Vec::new();

    // Step 1: resolve mode + validate the form
    let (mode, mode_warning) = match request.mode.as_deref() {
        Some(tag) => CreationMode::parse(tag),
        None => (CreationMode::Story, None),
    };
    warnings.extend(mode_warning);

    let length = request.length.unwrap_or_default();

    let report = validation::validate(mode, &request.form);
    if !report.valid {
        return Err(Error::Validation {
            errors: report.errors,
            warnings: report.warnings,
        });
    }
    warnings.extend(report.warnings);

    // Step 2: moderation pre-scan of everything user-supplied
    let user_text = [
        request.form.title.as_str(),
        request.form.premise.as_str(),
        request.form.description.as_deref().unwrap_or_default(),
        request.form.instructions.as_deref().unwrap_or_default(),
    ]
    .join("\n");
    let pre_scan = state.moderation.scan(&user_text);
    if state.moderation.should_block(&pre_scan) {
        return Err(Error::ContentBlocked {
            severity: pre_scan.severity,
            score: pre_scan.score,
        });
    }

    // Step 3: estimate and check the balance before any remote call
    let estimate = pricing::estimate_credits(mode, length);
    check_balance(state, user_id, estimate).await?;

    // Step 4: create the draft row
    let draft = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut stories_repo = Stories::new(&mut conn);
        stories_repo
            .create(&StoryCreateDBRequest {
                owner: user_id,
                title: request.form.title.clone(),
                genre: request.form.genre.clone(),
                premise: request.form.premise.clone(),
                mode,
                length,
            })
            .await?
    };

    // Step 5: call the provider (bounded by the generation limiter).
    // On failure the draft row stays behind in `draft` status.
    let _permit = state.limiters.acquire_generation(user_id).await?;

    let completion = state
        .llm
        .complete(&CompletionRequest {
            system: Some(prompts::foundation_system()),
            prompt: prompts::foundation_prompt(mode, &request.form)?,
            max_tokens: length.max_tokens(),
        })
        .await?;

    let post_scan = state.moderation.scan(&completion.text);
    let flagged = state.moderation.should_flag(&post_scan);
    if flagged {
        warnings.push("generated content was flagged by the moderation filter".to_string());
    }

    let foundation = Foundation::from_llm_text(&completion.text)?;
    foundation.ensure_mode(mode)?;
    let foundation_json = foundation.to_json()?;

    // Step 6: persist, deduct the actual cost, log, cache facts
    let credits = pricing::credits_for_usage(&completion.usage);
    let usd = pricing::usd_cost(&completion.model, &completion.usage);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let story = {
        let mut stories_repo = Stories::new(&mut tx);
        stories_repo
            .apply_generation(
                draft.id,
                Some(&foundation_json),
                Some(StoryStatus::InProgress),
                0,
                0,
                credits,
                usd,
            )
            .await?
    };

    let remaining = settle_charge(&mut tx, user_id, credits).await?;

    {
        let mut profiles_repo = Profiles::new(&mut tx);
        profiles_repo
            .record_usage(
                user_id,
                UsageIncrement {
                    tokens: completion.usage.total(),
                    stories: 1,
                    chapters: 0,
                },
            )
            .await?;
    }

    {
        let mut logs_repo = GenerationLogs::new(&mut tx);
        logs_repo
            .create(&GenerationLogCreateDBRequest {
                user_id,
                story_id: Some(story.id),
                operation: GenerationOperation::Foundation,
                model: completion.model.clone(),
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
                credits_charged: credits,
                usd_cost: usd,
                cached: completion.cached,
                flagged,
            })
            .await?;
    }

    {
        let mut facts_repo = StoryFacts::new(&mut tx);
        facts_repo
            .upsert_many(&facts::extract_from_foundation(story.id, &foundation))
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(FoundationOutcome {
        story,
        meta: GenerationMeta {
            progress: completed(FOUNDATION_STEPS),
            credits_charged: credits,
            credits_remaining: remaining,
            usage: completion.usage,
            cached: completion.cached,
            flagged,
            warnings,
        },
    })
}

/// Generate the next chapter of a story: the
/// `POST /api/stories/{id}/chapters` pipeline. The caller has already
/// fetched the story and checked ownership.
#[instrument(skip_all, fields(story = %crate::types::abbrev_uuid(&story.id)))]
pub async fn generate_chapter(
    state: &AppState,
    user_id: UserId,
    story: &StoryDBResponse,
    request: &ChapterCreateRequest,
) -> Result<ChapterOutcome> {
    let mut warnings = Vec::new();

    // Step 1: the story must have a foundation to write against
    if story.foundation.is_none() {
        return Err(Error::BadRequest {
            message: "Story has no foundation yet; generate it first".to_string(),
        });
    }
    if story.status == StoryStatus::Published {
        return Err(Error::BadRequest {
            message: "Cannot add chapters to a published story".to_string(),
        });
    }

    // Step 2: moderation pre-scan of the author guidance, if any
    if let Some(guidance) = &request.guidance {
        let scan = state.moderation.scan(guidance);
        if state.moderation.should_block(&scan) {
            return Err(Error::ContentBlocked {
                severity: scan.severity,
                score: scan.score,
            });
        }
    }

    // Step 3: estimate and check the balance
    let length = request.length.unwrap_or(story.length);
    let estimate = pricing::estimate_chapter_credits(length);
    check_balance(state, user_id, estimate).await?;

    // Step 4: assemble context (facts digest + previous chapter summary)
    let (facts_digest, previous_summary, next_number) = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let stored = {
            let mut facts_repo = StoryFacts::new(&mut conn);
            facts_repo.list_for_story(story.id).await?
        };

        let mut chapters_repo = Chapters::new(&mut conn);
        let latest = chapters_repo.latest(story.id).await?;
        let next_number = latest.as_ref().map(|c| c.chapter_number + 1).unwrap_or(1);
        let previous_summary = latest.and_then(|c| c.summary);

        (facts::digest(&stored), previous_summary, next_number)
    };

    // Step 5: call the provider
    let _permit = state.limiters.acquire_generation(user_id).await?;

    let completion = state
        .llm
        .complete(&CompletionRequest {
            system: Some(prompts::chapter_system()),
            prompt: prompts::chapter_prompt(
                &story.title,
                &story.genre,
                &story.premise,
                next_number,
                &facts_digest,
                previous_summary.as_deref(),
                request.guidance.as_deref(),
            )?,
            max_tokens: length.max_tokens(),
        })
        .await?;

    let post_scan = state.moderation.scan(&completion.text);
    let flagged = state.moderation.should_flag(&post_scan);
    if flagged {
        warnings.push("generated content was flagged by the moderation filter".to_string());
    }

    // Step 6: persist, deduct, log
    let credits = pricing::credits_for_usage(&completion.usage);
    let usd = pricing::usd_cost(&completion.model, &completion.usage);
    let words = word_count(&completion.text);
    let summary = summarize(&completion.text);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let chapter = {
        let mut chapters_repo = Chapters::new(&mut tx);
        chapters_repo
            .create(&ChapterCreateDBRequest {
                story_id: story.id,
                title: format!("Chapter {next_number}"),
                content: completion.text.clone(),
                summary: Some(summary.clone()),
                word_count: words,
                credits_spent: credits,
                usd_cost: usd,
            })
            .await?
    };

    let story_status = (story.status == StoryStatus::Draft).then_some(StoryStatus::InProgress);
    let updated_story = {
        let mut stories_repo = Stories::new(&mut tx);
        stories_repo
            .apply_generation(story.id, None, story_status, words, 1, credits, usd)
            .await?
    };

    let remaining = settle_charge(&mut tx, user_id, credits).await?;

    {
        let mut profiles_repo = Profiles::new(&mut tx);
        profiles_repo
            .record_usage(
                user_id,
                UsageIncrement {
                    tokens: completion.usage.total(),
                    stories: 0,
                    chapters: 1,
                },
            )
            .await?;
    }

    {
        let mut logs_repo = GenerationLogs::new(&mut tx);
        logs_repo
            .create(&GenerationLogCreateDBRequest {
                user_id,
                story_id: Some(story.id),
                operation: GenerationOperation::Chapter,
                model: completion.model.clone(),
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
                credits_charged: credits,
                usd_cost: usd,
                cached: completion.cached,
                flagged,
            })
            .await?;
    }

    {
        let mut facts_repo = StoryFacts::new(&mut tx);
        facts_repo
            .upsert(&facts::chapter_fact(story.id, chapter.chapter_number, &summary))
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(ChapterOutcome {
        chapter,
        story: updated_story,
        meta: GenerationMeta {
            progress: completed(CHAPTER_STEPS),
            credits_charged: credits,
            credits_remaining: remaining,
            usage: completion.usage,
            cached: completion.cached,
            flagged,
            warnings,
        },
    })
}

/// Pre-flight balance check against the estimate. No remote call is made
/// when this fails.
async fn check_balance(state: &AppState, user_id: UserId, estimate: Decimal) -> Result<()> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut profiles_repo = Profiles::new(&mut conn);
    let available = profiles_repo.balance(user_id).await?;

    if available < estimate {
        return Err(Error::InsufficientCredits {
            required: estimate,
            available,
        });
    }

    Ok(())
}

/// Deduct the actual charge. The conditional update is exactly-once; when it
/// loses a race (balance dropped below the charge since the pre-flight
/// check) the remainder is clamped at zero, because the provider cost is
/// already sunk. Returns the balance after settlement.
async fn settle_charge(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
    credits: Decimal,
) -> Result<Decimal> {
    let mut profiles_repo = Profiles::new(tx);

    if profiles_repo.try_deduct(user_id, credits).await? {
        return profiles_repo.balance(user_id).await.map_err(Error::from);
    }

    warn!(
        user = %crate::types::abbrev_uuid(&user_id),
        %credits,
        "balance no longer covers the actual generation cost; clamping to zero"
    );
    profiles_repo.deduct_clamped(user_id, credits).await.map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_summarize_truncates_long_content() {
        let long = "word ".repeat(100);
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.split_whitespace().count(), 41);

        let short = "just a few words";
        assert_eq!(summarize(short), short);
    }

    #[test]
    fn test_completed_progress() {
        let p = completed(6);
        assert_eq!(p.current_step, 6);
        assert_eq!(p.total_steps, 6);
        assert_eq!(p.stage, "complete");
    }
}
