//! Story repository.

use crate::api::models::stories::StoryStatus;
use crate::db::errors::Result;
use crate::db::models::stories::{StoryCreateDBRequest, StoryDBResponse, StoryUpdateDBRequest};
use crate::db::handlers::repository::Repository;
use crate::types::{StoryId, UserId};
use rust_decimal::Decimal;
use sqlx::PgConnection;

const STORY_COLUMNS: &str = "id, owner, title, genre, premise, mode, length, foundation, status, word_count, \
     chapter_count, credits_spent, usd_cost, created_at, updated_at";

/// Filter for listing stories.
#[derive(Debug, Clone)]
pub struct StoryFilter {
    pub owner: Option<UserId>,
    pub status: Option<StoryStatus>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Stories<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Stories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn count(&mut self, filter: &StoryFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stories
             WHERE ($1::uuid IS NULL OR owner = $1)
               AND ($2::text IS NULL OR status = $2)",
        )
        .bind(filter.owner)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Record the outcome of a successful generation against the story:
    /// foundation or word/chapter deltas plus the cost accounting fields.
    pub async fn apply_generation(
        &mut self,
        id: StoryId,
        foundation: Option<&str>,
        status: Option<StoryStatus>,
        word_delta: i64,
        chapter_delta: i64,
        credits: Decimal,
        usd: Decimal,
    ) -> Result<StoryDBResponse> {
        let story = sqlx::query_as::<_, StoryDBResponse>(&format!(
            "UPDATE stories
             SET foundation = COALESCE($2, foundation),
                 status = COALESCE($3, status),
                 word_count = word_count + $4,
                 chapter_count = chapter_count + $5,
                 credits_spent = credits_spent + $6,
                 usd_cost = usd_cost + $7,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {STORY_COLUMNS}"
        ))
        .bind(id)
        .bind(foundation)
        .bind(status)
        .bind(word_delta)
        .bind(chapter_delta)
        .bind(credits)
        .bind(usd)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(story)
    }
}

#[async_trait::async_trait]
impl Repository for Stories<'_> {
    type CreateRequest = StoryCreateDBRequest;
    type UpdateRequest = StoryUpdateDBRequest;
    type Response = StoryDBResponse;
    type Id = StoryId;
    type Filter = StoryFilter;

    async fn create(&mut self, request: &StoryCreateDBRequest) -> Result<StoryDBResponse> {
        let story = sqlx::query_as::<_, StoryDBResponse>(&format!(
            "INSERT INTO stories (owner, title, genre, premise, mode, length)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {STORY_COLUMNS}"
        ))
        .bind(request.owner)
        .bind(&request.title)
        .bind(&request.genre)
        .bind(&request.premise)
        .bind(request.mode)
        .bind(request.length)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(story)
    }

    async fn get_by_id(&mut self, id: StoryId) -> Result<Option<StoryDBResponse>> {
        let story = sqlx::query_as::<_, StoryDBResponse>(&format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(story)
    }

    async fn list(&mut self, filter: &StoryFilter) -> Result<Vec<StoryDBResponse>> {
        let stories = sqlx::query_as::<_, StoryDBResponse>(&format!(
            "SELECT {STORY_COLUMNS} FROM stories
             WHERE ($1::uuid IS NULL OR owner = $1)
               AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             OFFSET $3
             LIMIT $4"
        ))
        .bind(filter.owner)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(stories)
    }

    async fn update(&mut self, id: StoryId, request: &StoryUpdateDBRequest) -> Result<StoryDBResponse> {
        let story = sqlx::query_as::<_, StoryDBResponse>(&format!(
            "UPDATE stories
             SET title = COALESCE($2, title),
                 genre = COALESCE($3, genre),
                 status = COALESCE($4, status),
                 foundation = COALESCE($5, foundation),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {STORY_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.genre)
        .bind(request.status)
        .bind(&request.foundation)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(story)
    }
}
