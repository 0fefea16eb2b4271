//! Chapter repository.

use crate::db::errors::Result;
use crate::db::models::chapters::{ChapterCreateDBRequest, ChapterDBResponse};
use crate::types::StoryId;
use sqlx::PgConnection;

const CHAPTER_COLUMNS: &str =
    "id, story_id, chapter_number, title, content, summary, word_count, credits_spent, usd_cost, created_at";

pub struct Chapters<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Chapters<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append a chapter, assigning the next chapter_number in the same
    /// statement. The unique (story_id, chapter_number) index turns a lost
    /// race into a UniqueViolation instead of a duplicate number.
    pub async fn create(&mut self, request: &ChapterCreateDBRequest) -> Result<ChapterDBResponse> {
        let chapter = sqlx::query_as::<_, ChapterDBResponse>(&format!(
            "INSERT INTO chapters (story_id, chapter_number, title, content, summary, word_count, credits_spent, usd_cost)
             SELECT $1, COALESCE(MAX(chapter_number), 0) + 1, $2, $3, $4, $5, $6, $7
             FROM chapters WHERE story_id = $1
             RETURNING {CHAPTER_COLUMNS}"
        ))
        .bind(request.story_id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.summary)
        .bind(request.word_count)
        .bind(request.credits_spent)
        .bind(request.usd_cost)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(chapter)
    }

    pub async fn list_for_story(&mut self, story_id: StoryId) -> Result<Vec<ChapterDBResponse>> {
        let chapters = sqlx::query_as::<_, ChapterDBResponse>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id = $1 ORDER BY chapter_number"
        ))
        .bind(story_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(chapters)
    }

    pub async fn get_by_number(&mut self, story_id: StoryId, chapter_number: i64) -> Result<Option<ChapterDBResponse>> {
        let chapter = sqlx::query_as::<_, ChapterDBResponse>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id = $1 AND chapter_number = $2"
        ))
        .bind(story_id)
        .bind(chapter_number)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(chapter)
    }

    /// The most recent chapter of a story, if any.
    pub async fn latest(&mut self, story_id: StoryId) -> Result<Option<ChapterDBResponse>> {
        let chapter = sqlx::query_as::<_, ChapterDBResponse>(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id = $1 ORDER BY chapter_number DESC LIMIT 1"
        ))
        .bind(story_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(chapter)
    }
}
