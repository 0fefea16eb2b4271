//! Story fact repository (SFSL cache).

use crate::db::errors::Result;
use crate::db::models::story_facts::{StoryFactDBResponse, StoryFactUpsertDBRequest};
use crate::types::StoryId;
use sqlx::PgConnection;

const FACT_COLUMNS: &str = "id, story_id, kind, key, detail, source_chapter, created_at";

pub struct StoryFacts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> StoryFacts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Upsert a fact; the newest extraction for (story, kind, key) wins.
    pub async fn upsert(&mut self, request: &StoryFactUpsertDBRequest) -> Result<StoryFactDBResponse> {
        let fact = sqlx::query_as::<_, StoryFactDBResponse>(&format!(
            "INSERT INTO story_facts (story_id, kind, key, detail, source_chapter)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (story_id, kind, key)
             DO UPDATE SET detail = EXCLUDED.detail,
                           source_chapter = EXCLUDED.source_chapter,
                           created_at = NOW()
             RETURNING {FACT_COLUMNS}"
        ))
        .bind(request.story_id)
        .bind(request.kind)
        .bind(&request.key)
        .bind(&request.detail)
        .bind(request.source_chapter)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(fact)
    }

    pub async fn upsert_many(&mut self, requests: &[StoryFactUpsertDBRequest]) -> Result<()> {
        for request in requests {
            self.upsert(request).await?;
        }
        Ok(())
    }

    pub async fn list_for_story(&mut self, story_id: StoryId) -> Result<Vec<StoryFactDBResponse>> {
        let facts = sqlx::query_as::<_, StoryFactDBResponse>(&format!(
            "SELECT {FACT_COLUMNS} FROM story_facts WHERE story_id = $1 ORDER BY kind, key"
        ))
        .bind(story_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(facts)
    }
}
