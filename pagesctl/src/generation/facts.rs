//! SFSL: the compact story-fact storage format.
//!
//! Facts established by earlier generation calls are cached in the
//! `story_facts` table and rendered into later chapter prompts. Each fact is
//! one line, `kind|key|detail`, with `|` and newlines escaped so the digest
//! stays line-oriented.

use crate::api::models::foundation::Foundation;
use crate::db::models::story_facts::{FactKind, StoryFactDBResponse, StoryFactUpsertDBRequest};
use crate::types::StoryId;

fn escape(field: &str) -> String {
    field.replace('\\', "\\\\").replace('|', "\\|").replace('\n', " ")
}

/// Encode one fact as an SFSL line.
pub fn encode_line(kind: FactKind, key: &str, detail: &str) -> String {
    format!("{}|{}|{}", kind.as_str(), escape(key), escape(detail))
}

/// Render stored facts as the prompt digest, one SFSL line per fact.
pub fn digest(facts: &[StoryFactDBResponse]) -> String {
    facts
        .iter()
        .map(|f| encode_line(f.kind, &f.key, &f.detail))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract facts from a freshly generated foundation.
pub fn extract_from_foundation(story_id: StoryId, foundation: &Foundation) -> Vec<StoryFactUpsertDBRequest> {
    let mut facts = Vec::new();

    for character in foundation.characters() {
        let detail = if character.description.is_empty() {
            character.role.clone()
        } else {
            format!("{}; {}", character.role, character.description)
        };
        facts.push(StoryFactUpsertDBRequest {
            story_id,
            kind: FactKind::Character,
            key: character.name.clone(),
            detail,
            source_chapter: None,
        });
    }

    let setting = foundation.setting();
    let detail = if setting.atmosphere.is_empty() {
        setting.world.clone()
    } else {
        format!("{}; {}", setting.world, setting.atmosphere)
    };
    facts.push(StoryFactUpsertDBRequest {
        story_id,
        kind: FactKind::Location,
        key: "setting".to_string(),
        detail,
        source_chapter: None,
    });

    for (index, beat) in foundation.plot_outline().iter().enumerate() {
        facts.push(StoryFactUpsertDBRequest {
            story_id,
            kind: FactKind::Plot,
            key: format!("beat-{}", index + 1),
            detail: beat.clone(),
            source_chapter: None,
        });
    }

    facts
}

/// Record a generated chapter's summary as a plot fact so later chapters
/// see what already happened.
pub fn chapter_fact(story_id: StoryId, chapter_number: i64, summary: &str) -> StoryFactUpsertDBRequest {
    StoryFactUpsertDBRequest {
        story_id,
        kind: FactKind::Plot,
        key: format!("chapter-{chapter_number}"),
        detail: summary.to_string(),
        source_chapter: Some(chapter_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn foundation() -> Foundation {
        serde_json::from_value(json!({
            "type": "story",
            "characters": [
                {"name": "Ada", "role": "protagonist", "description": "a stubborn gardener"},
                {"name": "The Maze", "role": "antagonist", "description": ""}
            ],
            "setting": {"world": "a clockwork garden", "atmosphere": "uncanny"},
            "plot_outline": ["The hedges move", "Ada maps the night paths"],
            "themes": ["order vs growth"]
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_from_foundation() {
        let story_id = Uuid::new_v4();
        let facts = extract_from_foundation(story_id, &foundation());

        // 2 characters + 1 setting + 2 plot beats
        assert_eq!(facts.len(), 5);
        assert_eq!(facts[0].key, "Ada");
        assert!(facts[0].detail.contains("stubborn gardener"));
        // Empty description falls back to the role alone
        assert_eq!(facts[1].detail, "antagonist");
        assert_eq!(facts[2].key, "setting");
        assert_eq!(facts[3].key, "beat-1");
    }

    #[test]
    fn test_encode_line_escapes_delimiters() {
        let line = encode_line(FactKind::Character, "A|B", "first\nsecond");
        assert_eq!(line, "character|A\\|B|first second");
    }

    #[test]
    fn test_digest_is_line_oriented() {
        let story_id = Uuid::new_v4();
        let stored: Vec<StoryFactDBResponse> = extract_from_foundation(story_id, &foundation())
            .into_iter()
            .map(|f| StoryFactDBResponse {
                id: Uuid::new_v4(),
                story_id: f.story_id,
                kind: f.kind,
                key: f.key,
                detail: f.detail,
                source_chapter: f.source_chapter,
                created_at: chrono::Utc::now(),
            })
            .collect();

        let digest = digest(&stored);
        assert_eq!(digest.lines().count(), 5);
        assert!(digest.lines().all(|l| l.splitn(3, '|').count() == 3));
    }
}
