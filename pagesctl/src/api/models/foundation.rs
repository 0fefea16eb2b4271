//! The typed foundation contract.
//!
//! The AI-generated "foundation" (characters, plot, setting) is a tagged
//! union validated at the API boundary before it is persisted or returned.
//! Neither handlers nor clients ever see an untyped blob: provider output is
//! parsed into [`Foundation`] and rejected when it doesn't fit, and universe
//! PATCH requests are merged as JSON and re-validated through the same type.

use crate::errors::{Error, Result};
use crate::validation::CreationMode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Character {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Setting {
    pub world: String,
    #[serde(default)]
    pub atmosphere: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChapterPlan {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Branch {
    pub choice: String,
    #[serde(default)]
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Ending {
    pub title: String,
    #[serde(default)]
    pub tone: String,
}

/// The foundation of a story, shaped by its creation mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Foundation {
    Story {
        characters: Vec<Character>,
        setting: Setting,
        plot_outline: Vec<String>,
        #[serde(default)]
        themes: Vec<String>,
    },
    Novel {
        characters: Vec<Character>,
        setting: Setting,
        plot_outline: Vec<String>,
        #[serde(default)]
        themes: Vec<String>,
        chapter_plan: Vec<ChapterPlan>,
    },
    ChoiceBook {
        characters: Vec<Character>,
        setting: Setting,
        opening: String,
        branches: Vec<Branch>,
        endings: Vec<Ending>,
    },
    AiBuilder {
        brief: String,
        characters: Vec<Character>,
        setting: Setting,
        plot_outline: Vec<String>,
    },
}

impl Foundation {
    /// Which creation mode this foundation variant belongs to.
    pub fn mode(&self) -> CreationMode {
        match self {
            Foundation::Story { .. } => CreationMode::Story,
            Foundation::Novel { .. } => CreationMode::Novel,
            Foundation::ChoiceBook { .. } => CreationMode::ChoiceBook,
            Foundation::AiBuilder { .. } => CreationMode::AiBuilder,
        }
    }

    pub fn characters(&self) -> &[Character] {
        match self {
            Foundation::Story { characters, .. }
            | Foundation::Novel { characters, .. }
            | Foundation::ChoiceBook { characters, .. }
            | Foundation::AiBuilder { characters, .. } => characters,
        }
    }

    pub fn setting(&self) -> &Setting {
        match self {
            Foundation::Story { setting, .. }
            | Foundation::Novel { setting, .. }
            | Foundation::ChoiceBook { setting, .. }
            | Foundation::AiBuilder { setting, .. } => setting,
        }
    }

    pub fn plot_outline(&self) -> &[String] {
        match self {
            Foundation::Story { plot_outline, .. }
            | Foundation::Novel { plot_outline, .. }
            | Foundation::AiBuilder { plot_outline, .. } => plot_outline,
            Foundation::ChoiceBook { .. } => &[],
        }
    }

    /// Parse provider output. Models occasionally wrap the JSON in markdown
    /// fences or prose; the object is extracted from the first `{` to the
    /// last `}` before parsing. A reply that still doesn't fit the contract
    /// is treated as an upstream failure.
    pub fn from_llm_text(text: &str) -> Result<Self> {
        let start = text.find('{');
        let end = text.rfind('}');

        let json = match (start, end) {
            (Some(s), Some(e)) if e > s => &text[s..=e],
            _ => {
                return Err(Error::UpstreamUnavailable {
                    message: "provider reply contained no JSON object".to_string(),
                });
            }
        };

        serde_json::from_str(json).map_err(|e| Error::UpstreamUnavailable {
            message: format!("provider reply did not match the foundation contract: {e}"),
        })
    }

    /// Parse a foundation stored in the database. Stored foundations were
    /// validated on the way in, so failure here is an internal error.
    pub fn from_stored(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Internal {
            operation: format!("parse stored foundation: {e}"),
        })
    }

    /// Validate a client-supplied foundation against the story's mode.
    pub fn ensure_mode(&self, expected: CreationMode) -> Result<()> {
        if self.mode() != expected {
            return Err(Error::BadRequest {
                message: format!(
                    "foundation type '{}' does not match story mode '{}'",
                    self.mode().as_str(),
                    expected.as_str()
                ),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal {
            operation: format!("serialize foundation: {e}"),
        })
    }
}

/// Apply an RFC 7396-style merge patch to a stored foundation and
/// re-validate the result through the typed contract.
pub fn merge_patch(stored: &str, patch: &serde_json::Value) -> Result<Foundation> {
    let mut base: serde_json::Value = serde_json::from_str(stored).map_err(|e| Error::Internal {
        operation: format!("parse stored foundation: {e}"),
    })?;

    merge_values(&mut base, patch);

    serde_json::from_value(base).map_err(|e| Error::BadRequest {
        message: format!("patched foundation does not match the foundation contract: {e}"),
    })
}

fn merge_values(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                if value.is_null() {
                    base_map.remove(key);
                } else {
                    merge_values(base_map.entry(key.clone()).or_insert(serde_json::Value::Null), value);
                }
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story_json() -> String {
        json!({
            "type": "story",
            "characters": [{"name": "Ada", "role": "protagonist", "description": "a gardener"}],
            "setting": {"world": "a clockwork garden", "atmosphere": "uncanny"},
            "plot_outline": ["The hedges move", "Ada investigates"],
            "themes": ["order vs growth"]
        })
        .to_string()
    }

    #[test]
    fn test_parse_plain_json() {
        let foundation = Foundation::from_llm_text(&story_json()).unwrap();
        assert_eq!(foundation.mode(), CreationMode::Story);
        assert_eq!(foundation.characters()[0].name, "Ada");
    }

    #[test]
    fn test_parse_with_markdown_fences() {
        let wrapped = format!("Here is the foundation:\n```json\n{}\n```\n", story_json());
        let foundation = Foundation::from_llm_text(&wrapped).unwrap();
        assert_eq!(foundation.mode(), CreationMode::Story);
    }

    #[test]
    fn test_reply_without_json_is_upstream_failure() {
        let err = Foundation::from_llm_text("I cannot help with that.").unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_wrong_shape_is_upstream_failure() {
        let err = Foundation::from_llm_text(r#"{"type": "story", "characters": "none"}"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = Foundation::from_llm_text(r#"{"type": "poem", "lines": []}"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_ensure_mode_mismatch() {
        let foundation = Foundation::from_llm_text(&story_json()).unwrap();
        assert!(foundation.ensure_mode(CreationMode::Story).is_ok());
        let err = foundation.ensure_mode(CreationMode::Novel).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn test_merge_patch_updates_setting() {
        let patched = merge_patch(
            &story_json(),
            &json!({"setting": {"atmosphere": "serene"}}),
        )
        .unwrap();
        assert_eq!(patched.setting().atmosphere, "serene");
        // untouched fields survive
        assert_eq!(patched.setting().world, "a clockwork garden");
    }

    #[test]
    fn test_merge_patch_cannot_break_contract() {
        let err = merge_patch(&story_json(), &json!({"characters": "nobody"})).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[test]
    fn test_merge_patch_cannot_change_type() {
        // Changing the tag to an unknown variant fails re-validation
        let err = merge_patch(&story_json(), &json!({"type": "sonnet"})).unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
