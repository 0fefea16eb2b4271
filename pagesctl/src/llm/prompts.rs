//! Prompt assembly.
//!
//! User-supplied fields are folded into static instruction boilerplate via
//! minijinja templates, one per creation mode plus the chapter template. The
//! foundation templates instruct the model to reply with a single JSON
//! object matching the typed foundation contract; the dispatcher parses that
//! reply with [`crate::api::models::foundation::Foundation`].

use minijinja::{Environment, context};
use once_cell::sync::Lazy;

use crate::errors::{Error, Result};
use crate::validation::{CreationMode, StoryForm};

const SYSTEM_FOUNDATION: &str = "You are the story-foundation engine of a fiction writing platform. \
You design coherent story foundations: characters with distinct voices, a vivid setting, and a plot \
that pays off its premise. Reply with a single JSON object and nothing else - no markdown fences, \
no commentary.";

const SYSTEM_CHAPTER: &str = "You are the chapter-writing engine of a fiction writing platform. \
You write prose that stays consistent with the established story facts and picks up exactly where \
the previous chapter left off. Reply with the chapter text only.";

const FOUNDATION_STORY: &str = r#"Design the foundation for a short story.

Title: {{ title }}
Genre: {{ genre }}
Premise: {{ premise }}

Reply with JSON of this exact shape:
{"type": "story", "characters": [{"name": "...", "role": "...", "description": "..."}], "setting": {"world": "...", "atmosphere": "..."}, "plot_outline": ["..."], "themes": ["..."]}

Include 2-5 characters, 4-8 plot outline beats, and 1-3 themes."#;

const FOUNDATION_NOVEL: &str = r#"Design the foundation for a novel.

Title: {{ title }}
Genre: {{ genre }}
Premise: {{ premise }}
Description: {{ description }}

Reply with JSON of this exact shape:
{"type": "novel", "characters": [{"name": "...", "role": "...", "description": "..."}], "setting": {"world": "...", "atmosphere": "..."}, "plot_outline": ["..."], "themes": ["..."], "chapter_plan": [{"number": 1, "title": "...", "summary": "..."}]}

Include 3-8 characters, a plot outline spanning the whole arc, and a chapter plan of 8-20 chapters."#;

const FOUNDATION_CHOICE_BOOK: &str = r#"Design the foundation for an interactive choice-driven book.

Title: {{ title }}
Genre: {{ genre }}
Premise: {{ premise }}
Number of endings: {{ ending_count }}

Reply with JSON of this exact shape:
{"type": "choice_book", "characters": [{"name": "...", "role": "...", "description": "..."}], "setting": {"world": "...", "atmosphere": "..."}, "opening": "...", "branches": [{"choice": "...", "outcome": "..."}], "endings": [{"title": "...", "tone": "..."}]}

Provide exactly {{ ending_count }} endings and enough branches to reach each of them."#;

const FOUNDATION_AI_BUILDER: &str = r#"Design a story foundation following the author's build instructions.

Title: {{ title }}
Genre: {{ genre }}
Premise: {{ premise }}
Build instructions: {{ instructions }}

Reply with JSON of this exact shape:
{"type": "ai_builder", "brief": "...", "characters": [{"name": "...", "role": "...", "description": "..."}], "setting": {"world": "...", "atmosphere": "..."}, "plot_outline": ["..."]}

The brief should restate, in one paragraph, how the instructions shaped the design."#;

const CHAPTER: &str = r#"Write chapter {{ chapter_number }} of "{{ title }}" ({{ genre }}).

Premise: {{ premise }}

Established story facts:
{{ facts }}
{% if previous_summary %}
Previous chapter summary:
{{ previous_summary }}
{% endif %}{% if guidance %}
Author guidance for this chapter: {{ guidance }}
{% endif %}
Write the full chapter prose. Stay consistent with every established fact. Do not repeat earlier
events; move the story forward."#;

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("foundation_story", FOUNDATION_STORY)
        .expect("static template must parse");
    env.add_template("foundation_novel", FOUNDATION_NOVEL)
        .expect("static template must parse");
    env.add_template("foundation_choice_book", FOUNDATION_CHOICE_BOOK)
        .expect("static template must parse");
    env.add_template("foundation_ai_builder", FOUNDATION_AI_BUILDER)
        .expect("static template must parse");
    env.add_template("chapter", CHAPTER).expect("static template must parse");
    env
});

fn render(name: &str, ctx: minijinja::Value) -> Result<String> {
    let template = TEMPLATES.get_template(name).map_err(|e| Error::Internal {
        operation: format!("load prompt template '{name}': {e}"),
    })?;
    template.render(ctx).map_err(|e| Error::Internal {
        operation: format!("render prompt template '{name}': {e}"),
    })
}

/// System boilerplate for foundation generation.
pub fn foundation_system() -> String {
    SYSTEM_FOUNDATION.to_string()
}

/// System boilerplate for chapter generation.
pub fn chapter_system() -> String {
    SYSTEM_CHAPTER.to_string()
}

/// Render the foundation prompt for a mode from the validated form.
pub fn foundation_prompt(mode: CreationMode, form: &StoryForm) -> Result<String> {
    let ctx = context! {
        title => form.title,
        genre => form.genre,
        premise => form.premise,
        description => form.description.clone().unwrap_or_default(),
        instructions => form.instructions.clone().unwrap_or_default(),
        ending_count => form.ending_count.unwrap_or(2),
    };

    let name = match mode {
        CreationMode::Story => "foundation_story",
        CreationMode::Novel => "foundation_novel",
        CreationMode::ChoiceBook => "foundation_choice_book",
        CreationMode::AiBuilder => "foundation_ai_builder",
    };

    render(name, ctx)
}

/// Render the chapter prompt. `facts` is the SFSL digest of everything
/// established so far; `previous_summary` is the last chapter's summary when
/// one exists.
pub fn chapter_prompt(
    title: &str,
    genre: &str,
    premise: &str,
    chapter_number: i64,
    facts: &str,
    previous_summary: Option<&str>,
    guidance: Option<&str>,
) -> Result<String> {
    let ctx = context! {
        title => title,
        genre => genre,
        premise => premise,
        chapter_number => chapter_number,
        facts => if facts.is_empty() { "(none yet)" } else { facts },
        previous_summary => previous_summary.unwrap_or_default(),
        guidance => guidance.unwrap_or_default(),
    };

    render("chapter", ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> StoryForm {
        StoryForm {
            title: "The Clockwork Garden".to_string(),
            genre: "fantasy".to_string(),
            premise: "Hedges rearrange themselves at night.".to_string(),
            description: Some("A quiet gardener against a living maze.".to_string()),
            ending_count: Some(4),
            instructions: Some("Lean into dialogue.".to_string()),
        }
    }

    #[test]
    fn test_story_prompt_contains_fields() {
        let prompt = foundation_prompt(CreationMode::Story, &form()).unwrap();
        assert!(prompt.contains("The Clockwork Garden"));
        assert!(prompt.contains("fantasy"));
        assert!(prompt.contains("Hedges rearrange"));
        assert!(prompt.contains(r#""type": "story""#));
    }

    #[test]
    fn test_choice_book_prompt_carries_ending_count() {
        let prompt = foundation_prompt(CreationMode::ChoiceBook, &form()).unwrap();
        assert!(prompt.contains("Number of endings: 4"));
        assert!(prompt.contains("exactly 4 endings"));
    }

    #[test]
    fn test_ai_builder_prompt_carries_instructions() {
        let prompt = foundation_prompt(CreationMode::AiBuilder, &form()).unwrap();
        assert!(prompt.contains("Lean into dialogue."));
    }

    #[test]
    fn test_chapter_prompt_with_and_without_summary() {
        let with = chapter_prompt("T", "mystery", "P", 3, "character|Ada|detective", Some("Ada found the key."), None).unwrap();
        assert!(with.contains("chapter 3"));
        assert!(with.contains("character|Ada|detective"));
        assert!(with.contains("Ada found the key."));

        let without = chapter_prompt("T", "mystery", "P", 1, "", None, None).unwrap();
        assert!(without.contains("(none yet)"));
        assert!(!without.contains("Previous chapter summary"));
    }

    #[test]
    fn test_chapter_prompt_guidance() {
        let prompt = chapter_prompt("T", "mystery", "P", 2, "", None, Some("End on a cliffhanger.")).unwrap();
        assert!(prompt.contains("End on a cliffhanger."));
    }
}
