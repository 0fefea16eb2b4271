//! Mode-specific form validation for story creation requests.
//!
//! Validation is pure: a [`CreationMode`] plus the submitted form fields
//! produce a [`ValidationReport`] with ordered blocking errors and
//! non-blocking warnings. No side effects, no database access.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Field length and count limits shared across the API.
pub mod content_limits {
    pub const TITLE_MAX_LENGTH: usize = 200;
    pub const PREMISE_MAX_LENGTH: usize = 2000;
    pub const DESCRIPTION_MAX_LENGTH: usize = 4000;
    pub const INSTRUCTIONS_MAX_LENGTH: usize = 4000;
    pub const MIN_ENDINGS: u32 = 2;
    pub const MAX_ENDINGS: u32 = 10;
}

/// Genres the prompt templates know how to steer towards. Unknown genres are
/// accepted with a warning rather than rejected.
pub const KNOWN_GENRES: &[&str] = &[
    "fantasy",
    "science fiction",
    "mystery",
    "thriller",
    "romance",
    "horror",
    "historical",
    "literary",
    "adventure",
    "comedy",
];

/// The four content-creation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreationMode {
    Story,
    Novel,
    ChoiceBook,
    AiBuilder,
}

impl CreationMode {
    /// Parse a mode tag leniently. Unknown tags fall back to the base
    /// `story` field set and report a warning to the caller.
    pub fn parse(tag: &str) -> (Self, Option<String>) {
        match tag {
            "story" => (CreationMode::Story, None),
            "novel" => (CreationMode::Novel, None),
            "choice_book" | "choice-book" => (CreationMode::ChoiceBook, None),
            "ai_builder" | "ai-builder" => (CreationMode::AiBuilder, None),
            other => (
                CreationMode::Story,
                Some(format!("unknown mode '{other}', using story defaults")),
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreationMode::Story => "story",
            CreationMode::Novel => "novel",
            CreationMode::ChoiceBook => "choice_book",
            CreationMode::AiBuilder => "ai_builder",
        }
    }
}

/// The submitted creation form. All mode-specific fields are optional at the
/// wire level; the validator decides which are required.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StoryForm {
    pub title: String,
    pub genre: String,
    pub premise: String,
    /// Required for novel mode
    pub description: Option<String>,
    /// Required for choice_book mode
    pub ending_count: Option<u32>,
    /// Required for ai_builder mode
    pub instructions: Option<String>,
}

/// Outcome of validating a form: a validity flag plus ordered error and
/// warning lists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.valid = false;
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validate a creation form against the rules for the given mode.
pub fn validate(mode: CreationMode, form: &StoryForm) -> ValidationReport {
    use content_limits::*;

    let mut report = ValidationReport::new();

    // Base story field set, shared by every mode
    if form.title.trim().is_empty() {
        report.error("title is required");
    } else if form.title.chars().count() > TITLE_MAX_LENGTH {
        report.error(format!("title must be at most {TITLE_MAX_LENGTH} characters"));
    }

    if form.genre.trim().is_empty() {
        report.error("genre is required");
    } else if !KNOWN_GENRES.contains(&form.genre.to_lowercase().as_str()) {
        report.warning(format!("genre '{}' is not in the known genre list", form.genre));
    }

    if form.premise.trim().is_empty() {
        report.error("premise is required");
    } else if form.premise.chars().count() > PREMISE_MAX_LENGTH {
        report.error(format!("premise must be at most {PREMISE_MAX_LENGTH} characters"));
    }

    match mode {
        CreationMode::Story => {}
        CreationMode::Novel => match form.description.as_deref().map(str::trim) {
            None | Some("") => report.error("description is required for novel mode"),
            Some(d) if d.chars().count() > DESCRIPTION_MAX_LENGTH => {
                report.error(format!("description must be at most {DESCRIPTION_MAX_LENGTH} characters"));
            }
            Some(_) => {}
        },
        CreationMode::ChoiceBook => match form.ending_count {
            None => report.error("ending_count is required for choice_book mode"),
            Some(n) if n < MIN_ENDINGS => {
                report.error(format!("choice_book requires at least {MIN_ENDINGS} endings"));
            }
            Some(n) if n > MAX_ENDINGS => {
                report.error(format!("choice_book supports at most {MAX_ENDINGS} endings"));
            }
            Some(_) => {}
        },
        CreationMode::AiBuilder => match form.instructions.as_deref().map(str::trim) {
            None | Some("") => report.error("instructions are required for ai_builder mode"),
            Some(i) if i.chars().count() > INSTRUCTIONS_MAX_LENGTH => {
                report.error(format!(
                    "instructions must be at most {INSTRUCTIONS_MAX_LENGTH} characters"
                ));
            }
            Some(_) => {}
        },
    }

    report
}
