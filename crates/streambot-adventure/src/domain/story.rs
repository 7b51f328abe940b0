//! Stories and chapter templates.
//!
//! Chapter templates reference the two teams with `{{survivors}}` and
//! `{{victims}}`; each placeholder renders as a comma-separated name list.

use serde::Deserialize;
use thiserror::Error;

/// Placeholder key for the survivor names.
pub const SURVIVORS_KEY: &str = "survivors";

/// Placeholder key for the victim names.
pub const VICTIMS_KEY: &str = "victims";

/// Why a chapter template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The template names a placeholder nobody provides.
    #[error("unknown placeholder `{0}`")]
    UnknownPlaceholder(String),

    /// A `{{` has no matching `}}`.
    #[error("unterminated placeholder")]
    Unterminated,
}

/// One narrative beat of a story.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Chapter {
    template: String,
    mentions_survivors: bool,
    mentions_victims: bool,
}

impl Chapter {
    /// Creates a chapter, deriving the team markers from the template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let keys = placeholder_keys(&template);
        let mentions_survivors = keys.contains(&SURVIVORS_KEY);
        let mentions_victims = keys.contains(&VICTIMS_KEY);
        Self {
            template,
            mentions_survivors,
            mentions_victims,
        }
    }

    /// The raw template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the template names the survivors.
    #[must_use]
    pub fn mentions_survivors(&self) -> bool {
        self.mentions_survivors
    }

    /// Whether the template names the victims.
    #[must_use]
    pub fn mentions_victims(&self) -> bool {
        self.mentions_victims
    }

    /// A chapter that names a team with no members is left out of the
    /// narration rather than posted with an empty list.
    #[must_use]
    pub fn should_skip(&self, survivors: &[String], victims: &[String]) -> bool {
        (self.mentions_survivors && survivors.is_empty())
            || (self.mentions_victims && victims.is_empty())
    }

    /// Renders the chapter with the given team names.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the template is malformed or names an unknown
    /// placeholder.
    pub fn render(&self, survivors: &[String], victims: &[String]) -> Result<String, RenderError> {
        substitute(&self.template, |key| match key {
            SURVIVORS_KEY => Ok(survivors.join(", ")),
            VICTIMS_KEY => Ok(victims.join(", ")),
            other => Err(RenderError::UnknownPlaceholder(other.to_owned())),
        })
    }
}

impl From<String> for Chapter {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

/// A narrative template: a title and its ordered chapters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Story {
    /// Title announced when the round starts.
    pub title: String,
    /// Chapters, posted in order.
    pub chapters: Vec<Chapter>,
}

/// Keys of every complete `{{ key }}` placeholder, trimmed. Scanning stops
/// at an unterminated placeholder.
fn placeholder_keys(template: &str) -> Vec<&str> {
    let mut keys = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        keys.push(after[..end].trim());
        rest = &after[end + 2..];
    }
    keys
}

fn substitute(
    template: &str,
    mut resolve: impl FnMut(&str) -> Result<String, RenderError>,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(RenderError::Unterminated)?;
        out.push_str(&resolve(after[..end].trim())?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
