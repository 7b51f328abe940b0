//! Story catalog: where round narratives come from.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use streambot_core::error::DomainError;
use streambot_core::rng::DeterministicRng;

use crate::domain::story::Story;

/// Supplies stories for new rounds.
pub trait StoryCatalog: Send + Sync {
    /// Picks a story uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the catalog has no stories.
    fn random_story(&self, rng: &mut dyn DeterministicRng) -> Result<Story, DomainError>;

    /// Delay between consecutive chapters.
    fn chapter_interval(&self) -> Duration;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    chapter_interval_ms: u64,
    stories: Vec<Story>,
}

/// A fixed, validated list of stories.
#[derive(Debug, Clone)]
pub struct StaticStoryCatalog {
    stories: Vec<Story>,
    chapter_interval: Duration,
}

impl StaticStoryCatalog {
    /// Creates a catalog from already-built stories.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the list is empty, a story has
    /// no title or no chapters, or the interval is zero.
    pub fn new(stories: Vec<Story>, chapter_interval: Duration) -> Result<Self, DomainError> {
        if stories.is_empty() {
            return Err(DomainError::Configuration(
                "story catalog must contain at least one story".to_owned(),
            ));
        }
        if chapter_interval.is_zero() {
            return Err(DomainError::Configuration(
                "chapter interval must be greater than zero".to_owned(),
            ));
        }
        for (index, story) in stories.iter().enumerate() {
            if story.title.trim().is_empty() {
                return Err(DomainError::Configuration(format!(
                    "story #{index} has an empty title"
                )));
            }
            if story.chapters.is_empty() {
                return Err(DomainError::Configuration(format!(
                    "story `{}` has no chapters",
                    story.title
                )));
            }
        }
        Ok(Self {
            stories,
            chapter_interval,
        })
    }

    /// Parses a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the YAML is malformed or fails
    /// validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DomainError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| DomainError::Configuration(format!("invalid story catalog: {e}")))?;
        Self::new(file.stories, Duration::from_millis(file.chapter_interval_ms))
    }

    /// Loads a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the file cannot be read or
    /// fails to parse.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!(
                "cannot read story catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Number of stories in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// Always `false`; an empty catalog cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

impl StoryCatalog for StaticStoryCatalog {
    fn random_story(&self, rng: &mut dyn DeterministicRng) -> Result<Story, DomainError> {
        let last = u32::try_from(self.stories.len().saturating_sub(1)).unwrap_or(u32::MAX);
        let index = rng.next_u32_range(0, last) as usize;
        self.stories.get(index).cloned().ok_or_else(|| {
            DomainError::Configuration(format!("story index {index} out of range"))
        })
    }

    fn chapter_interval(&self) -> Duration {
        self.chapter_interval
    }
}
