//! Generated verse content: age tiers, cache keys and the content record.

pub mod generator;
pub mod normalize;
pub mod prompt;

pub use generator::{ContentGenerator, Generation};
pub use normalize::{normalize, NormalizedFields};
pub use prompt::build_prompt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// AgeGroup
// ============================================================================

/// Reading-level tier that selects tone guidance and image folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    /// Ages 0-6.
    Toddler,
    /// Ages 7-12.
    Child,
    /// Ages 13-17.
    Teen,
    #[default]
    Adult,
}

impl AgeGroup {
    /// Every tier, youngest first.
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Toddler,
        AgeGroup::Child,
        AgeGroup::Teen,
        AgeGroup::Adult,
    ];

    /// Parse a tier label. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "0-6" => Some(AgeGroup::Toddler),
            "7-12" => Some(AgeGroup::Child),
            "13-17" => Some(AgeGroup::Teen),
            "adult" | "adults" => Some(AgeGroup::Adult),
            _ => None,
        }
    }

    /// Like [`AgeGroup::parse`], but unrecognized labels resolve to `Adult`.
    pub fn resolve(input: &str) -> Self {
        Self::parse(input).unwrap_or_default()
    }

    /// Canonical label, as shown to users and stored in content.
    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::Toddler => "0-6",
            AgeGroup::Child => "7-12",
            AgeGroup::Teen => "13-17",
            AgeGroup::Adult => "Adult",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgeGroup::Toddler => "Simple stories and gentle lessons for the youngest hearts",
            AgeGroup::Child => "Adventure-filled tales that spark imagination and faith",
            AgeGroup::Teen => "Relevant insights for navigating the teen years with God",
            AgeGroup::Adult => "Deep wisdom and practical application for daily life",
        }
    }

    /// Folder under `images/` holding this tier's illustrations.
    pub fn image_folder(&self) -> &'static str {
        match self {
            AgeGroup::Toddler => "0-6",
            AgeGroup::Child => "7-12",
            AgeGroup::Teen => "13-17",
            AgeGroup::Adult => "adult",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgeGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for AgeGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AgeGroup::resolve(&raw))
    }
}

// ============================================================================
// CacheKey
// ============================================================================

/// Deterministic store key for a (verse, tier) pair.
///
/// The verse is trimmed, lower-cased and has whitespace runs collapsed, so
/// `"John  3:16 "` and `"john 3:16"` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(verse: &str, age_group: AgeGroup) -> Self {
        let verse = verse
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        CacheKey(format!(
            "{}_{}",
            verse,
            age_group.label().to_ascii_lowercase()
        ))
    }

    /// Key for a raw tier string; unknown tiers share the `Adult` key.
    pub fn from_request(verse: &str, age_group: &str) -> Self {
        Self::new(verse, AgeGroup::resolve(age_group))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// GeneratedContent
// ============================================================================

/// One unit of produced material for a (verse, tier) pair.
///
/// Immutable once built; regeneration replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    /// The verse reference as requested, trimmed.
    pub verse: String,
    pub age_group: AgeGroup,
    pub paraphrase: String,
    pub story: String,
    pub prayer: String,
    /// Never empty.
    pub activities: Vec<String>,
    /// Never empty.
    pub key_points: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl GeneratedContent {
    /// Assemble a record from normalized fields, stamping it with `now`.
    pub fn assemble(verse: &str, age_group: AgeGroup, fields: NormalizedFields) -> Self {
        Self {
            verse: verse.trim().to_string(),
            age_group,
            paraphrase: fields.paraphrase,
            story: fields.story,
            prayer: fields.prayer,
            activities: fields.activities,
            key_points: fields.key_points,
            timestamp: Utc::now(),
        }
    }

    /// Fixed placeholder shown when generation fails outright.
    ///
    /// Never written to the cache.
    pub fn fallback(verse: &str, age_group: AgeGroup) -> Self {
        let verse = verse.trim();
        Self {
            verse: if verse.is_empty() {
                "Unknown".to_string()
            } else {
                verse.to_string()
            },
            age_group,
            paraphrase: "We encountered an error while generating content. Please try again later."
                .to_string(),
            story: "The AI service is temporarily unavailable. Please try again in a few minutes."
                .to_string(),
            prayer: "Dear God, please help us understand your Word. Amen.".to_string(),
            activities: vec![
                "Try refreshing the page".to_string(),
                "Check your internet connection".to_string(),
                "Try again later".to_string(),
            ],
            key_points: vec![
                "God is always with us".to_string(),
                "His Word is important".to_string(),
                "Keep trying".to_string(),
            ],
            timestamp: Utc::now(),
        }
    }
}
