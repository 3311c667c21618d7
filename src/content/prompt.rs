//! Prompt construction for verse content generation.

use super::AgeGroup;

/// Instruction describing the JSON object the model must return.
const SCHEMA_INSTRUCTIONS: &str = r#"Please provide the following in JSON format:
{
  "paraphrase": "A simple explanation of the verse in age-appropriate language",
  "story": "A short, engaging story that illustrates the verse's meaning",
  "prayer": "A simple prayer related to the verse",
  "activities": ["3-4 fun, age-appropriate activities to help understand the verse"],
  "keyPoints": ["3-4 main points to remember from the verse"]
}"#;

/// Tone and reading-level guidance for a tier.
pub fn tone_guidance(age_group: AgeGroup) -> &'static str {
    match age_group {
        AgeGroup::Toddler => {
            "Use very simple language, short sentences, and focus on basic concepts like love, \
             kindness, and God's care. Include gentle, comforting themes."
        }
        AgeGroup::Child => {
            "Use engaging, adventure-style language that captures imagination. Include relatable \
             scenarios and clear moral lessons."
        }
        AgeGroup::Teen => {
            "Address real-life challenges teens face, use contemporary language, and connect \
             biblical principles to modern situations."
        }
        AgeGroup::Adult => {
            "Provide deeper theological insights, practical applications for daily life, and \
             connections to broader biblical themes."
        }
    }
}

/// Build the generation prompt for a verse and a raw tier label.
///
/// Unrecognized tiers get the `Adult` tone guidance.
pub fn build_prompt(verse: &str, age_group: &str) -> String {
    let tier = AgeGroup::resolve(age_group);
    let audience = match tier {
        AgeGroup::Adult => "adult readers".to_string(),
        other => format!("{} year olds", other.label()),
    };

    format!(
        "Create age-appropriate Bible content for {verse} for {audience}.\n\n\
         {guidance}\n\n\
         {schema}\n\n\
         Keep all content family-friendly and biblically accurate. \
         Respond with the JSON object only.",
        verse = verse.trim(),
        audience = audience,
        guidance = tone_guidance(tier),
        schema = SCHEMA_INSTRUCTIONS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_verse_and_tier() {
        let prompt = build_prompt("John 3:16", "7-12");
        assert!(prompt.contains("John 3:16"));
        assert!(prompt.contains("7-12 year olds"));
        assert!(prompt.contains(tone_guidance(AgeGroup::Child)));
    }

    #[test]
    fn test_prompt_describes_every_schema_field() {
        let prompt = build_prompt("Psalm 23:1", "0-6");
        for field in ["paraphrase", "story", "prayer", "activities", "keyPoints"] {
            assert!(
                prompt.contains(&format!("\"{field}\"")),
                "prompt should name field {field}"
            );
        }
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_unknown_tier_gets_adult_guidance() {
        let prompt = build_prompt("Romans 8:28", "retirees");
        assert!(prompt.contains(tone_guidance(AgeGroup::Adult)));
        assert!(!prompt.contains(tone_guidance(AgeGroup::Teen)));
    }

    #[test]
    fn test_each_tier_has_distinct_guidance() {
        let mut seen = std::collections::HashSet::new();
        for tier in AgeGroup::ALL {
            assert!(seen.insert(tone_guidance(tier)));
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("John 1:1", "13-17"), build_prompt("John 1:1", "13-17"));
    }
}
