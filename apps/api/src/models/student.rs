use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Self-reported proficiency for a single skill.
///
/// Known levels are matched case-insensitively; anything else is kept verbatim
/// so the advisor's wording still reaches the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Other(String),
}

impl From<String> for SkillLevel {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "beginner" => SkillLevel::Beginner,
            "intermediate" => SkillLevel::Intermediate,
            "advanced" => SkillLevel::Advanced,
            _ => SkillLevel::Other(raw.trim().to_string()),
        }
    }
}

impl From<&str> for SkillLevel {
    fn from(raw: &str) -> Self {
        SkillLevel::from(raw.to_string())
    }
}

impl From<SkillLevel> for String {
    fn from(level: SkillLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillLevel::Beginner => f.write_str("Beginner"),
            SkillLevel::Intermediate => f.write_str("Intermediate"),
            SkillLevel::Advanced => f.write_str("Advanced"),
            SkillLevel::Other(text) => f.write_str(text),
        }
    }
}

/// One tracked skill. No uniqueness is enforced across a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillRecord {
    pub skill: String,
    pub level: SkillLevel,
}

impl SkillRecord {
    pub fn new(skill: impl Into<String>, level: impl Into<SkillLevel>) -> Self {
        Self {
            skill: skill.into(),
            level: level.into(),
        }
    }
}

// Accepts both `{"skill": "..", "level": ".."}` and the `["skill", "level"]` pair form.
impl<'de> Deserialize<'de> for SkillRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Named { skill: String, level: String },
            Pair(String, String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Named { skill, level } | Repr::Pair(skill, level) => {
                SkillRecord::new(skill, level)
            }
        })
    }
}

/// Everything gathered about a student before the pipeline runs.
/// Built once by the caller and only borrowed by the stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    pub advisor_description: String,
    #[serde(default)]
    pub conversation_transcript: String,
    #[serde(default)]
    pub skills: Vec<SkillRecord>,
}

impl StudentProfile {
    /// True when there is nothing for the model to reason about.
    pub fn is_blank(&self) -> bool {
        self.advisor_description.trim().is_empty()
            && self.conversation_transcript.trim().is_empty()
            && self.skills.is_empty()
    }

    /// Bullet list of skills as it appears in every prompt.
    pub fn skills_listing(&self) -> String {
        if self.skills.is_empty() {
            return "- (no skills reported)".to_string();
        }
        self.skills
            .iter()
            .map(|s| format!("- {}: {}", s.skill, s.level))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
