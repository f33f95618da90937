use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single course placed in a roadmap level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapCourse {
    pub course_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub estimated_duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapLevel {
    #[serde(deserialize_with = "level_number")]
    pub level: u32,
    #[serde(default)]
    pub level_name: String,
    /// Duration estimate for the whole level, when the model gives one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub courses: Vec<RoadmapCourse>,
}

/// Accepts `1`, `1.0` and `"1"`; models are not consistent about number types.
fn level_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("expected a level number, got {value}")))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadmapLevels {
    pub levels: Vec<RoadmapLevel>,
}

/// The leveled learning path produced by stage 3.
///
/// Mirrors the reply format the model is asked for, so the extracted object
/// deserializes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub roadmap: RoadmapLevels,
    #[serde(default)]
    pub total_estimated_time: String,
    #[serde(default)]
    pub learning_path_summary: String,
}

impl Roadmap {
    pub fn levels(&self) -> &[RoadmapLevel] {
        &self.roadmap.levels
    }

    /// Every course title across all levels, in level order.
    pub fn course_titles(&self) -> impl Iterator<Item = &str> {
        self.roadmap
            .levels
            .iter()
            .flat_map(|l| l.courses.iter())
            .map(|c| c.course_title.as_str())
    }

    pub fn course_count(&self) -> usize {
        self.roadmap.levels.iter().map(|l| l.courses.len()).sum()
    }
}
