use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A course as stored in the on-disk corpus.
///
/// Only the fields the pipeline reads are typed; everything else is carried
/// through `extra` so partitioned files keep the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    /// Departments the course belongs to. May be empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department_name: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CourseRecord {
    pub fn new(title: impl Into<String>, short_description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            short_description: short_description.into(),
            department_name: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn in_departments<I, S>(mut self, departments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.department_name = departments.into_iter().map(Into::into).collect();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One course picked by the model in stage 2, with the prerequisite titles
/// it claims the student needs. Prerequisites are names only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSelection {
    pub course_title: String,
    #[serde(default)]
    pub course_description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}
