//! Stage 3: sequences the selected courses into a leveled roadmap.

use std::fmt::Write as _;

use tracing::{error, info};

use crate::extraction::{extract_as, JsonShape, ResponseExtractor};
use crate::llm_client::CompletionClient;
use crate::models::{CourseSelection, Roadmap};
use crate::recommendation::prompts::{render, ROADMAP_TEMPLATE};
use crate::recommendation::{Stage, StageError};

pub fn build_roadmap_prompt(courses: &[CourseSelection], profile_context: Option<&str>) -> String {
    let mut listing = String::new();
    for (i, course) in courses.iter().enumerate() {
        let prerequisites = if course.prerequisites.is_empty() {
            "None".to_string()
        } else {
            course.prerequisites.join(", ")
        };
        // Writing into a String cannot fail
        let _ = write!(
            listing,
            "{}. Course: {}\n   Department: {}\n   Description: {}\n   Prerequisites: {}\n\n",
            i + 1,
            course.course_title,
            course.department,
            course.course_description,
            prerequisites
        );
    }

    let profile_context = profile_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("Student Profile Context: {c}"))
        .unwrap_or_default();

    render(
        ROADMAP_TEMPLATE,
        &[
            ("profile_context", profile_context.as_str()),
            ("courses", listing.trim_end()),
        ],
    )
}

/// Runs stage 3. An empty course list fails before any completion call.
pub async fn build_roadmap(
    client: &CompletionClient,
    extractor: &dyn ResponseExtractor,
    courses: &[CourseSelection],
    profile_context: Option<&str>,
) -> Result<Roadmap, StageError> {
    if courses.is_empty() {
        return Err(StageError::NoCourses);
    }

    let prompt = build_roadmap_prompt(courses, profile_context);

    let reply = client
        .complete(&prompt)
        .await
        .map_err(|source| StageError::Completion {
            stage: Stage::RoadmapAssembly,
            source,
        })?;

    let roadmap: Roadmap = extract_as(extractor, &reply, JsonShape::Object).map_err(|source| {
        error!("Failed to parse roadmap from reply: {source}");
        StageError::Response {
            stage: Stage::RoadmapAssembly,
            source,
        }
    })?;

    info!(
        "Successfully created learning roadmap: {} levels, {} courses",
        roadmap.levels().len(),
        roadmap.course_count()
    );
    Ok(roadmap)
}
