//! Stage 2: selects courses and prerequisite chains, one department at a time.
//!
//! A department that cannot be loaded or whose reply cannot be parsed is
//! skipped and reported; the remaining departments still run.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::corpus::DepartmentStore;
use crate::extraction::{JsonShape, ResponseExtractor};
use crate::llm_client::CompletionClient;
use crate::models::{CourseRecord, CourseSelection, StudentProfile};
use crate::recommendation::prompts::{render, COURSE_SELECTION_TEMPLATE};

/// Only the first N courses of a department are shown to the model.
pub const MAX_COURSES_IN_PROMPT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDepartment {
    pub department: String,
    pub reason: String,
}

/// A prerequisite title that matches neither a loaded course nor a selected one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedPrerequisite {
    pub course_title: String,
    pub prerequisite: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseSelectionReport {
    /// Department processing order, then the model's order within a department.
    pub courses: Vec<CourseSelection>,
    pub skipped: Vec<SkippedDepartment>,
    pub unresolved_prerequisites: Vec<UnresolvedPrerequisite>,
}

pub fn build_course_prompt(
    department: &str,
    courses: &[CourseRecord],
    profile: &StudentProfile,
) -> String {
    let listing = courses
        .iter()
        .take(MAX_COURSES_IN_PROMPT)
        .map(|c| {
            format!(
                "- {}: {}",
                non_empty_or(&c.title, "No Title"),
                non_empty_or(&c.short_description, "No Description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let skills = profile.skills_listing();

    render(
        COURSE_SELECTION_TEMPLATE,
        &[
            ("department", department),
            ("advisor_description", profile.advisor_description.trim()),
            ("conversation_transcript", profile.conversation_transcript.trim()),
            ("skills", skills.as_str()),
            ("courses", listing.as_str()),
        ],
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Parses the model's course array, dropping entries that are not course objects.
/// A missing `department` is filled with the department being processed.
fn parse_selections(
    extractor: &dyn ResponseExtractor,
    reply: &str,
    department: &str,
) -> Result<Vec<CourseSelection>, String> {
    let value = extractor
        .extract(reply, JsonShape::Array)
        .map_err(|e| e.to_string())?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(format!("expected a JSON array, got {other}")),
    };

    let mut selections = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<CourseSelection>(item) {
            Ok(mut selection) => {
                if selection.department.trim().is_empty() {
                    selection.department = department.to_string();
                }
                selections.push(selection);
            }
            Err(e) => warn!("Ignoring malformed course entry from {department}: {e}"),
        }
    }
    Ok(selections)
}

/// Runs stage 2 over `departments` in order. Never fails as a whole.
pub async fn select_courses(
    client: &CompletionClient,
    extractor: &dyn ResponseExtractor,
    store: &DepartmentStore,
    departments: &[String],
    profile: &StudentProfile,
) -> CourseSelectionReport {
    let mut report = CourseSelectionReport::default();
    let mut known_titles: HashSet<String> = HashSet::new();

    for department in departments {
        let available = match store.load(department).await {
            Ok(courses) if courses.is_empty() => {
                warn!("Department {department} has no courses; skipping");
                report.skipped.push(SkippedDepartment {
                    department: department.clone(),
                    reason: "department has no courses".to_string(),
                });
                continue;
            }
            Ok(courses) => courses,
            Err(e) => {
                warn!("Skipping department {department}: {e}");
                report.skipped.push(SkippedDepartment {
                    department: department.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        known_titles.extend(available.iter().map(|c| normalize_title(&c.title)));

        let prompt = build_course_prompt(department, &available, profile);
        let outcome = match client.complete(&prompt).await {
            Ok(reply) => parse_selections(extractor, &reply, department),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(selections) => {
                info!("Selected {} courses from {}", selections.len(), department);
                report.courses.extend(selections);
            }
            Err(reason) => {
                error!("Error selecting courses from {department}: {reason}");
                report.skipped.push(SkippedDepartment {
                    department: department.clone(),
                    reason,
                });
            }
        }
    }

    known_titles.extend(report.courses.iter().map(|c| normalize_title(&c.course_title)));
    report.unresolved_prerequisites = find_unresolved(&report.courses, &known_titles);

    info!(
        "Total selected courses with prerequisites: {}",
        report.courses.len()
    );
    report
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

fn find_unresolved(
    courses: &[CourseSelection],
    known_titles: &HashSet<String>,
) -> Vec<UnresolvedPrerequisite> {
    let mut unresolved = Vec::new();
    for course in courses {
        for prerequisite in &course.prerequisites {
            if !known_titles.contains(&normalize_title(prerequisite)) {
                warn!(
                    "Prerequisite {:?} of {:?} is not a known course title",
                    prerequisite, course.course_title
                );
                unresolved.push(UnresolvedPrerequisite {
                    course_title: course.course_title.clone(),
                    prerequisite: prerequisite.clone(),
                });
            }
        }
    }
    unresolved
}
