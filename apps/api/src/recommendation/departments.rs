//! Stage 1: picks up to three departments from the catalog for a student profile.

use tracing::{info, warn};

use crate::catalog::DepartmentCatalog;
use crate::extraction::{extract_as, JsonShape, ResponseExtractor};
use crate::llm_client::CompletionClient;
use crate::models::StudentProfile;
use crate::recommendation::prompts::{
    render, DEPARTMENT_SELECTION_TEMPLATE, FOUNDATIONAL_RULE_TEMPLATE,
};
use crate::recommendation::{Stage, StageError};

pub const MAX_DEPARTMENTS: usize = 3;

/// Departments a beginner heading into STEM must be steered through.
pub const FOUNDATIONAL_DEPARTMENTS: &[(&str, &str)] = &[
    ("Mathematics", "mathematical foundations"),
    ("Physics", "science foundations"),
    (
        "Electrical_Engineering_and_Computer_Science",
        "programming/engineering foundations",
    ),
];

pub fn build_department_prompt(profile: &StudentProfile, catalog: &DepartmentCatalog) -> String {
    let foundational: Vec<String> = FOUNDATIONAL_DEPARTMENTS
        .iter()
        .filter(|(name, _)| catalog.contains(name))
        .map(|(name, why)| format!("   - {name} (for {why})"))
        .collect();

    let foundational_rule = if foundational.is_empty() {
        String::new()
    } else {
        render(
            FOUNDATIONAL_RULE_TEMPLATE,
            &[("departments", foundational.join("\n").as_str())],
        )
    };

    let skills = profile.skills_listing();
    let departments = catalog.prompt_listing();

    render(
        DEPARTMENT_SELECTION_TEMPLATE,
        &[
            ("advisor_description", profile.advisor_description.trim()),
            ("conversation_transcript", profile.conversation_transcript.trim()),
            ("skills", skills.as_str()),
            ("departments", departments.as_str()),
            ("foundational_rule", foundational_rule.as_str()),
        ],
    )
}

/// Keeps only catalog departments, drops repeats, caps at `MAX_DEPARTMENTS`.
pub fn filter_to_catalog(proposed: Vec<String>, catalog: &DepartmentCatalog) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(MAX_DEPARTMENTS);
    for name in proposed {
        let name = name.trim().to_string();
        if !catalog.contains(&name) {
            warn!("Dropping department not in catalog: {name:?}");
            continue;
        }
        if selected.contains(&name) {
            continue;
        }
        selected.push(name);
        if selected.len() == MAX_DEPARTMENTS {
            break;
        }
    }
    selected
}

/// Runs stage 1. An empty `Ok` means the model named no catalog department.
pub async fn select_departments(
    client: &CompletionClient,
    extractor: &dyn ResponseExtractor,
    catalog: &DepartmentCatalog,
    profile: &StudentProfile,
) -> Result<Vec<String>, StageError> {
    let prompt = build_department_prompt(profile, catalog);

    let reply = client
        .complete(&prompt)
        .await
        .map_err(|source| StageError::Completion {
            stage: Stage::DepartmentSelection,
            source,
        })?;

    let proposed: Vec<String> =
        extract_as(extractor, &reply, JsonShape::Array).map_err(|source| {
            warn!("Failed to parse department selection from reply: {source}");
            StageError::Response {
                stage: Stage::DepartmentSelection,
                source,
            }
        })?;

    let selected = filter_to_catalog(proposed, catalog);
    info!("Selected departments: {:?}", selected);
    Ok(selected)
}
