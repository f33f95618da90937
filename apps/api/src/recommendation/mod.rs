// Recommendation Pipeline
// Stage 1: department selection → Stage 2: course + prerequisite selection → Stage 3: roadmap.
// Every model call goes through llm_client and every reply through extraction.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractError;
use crate::llm_client::LlmError;

pub mod courses;
pub mod departments;
pub mod graph;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod roadmap;

pub use courses::{CourseSelectionReport, SkippedDepartment, UnresolvedPrerequisite};
pub use graph::CourseGraph;
pub use pipeline::{PipelineOutcome, RecommendationPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DepartmentSelection,
    CourseSelection,
    RoadmapAssembly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::DepartmentSelection => f.write_str("department selection"),
            Stage::CourseSelection => f.write_str("course selection"),
            Stage::RoadmapAssembly => f.write_str("roadmap assembly"),
        }
    }
}

/// Terminal failure of a single stage. Returned as a value, never raised.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage}: completion failed: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("{stage}: unusable model reply: {source}")]
    Response {
        stage: Stage,
        #[source]
        source: ExtractError,
    },

    #[error("No courses provided for roadmap creation")]
    NoCourses,
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Completion { stage, .. } | StageError::Response { stage, .. } => *stage,
            StageError::NoCourses => Stage::RoadmapAssembly,
        }
    }
}
