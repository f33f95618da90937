use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{CourseSelection, Roadmap, StudentProfile};
use crate::recommendation::departments::MAX_DEPARTMENTS;
use crate::recommendation::{CourseGraph, CourseSelectionReport, PipelineOutcome};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DepartmentSelectionRequest {
    pub profile: StudentProfile,
}

#[derive(Serialize)]
pub struct DepartmentSelectionResponse {
    pub departments: Vec<String>,
}

#[derive(Deserialize)]
pub struct CourseSelectionRequest {
    pub profile: StudentProfile,
    pub departments: Vec<String>,
}

#[derive(Deserialize)]
pub struct RoadmapRequest {
    pub courses: Vec<CourseSelection>,
    #[serde(default)]
    pub profile_context: Option<String>,
}

#[derive(Deserialize)]
pub struct GraphRequest {
    pub courses: Vec<CourseSelection>,
}

#[derive(Deserialize)]
pub struct RecommendationRequest {
    pub profile: StudentProfile,
    #[serde(default)]
    pub profile_context: Option<String>,
}

#[derive(Serialize)]
pub struct GraphResponse {
    #[serde(flatten)]
    pub graph: CourseGraph,
    /// Prerequisite titles that were not selected as courses themselves.
    pub dangling_prerequisites: Vec<String>,
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub course_count: u32,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub departments: Vec<CatalogEntry>,
}

fn require_profile(profile: &StudentProfile) -> Result<(), AppError> {
    if profile.is_blank() {
        return Err(AppError::Validation(
            "profile must include an advisor description, a transcript or at least one skill"
                .to_string(),
        ));
    }
    Ok(())
}

/// GET /api/v1/departments
pub async fn handle_list_departments(State(state): State<AppState>) -> Json<CatalogResponse> {
    let departments = state
        .pipeline
        .catalog()
        .iter()
        .map(|(name, course_count)| CatalogEntry {
            name: name.to_string(),
            course_count,
        })
        .collect();
    Json(CatalogResponse { departments })
}

/// POST /api/v1/recommendations/departments
pub async fn handle_select_departments(
    State(state): State<AppState>,
    Json(req): Json<DepartmentSelectionRequest>,
) -> Result<Json<DepartmentSelectionResponse>, AppError> {
    require_profile(&req.profile)?;
    let departments = state.pipeline.select_departments(&req.profile).await?;
    Ok(Json(DepartmentSelectionResponse { departments }))
}

/// POST /api/v1/recommendations/courses
pub async fn handle_select_courses(
    State(state): State<AppState>,
    Json(req): Json<CourseSelectionRequest>,
) -> Result<Json<CourseSelectionReport>, AppError> {
    require_profile(&req.profile)?;
    if req.departments.is_empty() || req.departments.len() > MAX_DEPARTMENTS {
        return Err(AppError::Validation(format!(
            "between 1 and {MAX_DEPARTMENTS} departments are required, got {}",
            req.departments.len()
        )));
    }
    let catalog = state.pipeline.catalog();
    let unknown: Vec<&str> = req
        .departments
        .iter()
        .map(String::as_str)
        .filter(|name| !catalog.contains(name))
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "departments not in the catalog: {}",
            unknown.join(", ")
        )));
    }
    let report = state
        .pipeline
        .select_courses(&req.departments, &req.profile)
        .await;
    Ok(Json(report))
}

/// POST /api/v1/recommendations/roadmap
pub async fn handle_build_roadmap(
    State(state): State<AppState>,
    Json(req): Json<RoadmapRequest>,
) -> Result<Json<Roadmap>, AppError> {
    let roadmap = state
        .pipeline
        .build_roadmap(&req.courses, req.profile_context.as_deref())
        .await?;
    Ok(Json(roadmap))
}

/// POST /api/v1/recommendations/graph
pub async fn handle_course_graph(Json(req): Json<GraphRequest>) -> Json<GraphResponse> {
    let graph = CourseGraph::from_selections(&req.courses);
    let dangling_prerequisites = graph
        .dangling_prerequisites()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(GraphResponse {
        graph,
        dangling_prerequisites,
    })
}

/// POST /api/v1/recommendations
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<PipelineOutcome>, AppError> {
    require_profile(&req.profile)?;
    let outcome = state
        .pipeline
        .run(&req.profile, req.profile_context.as_deref())
        .await?;
    Ok(Json(outcome))
}
