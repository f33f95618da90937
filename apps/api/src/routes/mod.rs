pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::recommendation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/departments", get(handlers::handle_list_departments))
        // Pipeline stages, callable one at a time
        .route(
            "/api/v1/recommendations/departments",
            post(handlers::handle_select_departments),
        )
        .route(
            "/api/v1/recommendations/courses",
            post(handlers::handle_select_courses),
        )
        .route(
            "/api/v1/recommendations/roadmap",
            post(handlers::handle_build_roadmap),
        )
        .route(
            "/api/v1/recommendations/graph",
            post(handlers::handle_course_graph),
        )
        // Full three-stage run
        .route("/api/v1/recommendations", post(handlers::handle_recommend))
        .with_state(state)
}
