//! Recommendation Pipeline: runs the three stages in order.
//!
//! Flow: select_departments → select_courses → build_roadmap.
//! Stages are also exposed one by one so a caller can stop and inspect
//! between them. Calls are strictly sequential; nothing runs in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::catalog::DepartmentCatalog;
use crate::corpus::DepartmentStore;
use crate::extraction::{DelimitedJsonExtractor, ResponseExtractor};
use crate::llm_client::CompletionClient;
use crate::models::{CourseSelection, Roadmap, StudentProfile};
use crate::recommendation::courses::{select_courses, CourseSelectionReport};
use crate::recommendation::departments::select_departments;
use crate::recommendation::roadmap::build_roadmap;
use crate::recommendation::StageError;

/// Result of a full run that did not hit a stage error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Stage 1 found no catalog department with confidence. Stages 2 and 3 were not run.
    NoDepartments { run_id: Uuid },
    /// Stage 2 produced no courses. Stage 3 was not run.
    NoCourses {
        run_id: Uuid,
        departments: Vec<String>,
        report: CourseSelectionReport,
    },
    Completed {
        run_id: Uuid,
        departments: Vec<String>,
        report: CourseSelectionReport,
        roadmap: Roadmap,
        generated_at: DateTime<Utc>,
    },
}

#[derive(Clone)]
pub struct RecommendationPipeline {
    client: CompletionClient,
    extractor: Arc<dyn ResponseExtractor>,
    catalog: Arc<DepartmentCatalog>,
    store: DepartmentStore,
}

impl RecommendationPipeline {
    pub fn new(
        client: CompletionClient,
        catalog: Arc<DepartmentCatalog>,
        store: DepartmentStore,
    ) -> Self {
        Self {
            client,
            extractor: Arc::new(DelimitedJsonExtractor),
            catalog,
            store,
        }
    }

    pub fn catalog(&self) -> &DepartmentCatalog {
        &self.catalog
    }

    pub async fn select_departments(
        &self,
        profile: &StudentProfile,
    ) -> Result<Vec<String>, StageError> {
        select_departments(&self.client, self.extractor.as_ref(), &self.catalog, profile).await
    }

    pub async fn select_courses(
        &self,
        departments: &[String],
        profile: &StudentProfile,
    ) -> CourseSelectionReport {
        select_courses(
            &self.client,
            self.extractor.as_ref(),
            &self.store,
            departments,
            profile,
        )
        .await
    }

    pub async fn build_roadmap(
        &self,
        courses: &[CourseSelection],
        profile_context: Option<&str>,
    ) -> Result<Roadmap, StageError> {
        build_roadmap(&self.client, self.extractor.as_ref(), courses, profile_context).await
    }

    /// Runs all three stages. Halts early, without error, when a stage
    /// produces nothing for the next one to work on.
    pub async fn run(
        &self,
        profile: &StudentProfile,
        profile_context: Option<&str>,
    ) -> Result<PipelineOutcome, StageError> {
        let run_id = Uuid::new_v4();
        self.run_stages(run_id, profile, profile_context)
            .instrument(info_span!("recommendation_run", %run_id))
            .await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        profile: &StudentProfile,
        profile_context: Option<&str>,
    ) -> Result<PipelineOutcome, StageError> {
        info!("Step 1: selecting relevant departments");
        let departments = self.select_departments(profile).await?;
        if departments.is_empty() {
            info!("No departments selected; stopping");
            return Ok(PipelineOutcome::NoDepartments { run_id });
        }

        info!("Step 2: selecting courses with prerequisites");
        let report = self.select_courses(&departments, profile).await;
        if report.courses.is_empty() {
            info!("No courses selected; stopping");
            return Ok(PipelineOutcome::NoCourses {
                run_id,
                departments,
                report,
            });
        }

        info!("Step 3: creating learning roadmap");
        let roadmap = self.build_roadmap(&report.courses, profile_context).await?;

        Ok(PipelineOutcome::Completed {
            run_id,
            departments,
            report,
            roadmap,
            generated_at: Utc::now(),
        })
    }
}
