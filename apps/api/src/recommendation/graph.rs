//! Prerequisite graph over a stage-2 course selection.
//!
//! Vertices are course titles, edges point from a prerequisite to the course
//! that needs it. Built locally without any model call.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::CourseSelection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphVertex {
    pub title: String,
    pub description: String,
    /// False for titles that only appear as someone's prerequisite.
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub prerequisite: String,
    pub course: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseGraph {
    pub vertices: Vec<GraphVertex>,
    pub edges: Vec<GraphEdge>,
}

impl CourseGraph {
    /// Selected courses come first in selection order, then prerequisite-only
    /// titles in the order they are first referenced. Duplicate titles and
    /// duplicate edges are collapsed; self-references are dropped.
    pub fn from_selections(courses: &[CourseSelection]) -> Self {
        let mut graph = CourseGraph::default();
        let mut seen_titles: HashSet<&str> = HashSet::new();
        let mut seen_edges: HashSet<(&str, &str)> = HashSet::new();

        for course in courses {
            if seen_titles.insert(course.course_title.as_str()) {
                graph.vertices.push(GraphVertex {
                    title: course.course_title.clone(),
                    description: course.course_description.clone(),
                    selected: true,
                });
            }
        }

        for course in courses {
            for prerequisite in &course.prerequisites {
                if prerequisite == &course.course_title {
                    continue;
                }
                if seen_titles.insert(prerequisite.as_str()) {
                    graph.vertices.push(GraphVertex {
                        title: prerequisite.clone(),
                        description: String::new(),
                        selected: false,
                    });
                }
                if seen_edges.insert((prerequisite.as_str(), course.course_title.as_str())) {
                    graph.edges.push(GraphEdge {
                        prerequisite: prerequisite.clone(),
                        course: course.course_title.clone(),
                    });
                }
            }
        }

        graph
    }

    /// Prerequisite titles that were never selected as courses themselves.
    pub fn dangling_prerequisites(&self) -> Vec<&str> {
        self.vertices
            .iter()
            .filter(|v| !v.selected)
            .map(|v| v.title.as_str())
            .collect()
    }
}
