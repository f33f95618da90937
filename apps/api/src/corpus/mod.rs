//! Course Corpus Partitioner: splits the flat course dump into one JSON file per department.
//!
//! Runs offline before the service starts. The service only reads the
//! resulting files, through `DepartmentStore`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::models::CourseRecord;

pub mod store;

pub use store::DepartmentStore;

/// Group for courses that list no department.
pub const OTHERS_GROUP: &str = "Others";

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("course file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed course JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no course file for department '{0}'")]
    DepartmentNotFound(String),
}

impl CorpusError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            CorpusError::InputNotFound(path.to_path_buf())
        } else {
            CorpusError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Turns a department name into a safe file stem.
///
/// Forbidden path characters become `_`, surrounding whitespace is trimmed,
/// inner spaces become `_` and runs of `_` collapse to one.
/// `"C/D:E"` → `"C_D_E"`.
pub fn sanitize_department_name(name: &str) -> String {
    static REPEATED: OnceLock<Regex> = OnceLock::new();
    let repeated =
        REPEATED.get_or_init(|| Regex::new("_{2,}").expect("underscore pattern is valid"));

    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let spaced = replaced.trim().replace(' ', "_");
    repeated.replace_all(&spaced, "_").into_owned()
}

/// Groups courses by sanitized department name. A course listing N departments
/// lands in N groups; a course listing none lands in `Others`.
pub fn group_by_department(courses: &[CourseRecord]) -> BTreeMap<String, Vec<CourseRecord>> {
    let mut groups: BTreeMap<String, Vec<CourseRecord>> = BTreeMap::new();
    for course in courses {
        if course.department_name.is_empty() {
            groups
                .entry(OTHERS_GROUP.to_string())
                .or_default()
                .push(course.clone());
            continue;
        }
        for department in &course.department_name {
            groups
                .entry(sanitize_department_name(department))
                .or_default()
                .push(course.clone());
        }
    }
    groups
}

pub fn read_courses(input: &Path) -> Result<Vec<CourseRecord>, CorpusError> {
    let raw = std::fs::read_to_string(input).map_err(|e| CorpusError::io(input, e))?;
    serde_json::from_str(&raw).map_err(|source| CorpusError::Malformed {
        path: input.to_path_buf(),
        source,
    })
}

/// Sorted, de-duplicated raw department names present in the corpus.
pub fn list_departments(input: &Path) -> Result<Vec<String>, CorpusError> {
    let courses = read_courses(input)?;
    let names: BTreeSet<String> = courses
        .into_iter()
        .flat_map(|c| c.department_name)
        .collect();
    Ok(names.into_iter().collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenGroup {
    pub department: String,
    pub file: PathBuf,
    pub courses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedGroup {
    pub department: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionReport {
    pub total_courses: usize,
    pub groups: Vec<WrittenGroup>,
    pub failed: Vec<FailedGroup>,
}

/// Splits `input` into `<out_dir>/<department>.json` files.
///
/// Input errors abort before anything is written. A failure on one group is
/// logged and reported; the remaining groups are still written. Each file is
/// written to a temp file first and renamed into place.
pub fn partition_courses(input: &Path, out_dir: &Path) -> Result<PartitionReport, CorpusError> {
    let courses = read_courses(input)?;
    std::fs::create_dir_all(out_dir).map_err(|source| CorpusError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let groups = group_by_department(&courses);
    let mut report = PartitionReport {
        total_courses: courses.len(),
        ..Default::default()
    };

    for (department, members) in groups {
        let file = out_dir.join(format!("{department}.json"));
        match write_group(out_dir, &file, &members) {
            Ok(()) => {
                info!("Wrote {} with {} courses", file.display(), members.len());
                report.groups.push(WrittenGroup {
                    department,
                    file,
                    courses: members.len(),
                });
            }
            Err(e) => {
                error!("Failed to write {}: {e}", file.display());
                report.failed.push(FailedGroup {
                    department,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Partitioned {} courses into {} departments ({} failed)",
        report.total_courses,
        report.groups.len(),
        report.failed.len()
    );
    Ok(report)
}

fn write_group(out_dir: &Path, file: &Path, members: &[CourseRecord]) -> Result<(), CorpusError> {
    let io_err = |source| CorpusError::Io {
        path: file.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(members).map_err(|source| CorpusError::Malformed {
        path: file.to_path_buf(),
        source,
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(out_dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.persist(file).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_input(dir: &Path, courses: &[CourseRecord]) -> PathBuf {
        let path = dir.join("all_courses.json");
        std::fs::write(&path, serde_json::to_string(courses).unwrap()).unwrap();
        path
    }

    fn sample_courses() -> Vec<CourseRecord> {
        vec![
            CourseRecord::new("Quantum Physics I", "Wave mechanics").in_departments(["A", "B"]),
            CourseRecord::new("Seminar", "Open discussion"),
            CourseRecord::new("Signals", "Fourier").in_departments(["C/D:E"]),
        ]
    }

    #[test]
    fn test_sanitize_replaces_forbidden_characters() {
        assert_eq!(sanitize_department_name("C/D:E"), "C_D_E");
        assert_eq!(sanitize_department_name("a<b>c|d?e*f\"g\\h"), "a_b_c_d_e_f_g_h");
    }

    #[test]
    fn test_sanitize_trims_and_collapses() {
        assert_eq!(
            sanitize_department_name("  Comparative Media Studies / Writing "),
            "Comparative_Media_Studies_Writing"
        );
        assert!(!sanitize_department_name("x //: y").contains("__"));
    }

    #[test]
    fn test_sanitize_is_idempotent_for_catalog_names() {
        let name = "Earth,_Atmospheric,_and_Planetary_Sciences";
        assert_eq!(sanitize_department_name(name), name);
    }

    #[test]
    fn test_multi_department_course_lands_in_each_group() {
        let groups = group_by_department(&sample_courses());
        assert_eq!(groups["A"][0].title, "Quantum Physics I");
        assert_eq!(groups["B"][0].title, "Quantum Physics I");
        assert_eq!(groups["C_D_E"][0].title, "Signals");
    }

    #[test]
    fn test_course_without_department_only_in_others() {
        let groups = group_by_department(&sample_courses());
        assert_eq!(groups[OTHERS_GROUP].len(), 1);
        assert_eq!(groups[OTHERS_GROUP][0].title, "Seminar");
        let in_other_groups = groups
            .iter()
            .filter(|(name, _)| name.as_str() != OTHERS_GROUP)
            .any(|(_, courses)| courses.iter().any(|c| c.title == "Seminar"));
        assert!(!in_other_groups);
    }

    #[test]
    fn test_partition_writes_one_file_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &sample_courses());
        let out = dir.path().join("nested").join("departments");

        let report = partition_courses(&input, &out).unwrap();

        assert_eq!(report.total_courses, 3);
        assert_eq!(report.groups.len(), 4);
        assert!(report.failed.is_empty());
        for name in ["A", "B", "C_D_E", "Others"] {
            let raw = std::fs::read_to_string(out.join(format!("{name}.json"))).unwrap();
            let courses: Vec<CourseRecord> = serde_json::from_str(&raw).unwrap();
            assert!(!courses.is_empty());
        }
    }

    #[test]
    fn test_partition_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("departments");
        let err = partition_courses(&dir.path().join("missing.json"), &out).unwrap_err();
        assert!(matches!(err, CorpusError::InputNotFound(_)));
        assert!(!out.exists());
    }

    #[test]
    fn test_partition_malformed_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("all_courses.json");
        std::fs::write(&input, "[{\"title\": ").unwrap();
        let out = dir.path().join("departments");

        let err = partition_courses(&input, &out).unwrap_err();
        assert!(matches!(err, CorpusError::Malformed { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_list_departments_sorted_and_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut courses = sample_courses();
        courses.push(CourseRecord::new("Optics", "Light").in_departments(["B"]));
        let input = write_input(dir.path(), &courses);

        assert_eq!(list_departments(&input).unwrap(), vec!["A", "B", "C/D:E"]);
    }
}
