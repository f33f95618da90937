//! Department catalog: the fixed department → course-count table.
//!
//! Loaded once at startup and shared read-only. It is both the candidate list
//! shown to the model in stage 1 and the whitelist its answer is filtered against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::corpus::DepartmentStore;

/// Course counts per department of the MIT OpenCourseWare corpus, keyed by the
/// sanitized department names used for the per-department files.
const BUILTIN_DEPARTMENTS: &[(&str, u32)] = &[
    ("Aeronautics_and_Astronautics", 92),
    ("Anthropology", 67),
    ("Architecture", 116),
    ("Athletics,_Physical_Education_and_Recreation", 10),
    ("Biological_Engineering", 41),
    ("Biology", 85),
    ("Brain_and_Cognitive_Sciences", 99),
    ("Chemical_Engineering", 57),
    ("Chemistry", 43),
    ("Civil_and_Environmental_Engineering", 105),
    ("Comparative_Media_Studies_Writing", 71),
    ("Concourse", 5),
    ("Earth,_Atmospheric,_and_Planetary_Sciences", 111),
    ("Economics", 85),
    ("Edgerton_Center", 28),
    ("Electrical_Engineering_and_Computer_Science", 298),
    ("Engineering_Systems_Division", 66),
    ("Experimental_Study_Group", 30),
    ("Global_Studies_and_Languages", 121),
    ("Health_Sciences_and_Technology", 72),
    ("History", 91),
    ("Institute_for_Data,_Systems,_and_Society", 20),
    ("Linguistics_and_Philosophy", 85),
    ("Literature", 128),
    ("Materials_Science_and_Engineering", 92),
    ("Mathematics", 213),
    ("Mechanical_Engineering", 162),
    ("Media_Arts_and_Sciences", 47),
    ("Music_and_Theater_Arts", 69),
    ("Nuclear_Science_and_Engineering", 53),
    ("Others", 447),
    ("Physics", 117),
    ("Political_Science", 97),
    ("Science,_Technology_and_Society", 70),
    ("Sloan_School_of_Management", 218),
    ("Special_Programs", 2),
    ("Urban_Studies_and_Planning", 211),
    ("Women's_and_Gender_Studies", 61),
];

/// Where the catalog is read from at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    /// A `{"Department": course_count}` JSON file.
    File(PathBuf),
    /// Course counts of the partitioned files in the departments directory.
    Corpus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentCatalog {
    departments: BTreeMap<String, u32>,
}

impl DepartmentCatalog {
    pub fn new<I, S>(departments: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            departments: departments
                .into_iter()
                .map(|(name, count)| (name.into(), count))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_DEPARTMENTS.iter().copied())
    }

    /// Reads a `{"Department": count, ...}` JSON object.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Catalog file {} is not a JSON object of counts", path.display()))
    }

    /// Builds the catalog from an already partitioned corpus directory.
    pub async fn from_store(store: &DepartmentStore) -> Result<Self> {
        let mut departments = BTreeMap::new();
        for name in store.department_names().await? {
            let courses = store.load(&name).await?;
            let count = u32::try_from(courses.len())
                .with_context(|| format!("Department {name} has too many courses to count"))?;
            departments.insert(name, count);
        }
        Ok(Self { departments })
    }

    pub async fn load(source: &CatalogSource, store: &DepartmentStore) -> Result<Self> {
        match source {
            CatalogSource::Builtin => Ok(Self::builtin()),
            CatalogSource::File(path) => Self::from_json_file(path),
            CatalogSource::Corpus => Self::from_store(store).await.with_context(|| {
                format!(
                    "Failed to derive the catalog from {}",
                    store.dir().display()
                )
            }),
        }
    }

    pub fn contains(&self, department: &str) -> bool {
        self.departments.contains_key(department)
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.departments.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// `- Name: N courses` lines, alphabetical.
    pub fn prompt_listing(&self) -> String {
        self.iter()
            .map(|(name, count)| format!("- {name}: {count} courses"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseRecord;

    fn count(catalog: &DepartmentCatalog, department: &str) -> Option<u32> {
        catalog
            .iter()
            .find(|(name, _)| *name == department)
            .map(|(_, n)| n)
    }

    fn write_partitioned(dir: &Path) -> PathBuf {
        let courses = vec![
            CourseRecord::new("Calculus I", "Limits").in_departments(["Mathematics"]),
            CourseRecord::new("Mechanics", "Forces").in_departments(["Physics", "Mathematics"]),
        ];
        let input = dir.join("all_courses.json");
        std::fs::write(&input, serde_json::to_string(&courses).unwrap()).unwrap();
        let out = dir.join("departments");
        crate::corpus::partition_courses(&input, &out).unwrap();
        out
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = DepartmentCatalog::builtin();
        assert_eq!(catalog.len(), 38);
        assert_eq!(count(&catalog, "Mathematics"), Some(213));
        assert!(catalog.contains("Electrical_Engineering_and_Computer_Science"));
        assert!(!catalog.contains("Astrology"));
    }

    #[test]
    fn test_prompt_listing_is_sorted() {
        let catalog = DepartmentCatalog::new([("Physics", 5), ("Mathematics", 5)]);
        assert_eq!(
            catalog.prompt_listing(),
            "- Mathematics: 5 courses\n- Physics: 5 courses"
        );
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"{"Biology": 85, "Chemistry": 43}"#).unwrap();

        let catalog = DepartmentCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(count(&catalog, "Chemistry"), Some(43));
    }

    #[test]
    fn test_from_json_file_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"["Biology"]"#).unwrap();
        assert!(DepartmentCatalog::from_json_file(&path).is_err());
    }

    #[tokio::test]
    async fn test_from_store_counts_courses() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_partitioned(dir.path());

        let catalog = DepartmentCatalog::from_store(&DepartmentStore::new(&out))
            .await
            .unwrap();
        assert_eq!(count(&catalog, "Mathematics"), Some(2));
        assert_eq!(count(&catalog, "Physics"), Some(1));
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_load_from_each_source() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_partitioned(dir.path());
        let store = DepartmentStore::new(&out);
        let file = dir.path().join("catalog.json");
        std::fs::write(&file, r#"{"Biology": 85}"#).unwrap();

        let builtin = DepartmentCatalog::load(&CatalogSource::Builtin, &store)
            .await
            .unwrap();
        assert_eq!(builtin.len(), 38);

        let from_file = DepartmentCatalog::load(&CatalogSource::File(file), &store)
            .await
            .unwrap();
        assert_eq!(count(&from_file, "Biology"), Some(85));

        let from_corpus = DepartmentCatalog::load(&CatalogSource::Corpus, &store)
            .await
            .unwrap();
        assert!(from_corpus.contains("Physics"));
        assert_eq!(from_corpus.len(), 2);
    }

    #[tokio::test]
    async fn test_load_from_missing_corpus_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = DepartmentStore::new(dir.path().join("missing"));
        assert!(DepartmentCatalog::load(&CatalogSource::Corpus, &store)
            .await
            .is_err());
    }
}
