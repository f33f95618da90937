use std::path::{Path, PathBuf};

use super::{sanitize_department_name, CorpusError};
use crate::models::CourseRecord;

/// Read-only view over a partitioned corpus directory.
#[derive(Debug, Clone)]
pub struct DepartmentStore {
    dir: PathBuf,
}

impl DepartmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, department: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_department_name(department)))
    }

    /// Loads one department's courses wholesale.
    pub async fn load(&self, department: &str) -> Result<Vec<CourseRecord>, CorpusError> {
        let path = self.path_for(department);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CorpusError::DepartmentNotFound(department.to_string()))
            }
            Err(source) => return Err(CorpusError::Io { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| CorpusError::Malformed { path, source })
    }

    /// File stems of every `*.json` group in the directory, sorted.
    pub async fn department_names(&self) -> Result<Vec<String>, CorpusError> {
        let io_err = |source| CorpusError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
