use crate::db::models::{Camera, Record, Violation, Worker};
use crate::error::Error;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;

const WORKERS_JSON: &str = include_str!("../../fixtures/workers.json");
const CAMERAS_JSON: &str = include_str!("../../fixtures/cameras.json");
const VIOLATIONS_JSON: &str = include_str!("../../fixtures/violations.json");

/// Seed data for the in-memory store
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub workers: Vec<Worker>,
    pub cameras: Vec<Camera>,
    pub violations: Vec<Violation>,
}

impl Fixtures {
    /// Fixtures compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(WORKERS_JSON, CAMERAS_JSON, VIOLATIONS_JSON)
    }

    /// Load `workers.json`, `cameras.json` and `violations.json` from a directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .context(format!("Failed to read fixture file: {:?}", path))
        };

        Self::parse(
            &read("workers.json")?,
            &read("cameras.json")?,
            &read("violations.json")?,
        )
    }

    fn parse(workers: &str, cameras: &str, violations: &str) -> Result<Self> {
        let fixtures = Self {
            workers: parse_collection(workers)?,
            cameras: parse_collection(cameras)?,
            violations: parse_collection(violations)?,
        };
        fixtures.check_unique_ids()?;
        Ok(fixtures)
    }

    fn check_unique_ids(&self) -> Result<(), Error> {
        ensure_unique(&self.workers)?;
        ensure_unique(&self.cameras)?;
        ensure_unique(&self.violations)
    }
}

fn parse_collection<T: Record + DeserializeOwned>(json: &str) -> Result<Vec<T>> {
    serde_json::from_str(json).map_err(|e| {
        anyhow::Error::from(Error::Serialization(format!(
            "Invalid {} fixture: {}",
            T::KIND,
            e
        )))
    })
}

fn ensure_unique<T: Record>(rows: &[T]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for row in rows {
        if !seen.insert(row.id()) {
            return Err(Error::Config(format!(
                "Duplicate {} id in fixtures: {}",
                T::KIND,
                row.id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_fixtures_load() {
        let fixtures = Fixtures::builtin().unwrap();
        assert!(!fixtures.workers.is_empty());
        assert!(!fixtures.cameras.is_empty());
        assert!(!fixtures.violations.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let workers = r#"[
            {"Id": 1, "fullName": "A", "username": "a", "employeeId": "E1", "department": "D"},
            {"Id": 1, "fullName": "B", "username": "b", "employeeId": "E2", "department": "D"}
        ]"#;
        let err = Fixtures::parse(workers, "[]", "[]").unwrap_err();
        assert!(matches!(Error::find(&err), Some(Error::Config(_))));
    }

    #[test]
    fn test_load_dir_reads_all_three_files() {
        let dir = std::env::temp_dir().join(format!("ppe-fixtures-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("workers.json"), "[]").unwrap();
        std::fs::write(dir.join("cameras.json"), "[]").unwrap();
        std::fs::write(dir.join("violations.json"), "[]").unwrap();

        let fixtures = Fixtures::load_dir(&dir).unwrap();
        assert!(fixtures.workers.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
