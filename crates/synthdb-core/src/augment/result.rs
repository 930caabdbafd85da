//! Targets in, results out: the manifest of schema-only databases and the
//! per-dbid outcome records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use super::error::{AugmentError, AugmentResult};
use crate::domain::{self, ArtifactDigest};

/// File name of the batch result artifact inside the workdir.
pub const RESULT_FILE: &str = "augment_result.json";

/// Terminal outcome for one dbid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationResult {
    pub success: bool,
    /// The accepted program on success, the last generated one otherwise.
    pub code: String,
}

impl AugmentationResult {
    pub fn succeeded(code: impl Into<String>) -> Self {
        Self {
            success: true,
            code: code.into(),
        }
    }

    pub fn failed(code: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
        }
    }
}

/// dbid → outcome, as persisted.
pub type AugmentationResults = BTreeMap<String, AugmentationResult>;

/// One manifest entry as produced upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sqlite_path: PathBuf,
    /// Table name → DDL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_meta: Option<BTreeMap<String, String>>,
}

/// A schema-only database to populate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDatabase {
    pub dbid: String,
    pub template_path: PathBuf,
    /// Schema text for prompts; read from the template when absent.
    pub schema: Option<String>,
}

impl TargetDatabase {
    pub fn new(dbid: impl Into<String>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            dbid: dbid.into(),
            template_path: template_path.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// The schema shown to the oracle.
    pub fn schema_text(&self) -> AugmentResult<String> {
        match &self.schema {
            Some(schema) => Ok(schema.clone()),
            None => read_schema(&self.template_path),
        }
    }
}

/// `CREATE` statements of the user tables in `path`, ordered by table name.
pub fn read_schema(path: &Path) -> AugmentResult<String> {
    if !path.exists() {
        return Err(AugmentError::TemplateMissing(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(
        "SELECT sql FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND sql IS NOT NULL \
         ORDER BY name",
    )?;
    let statements = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(statements
        .iter()
        .map(|s| format!("{s};"))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Load a manifest (`dbid → { sqlite_path, table_meta? }`) into targets
/// ordered by dbid. Relative paths resolve against the manifest's directory.
pub fn load_manifest(path: &Path) -> AugmentResult<Vec<TargetDatabase>> {
    let bytes = std::fs::read(path)?;
    let entries: BTreeMap<String, ManifestEntry> = serde_json::from_slice(&bytes)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    entries
        .into_iter()
        .map(|(dbid, entry)| {
            if dbid.is_empty() || dbid.contains(['/', '\\']) || dbid == "." || dbid == ".." {
                return Err(AugmentError::Manifest(format!("unusable dbid {dbid:?}")));
            }
            let template_path = if entry.sqlite_path.is_absolute() {
                entry.sqlite_path
            } else {
                base.join(entry.sqlite_path)
            };
            let schema = entry
                .table_meta
                .filter(|meta| !meta.is_empty())
                .map(|meta| meta.into_values().collect::<Vec<_>>().join("\n"));
            Ok(TargetDatabase {
                dbid,
                template_path,
                schema,
            })
        })
        .collect()
}

/// Write `<workdir>/augment_result.json` with its digest sidecar.
pub fn save_results(workdir: &Path, results: &AugmentationResults) -> domain::Result<ArtifactDigest> {
    domain::write_json_artifact(&workdir.join(RESULT_FILE), results)
}

/// Read a result artifact, verifying its digest sidecar when present.
pub fn load_results(workdir: &Path) -> domain::Result<AugmentationResults> {
    domain::read_json_artifact(&workdir.join(RESULT_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_resolves_paths_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("meta.json");
        std::fs::write(
            &manifest,
            r#"{
                "db_b": {"sqlite_path": "dbs/b.sqlite"},
                "db_a": {"sqlite_path": "/abs/a.sqlite",
                         "table_meta": {"users": "CREATE TABLE users (id INTEGER);",
                                        "orders": "CREATE TABLE orders (id INTEGER);"}}
            }"#,
        )
        .unwrap();

        let targets = load_manifest(&manifest).unwrap();
        assert_eq!(targets[0].dbid, "db_a");
        assert_eq!(targets[0].template_path, PathBuf::from("/abs/a.sqlite"));
        assert_eq!(
            targets[0].schema.as_deref(),
            Some("CREATE TABLE orders (id INTEGER);\nCREATE TABLE users (id INTEGER);")
        );
        assert_eq!(targets[1].template_path, dir.path().join("dbs/b.sqlite"));
        assert!(targets[1].schema.is_none());
    }

    #[test]
    fn test_manifest_rejects_path_like_dbid() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("meta.json");
        std::fs::write(&manifest, r#"{"../x": {"sqlite_path": "x.sqlite"}}"#).unwrap();
        assert!(matches!(
            load_manifest(&manifest),
            Err(AugmentError::Manifest(_))
        ));
    }

    #[test]
    fn test_schema_read_from_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE b (id INTEGER PRIMARY KEY);
                 CREATE TABLE a (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES b(id));",
            )
            .unwrap();
        let schema = TargetDatabase::new("x", &path).schema_text().unwrap();
        let lines: Vec<&str> = schema.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("CREATE TABLE a"));
        assert!(lines[1].ends_with(';'));
    }

    #[test]
    fn test_missing_template() {
        let err = read_schema(Path::new("/definitely/not/here.sqlite")).unwrap_err();
        assert!(matches!(err, AugmentError::TemplateMissing(_)));
    }

    #[test]
    fn test_results_round_trip_with_digest() {
        let dir = tempfile::tempdir().unwrap();
        let mut results = AugmentationResults::new();
        results.insert("db_1".into(), AugmentationResult::succeeded("code"));
        results.insert("db_2".into(), AugmentationResult::failed(""));

        save_results(dir.path(), &results).unwrap();
        assert!(dir.path().join("augment_result.digest").exists());

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(RESULT_FILE)).unwrap()).unwrap();
        assert_eq!(raw["db_1"]["success"], true);
        assert_eq!(load_results(dir.path()).unwrap(), results);
    }
}
