//! SHA-256 digests for persisted JSON artifacts.
//!
//! Every artifact written by synthdb (cluster maps, quality reports,
//! augmentation results) lands as `<name>.json` next to a `<name>.digest`
//! sidecar holding the hex digest of the exact bytes written. Readers verify the
//! sidecar before deserializing.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::error::{Result, SynthError};

/// Hex-encoded SHA-256 digest of an artifact's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    /// Digest raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn digest_path_for(path: &Path) -> PathBuf {
    path.with_extension("digest")
}

/// Persist `value` as pretty JSON at `path` plus a `.digest` sidecar.
///
/// Parent directories are created as needed.
pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> Result<ArtifactDigest> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(value)?;
    let digest = ArtifactDigest::from_bytes(&json);

    std::fs::write(path, &json)?;
    std::fs::write(digest_path_for(path), digest.as_str().as_bytes())?;

    Ok(digest)
}

/// Read a JSON artifact written by [`write_json_artifact`], verifying its digest.
///
/// A missing sidecar is tolerated so that hand-written inputs can be loaded;
/// a present but mismatching sidecar is an error.
pub fn read_json_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read(path)?;
    let sidecar = digest_path_for(path);

    if sidecar.exists() {
        let expected = std::fs::read_to_string(&sidecar)?;
        let actual = ArtifactDigest::from_bytes(&json);
        if expected.trim() != actual.as_str() {
            return Err(SynthError::DigestMismatch {
                expected: expected.trim().to_string(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_digest_is_stable_hex() {
        let a = ArtifactDigest::from_bytes(b"synthdb");
        let b = ArtifactDigest::from_bytes(b"synthdb");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_write_then_read_verifies_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("map.json");

        let mut map = BTreeMap::new();
        map.insert(0usize, vec!["orders".to_string(), "customers".to_string()]);
        write_json_artifact(&path, &map).unwrap();

        assert!(path.with_extension("digest").exists());
        let back: BTreeMap<usize, Vec<String>> = read_json_artifact(&path).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        write_json_artifact(&path, &vec![1, 2, 3]).unwrap();

        std::fs::write(&path, b"[1,2,4]").unwrap();
        let err = read_json_artifact::<Vec<i32>>(&path).unwrap_err();
        assert!(matches!(err, SynthError::DigestMismatch { .. }));
    }

    #[test]
    fn test_missing_sidecar_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, br#"{"a": 1}"#).unwrap();

        let back: BTreeMap<String, i32> = read_json_artifact(&path).unwrap();
        assert_eq!(back.get("a"), Some(&1));
    }
}
