//! Model Artifacts - existence, checksum pin, session creation
//!
//! Everything here runs once in the startup phase. Any failure is
//! `ModelUnavailable` and the pipeline refuses to build.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::error::{DiagnosticError, DiagnosticResult};

/// Loaded artifact description (logged at startup)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub loaded_at: DateTime<Utc>,
}

/// Streamed SHA-256 of a file, lowercase hex
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check the file exists and matches its pin (if any)
pub fn verify_artifact(name: &str, path: &Path, expected_sha256: Option<&str>) -> DiagnosticResult<ArtifactInfo> {
    if !path.is_file() {
        return Err(DiagnosticError::model_unavailable(
            name,
            format!("not found: {}", path.display()),
        ));
    }

    let size_bytes = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| DiagnosticError::model_unavailable(name, e))?;
    let sha256 = file_sha256(path).map_err(|e| DiagnosticError::model_unavailable(name, e))?;

    if let Some(expected) = expected_sha256 {
        let expected = expected.trim().to_ascii_lowercase();
        if expected != sha256 {
            return Err(DiagnosticError::model_unavailable(
                name,
                format!("checksum mismatch: expected {}, got {}", expected, sha256),
            ));
        }
    }

    Ok(ArtifactInfo {
        name: name.to_string(),
        path: path.to_path_buf(),
        sha256,
        size_bytes,
        loaded_at: Utc::now(),
    })
}

/// Verify, then commit an ONNX Runtime session from the file
pub fn load_session(
    name: &str,
    path: &Path,
    expected_sha256: Option<&str>,
) -> DiagnosticResult<(Session, ArtifactInfo)> {
    log::info!("Loading {} model from: {}", name, path.display());

    let info = verify_artifact(name, path, expected_sha256)?;

    let session = Session::builder()
        .map_err(|e| DiagnosticError::model_unavailable(name, format!("failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DiagnosticError::model_unavailable(name, format!("failed to set optimization: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| DiagnosticError::model_unavailable(name, format!("failed to load model: {}", e)))?;

    log::info!(
        "{} model loaded ({} bytes, sha256 {})",
        name,
        info.size_bytes,
        &info.sha256[..12]
    );

    Ok((session, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sha256_known_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        assert_eq!(
            file_sha256(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_artifact_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_session("corrector", &dir.path().join("absent.onnx"), None).unwrap_err();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.to_string().contains("corrector"));
    }

    #[test]
    fn test_checksum_pin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let ok = verify_artifact(
            "detector",
            file.path(),
            Some("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD"),
        )
        .unwrap();
        assert_eq!(ok.size_bytes, 3);

        let err = verify_artifact("detector", file.path(), Some("00")).unwrap_err();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
