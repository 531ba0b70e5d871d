//! Report persistence and restore.
//!
//! A finished session can be written to `<dir>/<run_id>/repair-report.json`
//! with a sibling `repair-report.digest` holding the SHA-256 of the JSON
//! bytes. Readers verify the digest before deserializing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::applier::{replace_file, resolve_in_root};
use crate::domain::error::{MendError, Result};
use crate::domain::report::RepairReport;

pub const REPORT_FILE: &str = "repair-report.json";
pub const DIGEST_FILE: &str = "repair-report.digest";

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<run_id>/repair-report.json` and its digest.
pub fn write_report_artifact(report: &RepairReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(report.run_id.to_string());
    std::fs::create_dir_all(&run_dir)?;

    let artifact_path = run_dir.join(REPORT_FILE);
    let digest_path = run_dir.join(DIGEST_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    let digest = sha256_hex(&json);

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(&digest_path, digest.as_bytes())?;

    Ok(artifact_path)
}

/// Read and verify `<dir>/<run_id>/repair-report.json`.
pub fn read_report_artifact(run_id: &str, dir: &Path) -> Result<RepairReport> {
    read_report_file(&dir.join(run_id).join(REPORT_FILE))
}

/// Read a report file, verifying the digest file next to it.
pub fn read_report_file(artifact_path: &Path) -> Result<RepairReport> {
    let digest_path = artifact_path.with_file_name(DIGEST_FILE);

    let json = std::fs::read(artifact_path)?;
    let digest = std::fs::read_to_string(&digest_path)?;
    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(MendError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

/// One file put back by [`restore_from_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredFile {
    pub file: String,
    pub backup_path: PathBuf,
}

/// Roll every file a report touched back to its earliest backup, which
/// holds the content from before the session's first repair of that file.
pub fn restore_from_report(report: &RepairReport, root: &Path) -> Result<Vec<RestoredFile>> {
    let mut seen = HashSet::new();
    let mut restored = Vec::new();

    for record in &report.fixed_files {
        if !seen.insert(record.file.as_str()) {
            continue;
        }

        let target = resolve_in_root(root, &record.file)?;
        let content = std::fs::read_to_string(&record.backup_path).map_err(|e| {
            MendError::Restore(format!(
                "cannot read backup {}: {e}",
                record.backup_path.display()
            ))
        })?;
        replace_file(&target, &content)?;

        info!(file = %record.file, backup = %record.backup_path.display(), "restored from backup");
        restored.push(RestoredFile {
            file: record.file.clone(),
            backup_path: record.backup_path.clone(),
        });
    }

    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
