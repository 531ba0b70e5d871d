//! Backup-then-replace file writer.
//!
//! The pre-repair content is written to `<path>.backup.<nanos>` before the
//! live file is touched. If the backup cannot be written the live file is
//! left alone. The overwrite itself goes through a temp file in the same
//! directory and a rename.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::domain::error::{MendError, Result};
use crate::domain::repair::{RepairRecord, RepairStrategy};

/// Bound on backup-name collisions before giving up.
const MAX_BACKUP_PROBES: u32 = 64;

/// Resolve a diagnostic path against the build root, refusing paths that
/// climb out of it.
pub fn resolve_in_root(root: &Path, file: &str) -> Result<PathBuf> {
    let relative = Path::new(file);
    if relative.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(MendError::OutsideRoot(relative.to_path_buf()));
    }
    if relative.is_absolute() {
        return if relative.starts_with(root) {
            Ok(relative.to_path_buf())
        } else {
            Err(MendError::OutsideRoot(relative.to_path_buf()))
        };
    }
    Ok(root.join(relative))
}

/// Write `content` to a fresh `<path>.backup.<nanos>` file.
///
/// `create_new` makes a name collision an error, in which case the stamp is
/// bumped and the write retried.
pub fn write_backup(path: &Path, content: &str) -> Result<PathBuf> {
    let base = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);

    let mut last_error = None;
    for probe in 0..MAX_BACKUP_PROBES {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".backup.{}", base + i64::from(probe)));
        let backup_path = PathBuf::from(name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&backup_path)
        {
            Ok(mut file) => {
                let written = file.write_all(content.as_bytes()).and_then(|_| file.sync_all());
                return match written {
                    Ok(()) => Ok(backup_path),
                    Err(source) => {
                        let _ = fs::remove_file(&backup_path);
                        Err(MendError::Backup {
                            path: backup_path,
                            source,
                        })
                    }
                };
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => last_error = Some(e),
            Err(source) => {
                return Err(MendError::Backup {
                    path: backup_path,
                    source,
                })
            }
        }
    }

    Err(MendError::Backup {
        path: path.to_path_buf(),
        source: last_error.unwrap_or_else(|| ErrorKind::AlreadyExists.into()),
    })
}

/// Replace `path` with `content` via temp file + rename.
pub fn replace_file(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    if let Ok(meta) = fs::metadata(path) {
        // Keep the original permissions.
        let _ = fs::set_permissions(tmp.path(), meta.permissions());
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Apply a candidate replacement to one file.
///
/// Returns `Ok(None)` when `new_content` equals `original_content`; no
/// backup is created in that case.
pub fn apply_repair(
    path: &Path,
    file: &str,
    message: &str,
    strategy: RepairStrategy,
    new_content: &str,
    original_content: &str,
) -> Result<Option<RepairRecord>> {
    if new_content == original_content {
        return Ok(None);
    }

    let backup_path = write_backup(path, original_content)?;
    replace_file(path, new_content)?;

    Ok(Some(RepairRecord {
        file: file.to_string(),
        message: message.to_string(),
        backup_path,
        strategy,
        applied_at: Utc::now(),
    }))
}
